//! Data model and wire types shared by the fieldball server and client.
//!
//! Both sides agree on these structs byte for byte: the server simulates
//! them and the client renders them, so any change here is a protocol
//! change. Snapshots are full replicas of match state, never deltas, which
//! keeps the protocol self-correcting under packet loss.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod codec;
pub mod config;

pub use config::{Config, ConfigError};

/// Protocol version carried in `Packet::Connect`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Used for snapshot timestamps on the server and clock-offset estimation
/// on the client.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Team assignment alternates by parity of the connected count, so the
    /// first player is red, the second blue, and so on.
    pub fn from_count(connected: usize) -> Team {
        if connected % 2 == 0 {
            Team::Red
        } else {
            Team::Blue
        }
    }
}

/// A connected player's physical state. This is both the simulation type
/// and the wire type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub team: Team,
}

impl Player {
    /// Creates a player at their team's home position: red spawns near the
    /// left goal, blue near the right, both vertically centered.
    pub fn spawn(id: u32, team: Team, cfg: &Config) -> Self {
        let x = match team {
            Team::Red => cfg.spawn_margin,
            Team::Blue => cfg.field_width - cfg.spawn_margin,
        };

        Self {
            id,
            x,
            y: cfg.field_height / 2.0,
            vx: 0.0,
            vy: 0.0,
            radius: cfg.player_radius,
            team,
        }
    }

    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
}

impl Ball {
    /// A ball at rest at field center, the state after every goal.
    pub fn centered(cfg: &Config) -> Self {
        Self {
            x: cfg.field_width / 2.0,
            y: cfg.field_height / 2.0,
            vx: 0.0,
            vy: 0.0,
            radius: cfg.ball_radius,
        }
    }

    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub red: u32,
    pub blue: u32,
}

impl Score {
    pub fn award(&mut self, team: Team) {
        match team {
            Team::Red => self.red += 1,
            Team::Blue => self.blue += 1,
        }
    }
}

/// The four logical movement directions a player can hold at once.
///
/// Built from wire tokens at the trust boundary; everything past the
/// boundary works with this fixed shape instead of free-form strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSet {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionSet {
    /// Parses wire tokens, accepting letter keys and arrow-key aliases.
    /// Unknown tokens are dropped silently, not an error.
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = DirectionSet::default();
        for token in tokens {
            match token.to_ascii_lowercase().as_str() {
                "up" | "w" | "arrowup" => set.up = true,
                "down" | "s" | "arrowdown" => set.down = true,
                "left" | "a" | "arrowleft" => set.left = true,
                "right" | "d" | "arrowright" => set.right = true,
                _ => {}
            }
        }
        set
    }

    /// Canonical token names for the wire.
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        if self.up {
            tokens.push("up".to_string());
        }
        if self.down {
            tokens.push("down".to_string());
        }
        if self.left {
            tokens.push("left".to_string());
        }
        if self.right {
            tokens.push("right".to_string());
        }
        tokens
    }

    pub fn is_empty(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }
}

/// A complete authoritative copy of match state, sent once per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u32,
    /// Server wall clock in milliseconds at encode time.
    pub timestamp: u64,
    pub players: HashMap<u32, Player>,
    pub ball: Ball,
    pub score: Score,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Client to server
    Connect {
        client_version: u32,
    },
    Input {
        directions: Vec<String>,
    },
    Disconnect,

    // Server to client
    Connected {
        client_id: u32,
        team: Team,
    },
    Snapshot(Snapshot),
    Disconnected {
        reason: String,
    },
}
