//! Match tunables and their startup validation.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// All tunable constants for a match.
///
/// Velocities are expressed in pixels per millisecond and the simulation
/// loop passes its fixed tick period in milliseconds, so the defaults below
/// reproduce the canonical 30 Hz dynamics exactly. None of these may change
/// mid-match; the tick period in particular must stay constant for a run so
/// velocity integration stays consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub field_width: f32,
    pub field_height: f32,
    pub player_radius: f32,
    pub ball_radius: f32,
    /// Vertical extent of each goal mouth, centered on the field.
    pub goal_height: f32,
    /// Distance of each team's spawn point from their own goal line.
    pub spawn_margin: f32,
    /// Velocity contributed per held direction, in px/ms.
    pub player_speed: f32,
    /// Per-tick velocity retention factor, applied after integration.
    pub friction: f32,
    /// Scales ball displacement per velocity unit; the ball responds more
    /// slowly than a player to the same velocity.
    pub ball_weight: f32,
    /// Impulse magnitude added along the kicking player's heading.
    pub kick_power: f32,
    pub max_ball_speed: f32,
    /// Fraction of velocity the ball keeps after a kick.
    pub restitution: f32,
    /// Fraction of velocity the ball keeps when rebounding off a wall.
    pub wall_rebound: f32,
    /// When set, a boundary crossing only scores if the ball is within the
    /// goal-mouth vertical band; otherwise any crossing of a goal line scores.
    pub goal_mouth_only: bool,
    pub tick_rate: u32,
    /// Deliberate rendering lag the client trades for smoothness.
    pub interp_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            field_width: 800.0,
            field_height: 400.0,
            player_radius: 20.0,
            ball_radius: 15.0,
            goal_height: 150.0,
            spawn_margin: 100.0,
            player_speed: 0.1,
            friction: 0.98,
            ball_weight: 0.2,
            kick_power: 2.0,
            max_ball_speed: 10.0,
            restitution: 0.3,
            wall_rebound: 0.5,
            goal_mouth_only: false,
            tick_rate: 30,
            interp_delay_ms: 100,
        }
    }
}

impl Config {
    /// Fixed tick period as a duration, for the server loop timer.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate as f64)
    }

    /// Fixed tick period in milliseconds, the `dt` fed to the simulation.
    pub fn tick_dt_ms(&self) -> f32 {
        1000.0 / self.tick_rate as f32
    }

    /// Expected interval between snapshots, used by the client interpolator.
    pub fn snapshot_interval_ms(&self) -> f64 {
        1000.0 / self.tick_rate as f64
    }

    /// Rejects configurations the simulation cannot run safely. These cannot
    /// be patched at runtime, so a violation is fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_width <= 0.0 || self.field_height <= 0.0 {
            return Err(ConfigError::new("field dimensions must be positive"));
        }
        if self.player_radius <= 0.0 || self.ball_radius <= 0.0 {
            return Err(ConfigError::new("radii must be positive"));
        }
        if self.player_radius * 2.0 > self.field_width.min(self.field_height)
            || self.ball_radius * 2.0 > self.field_width.min(self.field_height)
        {
            return Err(ConfigError::new("field too small for entity radii"));
        }
        if self.spawn_margin < self.player_radius || self.spawn_margin > self.field_width / 2.0 {
            return Err(ConfigError::new("spawn margin outside the playable area"));
        }
        if self.goal_height <= 0.0 || self.goal_height > self.field_height {
            return Err(ConfigError::new("goal height must fit the field"));
        }
        if self.player_speed <= 0.0 || self.kick_power < 0.0 || self.max_ball_speed <= 0.0 {
            return Err(ConfigError::new("speeds must be positive"));
        }
        if !(0.0..=1.0).contains(&self.friction) || self.friction == 0.0 {
            return Err(ConfigError::new("friction must be in (0, 1]"));
        }
        if self.ball_weight <= 0.0 {
            return Err(ConfigError::new("ball weight must be positive"));
        }
        if !(0.0..=1.0).contains(&self.restitution) || !(0.0..=1.0).contains(&self.wall_rebound) {
            return Err(ConfigError::new("restitution factors must be in [0, 1]"));
        }
        if self.tick_rate == 0 || self.tick_rate > 240 {
            return Err(ConfigError::new("tick rate must be in 1..=240"));
        }
        Ok(())
    }
}

/// A configuration invariant violation, fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.message)
    }
}

impl Error for ConfigError {}
