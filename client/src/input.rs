//! Keyboard sampling and input send pacing.

use macroquad::prelude::*;
use shared::DirectionSet;
use std::time::{Duration, Instant};

/// Inputs are resent at this cadence even when unchanged, so the server's
/// liveness tracking sees a quiet but connected player.
const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(250);

/// Samples held keys into a [`DirectionSet`] and decides when the set is
/// worth putting on the wire: on every change, and periodically as a
/// keep-alive.
pub struct InputManager {
    current: DirectionSet,
    last_sent: Instant,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            current: DirectionSet::default(),
            last_sent: Instant::now(),
        }
    }

    /// Reads the keyboard, supporting both WASD and arrow keys.
    fn sample() -> DirectionSet {
        DirectionSet {
            up: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
        }
    }

    /// Called once per frame. Returns the wire tokens to send, or `None`
    /// when nothing changed and the keep-alive is not due.
    pub fn update(&mut self) -> Option<Vec<String>> {
        let sampled = Self::sample();
        self.update_with(sampled)
    }

    fn update_with(&mut self, sampled: DirectionSet) -> Option<Vec<String>> {
        let changed = sampled != self.current;
        let keepalive_due = self.last_sent.elapsed() >= KEEPALIVE_INTERVAL;

        if changed || keepalive_due {
            self.current = sampled;
            self.last_sent = Instant::now();
            Some(sampled.to_tokens())
        } else {
            None
        }
    }

    pub fn current(&self) -> DirectionSet {
        self.current
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
