//! # Fieldball Server
//!
//! Authoritative server for the two-team ball game. The server owns the
//! only writable copy of match state: clients send directional intent, the
//! simulation advances at a fixed tick rate, and every tick a full-state
//! snapshot is broadcast to all connected clients.
//!
//! ## Architecture
//!
//! A single serialized loop (see [`network::Server::run`]) is the sole
//! writer of the [`game::Match`]. Connection handlers never touch
//! simulation state directly; inbound packets are funneled through a
//! channel into the loop, which applies them to per-session pending slots
//! in [`session::SessionRegistry`]. The tick consumes those slots
//! atomically at its boundary, so every message received before a tick
//! starts is visible no later than that tick and no message can partially
//! affect one.
//!
//! Outbound snapshots go through a bounded queue drained by a sender task;
//! a slow or unresponsive receiver drops snapshots instead of delaying the
//! simulation. Since every snapshot is a complete replica, a dropped one
//! only costs a frame of staleness.
//!
//! ## Modules
//!
//! - [`session`]: participant lifecycle, team assignment, pending input
//!   and deferred removal slots.
//! - [`game`]: the fixed-timestep physics tick over players, ball, and
//!   score.
//! - [`network`]: UDP transport, packet dispatch, the tick loop, and
//!   snapshot fan-out.

pub mod game;
pub mod network;
pub mod session;
