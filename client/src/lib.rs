//! # Fieldball Client
//!
//! Viewer for the two-team ball game. The client sends directional intent
//! to the authoritative server and renders the snapshots it gets back; it
//! performs no simulation of its own.
//!
//! Snapshots arrive at tick rate while frames render faster, so the
//! [`reconciler`] module buffers the last two snapshots and interpolates
//! entity positions behind a small fixed delay, keeping motion smooth
//! despite network jitter. Because each snapshot is a complete replica, a
//! lost datagram costs one frame of staleness and nothing else.
//!
//! ## Modules
//!
//! - [`reconciler`]: clock-offset estimation and snapshot interpolation.
//! - [`input`]: keyboard sampling into direction sets and send pacing.
//! - [`network`]: the tokio-backed UDP bridge feeding the frame loop.
//! - [`rendering`]: macroquad drawing of field, players, ball, and score.

pub mod input;
pub mod network;
pub mod reconciler;
pub mod rendering;
