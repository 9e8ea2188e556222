//! Snapshot buffering and render-state interpolation.
//!
//! The server ticks slower than the client renders, so drawing snapshots
//! directly would stutter. Instead the reconciler keeps the previous and
//! newest snapshots, estimates the server clock offset, and renders a
//! point a fixed delay behind server time, lerping positions between the
//! two snapshots. Velocities are never interpolated; the newest value is
//! authoritative.

use shared::{Ball, Player, Score, Snapshot};

/// Smoothing weight for the clock-offset moving average. Each sample moves
/// the estimate 10% of the way, filtering out network jitter.
const OFFSET_SMOOTHING: f64 = 0.1;

/// What the renderer draws on a given frame.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub players: Vec<Player>,
    pub ball: Ball,
    pub score: Score,
    pub tick: u32,
}

pub struct Reconciler {
    previous: Option<Snapshot>,
    latest: Option<Snapshot>,
    clock_offset_ms: Option<f64>,
    snapshot_interval_ms: f64,
    interp_delay_ms: f64,
}

impl Reconciler {
    pub fn new(snapshot_interval_ms: f64, interp_delay_ms: f64) -> Self {
        Self {
            previous: None,
            latest: None,
            clock_offset_ms: None,
            snapshot_interval_ms,
            interp_delay_ms,
        }
    }

    /// Records a freshly decoded snapshot and updates the smoothed clock
    /// offset from its embedded timestamp. `local_now_ms` is the local
    /// clock at decode time.
    ///
    /// UDP can reorder datagrams; a snapshot whose tick is not newer than
    /// the buffered one would lerp entities backward, so it is dropped.
    pub fn record(&mut self, snapshot: Snapshot, local_now_ms: f64) {
        if let Some(latest) = &self.latest {
            if snapshot.tick <= latest.tick {
                return;
            }
        }

        let sample = snapshot.timestamp as f64 - local_now_ms;
        self.clock_offset_ms = Some(match self.clock_offset_ms {
            Some(estimate) => estimate + OFFSET_SMOOTHING * (sample - estimate),
            None => sample,
        });

        self.previous = self.latest.take();
        self.latest = Some(snapshot);
    }

    /// The current server-minus-local clock estimate, if any snapshot has
    /// arrived yet.
    pub fn clock_offset_ms(&self) -> Option<f64> {
        self.clock_offset_ms
    }

    /// How far the render time has advanced past the newest snapshot,
    /// relative to the expected snapshot interval, clamped to [0, 1].
    /// 0 renders the previous snapshot's positions, 1 the newest.
    pub fn interpolation_factor(&self, local_now_ms: f64) -> f32 {
        let (Some(latest), Some(offset)) = (self.latest.as_ref(), self.clock_offset_ms) else {
            return 1.0;
        };

        let render_ts = local_now_ms + offset - self.interp_delay_ms;
        let elapsed = render_ts - latest.timestamp as f64;
        ((elapsed / self.snapshot_interval_ms) as f32).clamp(0.0, 1.0)
    }

    /// Produces the interpolated state for this frame, or `None` before
    /// the first snapshot arrives.
    pub fn render_state(&self, local_now_ms: f64) -> Option<RenderState> {
        let latest = self.latest.as_ref()?;
        let alpha = self.interpolation_factor(local_now_ms);

        let players = latest
            .players
            .values()
            .map(|player| {
                let prior = self
                    .previous
                    .as_ref()
                    .and_then(|s| s.players.get(&player.id));

                match prior {
                    Some(prev) => Player {
                        x: lerp(prev.x, player.x, alpha),
                        y: lerp(prev.y, player.y, alpha),
                        ..player.clone()
                    },
                    // First sighting: render at the reported position
                    None => player.clone(),
                }
            })
            .collect();

        let ball = match self.previous.as_ref() {
            Some(prev) => Ball {
                x: lerp(prev.ball.x, latest.ball.x, alpha),
                y: lerp(prev.ball.y, latest.ball.y, alpha),
                ..latest.ball.clone()
            },
            None => latest.ball.clone(),
        };

        Some(RenderState {
            players,
            ball,
            score: latest.score.clone(),
            tick: latest.tick,
        })
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
