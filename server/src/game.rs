//! The authoritative fixed-timestep simulation.
//!
//! [`Match`] is owned exclusively by the server loop; one [`Match::step`]
//! call advances the world by exactly one tick. The phase order inside a
//! tick is load-bearing: inputs resolve to velocities, positions integrate,
//! boundaries apply, then friction, so friction affects the next tick's
//! displacement rather than the current one.

use log::{debug, info};
use shared::{Ball, Config, DirectionSet, Player, Score, Snapshot, Team};
use std::collections::HashMap;

/// Authoritative world state: players, ball, score, and the tick counter.
#[derive(Debug, Clone)]
pub struct Match {
    pub tick: u32,
    pub players: HashMap<u32, Player>,
    pub ball: Ball,
    pub score: Score,
}

impl Match {
    pub fn new(cfg: &Config) -> Self {
        Self {
            tick: 0,
            players: HashMap::new(),
            ball: Ball::centered(cfg),
            score: Score::default(),
        }
    }

    /// Adds a player at their team's home position.
    pub fn add_player(&mut self, id: u32, team: Team, cfg: &Config) {
        let player = Player::spawn(id, team, cfg);
        info!(
            "Added player {} ({:?}) at ({}, {})",
            id, team, player.x, player.y
        );
        self.players.insert(id, player);
    }

    /// Removes a player; unknown ids are a no-op so late removals after a
    /// disconnect cannot fail.
    pub fn remove_player(&mut self, id: u32) {
        if self.players.remove(&id).is_some() {
            info!("Removed player {}", id);
        }
    }

    /// Advances the world one tick. `dt_ms` is the constant tick period in
    /// milliseconds; the caller guarantees `inputs` only references
    /// currently registered players.
    pub fn step(&mut self, inputs: &HashMap<u32, DirectionSet>, dt_ms: f32, cfg: &Config) {
        self.resolve_inputs(inputs, cfg);
        self.integrate_players(dt_ms, cfg);
        self.integrate_ball(dt_ms, cfg);
        self.apply_friction(cfg);
        self.resolve_ball_collision(cfg);
        self.cap_ball_speed(cfg);
        self.check_goals(cfg);
        self.tick = self.tick.wrapping_add(1);
    }

    /// A full-state snapshot of the current tick for broadcast.
    pub fn snapshot(&self, timestamp: u64) -> Snapshot {
        Snapshot {
            tick: self.tick,
            timestamp,
            players: self.players.clone(),
            ball: self.ball.clone(),
            score: self.score.clone(),
        }
    }

    /// Derives each player's velocity from held directions. Opposing keys
    /// cancel; diagonals are deliberately not normalized.
    fn resolve_inputs(&mut self, inputs: &HashMap<u32, DirectionSet>, cfg: &Config) {
        for (id, player) in &mut self.players {
            let input = inputs.get(id).copied().unwrap_or_default();

            player.vx = 0.0;
            player.vy = 0.0;
            if input.up {
                player.vy -= cfg.player_speed;
            }
            if input.down {
                player.vy += cfg.player_speed;
            }
            if input.left {
                player.vx -= cfg.player_speed;
            }
            if input.right {
                player.vx += cfg.player_speed;
            }
        }
    }

    fn integrate_players(&mut self, dt_ms: f32, cfg: &Config) {
        for player in self.players.values_mut() {
            player.x += player.vx * dt_ms;
            player.y += player.vy * dt_ms;

            player.x = player
                .x
                .clamp(player.radius, cfg.field_width - player.radius);
            player.y = player
                .y
                .clamp(player.radius, cfg.field_height - player.radius);
        }
    }

    /// Ball displacement is scaled by `ball_weight`, and wall contact
    /// inverts the corresponding velocity component scaled by the rebound
    /// factor rather than stopping the ball.
    fn integrate_ball(&mut self, dt_ms: f32, cfg: &Config) {
        let ball = &mut self.ball;
        ball.x += ball.vx * dt_ms * cfg.ball_weight;
        ball.y += ball.vy * dt_ms * cfg.ball_weight;

        if ball.x - ball.radius < 0.0 || ball.x + ball.radius > cfg.field_width {
            ball.vx = -ball.vx * cfg.wall_rebound;
            ball.x = if ball.x - ball.radius < 0.0 {
                ball.radius
            } else {
                cfg.field_width - ball.radius
            };
        }
        if ball.y - ball.radius < 0.0 || ball.y + ball.radius > cfg.field_height {
            ball.vy = -ball.vy * cfg.wall_rebound;
            ball.y = if ball.y - ball.radius < 0.0 {
                ball.radius
            } else {
                cfg.field_height - ball.radius
            };
        }
    }

    fn apply_friction(&mut self, cfg: &Config) {
        for player in self.players.values_mut() {
            player.vx *= cfg.friction;
            player.vy *= cfg.friction;
        }
        self.ball.vx *= cfg.friction;
        self.ball.vy *= cfg.friction;
    }

    /// Ball-versus-player collision. When several players overlap the ball
    /// in the same tick, the nearest one by center distance applies the
    /// kick; this replaces the order-dependent overwrite of earlier designs
    /// with a deterministic tie-break.
    fn resolve_ball_collision(&mut self, cfg: &Config) {
        let mut nearest: Option<(u32, f32)> = None;

        for (id, player) in &self.players {
            let dx = self.ball.x - player.x;
            let dy = self.ball.y - player.y;
            let distance = (dx * dx + dy * dy).sqrt();

            if distance < player.radius + self.ball.radius {
                // Equal distances fall to the lower id, so the winner never
                // depends on map iteration order
                let closer = match nearest {
                    Some((best_id, best)) => {
                        distance < best || (distance == best && *id < best_id)
                    }
                    None => true,
                };
                if closer {
                    nearest = Some((*id, distance));
                }
            }
        }

        let Some((id, _)) = nearest else {
            return;
        };
        let player = &self.players[&id];

        let dx = self.ball.x - player.x;
        let dy = self.ball.y - player.y;
        let angle = dy.atan2(dx);
        let reach = player.radius + self.ball.radius;

        // Push the ball to the player's surface along the contact angle
        self.ball.x = player.x + angle.cos() * reach;
        self.ball.y = player.y + angle.sin() * reach;

        // Kick along the player's heading, then restitution
        let heading = player.vy.atan2(player.vx);
        self.ball.vx = (player.vx + heading.cos() * cfg.kick_power) * cfg.restitution;
        self.ball.vy = (player.vy + heading.sin() * cfg.kick_power) * cfg.restitution;

        debug!("Player {} kicked the ball", id);
    }

    fn cap_ball_speed(&mut self, cfg: &Config) {
        let speed = self.ball.speed();
        if speed > cfg.max_ball_speed {
            let scale = cfg.max_ball_speed / speed;
            self.ball.vx *= scale;
            self.ball.vy *= scale;
        }
    }

    /// Scores when the ball's leading edge reaches a goal line, optionally
    /// gated on the goal-mouth band, and resets the ball to field center.
    fn check_goals(&mut self, cfg: &Config) {
        if cfg.goal_mouth_only && !self.ball_in_goal_mouth(cfg) {
            return;
        }

        let scorer = if self.ball.x - self.ball.radius <= 0.0 {
            Some(Team::Blue)
        } else if self.ball.x + self.ball.radius >= cfg.field_width {
            Some(Team::Red)
        } else {
            None
        };

        if let Some(team) = scorer {
            self.score.award(team);
            info!(
                "Goal for {:?}! Score is now red {} - blue {}",
                team, self.score.red, self.score.blue
            );
            self.ball = Ball::centered(cfg);
        }
    }

    fn ball_in_goal_mouth(&self, cfg: &Config) -> bool {
        (self.ball.y - cfg.field_height / 2.0).abs() <= cfg.goal_height / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn cfg() -> Config {
        Config::default()
    }

    fn input_map(id: u32, tokens: &[&str]) -> HashMap<u32, DirectionSet> {
        let mut map = HashMap::new();
        map.insert(id, DirectionSet::from_tokens(tokens.iter().copied()));
        map
    }

    fn empty_inputs() -> HashMap<u32, DirectionSet> {
        HashMap::new()
    }

    #[test]
    fn test_zero_input_is_stationary() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Red, &cfg);

        let (x0, y0) = {
            let p = &game.players[&1];
            (p.x, p.y)
        };

        for _ in 0..100 {
            game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);
        }

        let p = &game.players[&1];
        assert_eq!(p.x, x0);
        assert_eq!(p.y, y0);
        assert_eq!(game.ball.x, cfg.field_width / 2.0);
        assert_eq!(game.ball.y, cfg.field_height / 2.0);
    }

    #[test]
    fn test_input_moves_player() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Red, &cfg);
        let x0 = game.players[&1].x;

        game.step(&input_map(1, &["right"]), cfg.tick_dt_ms(), &cfg);

        let p = &game.players[&1];
        assert_approx_eq!(p.x, x0 + cfg.player_speed * cfg.tick_dt_ms(), 1e-4);
        // Friction has already been applied for the next tick
        assert_approx_eq!(p.vx, cfg.player_speed * cfg.friction, 1e-6);
    }

    #[test]
    fn test_opposing_directions_cancel() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Red, &cfg);
        let x0 = game.players[&1].x;

        game.step(&input_map(1, &["left", "right"]), cfg.tick_dt_ms(), &cfg);
        assert_eq!(game.players[&1].x, x0);
    }

    #[test]
    fn test_diagonal_is_not_normalized() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Blue, &cfg);

        game.step(&input_map(1, &["down", "right"]), cfg.tick_dt_ms(), &cfg);

        let p = &game.players[&1];
        let axis = cfg.player_speed * cfg.friction;
        assert_approx_eq!(p.vx, axis, 1e-6);
        assert_approx_eq!(p.vy, axis, 1e-6);
        // Magnitude exceeds the per-axis speed on purpose
        assert!(p.speed() > axis);
    }

    #[test]
    fn test_player_clamped_to_field() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Red, &cfg);

        let inputs = input_map(1, &["left", "up"]);
        for _ in 0..200 {
            game.step(&inputs, cfg.tick_dt_ms(), &cfg);

            let p = &game.players[&1];
            assert!(p.x >= p.radius && p.x <= cfg.field_width - p.radius);
            assert!(p.y >= p.radius && p.y <= cfg.field_height - p.radius);
        }

        let p = &game.players[&1];
        assert_eq!(p.x, p.radius);
        assert_eq!(p.y, p.radius);
    }

    #[test]
    fn test_ball_weight_slows_displacement() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.ball.vx = 1.0;
        let x0 = game.ball.x;

        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);

        let expected = x0 + 1.0 * cfg.tick_dt_ms() * cfg.ball_weight;
        assert_approx_eq!(game.ball.x, expected, 1e-4);
    }

    #[test]
    fn test_ball_rebounds_off_horizontal_wall() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.ball.y = cfg.field_height - game.ball.radius - 5.0;
        game.ball.vy = 10.0;

        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);

        // Velocity component flipped, scaled by the rebound factor, then
        // friction; position clamped to the wall
        assert_approx_eq!(game.ball.vy, -10.0 * cfg.wall_rebound * cfg.friction, 1e-4);
        assert_eq!(game.ball.y, cfg.field_height - game.ball.radius);
    }

    #[test]
    fn test_ball_speed_never_exceeds_cap() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.ball.vx = 50.0;
        game.ball.vy = -35.0;
        game.ball.y = cfg.field_height / 2.0;

        for _ in 0..50 {
            game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);
            assert!(game.ball.speed() <= cfg.max_ball_speed + 1e-3);
        }
    }

    #[test]
    fn test_goal_left_scores_blue_and_resets() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.ball.x = game.ball.radius + 5.0;
        game.ball.vx = -10.0;

        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);

        assert_eq!(game.score.blue, 1);
        assert_eq!(game.score.red, 0);
        assert_eq!(game.ball.x, cfg.field_width / 2.0);
        assert_eq!(game.ball.y, cfg.field_height / 2.0);
        assert_eq!(game.ball.vx, 0.0);
        assert_eq!(game.ball.vy, 0.0);
    }

    #[test]
    fn test_goal_right_scores_red_symmetrically() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.ball.x = cfg.field_width - game.ball.radius - 5.0;
        game.ball.vx = 10.0;

        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);

        assert_eq!(game.score.red, 1);
        assert_eq!(game.score.blue, 0);
        assert_eq!(game.ball.x, cfg.field_width / 2.0);
    }

    #[test]
    fn test_goal_mouth_gating_blocks_wide_shots() {
        let cfg = Config {
            goal_mouth_only: true,
            ..Config::default()
        };
        let mut game = Match::new(&cfg);
        game.ball.x = game.ball.radius + 5.0;
        game.ball.y = 30.0; // well outside the mouth band
        game.ball.vx = -10.0;

        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);

        assert_eq!(game.score.blue, 0);
        // The ball rebounded instead of resetting
        assert_eq!(game.ball.x, game.ball.radius);
        assert!(game.ball.vx > 0.0);
    }

    #[test]
    fn test_goal_mouth_gating_allows_centered_shots() {
        let cfg = Config {
            goal_mouth_only: true,
            ..Config::default()
        };
        let mut game = Match::new(&cfg);
        game.ball.x = game.ball.radius + 5.0;
        game.ball.vx = -10.0;

        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);
        assert_eq!(game.score.blue, 1);
    }

    #[test]
    fn test_kick_pushes_ball_to_surface() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Red, &cfg);

        let player = game.players.get_mut(&1).unwrap();
        player.x = 100.0;
        player.y = 200.0;
        player.vx = 0.1;
        player.vy = 0.0;

        game.ball.x = 120.0;
        game.ball.y = 200.0;

        game.resolve_ball_collision(&cfg);

        let reach = cfg.player_radius + cfg.ball_radius;
        assert_approx_eq!(game.ball.x, 100.0 + reach, 1e-4);
        assert_approx_eq!(game.ball.y, 200.0, 1e-4);

        // Kick along the player's heading, then restitution
        let expected_vx = (0.1 + cfg.kick_power) * cfg.restitution;
        assert_approx_eq!(game.ball.vx, expected_vx, 1e-4);
        assert_approx_eq!(game.ball.vy, 0.0, 1e-4);
    }

    #[test]
    fn test_nearest_player_wins_contested_ball() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Red, &cfg);
        game.add_player(2, Team::Blue, &cfg);

        // Both players overlap the ball; player 2 is nearer
        {
            let p1 = game.players.get_mut(&1).unwrap();
            p1.x = 100.0;
            p1.y = 200.0;
            p1.vx = 0.1;
        }
        {
            let p2 = game.players.get_mut(&2).unwrap();
            p2.x = 150.0;
            p2.y = 200.0;
            p2.vx = -0.1;
        }
        game.ball.x = 130.0;
        game.ball.y = 200.0;

        game.resolve_ball_collision(&cfg);

        // The resulting kick belongs to player 2, heading left
        let expected_vx = (-0.1 - cfg.kick_power) * cfg.restitution;
        assert_approx_eq!(game.ball.vx, expected_vx, 1e-4);
        assert!(game.ball.vx < 0.0);
    }

    #[test]
    fn test_equidistant_contact_resolves_to_lower_id() {
        let cfg = cfg();

        // Map iteration order varies per instance; the winner must not vary
        // with it
        for _ in 0..64 {
            let mut game = Match::new(&cfg);
            game.add_player(1, Team::Red, &cfg);
            game.add_player(2, Team::Blue, &cfg);

            {
                let p1 = game.players.get_mut(&1).unwrap();
                p1.x = 380.0;
                p1.y = 200.0;
                p1.vx = 0.1;
            }
            {
                let p2 = game.players.get_mut(&2).unwrap();
                p2.x = 420.0;
                p2.y = 200.0;
                p2.vx = -0.1;
            }
            game.ball.x = 400.0;
            game.ball.y = 200.0;

            game.resolve_ball_collision(&cfg);

            // Player 1 kicks rightward every time
            let expected_vx = (0.1 + cfg.kick_power) * cfg.restitution;
            assert_approx_eq!(game.ball.vx, expected_vx, 1e-4);
        }
    }

    #[test]
    fn test_score_is_monotonic_over_ticks() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        let mut last = (0, 0);

        for i in 0..200 {
            // Periodically fire the ball at a goal
            if i % 40 == 0 {
                game.ball.x = game.ball.radius + 1.0;
                game.ball.vx = -10.0;
            }
            game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);

            assert!(game.score.red >= last.0);
            assert!(game.score.blue >= last.1);
            assert!(game.score.red + game.score.blue <= last.0 + last.1 + 1);
            last = (game.score.red, game.score.blue);
        }

        assert!(game.score.blue >= 1);
    }

    #[test]
    fn test_remove_player_is_noop_for_unknown_id() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(1, Team::Red, &cfg);

        game.remove_player(99);
        assert_eq!(game.players.len(), 1);

        game.remove_player(1);
        assert!(game.players.is_empty());
    }

    #[test]
    fn test_tick_counter_advances() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        assert_eq!(game.tick, 0);

        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);
        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);
        assert_eq!(game.tick, 2);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let cfg = cfg();
        let mut game = Match::new(&cfg);
        game.add_player(7, Team::Blue, &cfg);
        game.step(&empty_inputs(), cfg.tick_dt_ms(), &cfg);

        let snapshot = game.snapshot(123_456);
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.timestamp, 123_456);
        assert!(snapshot.players.contains_key(&7));
        assert_eq!(snapshot.score, game.score);
    }
}
