//! macroquad drawing of the field and match state.

use crate::reconciler::RenderState;
use macroquad::prelude::*;
use shared::{Config, Team};

/// Padding around the playable area so entities at the boundary stay fully
/// visible.
pub const FIELD_MARGIN: f32 = 20.0;

const PITCH_GREEN: Color = Color::new(0.30, 0.69, 0.31, 1.00);
const LINE_WHITE: Color = Color::new(1.00, 1.00, 1.00, 0.90);

pub fn window_width(cfg: &Config) -> f32 {
    cfg.field_width + FIELD_MARGIN * 2.0
}

pub fn window_height(cfg: &Config) -> f32 {
    cfg.field_height + FIELD_MARGIN * 2.0
}

/// Draws one frame of the match.
pub fn draw_match(state: &RenderState, cfg: &Config) {
    clear_background(PITCH_GREEN);
    draw_field(cfg);

    for player in &state.players {
        let color = match player.team {
            Team::Red => RED,
            Team::Blue => BLUE,
        };
        draw_circle(
            player.x + FIELD_MARGIN,
            player.y + FIELD_MARGIN,
            player.radius,
            color,
        );
        draw_circle_lines(
            player.x + FIELD_MARGIN,
            player.y + FIELD_MARGIN,
            player.radius,
            2.0,
            LINE_WHITE,
        );
    }

    draw_circle(
        state.ball.x + FIELD_MARGIN,
        state.ball.y + FIELD_MARGIN,
        state.ball.radius,
        WHITE,
    );

    let score_text = format!("Red {} - {} Blue", state.score.red, state.score.blue);
    let size = measure_text(&score_text, None, 30, 1.0);
    draw_text(
        &score_text,
        (window_width(cfg) - size.width) / 2.0,
        FIELD_MARGIN - 4.0,
        30.0,
        WHITE,
    );
}

/// Placeholder frame shown until the first snapshot arrives.
pub fn draw_waiting(cfg: &Config) {
    clear_background(PITCH_GREEN);
    draw_field(cfg);
    draw_text(
        "Waiting for server...",
        window_width(cfg) / 2.0 - 90.0,
        window_height(cfg) / 2.0,
        24.0,
        WHITE,
    );
}

fn draw_field(cfg: &Config) {
    let w = cfg.field_width;
    let h = cfg.field_height;
    let m = FIELD_MARGIN;

    draw_rectangle_lines(m, m, w, h, 2.0, LINE_WHITE);

    // Center line and circle
    draw_line(m + w / 2.0, m, m + w / 2.0, m + h, 2.0, LINE_WHITE);
    draw_circle_lines(m + w / 2.0, m + h / 2.0, 50.0, 2.0, LINE_WHITE);

    // Goal mouths on both goal lines
    let mouth_top = m + (h - cfg.goal_height) / 2.0;
    draw_line(m, mouth_top, m, mouth_top + cfg.goal_height, 6.0, LINE_WHITE);
    draw_line(
        m + w,
        mouth_top,
        m + w,
        mouth_top + cfg.goal_height,
        6.0,
        LINE_WHITE,
    );
}
