/// Game configuration constants.
///
/// This module defines the presentation-layer spawn coordinates and the score
/// threshold that ends a match. Coordinates are in client pixel space; they
/// are deployment configuration, not correctness invariants.
pub const WIN_SCORE: u32 = 11; // First side to reach this score wins the match.

/// Ball spawn point for a round reset (center field).
pub const BALL_SPAWN_X: f32 = 400.0;
pub const BALL_SPAWN_Y: f32 = 100.0;

/// Paddle spawn x for the left side.
pub const LEFT_SPAWN_X: f32 = 200.0;

/// Paddle spawn x for the right side.
pub const RIGHT_SPAWN_X: f32 = 600.0;

/// Paddle spawn y (both sides).
pub const PADDLE_SPAWN_Y: f32 = 500.0;
