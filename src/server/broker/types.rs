use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::config::game::{LEFT_SPAWN_X, PADDLE_SPAWN_Y, RIGHT_SPAWN_X};

/// Board side of a paddle; also the score-keeping key.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Parse a side name coming off the wire. Goal events carry the side as a
    /// free string so that unrecognized values can be ignored instead of
    /// failing the whole message.
    pub fn parse(raw: &str) -> Option<Side> {
        match raw {
            "left" => Some(Side::Left),
            "right" => Some(Side::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Spawn x coordinate for a paddle on this side.
    pub fn spawn_x(self) -> f32 {
        match self {
            Side::Left => LEFT_SPAWN_X,
            Side::Right => RIGHT_SPAWN_X,
        }
    }
}

/// Match score, keyed by side.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Score {
    pub left: u32,
    pub right: u32,
}

impl Score {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn increment(&mut self, side: Side) {
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
    }
}

/// A connection's game-facing state within one room.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Player {
    pub id: Uuid,
    pub side: Side,
    pub skin: String,
    pub x: f32,
    pub y: f32,
}

impl Player {
    /// Create a player at the spawn point for its side.
    pub fn spawn(id: Uuid, side: Side, skin: String) -> Self {
        Player {
            id,
            side,
            skin,
            x: side.spawn_x(),
            y: PADDLE_SPAWN_Y,
        }
    }
}

/// Client-reported ball state, relayed verbatim (the server never validates
/// physical plausibility).
#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct BallState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Matchmaking mode requested by the client.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Random,
    Private,
}
