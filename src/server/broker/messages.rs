use actix::prelude::*;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use super::types::{BallState, MatchMode, Player, Score, Side};

/// Message client -> server.
///
/// Every event kind the broker handles is a variant here; the transport never
/// dispatches on raw event names.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "action", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientWsMessage {
    FindMatch {
        mode: MatchMode,
        room_id: Option<String>,
        skin: String,
    },
    Move {
        x: f32,
        y: f32,
    },
    SyncBall(BallState),
    Serve,
    /// Names the side whose score increments (the rally winner). Carried as a
    /// free string so unknown values can be dropped without failing the parse.
    Goal {
        side: String,
    },
}

// Message serveur -> client
#[derive(Message, Serialize, Deserialize, Clone, Debug)]
#[rtype(result = "()")]
#[serde(tag = "action", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerWsMessage {
    Waiting {
        room_id: Uuid,
    },
    GameStart {
        room_id: Uuid,
        #[serde(rename = "self")]
        self_player: Player,
        opponents: Vec<Player>,
    },
    PlayerJoined(Player),
    PlayerLeft {
        id: Uuid,
    },
    UpdatePlayer {
        id: Uuid,
        x: f32,
        y: f32,
    },
    UpdateBall(BallState),
    BallServed,
    ScoreUpdate(Score),
    ResetRound {
        x: f32,
        y: f32,
        serve_side: Option<Side>,
    },
    GameOver {
        winner: Side,
    },
    Error {
        message: String,
    },
}

impl ServerWsMessage {
    pub fn error(message: &str) -> Self {
        Self::Error { message: message.to_string() }
    }
}
