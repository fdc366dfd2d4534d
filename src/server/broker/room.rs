use uuid::Uuid;

use super::types::{Player, Score, Side};

/// Lifecycle state of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomState {
    /// One player seated, waiting for an opponent.
    Waiting,
    /// Both seats taken, gameplay events flow.
    Active,
}

/// Why a join attempt was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    /// Both seats are already taken. The room is left untouched.
    RoomFull,
    /// The requested side is occupied (two joins raced onto the same seat).
    SideTaken,
}

/// One match session: up to two players, a score, and a lifecycle state.
///
/// The room itself never talks to the network; the broker reads it to decide
/// what to deliver.
#[derive(Debug)]
pub struct Room {
    pub id: Uuid,
    /// Insertion order = join order. Never more than two entries.
    players: Vec<Player>,
    pub score: Score,
    pub state: RoomState,
}

impl Room {
    /// Create an empty room with a zeroed score.
    pub fn new(id: Uuid) -> Self {
        Room {
            id,
            players: Vec::with_capacity(2),
            score: Score::default(),
            state: RoomState::Waiting,
        }
    }

    /// Seat a player. Flips the room to Active exactly when the second player
    /// sits down. A third join is refused without mutating anything.
    pub fn join(&mut self, player: Player) -> Result<&Player, JoinError> {
        if self.players.len() >= 2 {
            return Err(JoinError::RoomFull);
        }
        if self.players.iter().any(|p| p.side == player.side) {
            return Err(JoinError::SideTaken);
        }
        self.players.push(player);
        if self.players.len() == 2 {
            self.state = RoomState::Active;
        }
        Ok(self.players.last().unwrap())
    }

    /// Unseat a connection's player, returning it if it was present. A room
    /// that drops below two players is Waiting again.
    pub fn leave(&mut self, conn_id: Uuid) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.id == conn_id)?;
        let player = self.players.remove(idx);
        self.state = RoomState::Waiting;
        Some(player)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn has_space(&self) -> bool {
        self.players.len() < 2
    }

    /// Side still open for a joiner, if any.
    pub fn free_side(&self) -> Option<Side> {
        for side in [Side::Left, Side::Right] {
            if !self.players.iter().any(|p| p.side == side) {
                return Some(side);
            }
        }
        None
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, conn_id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == conn_id)
    }

    pub fn player_mut(&mut self, conn_id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == conn_id)
    }

    /// The other occupant, from the point of view of `conn_id`.
    pub fn opponent_of(&self, conn_id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id != conn_id)
    }
}
