/// Score/round state machine.
///
/// A goal names the side whose score increments. The room's score is the only
/// state; rounds re-enter play immediately, and a match-over resets the score
/// in place so the same room hosts the next match.
use crate::config::game::WIN_SCORE;

use super::types::{Score, Side};

/// What a goal did to the match.
#[derive(Debug, PartialEq, Eq)]
pub enum RoundVerdict {
    /// Rally continues; the conceding side serves next.
    Continue { serve_side: Side },
    /// The scoring side just reached the winning threshold. `final_score` is
    /// the score as it stood at match point; the room's score has been reset
    /// to (0, 0) and the next serve is free.
    MatchOver { winner: Side, final_score: Score },
}

/// Apply a goal for `side` to `score` and decide what happens next.
pub fn apply_goal(score: &mut Score, side: Side) -> RoundVerdict {
    score.increment(side);
    if score.get(side) >= WIN_SCORE {
        let final_score = *score;
        *score = Score::default();
        RoundVerdict::MatchOver { winner: side, final_score }
    } else {
        RoundVerdict::Continue { serve_side: side.opposite() }
    }
}
