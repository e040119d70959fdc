//! Per-player-instance statistics.
//!
//! The turn engine accumulates into the record at the occupant's seat. The
//! replacement commit only ever creates fresh records and moves existing
//! ones; it never edits their contents.

use serde::{Deserialize, Serialize};

/// Accumulated statistics of one player instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStatistic {
    /// Turns completed.
    pub turns_played: u32,
    /// Moves made across all turns.
    pub moves: u32,
    /// Opponent pieces captured.
    pub captures: u32,
    /// Own pieces lost.
    pub times_captured: u32,
    /// Turns passed without a move.
    pub skipped_turns: u32,
    /// Total time spent on turn.
    pub time_on_turn_ms: u64,
}

impl PlayerStatistic {
    /// A freshly initialized record.
    #[must_use]
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Whether nothing has been accumulated yet.
    pub fn is_fresh(&self) -> bool {
        *self == Self::default()
    }

    /// Account a finished turn.
    pub fn record_turn(&mut self, moves: u32, elapsed_ms: u64) {
        self.turns_played += 1;
        self.moves += moves;
        if moves == 0 {
            self.skipped_turns += 1;
        }
        self.time_on_turn_ms += elapsed_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_equals_default() {
        assert_eq!(PlayerStatistic::fresh(), PlayerStatistic::default());
        assert!(PlayerStatistic::fresh().is_fresh());
    }

    #[test]
    fn record_turn_accumulates() {
        let mut stat = PlayerStatistic::fresh();
        stat.record_turn(2, 1500);
        stat.record_turn(0, 60_000);
        assert_eq!(stat.turns_played, 2);
        assert_eq!(stat.moves, 2);
        assert_eq!(stat.skipped_turns, 1);
        assert_eq!(stat.time_on_turn_ms, 61_500);
        assert!(!stat.is_fresh());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let stat: PlayerStatistic = serde_json::from_str(r#"{"moves": 3}"#).unwrap();
        assert_eq!(stat.moves, 3);
        assert_eq!(stat.turns_played, 0);
    }
}
