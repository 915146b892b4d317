//! Run state, timing and scoring types
//!
//! Time is counted in simulation ticks, never wall-clock.

use serde::{Deserialize, Serialize};

use crate::ticks_to_seconds;

/// Phase of the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    /// World built, waiting for the run to begin
    #[default]
    NotStarted,
    /// Timer counting, collisions observed
    Running,
    /// Player reached the goal
    FinishedSuccess,
    /// Player fell onto the ground
    FinishedFailure,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::FinishedSuccess | RunState::FinishedFailure)
    }
}

/// Outcome carried by a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

/// The `game-finished` notification, emitted once per completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFinished {
    pub status: RunStatus,
    /// Ticks elapsed when the run ended
    pub final_time: u64,
    pub score: u64,
}

impl GameFinished {
    /// Event name on the notification boundary
    pub const NAME: &'static str = "game-finished";

    pub fn final_seconds(&self) -> f32 {
        ticks_to_seconds(self.final_time)
    }
}

/// Score for finishing after `ticks` against a `budget`
#[inline]
pub fn score_for(budget: u64, ticks: u64) -> u64 {
    budget.saturating_sub(ticks)
}

/// Tick counter and score derivation for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreTimer {
    max_time_budget: u64,
    elapsed_ticks: u64,
    /// Set when the run ends; the timer no longer advances
    final_ticks: Option<u64>,
}

impl ScoreTimer {
    pub fn new(max_time_budget: u64) -> Self {
        Self {
            max_time_budget,
            elapsed_ticks: 0,
            final_ticks: None,
        }
    }

    pub fn max_time_budget(&self) -> u64 {
        self.max_time_budget
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn elapsed_seconds(&self) -> f32 {
        ticks_to_seconds(self.elapsed_ticks)
    }

    pub fn final_ticks(&self) -> Option<u64> {
        self.final_ticks
    }

    pub fn is_frozen(&self) -> bool {
        self.final_ticks.is_some()
    }

    /// Count one tick unless frozen
    pub fn advance(&mut self) {
        if self.final_ticks.is_none() {
            self.elapsed_ticks += 1;
        }
    }

    /// Stop counting and return the final tick count
    pub fn freeze(&mut self) -> u64 {
        *self.final_ticks.get_or_insert(self.elapsed_ticks)
    }

    pub fn reset(&mut self) {
        self.elapsed_ticks = 0;
        self.final_ticks = None;
    }

    /// Current score: frozen once finished, recomputed while running
    pub fn score(&self) -> u64 {
        score_for(
            self.max_time_budget,
            self.final_ticks.unwrap_or(self.elapsed_ticks),
        )
    }
}

/// Render a tick count as seconds with two decimals
pub fn format_seconds(ticks: u64) -> String {
    format!("{:.2}", ticks_to_seconds(ticks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn timer_counts_and_freezes() {
        let mut timer = ScoreTimer::new(400);
        for _ in 0..120 {
            timer.advance();
        }
        assert_eq!(timer.elapsed_ticks(), 120);
        assert_eq!(timer.score(), 280);
        assert_eq!(timer.freeze(), 120);
        timer.advance();
        assert_eq!(timer.elapsed_ticks(), 120);
        assert_eq!(timer.freeze(), 120);
        assert_eq!(timer.score(), 280);
    }

    #[test]
    fn score_floors_at_zero() {
        assert_eq!(score_for(100, 250), 0);
        assert_eq!(score_for(100, 100), 0);
        assert_eq!(score_for(100, 99), 1);
    }

    #[test]
    fn reset_clears_frozen_time() {
        let mut timer = ScoreTimer::new(10);
        timer.advance();
        timer.freeze();
        timer.reset();
        assert_eq!(timer.elapsed_ticks(), 0);
        assert!(!timer.is_frozen());
        assert_eq!(timer.max_time_budget(), 10);
    }

    #[test]
    fn seconds_formatting() {
        assert_eq!(format_seconds(120), "2.00");
        assert_eq!(format_seconds(90), "1.50");
    }

    #[test]
    fn notification_json_shape() {
        let event = GameFinished {
            status: RunStatus::Success,
            final_time: 120,
            score: 280,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "success", "finalTime": 120, "score": 280 })
        );
    }

    proptest! {
        #[test]
        fn score_is_bounded_and_decreasing(budget in 0u64..100_000, ticks in 0u64..200_000) {
            let score = score_for(budget, ticks);
            prop_assert!(score <= budget);
            if ticks < budget {
                prop_assert!(score_for(budget, ticks + 1) < score);
            } else {
                prop_assert_eq!(score, 0);
            }
        }
    }
}
