//! Session leaderboard of finished runs
//!
//! Keeps the top 10 successful runs by score plus attempt counters. Lives
//! only as long as the session.

use serde::{Deserialize, Serialize};

use crate::sim::state::{GameFinished, RunStatus};

/// Maximum number of entries to keep
pub const MAX_ENTRIES: usize = 10;

/// One successful run on the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub score: u64,
    /// Ticks taken
    pub final_time: u64,
    /// Which attempt of the session (1-indexed)
    pub attempt: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunHistory {
    pub entries: Vec<RunEntry>,
    pub attempts: u32,
    pub failures: u32,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a score would make the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_ENTRIES {
            return true;
        }
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Count a finished run; returns the leaderboard rank (1-indexed) it
    /// earned, if any. Failures only count toward the attempt tallies.
    pub fn record(&mut self, event: &GameFinished) -> Option<usize> {
        self.attempts += 1;
        if event.status == RunStatus::Failure {
            self.failures += 1;
            return None;
        }
        if !self.qualifies(event.score) {
            return None;
        }

        let entry = RunEntry {
            score: event.score,
            final_time: event.final_time,
            attempt: self.attempts,
        };
        // Descending by score; ties keep the earlier run ahead
        let pos = self
            .entries
            .iter()
            .position(|e| event.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        self.entries.truncate(MAX_ENTRIES);
        Some(pos + 1)
    }

    pub fn best(&self) -> Option<&RunEntry> {
        self.entries.first()
    }

    pub fn successes(&self) -> u32 {
        self.attempts - self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
