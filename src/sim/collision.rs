//! Collision-driven run state machine
//!
//! `NotStarted -> Running -> FinishedSuccess | FinishedFailure`, with
//! `restart` returning to `NotStarted` from anywhere. While running, the
//! machine holds a subscription on the player body; only contacts involving
//! that body can end the run. Contacts outside `Running` change nothing.

use thiserror::Error;

use super::state::{GameFinished, RunState, RunStatus, ScoreTimer};
use crate::physics::{BodyId, Contact};

/// Refused run transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("cannot start a run from {from:?}")]
    InvalidTransition { from: RunState },
}

/// Bodies whose contact with the player ends a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionTargets {
    pub goal: BodyId,
    pub ground: BodyId,
}

/// What a contact means for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Goal,
    Ground,
    Other,
}

impl CollisionTargets {
    /// Classify the body the player touched; the goal wins any tie
    pub fn classify(&self, other: &BodyId) -> CollisionKind {
        if other == &self.goal {
            CollisionKind::Goal
        } else if other == &self.ground {
            CollisionKind::Ground
        } else {
            CollisionKind::Other
        }
    }
}

/// Live observation of contacts on one body, owned by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionSubscription {
    observed: BodyId,
}

impl CollisionSubscription {
    pub fn new(observed: BodyId) -> Self {
        Self { observed }
    }

    pub fn observed(&self) -> &BodyId {
        &self.observed
    }

    /// Classify a contact; `None` when the observed body is not part of it
    pub fn classify(&self, contact: &Contact, targets: &CollisionTargets) -> Option<CollisionKind> {
        contact.other(&self.observed).map(|other| targets.classify(other))
    }
}

/// Owns run state, timer and score for one course
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    state: RunState,
    timer: ScoreTimer,
    final_score: u64,
    subscription: Option<CollisionSubscription>,
}

impl RunStateMachine {
    pub fn new(max_time_budget: u64) -> Self {
        Self {
            state: RunState::NotStarted,
            timer: ScoreTimer::new(max_time_budget),
            final_score: 0,
            subscription: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn timer(&self) -> &ScoreTimer {
        &self.timer
    }

    /// Score of the finished run (0 before it finishes)
    pub fn final_score(&self) -> u64 {
        self.final_score
    }

    pub fn subscription(&self) -> Option<&CollisionSubscription> {
        self.subscription.as_ref()
    }

    /// Begin a run observing `player`
    pub fn start(&mut self, player: BodyId) -> Result<(), RunError> {
        if self.state != RunState::NotStarted {
            return Err(RunError::InvalidTransition { from: self.state });
        }
        self.timer.reset();
        self.final_score = 0;
        self.subscription = Some(CollisionSubscription::new(player));
        self.state = RunState::Running;
        Ok(())
    }

    /// Count one tick while running
    pub fn advance(&mut self) {
        if self.is_running() {
            self.timer.advance();
        }
    }

    /// Handle one contact pair
    pub fn on_collision(
        &mut self,
        a: &BodyId,
        b: &BodyId,
        targets: &CollisionTargets,
    ) -> Option<GameFinished> {
        if !self.is_running() {
            return None;
        }
        let contact = Contact::new(a.clone(), b.clone());
        let kind = self.subscription.as_ref()?.classify(&contact, targets)?;
        match kind {
            CollisionKind::Goal => Some(self.finish(RunStatus::Success)),
            CollisionKind::Ground => Some(self.finish(RunStatus::Failure)),
            CollisionKind::Other => None,
        }
    }

    /// Handle all contacts from one step; a goal contact anywhere in the
    /// batch takes precedence over a ground contact
    pub fn on_contacts(
        &mut self,
        contacts: &[Contact],
        targets: &CollisionTargets,
    ) -> Option<GameFinished> {
        if !self.is_running() {
            return None;
        }
        let subscription = self.subscription.as_ref()?;
        let kinds: Vec<CollisionKind> = contacts
            .iter()
            .filter_map(|c| subscription.classify(c, targets))
            .collect();
        if kinds.contains(&CollisionKind::Goal) {
            Some(self.finish(RunStatus::Success))
        } else if kinds.contains(&CollisionKind::Ground) {
            Some(self.finish(RunStatus::Failure))
        } else {
            None
        }
    }

    fn finish(&mut self, status: RunStatus) -> GameFinished {
        let final_time = self.timer.freeze();
        self.final_score = match status {
            RunStatus::Success => self.timer.score(),
            RunStatus::Failure => 0,
        };
        self.state = match status {
            RunStatus::Success => RunState::FinishedSuccess,
            RunStatus::Failure => RunState::FinishedFailure,
        };
        self.subscription = None;
        GameFinished {
            status,
            final_time,
            score: self.final_score,
        }
    }

    /// Back to `NotStarted` with a zeroed timer, from any state
    pub fn restart(&mut self) {
        self.timer.reset();
        self.final_score = 0;
        self.subscription = None;
        self.state = RunState::NotStarted;
    }
}
