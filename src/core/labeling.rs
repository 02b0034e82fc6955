//! Ground-truth alertness labeling.
//!
//! Labels come from the behavioral channel only. The GSR features are never
//! consulted here, so they can be evaluated as predictors of an independent
//! label.

use crate::reader::types::{Outcome, TrialRecord};
use serde::{Deserialize, Serialize};

/// Reaction time above which a trial counts as drowsy (exclusive).
pub const DROWSY_REACTION_TIME_MS: i64 = 1100;

/// Binary alertness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Alert,
    Drowsy,
}

impl Label {
    pub fn is_drowsy(self) -> bool {
        self == Label::Drowsy
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Alert => f.pad("Alert"),
            Label::Drowsy => f.pad("Drowsy"),
        }
    }
}

/// Labels trials from reaction time and response correctness.
#[derive(Debug, Clone, Copy)]
pub struct Labeler {
    reaction_time_threshold_ms: i64,
}

impl Default for Labeler {
    fn default() -> Self {
        Self::new(DROWSY_REACTION_TIME_MS)
    }
}

impl Labeler {
    pub fn new(reaction_time_threshold_ms: i64) -> Self {
        Self {
            reaction_time_threshold_ms,
        }
    }

    /// `Drowsy` if the reaction time exceeds the threshold or the answer was wrong.
    pub fn label(&self, trial: &TrialRecord) -> Label {
        if trial.reaction_time_ms > self.reaction_time_threshold_ms
            || trial.outcome == Outcome::Wrong
        {
            Label::Drowsy
        } else {
            Label::Alert
        }
    }
}

/// Label a trial with the default threshold.
pub fn label(trial: &TrialRecord) -> Label {
    Labeler::default().label(trial)
}
