// src/planning/error.rs

use thiserror::Error;

/// Reasons a decider cycle cannot produce a decision. None are fatal: the
/// caller keeps the current lane and tries again next cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("candidate path list is empty")]
    EmptyInput,

    /// Persisted phase could not be decoded. Points at corrupted status
    /// storage and should page someone.
    #[error("unknown change-lane state: {0}")]
    UnknownState(String),

    #[error("vehicle is not on any non-change-lane candidate")]
    NoActiveLane,
}
