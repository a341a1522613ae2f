use thiserror::Error;

/// Failures that abort a reconciliation pass. Schedule problems never show up
/// here; they degrade into `ScheduleStatus` instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("prediction unavailable: {0}")]
    PredictionUnavailable(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ReconcileError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::PredictionUnavailable(reason.into())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no schedule published for season {0}")]
    NotFound(i32),

    #[error("schedule source unreachable: {0}")]
    Unreachable(String),

    #[error("malformed schedule: {0}")]
    Malformed(String),
}
