// src/engine/error.rs

use thiserror::Error;

use crate::engine::controller::Phase;
use crate::{models::session::SessionStatus, store::StoreError};

/// Failures of a single exam attempt. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is {0}, not active")]
    NotReady(SessionStatus),

    #[error("session has no questions")]
    EmptyQuestionSet,

    #[error("attempt is {0:?}, not in progress")]
    NotInProgress(Phase),

    #[error("no option selected")]
    NoSelection,

    #[error("'{0}' is not an option of the current question")]
    UnknownOption(String),

    #[error("question {0} is already confirmed")]
    AlreadyConfirmed(usize),

    #[error("current question has not been confirmed yet")]
    NotReviewed,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("attempt has already been submitted")]
    AlreadySubmitted,

    #[error("an attempt for this session is already running")]
    AttemptInProgress,

    #[error("no attempt has been started for this session")]
    NoAttempt,

    #[error("attempt has no unsynced result")]
    NothingToSync,

    #[error("session not found")]
    SessionNotFound,

    #[error("session store failed: {0}")]
    Store(String),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => SessionError::SessionNotFound,
            other => SessionError::Store(other.to_string()),
        }
    }
}

impl SessionError {
    /// Local validation failures: rejected without any state change.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SessionError::NoSelection
                | SessionError::UnknownOption(_)
                | SessionError::AlreadyConfirmed(_)
                | SessionError::NotReviewed
        )
    }
}
