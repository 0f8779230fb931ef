// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    question::Question,
    result::Submission,
    session::{ExamSession, SessionStatus, SessionSummary},
};

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error("session {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("corrupt session record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Connection-level failures are worth a retry; anything else is a query error.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Persistence collaborator for sessions.
///
/// Status changes go through `activate` and `submit` only, which enforce
/// draft -> active -> completed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: ExamSession) -> Result<ExamSession, StoreError>;

    async fn fetch(&self, id: Uuid) -> Result<ExamSession, StoreError>;

    /// Newest first.
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<SessionSummary>, StoreError>;

    /// Attaches generated questions to a draft and makes it active.
    async fn activate(&self, id: Uuid, questions: Vec<Question>)
    -> Result<ExamSession, StoreError>;

    /// Stores the result and violation log of an active session and completes it.
    async fn submit(&self, id: Uuid, submission: &Submission) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn SessionStore>;
