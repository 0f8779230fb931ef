// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::{
    models::{
        question::Question,
        result::{ExamResult, Submission},
        session::{ExamSession, SessionStatus, SessionSummary},
        violation::ViolationRecord,
    },
    store::{SessionStore, StoreError},
};

const COLUMNS: &str = "\
    id, owner_id, title, status, duration_secs, questions, result, violations, \
    created_at, completed_at";

/// Represents the 'exam_sessions' table in the database.
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    owner_id: String,
    title: String,
    status: String,
    duration_secs: Option<i32>,
    questions: Json<Vec<Question>>,
    result: Option<Json<ExamResult>>,
    violations: Json<Vec<ViolationRecord>>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for ExamSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<SessionStatus>().map_err(StoreError::Corrupt)?;
        let duration_secs = row
            .duration_secs
            .map(u32::try_from)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("duration_secs: {}", e)))?;

        Ok(ExamSession {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            status,
            questions: row.questions.0,
            duration_secs,
            results: row.result.map(|r| r.0),
            violations: row.violations.0,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

/// Postgres-backed session store. Questions, results and violation logs are
/// kept as JSONB next to the session row.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find(&self, id: Uuid) -> Result<Option<ExamSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {COLUMNS} FROM exam_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExamSession::try_from).transpose()
    }

    /// Explains why a guarded UPDATE touched no row.
    async fn transition_error(&self, id: Uuid, to: SessionStatus) -> StoreError {
        match self.find(id).await {
            Ok(Some(session)) => StoreError::InvalidTransition {
                id,
                from: session.status,
                to,
            },
            Ok(None) => StoreError::NotFound(id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: ExamSession) -> Result<ExamSession, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            INSERT INTO exam_sessions (id, owner_id, title, status, duration_secs, questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(session.id)
        .bind(&session.owner_id)
        .bind(&session.title)
        .bind(session.status.as_str())
        .bind(session.duration_secs.map(|d| d as i32))
        .bind(Json(&session.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert session: {:?}", e);
            StoreError::from(e)
        })?;

        ExamSession::try_from(row)
    }

    async fn fetch(&self, id: Uuid) -> Result<ExamSession, StoreError> {
        self.find(id).await?.ok_or(StoreError::NotFound(id))
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<SessionSummary>, StoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {COLUMNS} FROM exam_sessions WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| ExamSession::try_from(row).map(|s| s.summary()))
            .collect()
    }

    async fn activate(
        &self,
        id: Uuid,
        questions: Vec<Question>,
    ) -> Result<ExamSession, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            UPDATE exam_sessions
            SET status = 'active', questions = $2
            WHERE id = $1 AND status = 'draft'
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json(&questions))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => ExamSession::try_from(row),
            None => Err(self.transition_error(id, SessionStatus::Active).await),
        }
    }

    async fn submit(&self, id: Uuid, submission: &Submission) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE exam_sessions
            SET status = 'completed', result = $2, violations = $3, completed_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(Json(&submission.result))
        .bind(Json(&submission.violations))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store result for session {}: {:?}", id, e);
            StoreError::from(e)
        })?;

        if updated.rows_affected() == 0 {
            return Err(self.transition_error(id, SessionStatus::Completed).await);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM exam_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
