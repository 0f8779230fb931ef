// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        question::Question,
        result::Submission,
        session::{ExamSession, SessionStatus, SessionSummary},
    },
    store::{SessionStore, StoreError},
};

/// In-process store, used when no database is configured.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, ExamSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition(
        session: &mut ExamSession,
        to: SessionStatus,
    ) -> Result<(), StoreError> {
        if !session.status.can_advance_to(to) {
            return Err(StoreError::InvalidTransition {
                id: session.id,
                from: session.status,
                to,
            });
        }
        session.status = to;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: ExamSession) -> Result<ExamSession, StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn fetch(&self, id: Uuid) -> Result<ExamSession, StoreError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<SessionSummary>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut owned: Vec<&ExamSession> =
            sessions.values().filter(|s| s.owner_id == owner_id).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned.into_iter().map(ExamSession::summary).collect())
    }

    async fn activate(
        &self,
        id: Uuid,
        questions: Vec<Question>,
    ) -> Result<ExamSession, StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Self::transition(session, SessionStatus::Active)?;
        session.questions = questions;
        Ok(session.clone())
    }

    async fn submit(&self, id: Uuid, submission: &Submission) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Self::transition(session, SessionStatus::Completed)?;
        session.results = Some(submission.result.clone());
        session.violations = submission.violations.clone();
        session.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{result::ExamResult, session::CreateSessionRequest};

    fn draft(owner: &str, title: &str) -> ExamSession {
        ExamSession::new_draft(
            owner,
            CreateSessionRequest {
                title: title.to_string(),
                duration_secs: Some(600),
            },
        )
    }

    fn question() -> Question {
        Question {
            id: Uuid::new_v4(),
            question_text: "Q".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
            correct_answer: "A".to_string(),
            explanation: String::new(),
        }
    }

    #[tokio::test]
    async fn test_status_only_moves_forward() {
        let store = MemorySessionStore::new();
        let session = store.create(draft("s1", "History")).await.unwrap();
        let submission = Submission {
            result: ExamResult::from_answers(1, vec![]).unwrap(),
            violations: vec![],
        };

        // draft can not be completed directly
        assert!(matches!(
            store.submit(session.id, &submission).await,
            Err(StoreError::InvalidTransition { .. })
        ));

        let active = store.activate(session.id, vec![question()]).await.unwrap();
        assert_eq!(active.status, SessionStatus::Active);
        assert!(store.activate(session.id, vec![question()]).await.is_err());

        store.submit(session.id, &submission).await.unwrap();
        let done = store.fetch(session.id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert!(done.results.is_some());
        assert!(done.completed_at.is_some());

        assert!(store.submit(session.id, &submission).await.is_err());
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let store = MemorySessionStore::new();
        store.create(draft("s1", "A")).await.unwrap();
        store.create(draft("s1", "B")).await.unwrap();
        store.create(draft("s2", "C")).await.unwrap();

        let listed = store.list_for_owner("s1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s.title != "C"));
    }

    #[tokio::test]
    async fn test_missing_session() {
        let store = MemorySessionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.fetch(id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(id).await, Err(StoreError::NotFound(_))));
    }
}
