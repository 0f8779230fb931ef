// src/engine/registry.rs

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    engine::{
        attempt::{AttemptSettings, ExamAttempt, StoredHook},
        controller::Phase,
        error::SessionError,
    },
    store::SharedStore,
};

type AttemptMap = RwLock<HashMap<Uuid, ExamAttempt>>;

/// Live attempts of this process, at most one per session.
///
/// An attempt leaves the registry as soon as its result is stored. Attempts
/// whose result never reached the store stay, so it can still be shown and
/// retried.
#[derive(Clone, Default)]
pub struct AttemptRegistry {
    attempts: Arc<AttemptMap>,
}

impl AttemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an attempt on the session unless one is already registered
    /// for it. Only an abandoned attempt can be replaced.
    ///
    /// The session is read from the store under the registry lock, so a
    /// session completed by a concurrent submission is seen as completed.
    pub async fn start(
        &self,
        session_id: Uuid,
        store: SharedStore,
        settings: &AttemptSettings,
    ) -> Result<ExamAttempt, SessionError> {
        let mut attempts = self.attempts.write().await;

        if let Some(existing) = attempts.get(&session_id) {
            match existing.phase().await {
                Phase::Abandoned => {}
                Phase::Completed | Phase::CompletedWithSyncError => {
                    return Err(SessionError::AlreadySubmitted);
                }
                _ => return Err(SessionError::AttemptInProgress),
            }
        }

        let session = store.fetch(session_id).await?;
        let hook = evict_on_stored(Arc::downgrade(&self.attempts));
        let attempt = ExamAttempt::start_with_hook(session, store, settings, Some(hook)).await?;
        attempts.insert(session_id, attempt.clone());
        Ok(attempt)
    }

    pub async fn get(&self, session_id: Uuid) -> Option<ExamAttempt> {
        self.attempts.read().await.get(&session_id).cloned()
    }

    /// Unregisters the attempt and abandons it if it was still running.
    pub async fn close(&self, session_id: Uuid) -> Option<ExamAttempt> {
        let attempt = self.attempts.write().await.remove(&session_id)?;
        attempt.abandon().await;
        Some(attempt)
    }

    pub async fn contains(&self, session_id: Uuid) -> bool {
        self.attempts.read().await.contains_key(&session_id)
    }

    pub async fn len(&self) -> usize {
        self.attempts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.attempts.read().await.is_empty()
    }
}

fn evict_on_stored(attempts: Weak<AttemptMap>) -> StoredHook {
    Box::new(move |session_id| {
        Box::pin(async move {
            if let Some(attempts) = attempts.upgrade() {
                attempts.write().await.remove(&session_id);
                tracing::debug!(%session_id, "Stored attempt released");
            }
        })
    })
}
