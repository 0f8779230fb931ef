// src/engine/attempt.rs

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex as StdMutex, PoisonError, Weak},
    time::Duration,
};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    engine::{
        controller::{Advance, AttemptView, Phase, SessionController, SubmitOutcome, SubmitTrigger},
        error::SessionError,
        monitor::{DEFAULT_WARNING_TTL, IntegrityMonitor},
        timer::Countdown,
    },
    models::{result::Submission, session::ExamSession},
    store::SharedStore,
};

/// Knobs shared by every attempt of a process.
#[derive(Debug, Clone)]
pub struct AttemptSettings {
    /// Used when a session carries no duration of its own. `None` means untimed.
    pub default_duration_secs: Option<u32>,
    pub warning_ttl: Duration,
}

impl Default for AttemptSettings {
    fn default() -> Self {
        Self {
            default_duration_secs: Some(3600),
            warning_ttl: DEFAULT_WARNING_TTL,
        }
    }
}

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs once, after the result has reached the store.
pub(crate) type StoredHook = Box<dyn FnOnce(Uuid) -> BoxFuture + Send>;

struct AttemptInner {
    session_id: Uuid,
    owner_id: String,
    controller: Mutex<SessionController>,
    monitor: IntegrityMonitor,
    store: SharedStore,
    on_stored: StdMutex<Option<StoredHook>>,
}

/// A running exam attempt.
///
/// Wraps a [`SessionController`] with the two asynchronous edges of an
/// attempt: the countdown and the round-trip to the session store. Cheap to
/// clone; all clones drive the same attempt.
#[derive(Clone)]
pub struct ExamAttempt {
    inner: Arc<AttemptInner>,
}

impl ExamAttempt {
    /// Starts an attempt on an active session: attaches the integrity
    /// monitor and, if timed, the countdown that force-submits at zero.
    pub async fn start(
        session: ExamSession,
        store: SharedStore,
        settings: &AttemptSettings,
    ) -> Result<Self, SessionError> {
        Self::start_with_hook(session, store, settings, None).await
    }

    pub(crate) async fn start_with_hook(
        session: ExamSession,
        store: SharedStore,
        settings: &AttemptSettings,
        on_stored: Option<StoredHook>,
    ) -> Result<Self, SessionError> {
        let duration = session
            .duration_secs
            .or(settings.default_duration_secs)
            .filter(|secs| *secs > 0);
        let monitor = IntegrityMonitor::new(settings.warning_ttl);

        let mut controller = SessionController::new(session, monitor.clone())?;
        controller.start()?;

        let inner = Arc::new(AttemptInner {
            session_id: controller.session_id(),
            owner_id: controller.owner_id().to_owned(),
            controller: Mutex::new(controller),
            monitor,
            store,
            on_stored: StdMutex::new(on_stored),
        });

        if let Some(secs) = duration {
            let countdown = Countdown::start(secs, timeout_handler(Arc::downgrade(&inner)));
            inner.controller.lock().await.install_countdown(countdown);
        }

        tracing::info!(
            session_id = %inner.session_id,
            duration_secs = ?duration,
            "Exam attempt started"
        );
        Ok(Self { inner })
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn owner_id(&self) -> &str {
        &self.inner.owner_id
    }

    /// Capability handle the host wires its integrity signals to.
    pub fn signals(&self) -> &IntegrityMonitor {
        &self.inner.monitor
    }

    pub async fn phase(&self) -> Phase {
        self.inner.controller.lock().await.phase()
    }

    pub async fn view(&self) -> AttemptView {
        self.inner.controller.lock().await.view()
    }

    pub async fn select_option(&self, option: &str) -> Result<AttemptView, SessionError> {
        let mut controller = self.inner.controller.lock().await;
        controller.select_option(option)?;
        Ok(controller.view())
    }

    pub async fn confirm_answer(&self) -> Result<AttemptView, SessionError> {
        let mut controller = self.inner.controller.lock().await;
        controller.confirm_answer()?;
        Ok(controller.view())
    }

    pub async fn skip_question(&self) -> Result<AttemptView, SessionError> {
        let mut controller = self.inner.controller.lock().await;
        controller.skip_question()?;
        Ok(controller.view())
    }

    /// Moves to the next question, or submits after the last one.
    pub async fn advance(&self) -> Result<AttemptView, SessionError> {
        let advanced = self.inner.controller.lock().await.advance();
        let step = match advanced {
            Ok(step) => step,
            // The countdown submitted first; show its outcome.
            Err(SessionError::NotInProgress(
                Phase::Submitting | Phase::Completed | Phase::CompletedWithSyncError,
            )) => return Ok(self.view().await),
            Err(e) => return Err(e),
        };

        if step == Advance::Finished {
            match self.submit_with(SubmitTrigger::Finished).await {
                Ok(_) => {}
                // The countdown won the race; its submission stands.
                Err(SessionError::SubmissionInFlight | SessionError::AlreadySubmitted) => {
                    tracing::debug!(session_id = %self.inner.session_id, "Advance raced a submission");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.view().await)
    }

    /// Manual "Submit Exam".
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        self.submit_with(SubmitTrigger::Manual).await
    }

    /// Invoked by the countdown at zero. A no-op when the attempt already
    /// left `InProgress`, including while a submission is in flight.
    pub async fn force_submit_on_timeout(&self) -> Option<SubmitOutcome> {
        match self.submit_with(SubmitTrigger::Timeout).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::debug!(session_id = %self.inner.session_id, "Timeout ignored: {}", e);
                None
            }
        }
    }

    /// Re-sends the result of an attempt whose first write failed.
    pub async fn retry_sync(&self) -> Result<SubmitOutcome, SessionError> {
        let submission = self.inner.controller.lock().await.begin_retry_sync()?;
        Ok(self.persist(submission).await)
    }

    pub async fn dismiss_sync_error(&self) {
        self.inner.controller.lock().await.dismiss_sync_error();
    }

    /// Leaves the attempt without submitting. Timer and monitor are released.
    pub async fn abandon(&self) {
        let mut controller = self.inner.controller.lock().await;
        controller.abandon();
        tracing::info!(
            session_id = %self.inner.session_id,
            phase = ?controller.phase(),
            "Exam attempt closed"
        );
    }

    async fn submit_with(&self, trigger: SubmitTrigger) -> Result<SubmitOutcome, SessionError> {
        // The lock is released before the store call; the Submitting phase
        // keeps other callers out meanwhile.
        let submission = self.inner.controller.lock().await.begin_submit(trigger)?;
        tracing::info!(
            session_id = %self.inner.session_id,
            ?trigger,
            score = submission.result.score(),
            total = submission.result.total_questions(),
            violations = submission.violations.len(),
            "Submitting exam attempt"
        );
        Ok(self.persist(submission).await)
    }

    async fn persist(&self, submission: Submission) -> SubmitOutcome {
        let outcome = self
            .inner
            .store
            .submit(self.inner.session_id, &submission)
            .await;
        if let Err(e) = &outcome {
            tracing::error!(
                session_id = %self.inner.session_id,
                "Failed to persist exam result, keeping it locally: {}",
                e
            );
        }
        let outcome = self.inner.controller.lock().await.finish_submit(outcome);

        if outcome.synced {
            let hook = self
                .inner
                .on_stored
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(hook) = hook {
                hook(self.inner.session_id).await;
            }
        }
        outcome
    }
}

/// The countdown only holds a weak reference, so an attempt that is dropped
/// does not stay alive through its own timer.
fn timeout_handler(inner: Weak<AttemptInner>) -> impl FnOnce() -> BoxFuture + Send + 'static {
    move || -> BoxFuture {
        Box::pin(async move {
            if let Some(inner) = inner.upgrade() {
                let attempt = ExamAttempt { inner };
                tracing::info!(session_id = %attempt.session_id(), "Time is up");
                attempt.force_submit_on_timeout().await;
            }
        })
    }
}
