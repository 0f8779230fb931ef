// src/engine/controller.rs

use serde::Serialize;
use uuid::Uuid;

use crate::{
    engine::{
        error::SessionError,
        monitor::{IntegrityMonitor, MonitorGuard, WarningNotice},
        timer::{self, Countdown},
        tracker::AnswerTracker,
    },
    models::{
        answer::AnswerRecord,
        question::{PublicQuestion, Question},
        result::{ExamResult, ReviewRow, Submission},
        session::{ExamSession, SessionStatus},
    },
    store::StoreError,
};

/// Where an attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Unstarted,
    InProgress,
    Submitting,
    Completed,
    CompletedWithSyncError,
    Abandoned,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Completed | Phase::CompletedWithSyncError | Phase::Abandoned
        )
    }
}

/// Stage of the question currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionStage {
    Unanswered,
    Selected,
    Reviewed,
}

/// What caused the attempt to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitTrigger {
    /// Advanced past the last question.
    Finished,
    /// The student pressed "Submit Exam".
    Manual,
    /// The countdown reached zero.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the question at this index.
    Next(usize),
    /// The last question was reviewed; the attempt must be submitted.
    Finished,
}

/// Returned once an attempt has left the `Submitting` phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub result: ExamResult,
    pub synced: bool,
    pub sync_error: Option<String>,
}

/// Display snapshot of an attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub session_id: Uuid,
    pub title: String,
    pub phase: Phase,
    pub question_index: usize,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<QuestionStage>,
    pub selection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerRecord>,
    pub answered: usize,
    pub score: u32,
    pub remaining_secs: Option<u32>,
    pub clock: Option<String>,
    pub critical: bool,
    pub warning: Option<WarningNotice>,
    pub violation_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExamResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Vec<ReviewRow>>,
    pub sync_error: Option<String>,
    /// What ended the attempt, once it has been submitted.
    pub submitted_by: Option<SubmitTrigger>,
}

/// State machine for a single exam attempt.
///
/// Synchronous: every operation is one discrete event. The timer and the
/// integrity monitor are owned here so that leaving `InProgress` releases
/// both, whichever path the attempt takes out.
#[derive(Debug)]
pub struct SessionController {
    session_id: Uuid,
    owner_id: String,
    title: String,
    questions: Vec<Question>,
    phase: Phase,
    current: usize,
    selection: Option<String>,
    reviewed: bool,
    tracker: AnswerTracker,
    monitor: IntegrityMonitor,
    monitor_guard: Option<MonitorGuard>,
    countdown: Option<Countdown>,
    frozen_remaining: Option<u32>,
    trigger: Option<SubmitTrigger>,
    result: Option<ExamResult>,
    pending: Option<Submission>,
    sync_error: Option<String>,
}

impl SessionController {
    /// Takes ownership of an active session's question set.
    pub fn new(session: ExamSession, monitor: IntegrityMonitor) -> Result<Self, SessionError> {
        if session.status != SessionStatus::Active {
            return Err(SessionError::NotReady(session.status));
        }
        if session.questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }

        Ok(Self {
            session_id: session.id,
            owner_id: session.owner_id,
            title: session.title,
            questions: session.questions,
            phase: Phase::Unstarted,
            current: 0,
            selection: None,
            reviewed: false,
            tracker: AnswerTracker::new(),
            monitor,
            monitor_guard: None,
            countdown: None,
            frozen_remaining: None,
            trigger: None,
            result: None,
            pending: None,
            sync_error: None,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn tracker(&self) -> &AnswerTracker {
        &self.tracker
    }

    /// Enters `InProgress` and starts observing integrity signals.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Unstarted => {}
            Phase::InProgress => return Err(SessionError::AttemptInProgress),
            other => return Err(SessionError::NotInProgress(other)),
        }
        self.phase = Phase::InProgress;
        self.monitor_guard = Some(self.monitor.attach());
        Ok(())
    }

    /// Hands the running countdown to the controller. A countdown installed
    /// after the attempt already ended is cancelled right away.
    pub fn install_countdown(&mut self, countdown: Countdown) {
        if self.phase == Phase::InProgress {
            self.countdown = Some(countdown);
        } else {
            countdown.cancel();
        }
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        self.countdown
            .as_ref()
            .map(Countdown::remaining)
            .or(self.frozen_remaining)
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.phase == Phase::InProgress {
            Ok(())
        } else {
            Err(SessionError::NotInProgress(self.phase))
        }
    }

    fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    fn stage(&self) -> QuestionStage {
        if self.reviewed {
            QuestionStage::Reviewed
        } else if self.selection.is_some() {
            QuestionStage::Selected
        } else {
            QuestionStage::Unanswered
        }
    }

    /// Selects an option of the current question, replacing any earlier pick.
    pub fn select_option(&mut self, option: &str) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if self.reviewed {
            return Err(SessionError::AlreadyConfirmed(self.current));
        }
        if !self.current_question().has_option(option) {
            return Err(SessionError::UnknownOption(option.to_owned()));
        }
        self.selection = Some(option.to_owned());
        Ok(())
    }

    /// Grades the current selection and locks the question.
    pub fn confirm_answer(&mut self) -> Result<AnswerRecord, SessionError> {
        self.ensure_in_progress()?;
        if self.reviewed {
            return Err(SessionError::AlreadyConfirmed(self.current));
        }
        let selection = self.selection.as_deref().ok_or(SessionError::NoSelection)?;
        let record = self
            .tracker
            .confirm(self.current, &self.questions[self.current], Some(selection))?
            .clone();
        self.reviewed = true;
        Ok(record)
    }

    /// Locks the current question without an answer.
    pub fn skip_question(&mut self) -> Result<AnswerRecord, SessionError> {
        self.ensure_in_progress()?;
        if self.reviewed {
            return Err(SessionError::AlreadyConfirmed(self.current));
        }
        let record = self
            .tracker
            .confirm(self.current, &self.questions[self.current], None)?
            .clone();
        self.selection = None;
        self.reviewed = true;
        Ok(record)
    }

    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.ensure_in_progress()?;
        if !self.reviewed {
            return Err(SessionError::NotReviewed);
        }
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.selection = None;
            self.reviewed = false;
            Ok(Advance::Next(self.current))
        } else {
            Ok(Advance::Finished)
        }
    }

    /// Stops the countdown and detaches the monitor. Safe to call repeatedly.
    fn release_resources(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            self.frozen_remaining = Some(countdown.remaining());
            countdown.cancel();
        }
        if let Some(guard) = self.monitor_guard.take() {
            guard.detach();
        }
    }

    /// Sets the submitting guard and scores the attempt.
    ///
    /// Questions never confirmed are left out of the answer list. The
    /// returned submission is what the session store receives; the result is
    /// kept locally whatever the store answers.
    pub fn begin_submit(&mut self, trigger: SubmitTrigger) -> Result<Submission, SessionError> {
        match self.phase {
            Phase::InProgress => {}
            Phase::Submitting => return Err(SessionError::SubmissionInFlight),
            Phase::Completed | Phase::CompletedWithSyncError => {
                return Err(SessionError::AlreadySubmitted);
            }
            other => return Err(SessionError::NotInProgress(other)),
        }

        self.phase = Phase::Submitting;
        self.trigger = Some(trigger);
        self.release_resources();

        let result = ExamResult::from_graded(self.questions.len() as u32, self.tracker.records());
        let submission = Submission {
            result: result.clone(),
            violations: self.monitor.violations(),
        };
        self.result = Some(result);
        self.pending = Some(submission.clone());
        Ok(submission)
    }

    /// Re-enters `Submitting` with the unsynced submission.
    pub fn begin_retry_sync(&mut self) -> Result<Submission, SessionError> {
        match self.phase {
            Phase::CompletedWithSyncError => {}
            Phase::Submitting => return Err(SessionError::SubmissionInFlight),
            _ => return Err(SessionError::NothingToSync),
        }
        let submission = self.pending.clone().ok_or(SessionError::NothingToSync)?;
        self.phase = Phase::Submitting;
        Ok(submission)
    }

    /// Records the store's answer. A failed write still finishes the attempt.
    pub fn finish_submit(&mut self, outcome: Result<(), StoreError>) -> SubmitOutcome {
        match outcome {
            Ok(()) => {
                self.phase = Phase::Completed;
                self.pending = None;
                self.sync_error = None;
            }
            Err(e) => {
                self.phase = Phase::CompletedWithSyncError;
                self.sync_error = Some(format!("Could not save results: {}", e));
            }
        }

        SubmitOutcome {
            result: self.result.clone().unwrap_or_else(|| {
                ExamResult::from_graded(self.questions.len() as u32, self.tracker.records())
            }),
            synced: self.phase == Phase::Completed,
            sync_error: self.sync_error.clone(),
        }
    }

    /// Hides the sync notice; the attempt stays unsynced.
    pub fn dismiss_sync_error(&mut self) {
        self.sync_error = None;
    }

    /// Navigation away from an unfinished attempt. Nothing is persisted.
    pub fn abandon(&mut self) {
        self.release_resources();
        if matches!(self.phase, Phase::Unstarted | Phase::InProgress) {
            self.phase = Phase::Abandoned;
        }
    }

    pub fn view(&self) -> AttemptView {
        let in_progress = self.phase == Phase::InProgress;
        let question = in_progress.then(|| {
            let q = self.current_question();
            if self.reviewed {
                PublicQuestion::revealed(q)
            } else {
                PublicQuestion::hidden(q)
            }
        });
        let remaining = self.remaining_secs();

        AttemptView {
            session_id: self.session_id,
            title: self.title.clone(),
            phase: self.phase,
            question_index: self.current,
            total_questions: self.questions.len(),
            question,
            stage: in_progress.then(|| self.stage()),
            selection: self.selection.clone(),
            answer: self.tracker.get(self.current).cloned(),
            answered: self.tracker.len(),
            score: self.tracker.score(),
            remaining_secs: remaining,
            clock: remaining.map(timer::format_clock),
            critical: remaining.is_some_and(timer::is_critical),
            warning: self.monitor.active_warning(),
            violation_count: self.monitor.violation_count(),
            result: self.result.clone(),
            review: self.result.as_ref().map(|r| r.review(&self.questions)),
            sync_error: self.sync_error.clone(),
            submitted_by: self.trigger,
        }
    }
}
