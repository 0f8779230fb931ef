// src/models/session.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    question::{Question, QuestionInput},
    result::ExamResult,
    violation::ViolationRecord,
};

/// Lifecycle of a study session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, waiting for generated questions.
    Draft,
    /// Questions attached, can be attempted.
    Active,
    /// A result has been stored.
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }

    /// Allowed transitions: draft -> active -> completed.
    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Draft, SessionStatus::Active)
                | (SessionStatus::Active, SessionStatus::Completed)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SessionStatus::Draft),
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

/// A study session together with its question set and (once completed) its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    pub owner_id: String,
    pub title: String,
    pub status: SessionStatus,
    pub questions: Vec<Question>,
    pub duration_secs: Option<u32>,
    pub results: Option<ExamResult>,
    #[serde(default)]
    pub violations: Vec<ViolationRecord>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    pub fn new_draft(owner_id: &str, req: CreateSessionRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_owned(),
            title: req.title,
            status: SessionStatus::Draft,
            questions: Vec::new(),
            duration_secs: req.duration_secs,
            results: None,
            violations: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            title: self.title.clone(),
            status: self.status,
            question_count: self.questions.len(),
            created_at: self.created_at,
            results: self.results.as_ref().map(|r| ResultSummary {
                score: r.score(),
                total_questions: r.total_questions(),
                percentage: r.percentage(),
            }),
        }
    }
}

/// Aggregated struct for the study-history listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub status: SessionStatus,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
    pub results: Option<ResultSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
}

/// DTO for creating a new draft session.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 10, max = 86400))]
    pub duration_secs: Option<u32>,
}

/// DTO carrying generated questions into a draft session.
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessSessionRequest {
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<QuestionInput>,
}
