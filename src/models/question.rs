// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A single multiple-choice question as stored inside a session.
///
/// Immutable once a session has been activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,

    /// The prompt shown to the student (markdown / LaTeX allowed).
    pub question_text: String,

    /// Ordered list of choices. Order is significant for display.
    pub options: Vec<String>,

    /// Exactly one of `options`.
    pub correct_answer: String,

    /// Shown once the question has been reviewed.
    pub explanation: String,
}

impl Question {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

/// DTO for sending a question to the client.
///
/// The correct answer and explanation stay hidden until the student has
/// confirmed (or skipped) the question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl PublicQuestion {
    pub fn hidden(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            options: q.options.clone(),
            correct_answer: None,
            explanation: None,
        }
    }

    pub fn revealed(q: &Question) -> Self {
        Self {
            correct_answer: Some(q.correct_answer.clone()),
            explanation: Some(q.explanation.clone()),
            ..Self::hidden(q)
        }
    }
}

/// DTO for a generated question handed over by the question source.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(length(max = 4000))]
    #[serde(default)]
    pub explanation: String,
}

impl QuestionInput {
    /// Assigns an id and checks the answer key against the options.
    pub fn into_question(self) -> Result<Question, validator::ValidationError> {
        if !self.options.iter().any(|o| o == &self.correct_answer) {
            return Err(validator::ValidationError::new("correct_answer_not_an_option"));
        }
        Ok(Question {
            id: Uuid::new_v4(),
            question_text: self.question_text,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
        })
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("needs_at_least_two_options"));
    }
    if options.len() > 10 {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    let mut seen = HashSet::new();
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
        if !seen.insert(opt.as_str()) {
            return Err(validator::ValidationError::new("duplicate_option"));
        }
    }
    Ok(())
}
