// src/models/answer.rs

use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// Text shown for a question that was confirmed without a selection.
pub const SKIPPED: &str = "Skipped";

/// One confirmed answer for a question of the session.
///
/// `is_correct` is derived from the selection at grading time and is never
/// set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_index: usize,
    pub question_text: String,
    /// `None` when the student skipped the question.
    pub selected_option: Option<String>,
    pub is_correct: bool,
}

impl AnswerRecord {
    /// Grades a selection by exact string equality with the answer key.
    pub fn grade(question_index: usize, question: &Question, selection: Option<&str>) -> Self {
        Self {
            question_index,
            question_text: question.question_text.clone(),
            selected_option: selection.map(str::to_owned),
            is_correct: selection.is_some_and(|s| question.is_correct(s)),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.selected_option.is_none()
    }

    pub fn display_selection(&self) -> &str {
        self.selected_option.as_deref().unwrap_or(SKIPPED)
    }
}
