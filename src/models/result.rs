// src/models/result.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{answer::AnswerRecord, question::Question, violation::ViolationRecord};

/// Selection text shown for a question that was never confirmed.
pub const NO_ANSWER: &str = "No Answer";

/// Rounded percentage, `round(100 * score / total)` with halves rounded up.
/// An empty question set scores 0.
pub fn percentage_of(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (score, total) = (u64::from(score), u64::from(total));
    ((200 * score + total) / (2 * total)) as u32
}

/// The scored outcome of a finished attempt.
///
/// Only constructible through [`ExamResult::from_answers`]; deserialization
/// goes through the same consistency checks, so `percentage` always matches
/// `score` and `total_questions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ResultParts")]
pub struct ExamResult {
    score: u32,
    total_questions: u32,
    percentage: u32,
    answers: Vec<AnswerRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultParts {
    score: u32,
    total_questions: u32,
    percentage: u32,
    answers: Vec<AnswerRecord>,
}

impl TryFrom<ResultParts> for ExamResult {
    type Error = String;

    fn try_from(parts: ResultParts) -> Result<Self, Self::Error> {
        let result = ExamResult::from_answers(parts.total_questions, parts.answers)?;
        if result.score != parts.score {
            return Err(format!(
                "score {} does not match {} correct answers",
                parts.score, result.score
            ));
        }
        if result.percentage != parts.percentage {
            return Err(format!(
                "percentage {} does not match derived {}",
                parts.percentage, result.percentage
            ));
        }
        Ok(result)
    }
}

impl ExamResult {
    /// Scores a set of answer records for a session of `total_questions`.
    ///
    /// Records are ordered by question index; an index may appear at most once.
    pub fn from_answers(
        total_questions: u32,
        answers: Vec<AnswerRecord>,
    ) -> Result<Self, String> {
        let mut seen = HashSet::new();
        for a in &answers {
            if a.question_index >= total_questions as usize {
                return Err(format!("question index {} out of range", a.question_index));
            }
            if !seen.insert(a.question_index) {
                return Err(format!("duplicate answer for question {}", a.question_index));
            }
        }
        Ok(Self::from_graded(total_questions, answers))
    }

    /// Scores records already known to be unique and in range, such as the
    /// contents of an answer tracker.
    pub(crate) fn from_graded(total_questions: u32, mut answers: Vec<AnswerRecord>) -> Self {
        answers.sort_by_key(|a| a.question_index);
        let score = answers.iter().filter(|a| a.is_correct).count() as u32;
        Self {
            score,
            total_questions,
            percentage: percentage_of(score, total_questions),
            answers,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn missed(&self) -> u32 {
        self.total_questions - self.score
    }

    pub fn answer_for(&self, question_index: usize) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.question_index == question_index)
    }

    /// One row per question, in question order. Questions without a record
    /// (never reached before the attempt ended) show as "No Answer".
    pub fn review(&self, questions: &[Question]) -> Vec<ReviewRow> {
        questions
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let answer = self.answer_for(idx);
                let status = match answer {
                    Some(a) if a.is_correct => ReviewStatus::Correct,
                    Some(a) if a.is_skipped() => ReviewStatus::Skipped,
                    Some(_) => ReviewStatus::Incorrect,
                    None => ReviewStatus::NoAnswer,
                };
                ReviewRow {
                    question_index: idx,
                    question_text: q.question_text.clone(),
                    correct_answer: q.correct_answer.clone(),
                    explanation: q.explanation.clone(),
                    your_selection: answer
                        .map(|a| a.display_selection().to_owned())
                        .unwrap_or_else(|| NO_ANSWER.to_owned()),
                    status,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    Correct,
    Incorrect,
    Skipped,
    NoAnswer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRow {
    pub question_index: usize,
    pub question_text: String,
    pub correct_answer: String,
    pub explanation: String,
    pub your_selection: String,
    pub status: ReviewStatus,
}

/// Payload handed to the session store when an attempt ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(flatten)]
    pub result: ExamResult,
    #[serde(default)]
    pub violations: Vec<ViolationRecord>,
}
