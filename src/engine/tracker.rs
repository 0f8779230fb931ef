// src/engine/tracker.rs

use std::collections::BTreeMap;

use crate::{
    engine::error::SessionError,
    models::{answer::AnswerRecord, question::Question},
};

/// Confirmed answers of one attempt, keyed by question index.
#[derive(Debug, Default, Clone)]
pub struct AnswerTracker {
    records: BTreeMap<usize, AnswerRecord>,
}

impl AnswerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the answer for `index`. A confirmed answer is never replaced.
    pub fn confirm(
        &mut self,
        index: usize,
        question: &Question,
        selection: Option<&str>,
    ) -> Result<&AnswerRecord, SessionError> {
        if self.records.contains_key(&index) {
            return Err(SessionError::AlreadyConfirmed(index));
        }
        let record = AnswerRecord::grade(index, question, selection);
        Ok(self.records.entry(index).or_insert(record))
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.records.contains_key(&index)
    }

    pub fn get(&self, index: usize) -> Option<&AnswerRecord> {
        self.records.get(&index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn score(&self) -> u32 {
        self.records.values().filter(|r| r.is_correct).count() as u32
    }

    /// Records in question order.
    pub fn records(&self) -> Vec<AnswerRecord> {
        self.records.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn question(answer: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            question_text: "Pick one".to_string(),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            correct_answer: answer.to_string(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_confirm_records_correctness() {
        let mut tracker = AnswerTracker::new();
        let q = question("B");

        let record = tracker.confirm(0, &q, Some("B")).unwrap();
        assert!(record.is_correct);
        let record = tracker.confirm(1, &q, Some("C")).unwrap();
        assert!(!record.is_correct);

        assert_eq!(tracker.score(), 1);
        assert!(tracker.is_answered(1));
        assert!(!tracker.is_answered(2));
    }

    #[test]
    fn test_reconfirm_is_rejected_not_merged() {
        let mut tracker = AnswerTracker::new();
        let q = question("A");
        tracker.confirm(0, &q, Some("B")).unwrap();

        let err = tracker.confirm(0, &q, Some("A")).unwrap_err();
        assert_eq!(err, SessionError::AlreadyConfirmed(0));
        assert_eq!(tracker.get(0).unwrap().selected_option.as_deref(), Some("B"));
        assert_eq!(tracker.score(), 0);
    }

    #[test]
    fn test_records_are_ordered_by_index() {
        let mut tracker = AnswerTracker::new();
        let q = question("A");
        tracker.confirm(2, &q, None).unwrap();
        tracker.confirm(0, &q, Some("A")).unwrap();

        let indexes: Vec<usize> = tracker.records().iter().map(|r| r.question_index).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert_eq!(tracker.len(), 2);
    }
}
