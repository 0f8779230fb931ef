// src/models/violation.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of suspicious client behaviour observed during an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    FocusLost,
    CopyAttempt,
    PasteAttempt,
    ContextMenuAttempt,
}

impl ViolationKind {
    /// Whether the host should cancel the underlying default action.
    /// Losing focus can only be observed.
    pub fn is_preventable(self) -> bool {
        !matches!(self, ViolationKind::FocusLost)
    }

    pub fn description(self) -> &'static str {
        match self {
            ViolationKind::FocusLost => "Window lost focus (Tab switch/minimize)",
            ViolationKind::CopyAttempt => "Copy attempt",
            ViolationKind::PasteAttempt => "Paste attempt",
            ViolationKind::ContextMenuAttempt => "Right-click attempt",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Append-only record of one detected signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub at: DateTime<Utc>,
    pub kind: ViolationKind,
}

impl ViolationRecord {
    pub fn now(kind: ViolationKind) -> Self {
        Self { at: Utc::now(), kind }
    }
}
