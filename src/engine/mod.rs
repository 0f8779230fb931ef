// src/engine/mod.rs

//! Exam attempt core: answer tracking, countdown, integrity monitoring and
//! the controller that ties them together.

pub mod attempt;
pub mod controller;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod timer;
pub mod tracker;

pub use attempt::{AttemptSettings, ExamAttempt};
pub use controller::{AttemptView, Phase, SessionController, SubmitOutcome, SubmitTrigger};
pub use error::SessionError;
pub use monitor::{IntegrityMonitor, IntegritySignals, SignalAction};
pub use registry::AttemptRegistry;
