// src/engine/monitor.rs

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::time::Instant;

use crate::models::violation::{ViolationKind, ViolationRecord};

/// How long a warning notice stays visible after a detection.
pub const DEFAULT_WARNING_TTL: Duration = Duration::from_secs(3);

pub const WARNING_MESSAGE: &str = "Warning: Suspicious activity detected. This has been logged.";

/// What the host should do with the default action behind a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    /// Suppress the default action (copy, paste, context menu).
    Cancel,
    /// Let it through: either it can't be prevented, or no attempt is running.
    Allow,
}

/// Capability interface the host environment wires to its signal source
/// (browser events, OS hooks, an HTTP endpoint...).
pub trait IntegritySignals {
    fn on_focus_lost(&self) -> SignalAction;
    fn on_copy_attempt(&self) -> SignalAction;
    fn on_paste_attempt(&self) -> SignalAction;
    fn on_context_menu_attempt(&self) -> SignalAction;

    fn on_signal(&self, kind: ViolationKind) -> SignalAction {
        match kind {
            ViolationKind::FocusLost => self.on_focus_lost(),
            ViolationKind::CopyAttempt => self.on_copy_attempt(),
            ViolationKind::PasteAttempt => self.on_paste_attempt(),
            ViolationKind::ContextMenuAttempt => self.on_context_menu_attempt(),
        }
    }
}

/// Transient notice raised by a detection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningNotice {
    pub kind: ViolationKind,
    pub message: &'static str,
    pub expires_in_ms: u64,
}

#[derive(Debug)]
struct MonitorState {
    attached: bool,
    log: Vec<ViolationRecord>,
    warning: Option<(ViolationKind, Instant)>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<MonitorState>,
    warning_ttl: Duration,
}

/// Collects violation records for one attempt.
///
/// Cloning yields another handle to the same log. Signals only count while a
/// [`MonitorGuard`] obtained from [`IntegrityMonitor::attach`] is alive.
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    shared: Arc<Shared>,
}

impl IntegrityMonitor {
    pub fn new(warning_ttl: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MonitorState {
                    attached: false,
                    log: Vec::new(),
                    warning: None,
                }),
                warning_ttl,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts observing. Observation ends when the returned guard is dropped.
    pub fn attach(&self) -> MonitorGuard {
        self.state().attached = true;
        tracing::debug!("Integrity monitor attached");
        MonitorGuard {
            shared: Some(self.shared.clone()),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.state().attached
    }

    /// Appends a record for `kind` if attached and raises the warning notice.
    pub fn record(&self, kind: ViolationKind) -> SignalAction {
        let mut state = self.state();
        if !state.attached {
            tracing::debug!("Ignoring {:?} signal: monitor detached", kind);
            return SignalAction::Allow;
        }
        state.log.push(ViolationRecord::now(kind));
        state.warning = Some((kind, Instant::now()));
        tracing::warn!("Violation detected: {}", kind);

        if kind.is_preventable() {
            SignalAction::Cancel
        } else {
            SignalAction::Allow
        }
    }

    /// Snapshot of the log in detection order.
    pub fn violations(&self) -> Vec<ViolationRecord> {
        self.state().log.clone()
    }

    pub fn violation_count(&self) -> usize {
        self.state().log.len()
    }

    /// The latest warning, if it has not expired yet. A newer detection
    /// replaces the older notice and restarts its lifetime.
    pub fn active_warning(&self) -> Option<WarningNotice> {
        let state = self.state();
        let (kind, raised_at) = state.warning?;
        let age = raised_at.elapsed();
        if age >= self.shared.warning_ttl {
            return None;
        }
        Some(WarningNotice {
            kind,
            message: WARNING_MESSAGE,
            expires_in_ms: (self.shared.warning_ttl - age).as_millis() as u64,
        })
    }
}

impl Default for IntegrityMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_TTL)
    }
}

impl IntegritySignals for IntegrityMonitor {
    fn on_focus_lost(&self) -> SignalAction {
        self.record(ViolationKind::FocusLost)
    }

    fn on_copy_attempt(&self) -> SignalAction {
        self.record(ViolationKind::CopyAttempt)
    }

    fn on_paste_attempt(&self) -> SignalAction {
        self.record(ViolationKind::PasteAttempt)
    }

    fn on_context_menu_attempt(&self) -> SignalAction {
        self.record(ViolationKind::ContextMenuAttempt)
    }
}

/// Keeps the monitor attached. Detaches on [`MonitorGuard::detach`] or drop.
#[derive(Debug)]
pub struct MonitorGuard {
    shared: Option<Arc<Shared>>,
}

impl MonitorGuard {
    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(shared) = self.shared.take() {
            let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.attached = false;
            state.warning = None;
            tracing::debug!("Integrity monitor detached after {} violations", state.log.len());
        }
    }
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        self.release();
    }
}
