// src/engine/timer.rs

use std::{future::Future, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

/// Below this many seconds the clock is shown in its critical state.
pub const CRITICAL_THRESHOLD_SECS: u32 = 300;

/// `mm:ss`, zero padded. Minutes are not wrapped into hours.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn is_critical(secs: u32) -> bool {
    secs < CRITICAL_THRESHOLD_SECS
}

/// A one-shot countdown in whole seconds.
///
/// Decrements once per elapsed second and runs `on_expire` exactly once when
/// it reaches zero. Dropping the handle cancels the countdown; a countdown
/// that already expired is unaffected by cancellation.
#[derive(Debug)]
pub struct Countdown {
    remaining: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn start<F, Fut>(duration_secs: u32, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = watch::channel(duration_secs);

        let task = tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = time::interval_at(Instant::now() + period, period);
            // A stalled runtime still accounts for every elapsed second.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

            let mut remaining = duration_secs;
            while remaining > 0 {
                ticker.tick().await;
                remaining -= 1;
                tx.send_replace(remaining);
            }

            tracing::debug!("Countdown of {}s reached zero", duration_secs);
            // Detached: the expiry handler usually cancels this very countdown.
            tokio::spawn(on_expire());
        });

        Self { remaining: rx, task }
    }

    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
