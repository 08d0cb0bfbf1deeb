//! Human-readable progress reporting with elapsed-time stamps.
//!
//! A [`Notifier`] is created once per run and handed by reference to every
//! stage that reports progress. Each message is stamped with the time since
//! the run started and the time since the previous message:
//!
//! ```text
//! 3.21s [0.87s]: block 2/3 done: 20 fetched
//! ```
//!
//! Lines go through `tracing` under the `notifier` target, so they share the
//! subscriber configured in `main`.

use chrono::Local;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug)]
pub struct Notifier {
    started: Instant,
    last: Mutex<Instant>,
}

impl Notifier {
    /// Start the clock and announce the run.
    pub fn start() -> Self {
        let now = Instant::now();
        let notifier = Notifier {
            started: now,
            last: Mutex::new(now),
        };
        notifier.say(&format!("start ({})", Local::now().format("%Y-%m-%d %H:%M:%S")));
        notifier
    }

    /// Report a message. Fire-and-forget.
    pub fn say(&self, message: &str) {
        let now = Instant::now();
        let step = {
            // A panicked holder cannot leave an Instant half-written.
            let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
            let step = now.duration_since(*last);
            *last = now;
            step
        };

        let line = format_line(now.duration_since(self.started), step, message);
        info!(target: "notifier", "{line}");
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

fn format_line(total: Duration, step: Duration, message: &str) -> String {
    format!(
        "{:.2}s [{:.2}s]: {}",
        total.as_secs_f64(),
        step.as_secs_f64(),
        message
    )
}
