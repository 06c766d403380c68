//! Spinner feedback for the slow steps (reading workbooks, comparing requests)

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(100);

/// One spinner reused across the steps of a command
#[derive(Debug)]
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
    enabled: bool,
    step_started: Instant,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::from_flag(true)
    }

    /// Reporter that never draws anything, for `--quiet` and tests
    pub fn new_minimal() -> Self {
        Self::from_flag(false)
    }

    pub fn from_flag(enabled: bool) -> Self {
        Self {
            spinner: None,
            enabled,
            step_started: Instant::now(),
        }
    }

    /// Begin a step, relabelling the spinner if one is already running
    pub fn start(&mut self, message: &str) {
        self.step_started = Instant::now();
        if !self.enabled {
            return;
        }
        match &self.spinner {
            Some(pb) => pb.set_message(message.to_string()),
            None => self.spinner = Some(spinner(message)),
        }
    }

    /// End the current step, leaving `message` on screen
    pub fn finish(&mut self, message: &str) {
        log::debug!("{} ({:.2?})", message, self.elapsed());
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    /// Time since the current step started
    pub fn elapsed(&self) -> Duration {
        self.step_started.elapsed()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        // A step abandoned by an error should not leave a spinner behind
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = ProgressBar::new_spinner().with_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(TICK);
    pb
}
