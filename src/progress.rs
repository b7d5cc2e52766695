// src/progress.rs

//! Progress reporting for provisioning steps
//!
//! The convergence pass reports what it is doing through the `Reporter`
//! trait. Reporters are pure sinks: nothing they do feeds back into the
//! decisions being made.
//!
//! Implementations:
//! - `ConsoleReporter`: spinners and byte bars on the terminal using indicatif
//! - `LogReporter`: forwards everything to tracing
//! - `SilentReporter`: no-op for tests and scripted use

use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;
use tracing::{info, warn};

/// Sink for step-level progress
pub trait Reporter {
    /// A step has started
    fn step(&self, message: &str);

    /// The current step finished successfully
    fn done(&self, message: &str);

    /// A step was not needed
    fn skipped(&self, message: &str);

    /// The current step failed
    fn failed(&self, message: &str);

    /// Progress bar for a byte transfer of the given size (if known)
    fn transfer(&self, total: Option<u64>, name: &str) -> ProgressBar;
}

/// No-op reporter
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn step(&self, _message: &str) {}
    fn done(&self, _message: &str) {}
    fn skipped(&self, _message: &str) {}
    fn failed(&self, _message: &str) {}

    fn transfer(&self, _total: Option<u64>, _name: &str) -> ProgressBar {
        ProgressBar::hidden()
    }
}

/// Reporter that writes to the tracing log instead of the terminal
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn step(&self, message: &str) {
        info!("{}...", message);
    }

    fn done(&self, message: &str) {
        info!("{}", message);
    }

    fn skipped(&self, message: &str) {
        info!("{} (already satisfied)", message);
    }

    fn failed(&self, message: &str) {
        warn!("{}", message);
    }

    fn transfer(&self, _total: Option<u64>, name: &str) -> ProgressBar {
        info!("Downloading {}", name);
        ProgressBar::hidden()
    }
}

/// Terminal reporter with one spinner per running step
pub struct ConsoleReporter {
    current: RefCell<Option<ProgressBar>>,
    show_bars: bool,
}

impl ConsoleReporter {
    /// Create a console reporter; `show_bars` disables animation when false
    pub fn new(show_bars: bool) -> Self {
        Self {
            current: RefCell::new(None),
            show_bars,
        }
    }

    fn finish_current(&self, line: String) {
        match self.current.borrow_mut().take() {
            Some(spinner) => spinner.finish_with_message(line),
            None => println!("{}", line),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn step(&self, message: &str) {
        if !self.show_bars {
            println!("  {}...", message);
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .expect("Invalid spinner template"),
        );
        spinner.set_message(format!("{}...", message));
        spinner.enable_steady_tick(Duration::from_millis(100));

        if let Some(previous) = self.current.replace(Some(spinner)) {
            previous.finish_and_clear();
        }
    }

    fn done(&self, message: &str) {
        self.finish_current(format!("  [ok] {}", message));
    }

    fn skipped(&self, message: &str) {
        println!("  [--] {} (already satisfied)", message);
    }

    fn failed(&self, message: &str) {
        self.finish_current(format!("  [!!] {}", message));
    }

    fn transfer(&self, total: Option<u64>, name: &str) -> ProgressBar {
        if !self.show_bars {
            return ProgressBar::hidden();
        }

        let bar = match total {
            Some(size) => {
                let bar = ProgressBar::new(size);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("  {spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
                        .expect("Invalid progress bar template")
                        .progress_chars("#>-"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("  {spinner:.green} {bytes} ({bytes_per_sec}) {msg}")
                        .expect("Invalid spinner template"),
                );
                bar
            }
        };
        bar.set_message(name.to_string());

        // The step spinner would fight the byte bar for the same line
        if let Some(spinner) = self.current.borrow().as_ref() {
            spinner.disable_steady_tick();
        }
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_transfer_is_hidden() {
        let bar = SilentReporter.transfer(Some(100), "archive");
        assert!(bar.is_hidden());
    }

    #[test]
    fn test_console_without_bars_is_hidden() {
        let reporter = ConsoleReporter::new(false);
        reporter.step("Installing runtime");
        reporter.done("Runtime installed");
        assert!(reporter.transfer(None, "archive").is_hidden());
        assert!(reporter.current.borrow().is_none());
    }
}
