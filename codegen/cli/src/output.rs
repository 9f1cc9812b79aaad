//! Console output: colored messages and the watch spinner.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use codegen_lib::WatchEvent;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing_subscriber::fmt::MakeWriter;

const READ_MORE_URL: &str = "https://github.com/flotiq/flotiq-codegen-ts";

/// Creates the "Watching for changes" spinner.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.yellow().to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn print_generated(destination: &Path) {
    println!("{}", "Client generated successfully!".green());
    println!(
        "{}",
        format!("You can start using your Flotiq SDK in '{}'", destination.display()).green()
    );
    println!("{}", format!("Read more: {READ_MORE_URL}").cyan());
}

pub fn print_terminated() {
    println!("{}", "Application terminated!".yellow());
}

/// Stderr log writer that hides the attached spinner while a line is written.
#[derive(Clone, Default)]
pub struct LogWriter {
    spinner: Arc<Mutex<Option<ProgressBar>>>,
}

impl LogWriter {
    pub fn attach(&self, spinner: ProgressBar) {
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    pub fn detach(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = None;
        }
    }

    fn active_spinner(&self) -> Option<ProgressBar> {
        self.spinner.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.active_spinner() {
            Some(spinner) => spinner.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// User-facing line for a watch event, if it deserves one.
pub fn event_message(event: &WatchEvent) -> Option<String> {
    match event {
        WatchEvent::BaselineRecorded { .. } => {
            Some("Recorded current schema, waiting for changes".dimmed().to_string())
        }
        WatchEvent::ChangeDetected { .. } => {
            Some("Detected changes in content!".green().to_string())
        }
        WatchEvent::Regenerated => Some("Client generated successfully!".green().to_string()),
        WatchEvent::Failed { error } => Some(format!("{} {error}", "An error occurred:".red())),
        WatchEvent::StateChanged { .. } => None,
    }
}

/// Prints `event` above the spinner, or plainly when there is none.
pub fn report_event(spinner: Option<&ProgressBar>, event: &WatchEvent) {
    let Some(line) = event_message(event) else {
        return;
    };
    match spinner {
        Some(spinner) => spinner.println(line),
        None => println!("{line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegen_lib::{Fingerprint, WatchState};

    #[test]
    fn log_writer_writes_with_and_without_spinner() {
        let mut writer = LogWriter::default();
        assert_eq!(writer.write(b"plain\n").unwrap(), 6);

        writer.attach(ProgressBar::hidden());
        assert!(writer.active_spinner().is_some());
        assert_eq!(writer.write(b"suspended\n").unwrap(), 10);

        writer.detach();
        assert!(writer.active_spinner().is_none());
    }

    #[test]
    fn log_writer_clones_share_the_spinner() {
        let writer = LogWriter::default();
        let handle = writer.make_writer();

        writer.attach(ProgressBar::hidden());

        assert!(handle.active_spinner().is_some());
    }

    #[test]
    fn state_changes_are_not_printed() {
        let event = WatchEvent::StateChanged {
            state: WatchState::Polling,
        };
        assert!(event_message(&event).is_none());
    }

    #[test]
    fn change_detected_is_announced() {
        let event = WatchEvent::ChangeDetected {
            previous: Fingerprint::new("a", "b"),
            current: Fingerprint::new("a", "c"),
        };
        assert!(event_message(&event).unwrap().contains("Detected changes in content!"));
    }

    #[test]
    fn failures_include_the_error() {
        let event = WatchEvent::Failed {
            error: "service error (500): generator down".to_string(),
        };
        let line = event_message(&event).unwrap();
        assert!(line.contains("An error occurred:"));
        assert!(line.contains("generator down"));
    }
}
