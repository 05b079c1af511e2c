//! Status display collaborator.

use chrono::Local;

/// What the wearer should currently see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    ShowIdle,
    ShowCountdown(u8),
    ShowCapturing,
    ShowDone,
    ShowError(String),
}

/// Presentation sink for state changes. Nothing it does feeds back into
/// the capture cycle.
pub trait StatusDisplay: Send {
    fn show(&self, event: DisplayEvent);

    /// Keep the screen on while a cycle is running.
    fn keep_awake(&self, _on: bool) {}
}

/// Prints state changes to stdout.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl StatusDisplay for ConsoleDisplay {
    fn show(&self, event: DisplayEvent) {
        let stamp = Local::now().format("%H:%M:%S%.3f");
        match event {
            DisplayEvent::ShowIdle => println!("[{stamp}] Start"),
            DisplayEvent::ShowCountdown(n) => println!("[{stamp}] {n}"),
            DisplayEvent::ShowCapturing => println!("[{stamp}] Recording..."),
            DisplayEvent::ShowDone => println!("[{stamp}] Done"),
            DisplayEvent::ShowError(message) => eprintln!("[{stamp}] {message}"),
        }
    }

    fn keep_awake(&self, on: bool) {
        tracing::trace!(on, "Keep-awake");
    }
}
