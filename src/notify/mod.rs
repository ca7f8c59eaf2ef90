//! User notifications
//!
//! Notifications are fire-and-forget: the controller hands one over and never
//! looks at what the sink did with it.

pub mod clipboard;

use std::time::Duration;

use crate::config::NotificationConfig;

pub use clipboard::{Clipboard, ClipboardError, StdoutClipboard};

#[cfg(feature = "clipboard")]
pub use clipboard::SystemClipboard;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// How a notification should be presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub position: String,
    pub duration: Duration,
    pub dismiss_on_click: bool,
    pub pause_on_hover: bool,
}

impl DisplayOptions {
    pub fn new(position: impl Into<String>, duration: Duration) -> Self {
        Self {
            position: position.into(),
            duration,
            dismiss_on_click: true,
            pause_on_hover: true,
        }
    }
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub display: DisplayOptions,
}

/// Builds the controller's notifications with configured display parameters
#[derive(Debug, Clone)]
pub struct NotificationStyle {
    config: NotificationConfig,
}

impl NotificationStyle {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    pub fn uploaded(&self) -> Notification {
        self.success("File uploaded successfully", self.config.uploaded_duration())
    }

    pub fn link_copied(&self) -> Notification {
        self.success("The download link was copied", self.config.copied_duration())
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        Notification {
            message: message.into(),
            severity: Severity::Error,
            display: DisplayOptions::new(&self.config.position, self.config.error_duration()),
        }
    }

    fn success(&self, message: &str, duration: Duration) -> Notification {
        Notification {
            message: message.to_string(),
            severity: Severity::Success,
            display: DisplayOptions::new(&self.config.position, duration),
        }
    }
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

/// Notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Emits notifications as log events
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => tracing::info!(
                position = %notification.display.position,
                duration_ms = notification.display.duration.as_millis() as u64,
                "{}",
                notification.message
            ),
            Severity::Error => tracing::error!(
                position = %notification.display.position,
                duration_ms = notification.display.duration.as_millis() as u64,
                "{}",
                notification.message
            ),
        }
    }
}

/// Prints notifications on stderr
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Single-line rendering used on the terminal
    pub fn render(notification: &Notification) -> String {
        let marker = match notification.severity {
            Severity::Success => "✔",
            Severity::Error => "✖",
        };
        format!("{} {}", marker, notification.message)
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        // Start on a fresh line in case a progress line is being redrawn.
        eprintln!("\r\x1b[2K{}", Self::render(&notification));
    }
}
