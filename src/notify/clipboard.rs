//! Clipboard access

use std::io::Write;
#[cfg(feature = "clipboard")]
use std::time::Duration;
#[cfg(all(feature = "clipboard", target_os = "linux"))]
use std::time::Instant;

#[cfg(feature = "clipboard")]
use parking_lot::Mutex;
use thiserror::Error;

/// Clipboard errors
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Destination for the download link
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Keep the last written text available after the process exits
    fn persist(&self) -> Result<(), ClipboardError> {
        Ok(())
    }
}

impl<T: Clipboard + ?Sized> Clipboard for Box<T> {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        (**self).write_text(text)
    }

    fn persist(&self) -> Result<(), ClipboardError> {
        (**self).persist()
    }
}

impl<T: Clipboard + ?Sized> Clipboard for std::sync::Arc<T> {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        (**self).write_text(text)
    }

    fn persist(&self) -> Result<(), ClipboardError> {
        (**self).persist()
    }
}

/// The desktop clipboard.
///
/// On Linux the selection is served by this process, so the text is lost
/// when it exits unless a clipboard manager has taken it over. Call
/// [`Clipboard::persist`] before exiting to keep serving the last
/// written text for up to `hold`.
#[cfg(feature = "clipboard")]
#[derive(Debug, Default)]
pub struct SystemClipboard {
    hold: Duration,
    last: Mutex<Option<String>>,
}

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            last: Mutex::new(None),
        }
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }
}

#[cfg(all(feature = "clipboard", target_os = "linux"))]
fn hold_selection(text: String, hold: Duration) -> Result<(), ClipboardError> {
    use arboard::SetExtLinux;

    tracing::debug!(hold_ms = hold.as_millis() as u64, "holding clipboard selection");
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
    clipboard
        .set()
        .wait_until(Instant::now() + hold)
        .text(text)
        .map_err(|e| ClipboardError::Unavailable(e.to_string()))
}

#[cfg(all(feature = "clipboard", not(target_os = "linux")))]
fn hold_selection(_text: String, _hold: Duration) -> Result<(), ClipboardError> {
    Ok(())
}

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        *self.last.lock() = Some(text.to_string());
        Ok(())
    }

    /// Block until another application owns the clipboard or `hold` elapses.
    /// Returns immediately when nothing was written or off Linux.
    fn persist(&self) -> Result<(), ClipboardError> {
        let Some(text) = self.last.lock().take() else {
            return Ok(());
        };
        if self.hold.is_zero() {
            return Ok(());
        }
        hold_selection(text, self.hold)
    }
}

/// Writes the text to stdout, for headless sessions and piping
#[derive(Debug, Clone, Default)]
pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", text)?;
        stdout.flush()?;
        Ok(())
    }
}
