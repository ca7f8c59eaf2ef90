//! Upload lifecycle controller
//!
//! Owns the selected file, the upload status and the current cancellation
//! handle, and moves between the four states in response to user actions and
//! to the outcome of the remote write.
//!
//! ```text
//!            select_file / clear
//!              ┌──────┐
//!              ▼      │
//!   ┌────────► Idle ──┘ ── start_upload ──► Uploading ── success ──► Done
//!   │           ▲  ▲                         │   │                   │
//!   │           │  └──── cancel / failure ───┘   │ too large         │
//!   │           │                                ▼                   │
//!   │           └──────── try_again ──────────  Error                │
//!   └───────────────────────────── copy_and_done ────────────────────┘
//! ```
//!
//! The controller is shared behind an `Arc`; every operation takes `&self`.
//! Results of a request are applied only if the handle that started it is
//! still the current one, so a response arriving after `cancel` is dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

use super::cancel::CancelHandle;
use super::file::{commit_message, SelectedFile};
use crate::github::{ContentsApi, ContentsError, ProgressFn, PutContentsRequest, TransferProgress};
use crate::metrics;
use crate::notify::{Clipboard, ClipboardError, NotificationStyle, Notifier};

/// Where an upload stands. Each state carries only the data valid in it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading {
        progress: u8,
    },
    Done {
        download_url: String,
    },
    /// The service rejected the file as too large
    Error,
}

impl UploadStatus {
    /// Percentage shown to the user; zero outside `Uploading`
    pub fn progress(&self) -> u8 {
        match self {
            UploadStatus::Uploading { progress } => *progress,
            _ => 0,
        }
    }

    pub fn download_url(&self) -> Option<&str> {
        match self {
            UploadStatus::Done { download_url } => Some(download_url),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UploadStatus::Idle => "idle",
            UploadStatus::Uploading { .. } => "uploading",
            UploadStatus::Done { .. } => "done",
            UploadStatus::Error => "error",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The one action offered to the user in a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ChooseFile,
    Upload,
    Cancel,
    CopyAndDone,
    TryAgain,
}

/// Point-in-time view of the controller, published on every change
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub file_name: Option<String>,
    pub status: UploadStatus,
}

impl Snapshot {
    pub fn action(&self) -> Action {
        match (&self.status, &self.file_name) {
            (UploadStatus::Idle, None) => Action::ChooseFile,
            (UploadStatus::Idle, Some(_)) => Action::Upload,
            (UploadStatus::Uploading { .. }, _) => Action::Cancel,
            (UploadStatus::Done { .. }, _) => Action::CopyAndDone,
            (UploadStatus::Error, _) => Action::TryAgain,
        }
    }

    pub fn progress(&self) -> u8 {
        self.status.progress()
    }
}

/// How an upload attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed { download_url: String },
    Oversized,
    Failed { message: String },
    Cancelled,
}

/// Controller misuse
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: &'static str,
    },

    #[error("No file selected")]
    NoFileSelected,

    #[error("Selected file is empty")]
    EmptyFile,

    #[error("Failed to copy the download link: {0}")]
    Clipboard(#[from] ClipboardError),
}

fn invalid(action: &'static str, status: &UploadStatus) -> ControllerError {
    ControllerError::InvalidTransition {
        action,
        status: status.name(),
    }
}

#[derive(Debug)]
struct Session {
    file: Option<SelectedFile>,
    status: UploadStatus,
    handle: CancelHandle,
}

impl Session {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            file_name: self.file.as_ref().map(|f| f.name().to_string()),
            status: self.status.clone(),
        }
    }

    /// Drop the selection and return to `Idle`
    fn reset(&mut self) {
        self.file = None;
        self.status = UploadStatus::Idle;
    }
}

struct Shared {
    session: Mutex<Session>,
    updates: watch::Sender<Snapshot>,
}

impl Shared {
    fn publish(&self, session: &Session) {
        self.updates.send_replace(session.snapshot());
    }
}

/// Drives one file through selection, upload and hand-off of its link
pub struct UploadController<A, N, C> {
    api: A,
    notifier: N,
    clipboard: C,
    style: NotificationStyle,
    shared: Arc<Shared>,
}

impl<A, N, C> UploadController<A, N, C>
where
    A: ContentsApi,
    N: Notifier,
    C: Clipboard,
{
    pub fn new(api: A, notifier: N, clipboard: C) -> Self {
        let session = Session {
            file: None,
            status: UploadStatus::Idle,
            handle: CancelHandle::new(),
        };
        let (updates, _) = watch::channel(session.snapshot());

        Self {
            api,
            notifier,
            clipboard,
            style: NotificationStyle::default(),
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                updates,
            }),
        }
    }

    /// Use configured notification display parameters
    pub fn with_style(mut self, style: NotificationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.session.lock().snapshot()
    }

    pub fn status(&self) -> UploadStatus {
        self.shared.session.lock().status.clone()
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        self.shared.session.lock().file.clone()
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.updates.subscribe()
    }

    /// Pick the file to upload, replacing any previous pick
    pub fn select_file(&self, file: SelectedFile) -> Result<(), ControllerError> {
        let mut session = self.shared.session.lock();
        if session.status != UploadStatus::Idle {
            return Err(invalid("select a file", &session.status));
        }

        tracing::debug!(file = %file.name(), bytes = file.size(), "file selected");
        session.file = Some(file);
        self.shared.publish(&session);
        Ok(())
    }

    /// Deselect while idle, or reset after an oversized rejection
    pub fn clear(&self) -> Result<(), ControllerError> {
        let mut session = self.shared.session.lock();
        match session.status {
            UploadStatus::Idle | UploadStatus::Error => {
                session.reset();
                self.shared.publish(&session);
                Ok(())
            }
            _ => Err(invalid("clear", &session.status)),
        }
    }

    /// Leave the oversized-error state
    pub fn try_again(&self) -> Result<(), ControllerError> {
        let mut session = self.shared.session.lock();
        if session.status != UploadStatus::Error {
            return Err(invalid("try again", &session.status));
        }

        session.reset();
        self.shared.publish(&session);
        Ok(())
    }

    /// Abort the in-flight upload and return to `Idle`.
    ///
    /// The current handle is cancelled and replaced right away, so the next
    /// upload starts with a live token and the aborted one can no longer
    /// touch state.
    pub fn cancel(&self) -> Result<(), ControllerError> {
        let mut session = self.shared.session.lock();
        if !matches!(session.status, UploadStatus::Uploading { .. }) {
            return Err(invalid("cancel", &session.status));
        }

        session.handle.cancel();
        session.handle = CancelHandle::new();
        session.reset();
        self.shared.publish(&session);

        tracing::info!("upload cancelled");
        Ok(())
    }

    /// Copy the download link, confirm, and reset.
    ///
    /// If the clipboard write fails the state stays `Done` so the link is
    /// not lost.
    pub fn copy_and_done(&self) -> Result<String, ControllerError> {
        let download_url = {
            let session = self.shared.session.lock();
            match &session.status {
                UploadStatus::Done { download_url } => download_url.clone(),
                other => return Err(invalid("copy the link", other)),
            }
        };

        if let Err(e) = self.clipboard.write_text(&download_url) {
            tracing::warn!(error = %e, "clipboard write failed");
            metrics::record_error("clipboard");
            self.notifier.notify(self.style.error(e.to_string()));
            return Err(e.into());
        }

        self.notifier.notify(self.style.link_copied());

        let mut session = self.shared.session.lock();
        if matches!(session.status, UploadStatus::Done { .. }) {
            session.reset();
            self.shared.publish(&session);
        }

        Ok(download_url)
    }

    /// Upload the selected file.
    ///
    /// Moves to `Uploading` and returns once the request finishes or is
    /// cancelled. Remote failures are reported as outcomes, not errors.
    pub async fn start_upload(&self) -> Result<UploadOutcome, ControllerError> {
        let (file, attempt) = {
            let mut session = self.shared.session.lock();
            if session.status != UploadStatus::Idle {
                return Err(invalid("start an upload", &session.status));
            }
            let file = session.file.clone().ok_or(ControllerError::NoFileSelected)?;
            if file.is_empty() {
                return Err(ControllerError::EmptyFile);
            }

            session.handle = CancelHandle::new();
            session.status = UploadStatus::Uploading { progress: 0 };
            self.shared.publish(&session);
            (file, session.handle.clone())
        };

        let storage_name = file.storage_name();
        let request = PutContentsRequest {
            path: file.remote_path(&storage_name),
            message: commit_message(&chrono::Local::now()),
            content: file.content().clone(),
        };

        tracing::info!(
            file = %file.name(),
            path = %request.path,
            bytes = file.size(),
            attempt = %attempt.id(),
            "upload started"
        );

        let start_time = Instant::now();
        let result = self
            .api
            .put_contents(request, self.progress_reporter(&attempt), attempt.token())
            .await;
        metrics::record_upload_duration(start_time.elapsed().as_secs_f64());

        Ok(self.finish(&attempt, &file, result))
    }

    fn progress_reporter(&self, attempt: &CancelHandle) -> ProgressFn {
        let shared = Arc::clone(&self.shared);
        let attempt = attempt.clone();

        Arc::new(move |transfer: TransferProgress| {
            let mut session = shared.session.lock();
            if !session.handle.is_same(&attempt) {
                return;
            }

            let percent = transfer.percent();
            let advanced = match &mut session.status {
                UploadStatus::Uploading { progress } if percent > *progress => {
                    *progress = percent;
                    true
                }
                _ => false,
            };

            if advanced {
                shared.publish(&session);
            }
        })
    }

    fn finish(
        &self,
        attempt: &CancelHandle,
        file: &SelectedFile,
        result: Result<crate::github::ContentDescriptor, ContentsError>,
    ) -> UploadOutcome {
        let mut session = self.shared.session.lock();

        let current = session.handle.is_same(attempt)
            && matches!(session.status, UploadStatus::Uploading { .. });
        if !current {
            tracing::debug!(attempt = %attempt.id(), "discarding result of a cancelled upload");
            metrics::record_upload_outcome("cancelled");
            return UploadOutcome::Cancelled;
        }

        match result {
            Ok(descriptor) => {
                session.status = UploadStatus::Done {
                    download_url: descriptor.download_url.clone(),
                };
                self.shared.publish(&session);
                drop(session);

                metrics::record_upload_outcome("completed");
                metrics::record_upload_bytes(file.size());
                tracing::info!(
                    download_url = %descriptor.download_url,
                    sha = %descriptor.sha,
                    "upload completed"
                );
                self.notifier.notify(self.style.uploaded());

                UploadOutcome::Completed {
                    download_url: descriptor.download_url,
                }
            }
            Err(ContentsError::PayloadTooLarge { status }) => {
                session.status = UploadStatus::Error;
                self.shared.publish(&session);

                metrics::record_upload_outcome("oversized");
                tracing::warn!(
                    status = status,
                    bytes = file.size(),
                    "upload rejected as too large"
                );
                UploadOutcome::Oversized
            }
            Err(ContentsError::Cancelled) => {
                // The token was cancelled outside the controller.
                session.reset();
                self.shared.publish(&session);

                metrics::record_upload_outcome("cancelled");
                UploadOutcome::Cancelled
            }
            Err(ContentsError::Failed { message }) => {
                session.reset();
                self.shared.publish(&session);
                drop(session);

                metrics::record_upload_outcome("failed");
                metrics::record_error("upload");
                tracing::error!(error = %message, "upload failed");
                self.notifier.notify(self.style.error(message.clone()));

                UploadOutcome::Failed { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_progress_only_while_uploading() {
        assert_eq!(UploadStatus::Idle.progress(), 0);
        assert_eq!(UploadStatus::Uploading { progress: 42 }.progress(), 42);
        assert_eq!(UploadStatus::Error.progress(), 0);
        assert_eq!(
            UploadStatus::Done {
                download_url: "u".into()
            }
            .progress(),
            0
        );
    }

    #[test]
    fn test_download_url_only_when_done() {
        assert_eq!(UploadStatus::Idle.download_url(), None);
        assert_eq!(
            UploadStatus::Done {
                download_url: "https://example/report.pdf".into()
            }
            .download_url(),
            Some("https://example/report.pdf")
        );
    }

    #[test]
    fn test_snapshot_action() {
        let mut snapshot = Snapshot::default();
        assert_eq!(snapshot.action(), Action::ChooseFile);

        snapshot.file_name = Some("report.pdf".into());
        assert_eq!(snapshot.action(), Action::Upload);

        snapshot.status = UploadStatus::Uploading { progress: 10 };
        assert_eq!(snapshot.action(), Action::Cancel);

        snapshot.status = UploadStatus::Done {
            download_url: "u".into(),
        };
        assert_eq!(snapshot.action(), Action::CopyAndDone);

        snapshot.status = UploadStatus::Error;
        assert_eq!(snapshot.action(), Action::TryAgain);
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = invalid("cancel", &UploadStatus::Idle);
        assert_eq!(err.to_string(), "Cannot cancel while idle");
    }
}
