//! Shared test doubles for controller tests
//!
//! - `ScriptedApi`: a Contents API whose progress reports and final response
//!   are fed step by step from the test
//! - `RecordingNotifier` / `RecordingClipboard`: capture what the controller
//!   hands to its collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use repodrop::github::{
    ContentDescriptor, ContentsApi, ContentsError, ProgressFn, PutContentsRequest,
    TransferProgress,
};
use repodrop::notify::{Clipboard, ClipboardError, Notification, Notifier, Severity};
use repodrop::upload::{SelectedFile, UploadController};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One scripted event of a fake request
pub enum Step {
    Progress { loaded: u64, total: u64 },
    Respond(Result<ContentDescriptor, ContentsError>),
}

/// Receiving end of one [`Script`]
struct Lane {
    steps: tokio::sync::Mutex<mpsc::UnboundedReceiver<Step>>,
    acks: mpsc::UnboundedSender<()>,
}

/// Contents API driven by [`Script`]s.
///
/// The n-th request reads from the n-th script; once they run out, later
/// requests share the last one.
pub struct ScriptedApi {
    lanes: Vec<Lane>,
    calls: AtomicUsize,
    requests: Mutex<Vec<PutContentsRequest>>,
    honor_cancel: bool,
}

/// Test-side handle feeding a [`ScriptedApi`]
pub struct Script {
    steps: mpsc::UnboundedSender<Step>,
    acks: mpsc::UnboundedReceiver<()>,
}

impl Script {
    /// Deliver a progress report and wait until the controller has seen it
    pub async fn progress(&mut self, loaded: u64, total: u64) {
        self.steps
            .send(Step::Progress { loaded, total })
            .expect("api dropped");
        self.acks.recv().await.expect("api dropped");
    }

    pub fn respond(&self, result: Result<ContentDescriptor, ContentsError>) {
        self.steps.send(Step::Respond(result)).expect("api dropped");
    }
}

impl ScriptedApi {
    /// An API that ignores cancellation, so responses can arrive late
    pub fn new() -> (Arc<Self>, Script) {
        Self::build(false)
    }

    /// An API that aborts as soon as the token fires
    pub fn cancellable() -> (Arc<Self>, Script) {
        Self::build(true)
    }

    /// An API ignoring cancellation with one script per request
    pub fn per_request(count: usize) -> (Arc<Self>, Vec<Script>) {
        Self::build_lanes(count, false)
    }

    fn build(honor_cancel: bool) -> (Arc<Self>, Script) {
        let (api, mut scripts) = Self::build_lanes(1, honor_cancel);
        let script = scripts.pop().expect("one script");
        (api, script)
    }

    fn build_lanes(count: usize, honor_cancel: bool) -> (Arc<Self>, Vec<Script>) {
        let mut lanes = Vec::with_capacity(count);
        let mut scripts = Vec::with_capacity(count);
        for _ in 0..count {
            let (step_tx, step_rx) = mpsc::unbounded_channel();
            let (ack_tx, ack_rx) = mpsc::unbounded_channel();
            lanes.push(Lane {
                steps: tokio::sync::Mutex::new(step_rx),
                acks: ack_tx,
            });
            scripts.push(Script {
                steps: step_tx,
                acks: ack_rx,
            });
        }

        let api = Arc::new(Self {
            lanes,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            honor_cancel,
        });
        (api, scripts)
    }

    pub fn requests(&self) -> Vec<PutContentsRequest> {
        self.requests.lock().clone()
    }

    async fn run(
        &self,
        lane: &Lane,
        progress: ProgressFn,
    ) -> Result<ContentDescriptor, ContentsError> {
        let mut steps = lane.steps.lock().await;
        loop {
            match steps.recv().await {
                Some(Step::Progress { loaded, total }) => {
                    progress(TransferProgress { loaded, total });
                    let _ = lane.acks.send(());
                }
                Some(Step::Respond(result)) => return result,
                None => {
                    return Err(ContentsError::Failed {
                        message: "script ended".into(),
                    })
                }
            }
        }
    }
}

#[async_trait]
impl ContentsApi for ScriptedApi {
    async fn put_contents(
        &self,
        request: PutContentsRequest,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<ContentDescriptor, ContentsError> {
        self.requests.lock().push(request);
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let lane = &self.lanes[call.min(self.lanes.len() - 1)];

        if self.honor_cancel {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ContentsError::Cancelled),
                result = self.run(lane, progress) => result,
            }
        } else {
            self.run(lane, progress).await
        }
    }
}

/// Captures notifications
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn count_of(&self, severity: Severity) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

/// In-memory clipboard
#[derive(Clone, Default)]
pub struct RecordingClipboard {
    contents: Arc<Mutex<Option<String>>>,
}

impl RecordingClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

pub type TestController = UploadController<Arc<ScriptedApi>, RecordingNotifier, RecordingClipboard>;

/// Controller wired to fresh doubles
pub fn controller(
    api: Arc<ScriptedApi>,
) -> (Arc<TestController>, RecordingNotifier, RecordingClipboard) {
    let notifier = RecordingNotifier::default();
    let clipboard = RecordingClipboard::default();
    let controller = Arc::new(UploadController::new(
        api,
        notifier.clone(),
        clipboard.clone(),
    ));
    (controller, notifier, clipboard)
}

/// A file of `size` bytes
pub fn file(name: &str, media_type: &str, size: usize) -> SelectedFile {
    SelectedFile::new(name, media_type, Bytes::from(vec![0x2a; size]))
}

pub fn descriptor(download_url: &str) -> ContentDescriptor {
    ContentDescriptor {
        name: "stored".into(),
        path: "application/pdf/stored.pdf".into(),
        sha: "3a0f86fb8db8eea7ccbb9a95f325ddbedfb25e15".into(),
        size: 0,
        download_url: download_url.into(),
        html_url: None,
    }
}
