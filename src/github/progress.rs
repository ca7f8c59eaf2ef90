//! Upload progress reporting
//!
//! The request body is sliced into fixed-size chunks and handed to the
//! transport as a stream. Each chunk pulled by the transport produces one
//! [`TransferProgress`] report, so reports are non-decreasing and the last
//! one always has `loaded == total`.

use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;

/// Bytes handed to the transport so far, out of the full body size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: u64,
}

impl TransferProgress {
    /// Whole percentage, rounded to nearest, clamped to 0..=100.
    ///
    /// An empty body counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let loaded = self.loaded.min(self.total) as u128;
        let total = self.total as u128;
        ((loaded * 100 + total / 2) / total) as u8
    }
}

/// Callback invoked for every progress report
pub type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// A progress callback that discards every report
pub fn ignore_progress() -> ProgressFn {
    Arc::new(|_| {})
}

/// Split `body` into `chunk_size` slices, reporting progress as each slice
/// is pulled. Slices share the original buffer.
pub fn progress_stream(
    body: Bytes,
    chunk_size: usize,
    progress: ProgressFn,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = body.len() as u64;
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..body.len())
        .step_by(chunk_size)
        .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
        .collect();

    let mut loaded = 0u64;
    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        loaded += chunk.len() as u64;
        progress(TransferProgress { loaded, total });
        Ok(chunk)
    }))
}
