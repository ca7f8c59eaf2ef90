//! Upload module
//!
//! The file being uploaded, per-attempt cancellation, and the lifecycle
//! controller that ties them to the Contents API.

pub mod cancel;
pub mod controller;
pub mod file;

pub use cancel::CancelHandle;
pub use controller::{
    Action, ControllerError, Snapshot, UploadController, UploadOutcome, UploadStatus,
};
pub use file::{commit_message, FileError, SelectedFile, DEFAULT_MEDIA_TYPE};

/// Message shown while in the oversized-error state
pub fn oversized_guidance(size_limit_mb: u64) -> String {
    format!(
        "That's a big file. Try again with a file smaller than {}MB.",
        size_limit_mb
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_guidance() {
        assert_eq!(
            oversized_guidance(25),
            "That's a big file. Try again with a file smaller than 25MB."
        );
    }
}
