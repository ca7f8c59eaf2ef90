//! Repodrop Library
//!
//! Upload a local file to a GitHub repository through the Contents API and
//! hand back a public download link.
//!
//! # Features
//!
//! - **Single request**: content is base64-encoded and written with one `PUT`
//! - **Progress**: whole-percent progress reported while the body is sent
//! - **Cancellation**: per-attempt handles; late responses are discarded
//! - **Namespaced paths**: files land under `<media type>/<uuid>.<ext>`
//!
//! # Example
//!
//! ```no_run
//! use repodrop::config::Config;
//! use repodrop::github::ContentsClient;
//! use repodrop::notify::{StdoutClipboard, TracingNotifier};
//! use repodrop::upload::{SelectedFile, UploadController, UploadOutcome};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = ContentsClient::new(&config.github, config.upload.chunk_size)?;
//!     let controller = UploadController::new(client, TracingNotifier, StdoutClipboard);
//!
//!     controller.select_file(SelectedFile::from_path(Path::new("report.pdf"), None).await?)?;
//!     if let UploadOutcome::Completed { .. } = controller.start_upload().await? {
//!         controller.copy_and_done()?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod github;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use upload::UploadController;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
