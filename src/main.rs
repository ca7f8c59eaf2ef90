//! Repodrop - upload a file to a GitHub repository and get a download link
//!
//! Ctrl-C cancels an upload in progress.

use anyhow::Context;
use clap::Parser;
use repodrop::config::Config;
use repodrop::github::ContentsClient;
use repodrop::logging;
use repodrop::metrics;
#[cfg(feature = "clipboard")]
use repodrop::notify::SystemClipboard;
use repodrop::notify::{Clipboard, ConsoleNotifier, NotificationStyle, StdoutClipboard};
use repodrop::upload::{
    oversized_guidance, SelectedFile, UploadController, UploadOutcome, UploadStatus,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const EXIT_FAILED: u8 = 1;
const EXIT_OVERSIZED: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

/// Repodrop - upload a file to GitHub and print its public download link
#[derive(Parser, Debug)]
#[command(name = "repodrop")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to upload
    file: PathBuf,

    /// Path to configuration file (defaults to REPODROP_* environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Media type to record instead of guessing from the extension
    #[arg(long)]
    media_type: Option<String>,

    /// Print the link instead of copying it to the clipboard
    #[arg(long)]
    no_clipboard: bool,

    /// Print Prometheus metrics on exit
    #[arg(long)]
    print_metrics: bool,
}

/// Clipboard to use, and whether the link still needs printing
#[cfg(feature = "clipboard")]
fn clipboard(no_clipboard: bool, hold: Duration) -> (Arc<dyn Clipboard>, bool) {
    if no_clipboard {
        (Arc::new(StdoutClipboard), false)
    } else {
        (Arc::new(SystemClipboard::new(hold)), true)
    }
}

#[cfg(not(feature = "clipboard"))]
fn clipboard(_no_clipboard: bool, _hold: Duration) -> (Arc<dyn Clipboard>, bool) {
    (Arc::new(StdoutClipboard), false)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => Some(
            Config::load(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        ),
        None => None,
    };

    let mut logging_config = file_config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        logging_config.level = level.clone();
    }
    logging_config.json |= args.json_logs;
    logging::init_logging(&logging_config)?;

    info!("Starting Repodrop v{}", env!("CARGO_PKG_VERSION"));

    let config = match file_config {
        Some(config) => config,
        None => Config::from_env().context("Invalid environment configuration")?,
    };

    let client = ContentsClient::new(&config.github, config.upload.chunk_size)?;
    let (clipboard, echo_link) = clipboard(
        args.no_clipboard,
        config.notifications.clipboard_hold(),
    );
    let controller = Arc::new(
        UploadController::new(client, ConsoleNotifier, Arc::clone(&clipboard))
            .with_style(NotificationStyle::new(config.notifications.clone())),
    );

    let file = SelectedFile::from_path(&args.file, args.media_type.as_deref()).await?;
    controller.select_file(file)?;

    let render = tokio::spawn(render_progress(controller.subscribe()));

    let canceller = Arc::clone(&controller);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Err(e) = canceller.cancel() {
                debug!(error = %e, "nothing to cancel");
            }
        }
    });

    let outcome = controller.start_upload().await?;
    ctrl_c.abort();
    render.abort();
    eprintln!();

    let code = match outcome {
        UploadOutcome::Completed { download_url } => match controller.copy_and_done() {
            Ok(url) => {
                if echo_link {
                    println!("{}", url);
                }
                let held = tokio::task::spawn_blocking(move || clipboard.persist()).await?;
                if let Err(e) = held {
                    warn!(error = %e, "clipboard selection not kept after exit");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                warn!(error = %e, "falling back to printing the link");
                println!("{}", download_url);
                ExitCode::SUCCESS
            }
        },
        UploadOutcome::Oversized => {
            eprintln!("{}", oversized_guidance(config.upload.size_limit_mb));
            controller.try_again()?;
            ExitCode::from(EXIT_OVERSIZED)
        }
        UploadOutcome::Failed { .. } => ExitCode::from(EXIT_FAILED),
        UploadOutcome::Cancelled => {
            eprintln!("Upload cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
    };

    if args.print_metrics {
        print!("{}", metrics::render());
    }

    Ok(code)
}

async fn render_progress(mut updates: tokio::sync::watch::Receiver<repodrop::upload::Snapshot>) {
    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        if let UploadStatus::Uploading { progress } = snapshot.status {
            let name = snapshot.file_name.unwrap_or_default();
            eprint!("\r\x1b[2KUploading {} {:>3}%", name, progress);
            let _ = std::io::stderr().flush();
        }
    }
}
