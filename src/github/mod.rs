//! GitHub Contents API client
//!
//! Creates a file in a repository with a single `PUT /repos/{owner}/{repo}/contents/{path}`
//! request and returns the content descriptor, including the public download URL.
//!
//! # Example
//!
//! ```no_run
//! use repodrop::github::{ContentsApi, ContentsClient, PutContentsRequest, ignore_progress};
//! use repodrop::config::Config;
//! use bytes::Bytes;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let client = ContentsClient::new(&config.github, config.upload.chunk_size)?;
//!
//! let request = PutContentsRequest {
//!     path: "text/plain/hello.txt".to_string(),
//!     message: "2024/05/01 - 09:30".to_string(),
//!     content: Bytes::from("Hello, World!"),
//! };
//! let descriptor = client
//!     .put_contents(request, ignore_progress(), CancellationToken::new())
//!     .await?;
//! println!("{}", descriptor.download_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Failure classification
//!
//! | Response | Error |
//! |----------|-------|
//! | 400, 413, 422 | [`ContentsError::PayloadTooLarge`] |
//! | any other non-2xx, transport failure, malformed body | [`ContentsError::Failed`] |
//! | token cancelled before completion | [`ContentsError::Cancelled`] |

pub mod progress;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::GitHubConfig;

pub use progress::{ignore_progress, ProgressFn, TransferProgress};

const API_VERSION: &str = "2022-11-28";
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Contents API errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentsError {
    /// The service refused the payload; used as the oversized-file signal
    #[error("GitHub rejected the upload (status {status}); the file is likely too large")]
    PayloadTooLarge { status: u16 },

    #[error("{message}")]
    Failed { message: String },

    #[error("Upload cancelled")]
    Cancelled,
}

impl ContentsError {
    fn failed(message: impl Into<String>) -> Self {
        ContentsError::Failed {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::BAD_REQUEST
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::UNPROCESSABLE_ENTITY => ContentsError::PayloadTooLarge {
                status: status.as_u16(),
            },
            _ => {
                let detail = serde_json::from_str::<ApiErrorBody>(body)
                    .map(|b| b.message)
                    .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
                ContentsError::failed(format!(
                    "Request failed with status code {}: {}",
                    status.as_u16(),
                    detail
                ))
            }
        }
    }
}

/// A file write request
#[derive(Debug, Clone)]
pub struct PutContentsRequest {
    /// Repository path, `/`-separated, without a leading slash
    pub path: String,
    /// Commit message
    pub message: String,
    /// Raw file content; base64-encoded by the client
    pub content: Bytes,
}

/// Metadata GitHub returns for the written file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    pub download_url: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: Option<RawDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    sha: String,
    #[serde(default)]
    size: u64,
    download_url: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Remote write operation used by the upload controller
#[async_trait]
pub trait ContentsApi: Send + Sync {
    /// Write `request.content` to `request.path`.
    ///
    /// `progress` is called as the body is transmitted. When `cancel` fires
    /// the request is aborted and [`ContentsError::Cancelled`] is returned.
    async fn put_contents(
        &self,
        request: PutContentsRequest,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<ContentDescriptor, ContentsError>;
}

#[async_trait]
impl<T: ContentsApi + ?Sized> ContentsApi for std::sync::Arc<T> {
    async fn put_contents(
        &self,
        request: PutContentsRequest,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<ContentDescriptor, ContentsError> {
        (**self).put_contents(request, progress, cancel).await
    }
}

/// Encode the JSON request body; content is base64 (standard alphabet, padded)
pub fn encode_body(
    message: &str,
    content: &[u8],
    branch: Option<&str>,
) -> Result<Bytes, serde_json::Error> {
    let body = PutContentsBody {
        message,
        content: base64::engine::general_purpose::STANDARD.encode(content),
        branch,
    };
    serde_json::to_vec(&body).map(Bytes::from)
}

/// reqwest-backed Contents API client
#[derive(Debug, Clone)]
pub struct ContentsClient {
    config: GitHubConfig,
    chunk_size: usize,
    http_client: reqwest::Client,
}

impl ContentsClient {
    /// Create a new client
    pub fn new(config: &GitHubConfig, chunk_size: usize) -> Result<Self, ContentsError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ContentsError::failed(e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            chunk_size,
            http_client,
        })
    }

    /// Repository owner
    pub fn owner(&self) -> &str {
        &self.config.owner
    }

    /// Repository name
    pub fn repository(&self) -> &str {
        &self.config.repository
    }

    /// Full URL of the contents endpoint for `path`
    pub fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            utf8_percent_encode(&self.config.owner, SEGMENT),
            utf8_percent_encode(&self.config.repository, SEGMENT),
            encoded.join("/")
        )
    }

    async fn send(
        &self,
        request: PutContentsRequest,
        progress: ProgressFn,
    ) -> Result<ContentDescriptor, ContentsError> {
        let url = self.contents_url(&request.path);
        let body = encode_body(
            &request.message,
            &request.content,
            self.config.branch.as_deref(),
        )
        .map_err(|e| ContentsError::failed(e.to_string()))?;
        let total = body.len();

        let stream = progress::progress_stream(body, self.chunk_size, progress);

        let response = self
            .http_client
            .put(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(ACCEPT, GITHUB_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| ContentsError::failed(e.to_string()))?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        let text = response
            .text()
            .await
            .map_err(|e| ContentsError::failed(e.to_string()))?;

        if !status.is_success() {
            return Err(ContentsError::from_status(status, &text));
        }

        parse_descriptor(&text)
    }
}

/// Extract the descriptor from a successful response body
pub fn parse_descriptor(text: &str) -> Result<ContentDescriptor, ContentsError> {
    let parsed: PutContentsResponse = serde_json::from_str(text)
        .map_err(|e| ContentsError::failed(format!("Malformed response: {}", e)))?;

    let raw = parsed
        .content
        .ok_or_else(|| ContentsError::failed("Malformed response: missing content"))?;

    let download_url = raw
        .download_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ContentsError::failed("Malformed response: missing download_url"))?;

    Ok(ContentDescriptor {
        name: raw.name,
        path: raw.path,
        sha: raw.sha,
        size: raw.size,
        download_url,
        html_url: raw.html_url,
    })
}

#[async_trait]
impl ContentsApi for ContentsClient {
    #[tracing::instrument(
        name = "github.put_contents",
        skip(self, request, progress, cancel),
        fields(
            github.owner = %self.config.owner,
            github.repo = %self.config.repository,
            github.path = %request.path,
            http.method = "PUT",
            upload.bytes = request.content.len(),
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn put_contents(
        &self,
        request: PutContentsRequest,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<ContentDescriptor, ContentsError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("request aborted by cancellation");
                Err(ContentsError::Cancelled)
            }
            result = self.send(request, progress) => result,
        }
    }
}
