//! The file picked for upload and the names derived from it

use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use std::path::Path;
use thiserror::Error;

/// Fallback media type when none can be determined
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Errors reading a file from disk
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a file name: {0}")]
    InvalidName(String),
}

/// A file held in memory, ready to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    media_type: String,
    content: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: Bytes) -> Self {
        let media_type = media_type.into();
        let media_type = if media_type.trim().is_empty() {
            DEFAULT_MEDIA_TYPE.to_string()
        } else {
            media_type
        };

        Self {
            name: name.into(),
            media_type,
            content,
        }
    }

    /// Read `path` into memory. The media type is `media_type` when given,
    /// otherwise guessed from the extension.
    pub async fn from_path(path: &Path, media_type: Option<&str>) -> Result<Self, FileError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FileError::InvalidName(path.display().to_string()))?
            .to_string();

        let content = tokio::fs::read(path).await.map_err(|source| FileError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let media_type = match media_type {
            Some(t) => t.to_string(),
            None => mime_guess::from_path(path)
                .first_raw()
                .unwrap_or(DEFAULT_MEDIA_TYPE)
                .to_string(),
        };

        tracing::debug!(
            file = %name,
            media_type = %media_type,
            bytes = content.len(),
            "file loaded"
        );

        Ok(Self::new(name, media_type, Bytes::from(content)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Text after the last dot of the name, if any.
    ///
    /// Dotfiles like `.bashrc` and names ending in a dot have none.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext)
    }

    /// A fresh random name keeping the original extension
    pub fn storage_name(&self) -> String {
        let id = uuid::Uuid::new_v4();
        match self.extension() {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        }
    }

    /// Repository path for `storage_name`, namespaced by media type
    pub fn remote_path(&self, storage_name: &str) -> String {
        format!("{}/{}", self.media_type.trim_matches('/'), storage_name)
    }
}

/// Commit message for an upload made at `now`
pub fn commit_message<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y/%m/%d - %H:%M").to_string()
}
