use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Central error type for the sync core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download of {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    // ── Decoding ────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Sync pipeline ───────────────────────────────────
    /// The Java runtime could not be obtained.
    #[error("Runtime provisioning failed: {0}")]
    Provision(String),

    /// A manifest, catalog or descriptor was unreachable.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Archive download, replacement or extraction failed.
    #[error("Modpack sync failed: {0}")]
    Sync(#[source] Box<LauncherError>),

    /// The external loader installer failed.
    #[error("Loader install failed: {0}")]
    Install(String),

    /// Error of an in-flight sync observed by an attached caller.
    #[error(transparent)]
    Shared(Arc<LauncherError>),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn sync(source: LauncherError) -> Self {
        match source {
            already @ LauncherError::Sync(_) => already,
            other => LauncherError::Sync(Box::new(other)),
        }
    }

    /// Status line shown to the UI when a launch attempt is aborted.
    pub fn status_message(&self) -> String {
        match self {
            LauncherError::Shared(inner) => inner.status_message(),
            LauncherError::Provision(_) => format!("Java Setup Failed: {self}"),
            LauncherError::Sync(inner) => format!("Download Failed: {inner}"),
            LauncherError::Install(_) => format!("Loader Install Failed: {self}"),
            other => format!("Error: {other}"),
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
