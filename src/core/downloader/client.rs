use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::ProgressSink;

/// Network seam used by every component of the sync core.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the whole body. Non-2xx is an error.
    async fn fetch_bytes(&self, url: &str) -> LauncherResult<Vec<u8>>;

    /// Stream `url` into `dest`, creating parent directories.
    ///
    /// With a `timeout` the whole transfer is cancelled once it elapses.
    /// Returns the number of bytes written.
    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> LauncherResult<u64>;
}

/// Streaming HTTP downloader backed by `reqwest`.
pub struct Downloader {
    client: Client,
    progress: ProgressSink,
}

impl Downloader {
    pub fn new(client: Client, progress: ProgressSink) -> Self {
        Self { client, progress }
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> LauncherResult<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length().unwrap_or_default();
        let task = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // Scoped so the handle is closed before callers rename the file.
        let written = {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            let mut stream = response.bytes_stream();
            let mut written = 0_u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(dest, e))?;
                written = written.saturating_add(chunk.len() as u64);
                self.progress.progress("download", &task, written, total_bytes);
            }
            file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
            written
        };

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }
}

#[async_trait]
impl Transport for Downloader {
    #[instrument(skip(self))]
    async fn fetch_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self))]
    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> LauncherResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream_to_file(url, dest))
                .await
                .map_err(|_| LauncherError::Timeout {
                    url: url.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => self.stream_to_file(url, dest).await,
        }
    }
}

/// Hex SHA-1 of a file, hashed off the async runtime.
pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> LauncherResult<String> {
        use std::io::Read;

        let mut file = std::fs::File::open(&path).map_err(|e| LauncherError::io(&path, e))?;
        let mut hasher = Sha1::new();
        let mut buffer = [0_u8; 8192];
        loop {
            let read = file
                .read(&mut buffer)
                .map_err(|e| LauncherError::io(&path, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
}
