// In-memory transport and archive builders shared by unit tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::downloader::Transport;
use crate::core::error::{LauncherError, LauncherResult};

/// How a registered URL answers.
#[derive(Clone)]
enum Route {
    Body(Vec<u8>),
    /// Writes the bytes, then fails as if the connection dropped.
    Truncated(Vec<u8>),
    /// Never answers.
    Stalled,
    /// Panics on the first request, then serves the body.
    PanicOnce(Vec<u8>),
}

/// Serves registered URLs from memory and records every request.
///
/// Lookups ignore the query string so cache-busted URLs still match.
/// `download_to` honours its timeout the way `Downloader` does.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
    timeouts: Mutex<Vec<Option<Duration>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }

    pub fn route(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.set(url, Route::Body(body.into()));
    }

    pub fn route_truncated(&self, url: &str, partial: impl Into<Vec<u8>>) {
        self.set(url, Route::Truncated(partial.into()));
    }

    pub fn route_stalled(&self, url: &str) {
        self.set(url, Route::Stalled);
    }

    pub fn route_panic_once(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.set(url, Route::PanicOnce(body.into()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|requested| strip_query(requested) == url)
            .count()
    }

    /// Timeouts passed to `download_to`, in call order.
    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.timeouts.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> LauncherResult<Route> {
        self.requests.lock().unwrap().push(url.to_string());
        let key = strip_query(url);
        let route = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes.get(key).cloned();
            if let Some(Route::PanicOnce(body)) = &route {
                routes.insert(key.to_string(), Route::Body(body.clone()));
            }
            route
        };
        match route {
            // Locks are released above so the panic does not poison them.
            Some(Route::PanicOnce(_)) => panic!("transport failure serving {url}"),
            Some(route) => Ok(route),
            None => Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn serve(&self, url: &str, dest: Option<&Path>) -> LauncherResult<Vec<u8>> {
        tokio::task::yield_now().await;
        let (body, complete) = match self.lookup(url)? {
            Route::Body(body) => (body, true),
            Route::Truncated(partial) => (partial, false),
            Route::Stalled => std::future::pending().await,
            Route::PanicOnce(_) => unreachable!("converted by lookup"),
        };
        if let Some(dest) = dest {
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(dest, &body).await?;
        }
        if !complete {
            return Err(LauncherError::Other(format!(
                "connection reset while reading {url}"
            )));
        }
        Ok(body)
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        self.serve(url, None).await
    }

    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> LauncherResult<u64> {
        self.timeouts.lock().unwrap().push(timeout);
        let transfer = self.serve(url, Some(dest));
        let body = match timeout {
            Some(limit) => tokio::time::timeout(limit, transfer).await.map_err(|_| {
                LauncherError::Timeout {
                    url: url.to_string(),
                    secs: limit.as_secs(),
                }
            })??,
            None => transfer.await?,
        };
        Ok(body.len() as u64)
    }
}

/// Build an in-memory zip with the given `(path, contents)` entries.
/// Paths ending in `/` become directories.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Build an in-memory gzip tarball with the given `(path, contents)` files.
pub fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *contents).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
