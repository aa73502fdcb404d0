//! Archive fetching
//!
//! The cache downloads through the `ArchiveFetcher` trait so alternative
//! transports (mirrors, test doubles) can be plugged in.

use crate::error::{TpodError, TpodResult};
use async_trait::async_trait;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Fetches a remote archive to a local file
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written
    async fn fetch(&self, url: &str, dest: &Path) -> TpodResult<u64>;
}

/// Fetcher for `http(s)://` and `file://` URLs
///
/// Runs the blocking transfer on tokio's blocking pool.
#[derive(Debug, Clone, Default)]
pub struct UrlFetcher {
    timeout: Option<Duration>,
}

impl UrlFetcher {
    /// Create a fetcher with an overall per-download timeout (`None` = unbounded)
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Build a fetcher from a timeout in seconds where 0 disables the timeout
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }

    fn fetch_blocking(timeout: Option<Duration>, url: &str, dest: &Path) -> TpodResult<u64> {
        if let Some(local) = file_url_path(url) {
            debug!("Copying local archive {}", local.display());
            return std::fs::copy(&local, dest)
                .map_err(|e| TpodError::io(format!("copying {}", local.display()), e));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build()
            .into();

        let mut response = agent
            .get(url)
            .call()
            .map_err(|e| TpodError::Internal(format!("GET {}: {}", url, e)))?;

        let file = File::create(dest)
            .map_err(|e| TpodError::io(format!("creating {}", dest.display()), e))?;
        let mut writer = BufWriter::new(file);
        let mut reader = response.body_mut().as_reader();

        let bytes = io::copy(&mut reader, &mut writer)
            .map_err(|e| TpodError::io(format!("downloading {}", url), e))?;
        writer
            .flush()
            .map_err(|e| TpodError::io(format!("writing {}", dest.display()), e))?;

        Ok(bytes)
    }
}

#[async_trait]
impl ArchiveFetcher for UrlFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> TpodResult<u64> {
        info!("Downloading {}", url);

        let timeout = self.timeout;
        let url_owned = url.to_string();
        let dest_owned = dest.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || {
            Self::fetch_blocking(timeout, &url_owned, &dest_owned)
        })
        .await
        .map_err(|e| TpodError::Internal(format!("download task failed: {}", e)))??;

        info!("Downloaded {} bytes from {}", bytes, url);
        Ok(bytes)
    }
}

/// Local path for a `file://` URL
fn file_url_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix("file://").map(PathBuf::from)
}
