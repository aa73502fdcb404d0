//! On-disk pretrained model cache
//!
//! One directory per cache key under a single root. A key's directory only
//! appears once its archive has been fully downloaded and extracted: work
//! happens in a hidden staging directory that is renamed into place at the end.

use crate::cache::archive::{extract_tarball, sha256_file};
use crate::cache::fetch::{ArchiveFetcher, UrlFetcher};
use crate::error::{TpodError, TpodResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Metadata file written into every populated entry
pub const ENTRY_METADATA_FILE: &str = ".tpod-entry.json";

/// Informational record of how an entry was populated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Archive URL the entry was populated from
    pub source_url: String,

    /// SHA256 of the downloaded archive
    pub sha256: String,

    /// Archive size in bytes
    pub archive_bytes: u64,

    /// When population finished
    pub populated_at: DateTime<Utc>,
}

/// A present cache entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    /// Missing for entries populated by hand
    pub metadata: Option<EntryMetadata>,
}

/// Pretrained model cache with single-flight population per key
pub struct ModelCache {
    root: PathBuf,
    fetcher: Arc<dyn ArchiveFetcher>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ModelCache {
    /// Create a cache rooted at `root` using the default URL fetcher
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fetcher(root, Arc::new(UrlFetcher::default()))
    }

    /// Create a cache with a custom fetcher
    pub fn with_fetcher(root: impl Into<PathBuf>, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an entry lives at (present or not)
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Whether the entry for `key` is present
    pub fn is_cached(&self, key: &str) -> bool {
        self.entry_path(key).is_dir()
    }

    /// Ensure the entry for `key` exists, populating it from `url` if absent
    ///
    /// A present entry is returned as-is with no network access. Concurrent
    /// calls for the same key perform a single download; the others wait and
    /// reuse its result. Calls for different keys do not block each other.
    pub async fn ensure_cached(&self, key: &str, url: &str) -> TpodResult<PathBuf> {
        validate_key(key)?;
        let entry = self.entry_path(key);

        if entry.is_dir() {
            debug!("Cache hit: {}", key);
            return Ok(entry);
        }

        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        // Another caller may have populated it while we waited
        if entry.is_dir() {
            debug!("Cache populated by concurrent caller: {}", key);
            return Ok(entry);
        }

        info!("Caching pretrained model {} from {}", key, url);
        match self.populate(key, url, &entry).await {
            Ok(()) => {
                info!("Cached {} at {}", key, entry.display());
                Ok(entry)
            }
            Err(e @ TpodError::CacheDownloadFailure { .. }) => Err(e),
            Err(e) => Err(TpodError::download(key, url, e.to_string())),
        }
    }

    async fn populate(&self, key: &str, url: &str, entry: &Path) -> TpodResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            TpodError::io(format!("creating cache root {}", self.root.display()), e)
        })?;

        let token = Uuid::new_v4().simple().to_string();
        let staging = self.root.join(format!(".{}.partial-{}", key, token));
        let archive = self.root.join(format!(".{}.download-{}", key, token));

        let result = self.populate_staging(url, &staging, &archive).await;

        if let Err(e) = fs::remove_file(&archive).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", archive.display(), e);
            }
        }

        let result = match result {
            Ok(()) => promote(&staging, entry).await,
            Err(e) => Err(e),
        };

        if result.is_err() || staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", staging.display(), e);
                }
            }
        }

        result
    }

    async fn populate_staging(&self, url: &str, staging: &Path, archive: &Path) -> TpodResult<()> {
        fs::create_dir_all(staging)
            .await
            .map_err(|e| TpodError::io(format!("creating {}", staging.display()), e))?;

        let archive_bytes = self.fetcher.fetch(url, archive).await?;

        let archive_owned = archive.to_path_buf();
        let staging_owned = staging.to_path_buf();
        let sha256 = tokio::task::spawn_blocking(move || {
            let sha256 = sha256_file(&archive_owned)?;
            extract_tarball(&archive_owned, &staging_owned)?;
            Ok::<_, TpodError>(sha256)
        })
        .await
        .map_err(|e| TpodError::Internal(format!("extract task failed: {}", e)))??;

        let metadata = EntryMetadata {
            source_url: url.to_string(),
            sha256,
            archive_bytes,
            populated_at: Utc::now(),
        };
        let metadata_path = staging.join(ENTRY_METADATA_FILE);
        fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
            .await
            .map_err(|e| TpodError::io(format!("writing {}", metadata_path.display()), e))?;

        Ok(())
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.entry(key.to_string()).or_default().clone()
    }

    /// List present entries sorted by key
    pub async fn list_entries(&self) -> TpodResult<Vec<CacheEntry>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut entries = vec![];
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| TpodError::io("reading cache directory", e))?;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| TpodError::io("reading cache entry", e))?
        {
            let path = item.path();
            let Some(key) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            // Staging and download leftovers are hidden
            if key.starts_with('.') || !path.is_dir() {
                continue;
            }

            let metadata = fs::read_to_string(path.join(ENTRY_METADATA_FILE))
                .await
                .ok()
                .and_then(|content| serde_json::from_str(&content).ok());

            entries.push(CacheEntry {
                key,
                path,
                metadata,
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Remove one entry, returning whether it existed
    pub async fn remove(&self, key: &str) -> TpodResult<bool> {
        validate_key(key)?;
        let entry = self.entry_path(key);
        if !entry.exists() {
            return Ok(false);
        }

        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        fs::remove_dir_all(&entry)
            .await
            .map_err(|e| TpodError::io(format!("removing {}", entry.display()), e))?;
        info!("Removed cache entry {}", key);
        Ok(true)
    }

    /// Remove every entry, returning how many were removed
    pub async fn clear(&self) -> TpodResult<usize> {
        let mut removed = 0;
        for entry in self.list_entries().await? {
            if self.remove(&entry.key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Move a finished staging directory into place
///
/// If another process won the race the staging copy is discarded.
async fn promote(staging: &Path, entry: &Path) -> TpodResult<()> {
    match fs::rename(staging, entry).await {
        Ok(()) => Ok(()),
        Err(_) if entry.is_dir() => {
            debug!("Entry {} appeared during population, keeping it", entry.display());
            Ok(())
        }
        Err(e) => Err(TpodError::io(
            format!("moving {} into place", entry.display()),
            e,
        )),
    }
}

fn validate_key(key: &str) -> TpodResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(TpodError::Internal(format!("invalid cache key: {:?}", key)))
    }
}
