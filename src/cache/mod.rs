//! Pretrained model cache
//!
//! Keeps downloaded and extracted pretrained model archives on disk, one
//! directory per cache key, shared by every detector of a provider type.
//!
//! # Entry States
//!
//! | State | On disk | Description |
//! |-------|---------|-------------|
//! | Absent | nothing | Not yet populated |
//! | Downloading | `.<key>.partial-<id>` | Hidden staging dir, never reported as present |
//! | Present | `<key>/` | Fully extracted, reused without re-checking |
//!
//! Entries never expire. Removal is manual (`tpod cache clear`).

pub mod archive;
pub mod checkpoint;
pub mod fetch;
pub mod store;

pub use checkpoint::{checkpoint_exists, locate_checkpoint, CHECKPOINT_PREFIX};
pub use fetch::{ArchiveFetcher, UrlFetcher};
pub use store::{CacheEntry, EntryMetadata, ModelCache, ENTRY_METADATA_FILE};
