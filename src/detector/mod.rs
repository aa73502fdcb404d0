//! Detector instances
//!
//! A [`Detector`] pairs a provider with one detector's parameters and moves
//! through `Created -> Prepared -> Launched`:
//!
//! - `Created`: constructed; the provider's pretrained model is cached
//! - `Prepared`: config validated and pipeline config written
//! - `Launched`: trainer process started
//!
//! Whether training later succeeds is decided by whoever watches the process.

pub mod config;
pub mod label_map;
pub mod materialize;

pub use config::{keys, DetectorConfig, ParamKind, ParamValue, ValidatedConfig};
pub use materialize::{layout, prepare_config, render_pipeline_config};

use crate::cache::ModelCache;
use crate::error::{TpodError, TpodResult};
use crate::launcher::{JobHandle, TrainingLauncher};
use crate::provider::DetectorProvider;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Lifecycle stage of a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Created,
    Prepared,
    Launched,
}

impl DetectorState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Prepared => "prepared",
            Self::Launched => "launched",
        }
    }
}

impl fmt::Display for DetectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One detector being prepared and trained by a provider
///
/// Mutating steps take `&mut self`, so one instance can never prepare twice
/// concurrently or train while it is still being prepared.
pub struct Detector {
    provider: Arc<dyn DetectorProvider>,
    config: DetectorConfig,
    input_dir: PathBuf,
    output_dir: PathBuf,
    cache_entry: PathBuf,
    validated: Option<ValidatedConfig>,
    state: DetectorState,
}

impl Detector {
    /// Create a detector, caching the provider's pretrained model if needed
    ///
    /// `config` must carry `input_dir` and `output_dir`.
    pub async fn new(
        provider: Arc<dyn DetectorProvider>,
        config: DetectorConfig,
        cache: &ModelCache,
    ) -> TpodResult<Self> {
        let input_dir = config.require_path(keys::INPUT_DIR)?;
        let output_dir = config.require_path(keys::OUTPUT_DIR)?;

        let cache_entry = cache
            .ensure_cached(
                &provider.pretrained_model_cache_key(),
                provider.pretrained_model_url(),
            )
            .await?;

        Ok(Self {
            provider,
            config,
            input_dir,
            output_dir,
            cache_entry,
            validated: None,
            state: DetectorState::Created,
        })
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The provider's pretrained model directory
    pub fn cache_entry(&self) -> &Path {
        &self.cache_entry
    }

    /// The validated config once prepared
    pub fn validated_config(&self) -> Option<&ValidatedConfig> {
        self.validated.as_ref()
    }

    /// Validate parameters and write the pipeline config
    ///
    /// A failed attempt drops any earlier result, so `train` needs another
    /// successful `prepare` first.
    pub async fn prepare(&mut self) -> TpodResult<&ValidatedConfig> {
        if self.state == DetectorState::Launched {
            return Err(TpodError::InvalidState {
                current: self.state.as_str(),
                action: "prepare",
            });
        }

        self.validated = None;
        self.state = DetectorState::Created;

        let provider = Arc::clone(&self.provider);
        let config = self.config.clone();
        let input_dir = self.input_dir.clone();
        let cache_entry = self.cache_entry.clone();
        let validated = tokio::task::spawn_blocking(move || {
            prepare_config(&*provider, config, &input_dir, &cache_entry)
        })
        .await
        .map_err(|e| TpodError::Internal(format!("prepare task failed: {}", e)))??;
        render_pipeline_config(&*self.provider, &validated).await?;

        self.state = DetectorState::Prepared;
        info!(
            "Prepared {} detector in {}",
            self.provider.name(),
            self.input_dir.display()
        );
        Ok(self.validated.insert(validated))
    }

    /// Start the trainer; requires a successful `prepare`
    pub async fn train(&mut self, launcher: &TrainingLauncher) -> TpodResult<JobHandle> {
        let validated = match (&self.validated, self.state) {
            (Some(v), DetectorState::Prepared) => v,
            _ => {
                return Err(TpodError::InvalidState {
                    current: self.state.as_str(),
                    action: "train",
                })
            }
        };

        let handle = launcher.launch(validated, &self.output_dir).await?;
        self.state = DetectorState::Launched;
        Ok(handle)
    }
}
