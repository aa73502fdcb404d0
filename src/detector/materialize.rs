//! Training config derivation, validation and rendering

use crate::cache::{checkpoint_exists, locate_checkpoint};
use crate::detector::config::{keys, DetectorConfig, ParamKind, ValidatedConfig};
use crate::detector::label_map;
use crate::error::{TpodError, TpodResult};
use crate::provider::{DetectorProvider, PipelineTemplate};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Fixed file names inside a detector's input directory
pub mod layout {
    pub const PIPELINE_CONFIG: &str = "pipeline.config";
    pub const TRAIN_RECORD: &str = "train.tfrecord";
    pub const EVAL_RECORD: &str = "eval.tfrecord";
    pub const LABEL_MAP: &str = "label_map.pbtxt";
}

/// Derive, check and complete a detector's parameters
///
/// `cache_entry` is the provider's populated pretrained model directory, used
/// when the caller did not pick a `fine_tune_checkpoint` themselves. Supplied
/// values must match the kind of the provider's declaration. This reads the
/// input directory with blocking IO; async callers run it on a blocking thread.
pub fn prepare_config(
    provider: &dyn DetectorProvider,
    mut config: DetectorConfig,
    input_dir: &Path,
    cache_entry: &Path,
) -> TpodResult<ValidatedConfig> {
    let input_dir = absolute(input_dir)?;

    config.set(
        keys::PIPELINE_CONFIG_PATH,
        input_dir.join(layout::PIPELINE_CONFIG).as_path(),
    );
    config.set(
        keys::TRAIN_INPUT_PATH,
        input_dir.join(layout::TRAIN_RECORD).as_path(),
    );
    config.set(
        keys::EVAL_INPUT_PATH,
        input_dir.join(layout::EVAL_RECORD).as_path(),
    );
    let label_map_path = input_dir.join(layout::LABEL_MAP);
    config.set(keys::LABEL_MAP_PATH, label_map_path.as_path());

    let num_classes = label_map::count_labels(&label_map_path)?;
    debug!("Label map {} declares {} classes", label_map_path.display(), num_classes);
    config.set(keys::NUM_CLASSES, num_classes);

    for record in [layout::TRAIN_RECORD, layout::EVAL_RECORD] {
        let path = input_dir.join(record);
        if !path.is_file() {
            return Err(TpodError::InputLayout(path));
        }
    }

    match config.get(keys::FINE_TUNE_CHECKPOINT) {
        Some(_) => {
            let explicit = config.require_path(keys::FINE_TUNE_CHECKPOINT)?;
            if !checkpoint_exists(&explicit) {
                return Err(TpodError::CheckpointNotFound(explicit));
            }
        }
        None => {
            let checkpoint = locate_checkpoint(cache_entry)?;
            debug!("Fine-tuning from {}", checkpoint.display());
            config.set(keys::FINE_TUNE_CHECKPOINT, checkpoint.as_path());
        }
    }

    for parameter in provider.required_parameters() {
        if !config.contains(parameter) {
            return Err(TpodError::MissingRequiredParameter(parameter.to_string()));
        }
        if let Some(kind) = provider.required_parameter_kind(parameter) {
            check_kind(&mut config, parameter, kind)?;
        }
    }

    for (parameter, default) in provider.optional_parameters() {
        let kind = ParamKind::of(&default);
        if config.set_default(parameter, default) {
            debug!("Using default for {}", parameter);
        } else {
            check_kind(&mut config, parameter, kind)?;
        }
    }

    PipelineTemplate::parse(provider.pipeline_config_template())?.check(&config)?;

    Ok(ValidatedConfig::new(config))
}

/// Render the provider template and write it to the config's pipeline path
pub async fn render_pipeline_config(
    provider: &dyn DetectorProvider,
    config: &ValidatedConfig,
) -> TpodResult<PathBuf> {
    let template = PipelineTemplate::parse(provider.pipeline_config_template())?;
    let rendered = template.render(config.params())?;

    let path = config.pipeline_config_path()?;
    fs::write(&path, rendered)
        .await
        .map_err(|e| TpodError::io(format!("writing pipeline config {}", path.display()), e))?;

    info!("Wrote pipeline config {}", path.display());
    Ok(path)
}

/// Replace a supplied value with its coerced form, or reject it
fn check_kind(config: &mut DetectorConfig, key: &str, kind: ParamKind) -> TpodResult<()> {
    let Some(value) = config.get(key) else {
        return Ok(());
    };
    let coerced = kind
        .coerce(value)
        .ok_or_else(|| TpodError::InvalidParameter {
            key: key.to_string(),
            expected: kind.to_string(),
            value: value.to_string(),
        })?;
    config.set(key, coerced);
    Ok(())
}

fn absolute(path: &Path) -> TpodResult<PathBuf> {
    if !path.is_dir() {
        return Err(TpodError::InputLayout(path.to_path_buf()));
    }
    path.canonicalize()
        .map_err(|e| TpodError::io(format!("resolving {}", path.display()), e))
}
