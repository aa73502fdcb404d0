//! Prepare and train commands

use crate::audit::{self, AuditLog};
use crate::cache::{ModelCache, UrlFetcher};
use crate::cli::args::DetectorArgs;
use crate::config::{Config, ConfigManager};
use crate::detector::{keys, Detector, DetectorConfig, ParamValue, ValidatedConfig};
use crate::error::{TpodError, TpodResult};
use crate::launcher::{JobHandle, TrainingLauncher, JOB_FILE};
use crate::provider::ProviderRegistry;
use crate::ui::{self, TaskSpinner, UiContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// Execute the prepare command
pub async fn prepare(
    args: DetectorArgs,
    config: &Config,
    registry: &ProviderRegistry,
) -> TpodResult<()> {
    let ctx = UiContext::detect();
    let audit = AuditLog::new(config);

    ui::intro(&ctx, &format!("Preparing {}", args.type_id));
    let mut detector = create_detector(&ctx, &args, config, registry, &audit).await?;
    let validated = detector.prepare().await?;
    report_prepared(&ctx, validated);
    log_prepared(&audit, &args.type_id, validated).await;

    ui::outro_success(&ctx, "Detector prepared");
    Ok(())
}

/// Execute the train command
pub async fn train(
    args: DetectorArgs,
    config: &Config,
    registry: &ProviderRegistry,
) -> TpodResult<()> {
    let ctx = UiContext::detect();
    let audit = AuditLog::new(config);
    let launcher = TrainingLauncher::from_config(&config.trainer);

    ui::intro(&ctx, &format!("Training {}", args.type_id));
    let mut detector = create_detector(&ctx, &args, config, registry, &audit).await?;
    let validated = detector.prepare().await?;
    report_prepared(&ctx, validated);
    log_prepared(&audit, &args.type_id, validated).await;

    warn_previous_job(&ctx, detector.output_dir()).await;

    let handle = detector.train(&launcher).await?;
    let job_file = handle.save().await?;

    audit
        .log(
            audit::TRAINING_LAUNCHED,
            &serde_json::json!({
                "type_id": args.type_id,
                "job_id": handle.id,
                "pid": handle.pid,
                "command": handle.command,
                "output_dir": handle.output_dir,
            }),
        )
        .await;

    ui::step_ok_detail(&ctx, "Training launched", &format!("pid {}", handle.pid));
    ui::key_value(&ctx, "Job", &handle.id.to_string());
    ui::key_value(&ctx, "Job file", &job_file.display().to_string());
    ui::remark(&ctx, "The trainer keeps running after tpod exits");
    ui::outro_success(&ctx, "Training started");
    Ok(())
}

/// Point out a job file left by an earlier launch; it is about to be replaced
async fn warn_previous_job(ctx: &UiContext, output_dir: &Path) {
    match JobHandle::load(output_dir).await {
        Ok(Some(previous)) => ui::step_warn_hint(
            ctx,
            &format!(
                "Replacing {} from job {} (pid {})",
                JOB_FILE, previous.id, previous.pid
            ),
            "Stop the earlier trainer first if it is still running",
        ),
        Ok(None) => {}
        Err(e) => warn!("Ignoring unreadable job file in {}: {}", output_dir.display(), e),
    }
}

/// Resolve the provider, collect parameters and make sure the pretrained
/// model is cached
async fn create_detector(
    ctx: &UiContext,
    args: &DetectorArgs,
    config: &Config,
    registry: &ProviderRegistry,
    audit: &AuditLog,
) -> TpodResult<Detector> {
    let provider = registry.create(&args.type_id)?;
    let params = collect_params(args).await?;

    let cache = ModelCache::with_fetcher(
        ConfigManager::cache_dir(config),
        Arc::new(UrlFetcher::with_timeout_secs(
            config.cache.download_timeout_secs,
        )),
    );
    let key = provider.pretrained_model_cache_key();
    let url = provider.pretrained_model_url().to_string();

    if cache.is_cached(&key) {
        debug!("Pretrained model {} already cached", key);
        ui::step_info(ctx, &format!("Using cached pretrained model {}", key));
        return Detector::new(provider, params, &cache).await;
    }

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Fetching pretrained model {}...", key));
    match Detector::new(provider, params, &cache).await {
        Ok(detector) => {
            spinner.stop("Pretrained model cached");
            audit
                .log(
                    audit::CACHE_POPULATED,
                    &serde_json::json!({
                        "key": key,
                        "url": url,
                        "path": detector.cache_entry(),
                    }),
                )
                .await;
            Ok(detector)
        }
        Err(e) => {
            spinner.stop_error("Failed to cache pretrained model");
            Err(e)
        }
    }
}

/// Build the detector config: params file first, then `--param` values,
/// then the two directories
async fn collect_params(args: &DetectorArgs) -> TpodResult<DetectorConfig> {
    let mut params = match &args.params_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .await
                .map_err(|e| TpodError::io(format!("reading {}", path.display()), e))?;
            DetectorConfig::from_json_str(&content).map_err(|e| {
                TpodError::User(format!("Invalid params file {}: {}", path.display(), e))
            })?
        }
        None => DetectorConfig::new(),
    };

    for (key, value) in &args.params {
        params.set(key, ParamValue::parse(value));
    }

    params.set(keys::INPUT_DIR, absolute(&args.input_dir)?.as_path());
    params.set(keys::OUTPUT_DIR, absolute(&args.output_dir)?.as_path());
    Ok(params)
}

fn absolute(path: &Path) -> TpodResult<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| TpodError::io(format!("resolving {}", path.display()), e))
}

fn report_prepared(ctx: &UiContext, validated: &ValidatedConfig) {
    if let Some(num_classes) = validated.num_classes() {
        ui::step_ok_detail(ctx, "Label map read", &format!("{} classes", num_classes));
    }
    if let Ok(path) = validated.pipeline_config_path() {
        ui::step_ok_detail(ctx, "Pipeline config written", &path.display().to_string());
    }
    for (key, value) in validated.params().iter() {
        ui::key_value(ctx, key, &value.to_string());
    }
}

async fn log_prepared(audit: &AuditLog, type_id: &str, validated: &ValidatedConfig) {
    audit
        .log(
            audit::DETECTOR_PREPARED,
            &serde_json::json!({
                "type_id": type_id,
                "params": validated,
            }),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(params: &[(&str, &str)], params_file: Option<PathBuf>) -> DetectorArgs {
        DetectorArgs {
            type_id: "tensorflow_ssd_mobilenet_v2".to_string(),
            input_dir: PathBuf::from("/data/in"),
            output_dir: PathBuf::from("/data/out"),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            params_file,
        }
    }

    #[tokio::test]
    async fn params_are_typed_and_dirs_set() {
        let params = collect_params(&args(&[("batch_size", "8"), ("note", "x")], None))
            .await
            .unwrap();

        assert_eq!(params.get("batch_size"), Some(&ParamValue::Int(8)));
        assert_eq!(params.get("note"), Some(&ParamValue::Text("x".to_string())));
        assert_eq!(
            params.require_path(keys::INPUT_DIR).unwrap(),
            PathBuf::from("/data/in")
        );
    }

    #[tokio::test]
    async fn command_line_overrides_params_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("params.json");
        std::fs::write(&file, r#"{"batch_size": 4, "num_steps": 100, "learning_rate": null}"#)
            .unwrap();

        let params = collect_params(&args(&[("batch_size", "16")], Some(file)))
            .await
            .unwrap();

        assert_eq!(params.get("batch_size"), Some(&ParamValue::Int(16)));
        assert_eq!(params.get("num_steps"), Some(&ParamValue::Int(100)));
        assert!(!params.contains("learning_rate"));
    }

    #[tokio::test]
    async fn invalid_params_file_is_user_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("params.json");
        std::fs::write(&file, "[1, 2]").unwrap();

        let err = collect_params(&args(&[], Some(file))).await.unwrap_err();
        assert!(matches!(err, TpodError::User(msg) if msg.contains("Invalid params file")));
    }
}
