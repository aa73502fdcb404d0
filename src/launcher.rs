//! Training process launcher
//!
//! The external trainer runs as its own OS process. The launcher starts it and
//! returns immediately with a [`JobHandle`]; watching or stopping the process
//! is up to whoever holds the handle.

use crate::config::schema::TrainerConfig;
use crate::detector::config::ValidatedConfig;
use crate::error::{TpodError, TpodResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::info;
use uuid::Uuid;

/// Flag asking the trainer to mirror its logs to stderr
pub const VERBOSE_LOGGING_FLAG: &str = "--alsologtostderr";

/// Name of the handle file written into the output directory
pub const JOB_FILE: &str = "job.json";

/// A launched training process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Unique job ID
    pub id: Uuid,

    /// OS process identifier
    pub pid: u32,

    /// Full argv the process was started with
    pub command: Vec<String>,

    /// Where the trainer writes checkpoints
    pub output_dir: PathBuf,

    /// When the process was started
    pub launched_at: DateTime<Utc>,
}

impl JobHandle {
    /// Write the handle to `<output_dir>/job.json`
    pub async fn save(&self) -> TpodResult<PathBuf> {
        fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            TpodError::io(format!("creating {}", self.output_dir.display()), e)
        })?;

        let path = self.output_dir.join(JOB_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .await
            .map_err(|e| TpodError::io(format!("writing job file {}", path.display()), e))?;
        Ok(path)
    }

    /// Read the handle written by a previous launch, if any
    pub async fn load(output_dir: &Path) -> TpodResult<Option<Self>> {
        let path = output_dir.join(JOB_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| TpodError::io(format!("reading job file {}", path.display()), e))?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Starts the external training entry point
#[derive(Debug, Clone)]
pub struct TrainingLauncher {
    program: String,
    args: Vec<String>,
}

impl TrainingLauncher {
    /// Create a launcher for `program` with leading `args`
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Create a launcher from the `[trainer]` config section
    pub fn from_config(config: &TrainerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// The argv that would be executed for a job
    pub fn command(&self, pipeline_config_path: &Path, output_dir: &Path) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 4);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push(format!(
            "--pipeline_config_path={}",
            pipeline_config_path.display()
        ));
        argv.push(format!("--model_dir={}", output_dir.display()));
        argv.push(VERBOSE_LOGGING_FLAG.to_string());
        argv
    }

    /// Spawn the trainer for a validated config and return without waiting
    ///
    /// Must run inside a tokio runtime, which reaps the child once it exits.
    pub async fn launch(
        &self,
        config: &ValidatedConfig,
        output_dir: &Path,
    ) -> TpodResult<JobHandle> {
        let pipeline_config_path = config.pipeline_config_path()?;
        fs::create_dir_all(output_dir)
            .await
            .map_err(|e| TpodError::io(format!("creating {}", output_dir.display()), e))?;
        let argv = self.command(&pipeline_config_path, output_dir);
        let command_line = argv.join(" ");

        info!("Launching training process: {}", command_line);

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);

        // Own process group so signals aimed at the caller don't reach it
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| TpodError::LaunchFailure {
            command: command_line.clone(),
            source: e,
        })?;

        let pid = child.id().ok_or_else(|| TpodError::LaunchFailure {
            command: command_line,
            source: std::io::Error::other("process exited before its id was read"),
        })?;

        info!("Training process started with pid {}", pid);

        Ok(JobHandle {
            id: Uuid::new_v4(),
            pid,
            command: argv,
            output_dir: output_dir.to_path_buf(),
            launched_at: Utc::now(),
        })
    }
}

impl Default for TrainingLauncher {
    fn default() -> Self {
        Self::from_config(&TrainerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::config::{keys, DetectorConfig};
    use tempfile::TempDir;

    fn validated(pipeline: &Path) -> ValidatedConfig {
        let mut config = DetectorConfig::new();
        config.set(keys::PIPELINE_CONFIG_PATH, pipeline);
        ValidatedConfig::new(config)
    }

    #[test]
    fn command_includes_paths_and_flag() {
        let launcher = TrainingLauncher::default();
        let argv = launcher.command(Path::new("/a/pipeline.config"), Path::new("/a/out"));

        assert_eq!(argv[0], "python");
        assert!(argv.contains(&"--pipeline_config_path=/a/pipeline.config".to_string()));
        assert!(argv.contains(&"--model_dir=/a/out".to_string()));
        assert_eq!(argv.last().unwrap(), VERBOSE_LOGGING_FLAG);
    }

    #[test]
    fn command_uses_configured_entry_point() {
        let launcher = TrainingLauncher::new("/opt/train", vec!["--tf1".to_string()]);
        let argv = launcher.command(Path::new("/p.config"), Path::new("/out"));
        assert_eq!(
            argv,
            vec![
                "/opt/train",
                "--tf1",
                "--pipeline_config_path=/p.config",
                "--model_dir=/out",
                "--alsologtostderr"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launch_returns_pid() {
        let dir = TempDir::new().unwrap();
        let launcher = TrainingLauncher::new("true", vec![]);
        let config = validated(&dir.path().join("pipeline.config"));

        let out = dir.path().join("out");
        let handle = launcher.launch(&config, &out).await.unwrap();
        assert!(handle.pid > 0);
        assert_eq!(handle.command[0], "true");
        assert!(out.is_dir());
    }

    #[tokio::test]
    async fn missing_program_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let launcher = TrainingLauncher::new("/nonexistent/tpod-trainer", vec![]);
        let config = validated(&dir.path().join("pipeline.config"));

        let err = launcher.launch(&config, dir.path()).await.unwrap_err();
        match err {
            TpodError::LaunchFailure { command, .. } => {
                assert!(command.starts_with("/nonexistent/tpod-trainer"))
            }
            other => panic!("expected LaunchFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handle_save_and_load() {
        let dir = TempDir::new().unwrap();
        let handle = JobHandle {
            id: Uuid::new_v4(),
            pid: 4242,
            command: vec!["python".to_string()],
            output_dir: dir.path().join("out"),
            launched_at: Utc::now(),
        };

        let path = handle.save().await.unwrap();
        assert!(path.ends_with(JOB_FILE));

        let loaded = JobHandle::load(&dir.path().join("out")).await.unwrap();
        assert_eq!(loaded, Some(handle));
        assert!(JobHandle::load(dir.path()).await.unwrap().is_none());
    }
}
