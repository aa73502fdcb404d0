//! Integration tests for tpod

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::ffi::OsStr;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use tpod::config::Config;

    fn tpod() -> Command {
        cargo_bin_cmd!("tpod")
    }

    /// Config file, cache root with a hand-populated entry, and an input dir
    struct Workspace {
        dir: TempDir,
        config: PathBuf,
        input: PathBuf,
        output: PathBuf,
    }

    impl Workspace {
        fn new(trainer: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let cache = dir.path().join("cache");
            let input = dir.path().join("data");
            let output = dir.path().join("models");

            let checkpoint_dir = cache.join("TFODSSDMobileNetV2-pretrained-model/ssd_mobilenet_v2");
            fs::create_dir_all(&checkpoint_dir).unwrap();
            fs::write(checkpoint_dir.join("model.ckpt.index"), b"").unwrap();

            fs::create_dir_all(&input).unwrap();
            fs::write(input.join("train.tfrecord"), b"train").unwrap();
            fs::write(input.join("eval.tfrecord"), b"eval").unwrap();
            fs::write(
                input.join("label_map.pbtxt"),
                "item {\n  id: 1\n  name: 'cat'\n}\nitem {\n  id: 2\n  name: \"dog\"\n}\n",
            )
            .unwrap();

            let mut settings = Config::default();
            settings.general.audit_log = false;
            settings.cache.dir = Some(cache);
            settings.trainer.program = trainer.to_string();
            settings.trainer.args = vec![];
            let config = dir.path().join("config.toml");
            fs::write(&config, toml::to_string_pretty(&settings).unwrap()).unwrap();

            Self {
                dir,
                config,
                input,
                output,
            }
        }

        fn cmd(&self) -> Command {
            let mut cmd = tpod();
            cmd.arg("--config").arg(&self.config);
            cmd
        }

        fn detector_args<'a>(&'a self, command: &'a str) -> Vec<&'a OsStr> {
            vec![
                OsStr::new(command),
                OsStr::new("tensorflow_ssd_mobilenet_v2"),
                OsStr::new("--input-dir"),
                self.input.as_os_str(),
                OsStr::new("--output-dir"),
                self.output.as_os_str(),
            ]
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn help_displays() {
        tpod()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Object detector training"));
    }

    #[test]
    fn version_displays() {
        tpod()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tpod"));
    }

    #[test]
    fn types_lists_builtin_detectors() {
        tpod()
            .args(["types", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff(
                "tensorflow_faster_rcnn_resnet101\ntensorflow_ssd_mobilenet_v2\n",
            ));
    }

    #[test]
    fn describe_shows_parameters() {
        tpod()
            .args(["describe", "tensorflow_faster_rcnn_resnet101", "--format", "json"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("\"batch_size\"")
                    .and(predicate::str::contains("\"num_steps\": 20000")),
            );
    }

    #[test]
    fn describe_unknown_type_fails() {
        tpod()
            .args(["describe", "yolo_v9"])
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("Unknown detector type: yolo_v9")
                    .and(predicate::str::contains("Run: tpod types")),
            );
    }

    #[test]
    fn config_path_honors_flag() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[trainer]"));
    }

    #[test]
    fn config_init_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        tpod()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();

        assert!(read(&path).contains("[cache]"));
    }

    #[test]
    fn cache_list_shows_manual_entry() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("TFODSSDMobileNetV2-pretrained-model")
                    .and(predicate::str::contains("manual")),
            );
    }

    #[test]
    fn cache_clear_removes_entries() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 1 cached model(s)"));

        assert!(!ws
            .dir
            .path()
            .join("cache/TFODSSDMobileNetV2-pretrained-model")
            .exists());
    }

    #[test]
    fn prepare_renders_pipeline_config() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(ws.detector_args("prepare"))
            .args(["--param", "batch_size=4"])
            .assert()
            .success();

        let pipeline = read(&ws.input.join("pipeline.config"));
        assert!(pipeline.contains("num_classes: 2"));
        assert!(pipeline.contains("batch_size: 4"));
        assert!(pipeline.contains("num_steps: 20000"));
        assert!(pipeline.contains("ssd_mobilenet_v2/model.ckpt"));
    }

    #[test]
    fn prepare_without_batch_size_fails() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(ws.detector_args("prepare"))
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Parameter (batch_size) is required, but not given",
            ));

        assert!(!ws.input.join("pipeline.config").exists());
    }

    #[test]
    fn prepare_rejects_non_numeric_batch_size() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(ws.detector_args("prepare"))
            .args(["--param", "batch_size=not-a-number"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Parameter (batch_size) must be an integer, got 'not-a-number'",
            ));

        assert!(!ws.input.join("pipeline.config").exists());
    }

    #[cfg(unix)]
    #[test]
    fn train_again_warns_about_previous_job() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(ws.detector_args("train"))
            .args(["--param", "batch_size=4"])
            .assert()
            .success();

        ws.cmd()
            .args(ws.detector_args("train"))
            .args(["--param", "batch_size=4"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Replacing job.json from job"));
    }

    #[cfg(unix)]
    #[test]
    fn train_launches_and_writes_job_file() {
        let ws = Workspace::new("true");
        ws.cmd()
            .args(ws.detector_args("train"))
            .args(["--param", "batch_size=4"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Training launched"));

        let job: serde_json::Value =
            serde_json::from_str(&read(&ws.output.join("job.json"))).unwrap();
        assert!(job["pid"].as_u64().unwrap() > 0);
        assert_eq!(job["command"][0], "true");
        assert_eq!(job["command"].as_array().unwrap().last().unwrap(), "--alsologtostderr");
    }

    #[test]
    fn train_with_missing_trainer_fails() {
        let ws = Workspace::new("/nonexistent/tpod-trainer");
        ws.cmd()
            .args(ws.detector_args("train"))
            .args(["--param", "batch_size=4"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to launch training process"));

        assert!(!ws.output.join("job.json").exists());
    }
}
