//! Checkpoint discovery inside a cache entry

use crate::error::{TpodError, TpodResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name prefix shared by every file of a TensorFlow checkpoint
pub const CHECKPOINT_PREFIX: &str = "model.ckpt";

/// Locate the checkpoint to fine-tune from inside `entry_dir`
///
/// Searches recursively for `model.ckpt*` files. When several match, the
/// smallest path (component-wise ordering) wins, so the choice does not
/// depend on filesystem enumeration order. Returns the checkpoint prefix
/// `<dir>/model.ckpt` that TensorFlow expects, not the individual file.
pub fn locate_checkpoint(entry_dir: &Path) -> TpodResult<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(entry_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(CHECKPOINT_PREFIX))
        })
        .map(|e| e.into_path())
        .collect();
    candidates.sort();

    let first = candidates
        .into_iter()
        .next()
        .ok_or_else(|| TpodError::CheckpointNotFound(entry_dir.to_path_buf()))?;

    let dir = first.parent().unwrap_or(entry_dir);
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    Ok(dir.join(CHECKPOINT_PREFIX))
}

/// Whether a checkpoint path (file or multi-file prefix) exists on disk
pub fn checkpoint_exists(path: &Path) -> bool {
    if path.exists() {
        return true;
    }

    let (Some(dir), Some(prefix)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
    else {
        return false;
    };

    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };

    let dotted = format!("{}.", prefix);
    entries
        .filter_map(Result::ok)
        .any(|e| e.file_name().to_str().is_some_and(|n| n.starts_with(&dotted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_nested_checkpoint() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("faster_rcnn_resnet101_coco_2018_01_28");
        fs::create_dir_all(&model).unwrap();
        fs::write(model.join("model.ckpt.index"), b"").unwrap();
        fs::write(model.join("model.ckpt.meta"), b"").unwrap();
        fs::write(model.join("pipeline.config"), b"").unwrap();

        let ckpt = locate_checkpoint(dir.path()).unwrap();
        assert_eq!(ckpt.file_name().unwrap(), "model.ckpt");
        assert!(ckpt.parent().unwrap().ends_with("faster_rcnn_resnet101_coco_2018_01_28"));
        assert!(ckpt.is_absolute());
    }

    #[test]
    fn picks_smallest_path_among_many() {
        let dir = TempDir::new().unwrap();
        for sub in ["zeta", "alpha", "mid"] {
            let d = dir.path().join(sub);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join("model.ckpt.index"), b"").unwrap();
        }

        for _ in 0..3 {
            let ckpt = locate_checkpoint(dir.path()).unwrap();
            assert!(ckpt.parent().unwrap().ends_with("alpha"));
        }
    }

    #[test]
    fn missing_checkpoint_names_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("frozen_inference_graph.pb"), b"").unwrap();

        let err = locate_checkpoint(dir.path()).unwrap_err();
        assert!(err.to_string().contains(&dir.path().display().to_string()));
        assert!(matches!(err, TpodError::CheckpointNotFound(_)));
    }

    #[test]
    fn prefix_exists_via_sibling_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("model.ckpt.index"), b"").unwrap();

        assert!(checkpoint_exists(&dir.path().join("model.ckpt")));
        assert!(checkpoint_exists(&dir.path().join("model.ckpt.index")));
        assert!(!checkpoint_exists(&dir.path().join("other.ckpt")));
        assert!(!checkpoint_exists(&dir.path().join("missing/model.ckpt")));
    }
}
