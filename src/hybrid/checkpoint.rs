//! Per-epoch checkpoints: model weights plus a JSON sidecar with training state.
//!
//! The optimizer moments are not stored; a resumed run restarts AdamW with
//! the learning rate recovered from the scheduler state.

use super::model::HybridModel;
use super::schedule::CosineAnnealingLr;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CHECKPOINT_PREFIX: &str = "lda_roberta_checkpoint_epoch_";
pub const FINAL_MODEL_STEM: &str = "lda_roberta_final_model";

/// Training state written next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Zero-based index of the completed epoch
    pub epoch: usize,
    /// Average training loss of that epoch
    pub loss: f64,
    pub scheduler: CosineAnnealingLr,
}

impl CheckpointState {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointPaths {
    pub weights: PathBuf,
    pub state: PathBuf,
}

impl CheckpointPaths {
    pub fn for_epoch(dir: impl AsRef<Path>, epoch: usize) -> Self {
        Self::from_weights(dir.as_ref().join(format!("{CHECKPOINT_PREFIX}{epoch}.ot")))
    }

    /// Sidecar path derived from a weights file.
    pub fn from_weights(weights: impl Into<PathBuf>) -> Self {
        let weights = weights.into();
        let state = weights.with_extension("json");
        Self { weights, state }
    }
}

pub fn save_checkpoint(
    model: &HybridModel,
    dir: impl AsRef<Path>,
    state: &CheckpointState,
) -> Result<CheckpointPaths> {
    fs::create_dir_all(dir.as_ref())?;
    let paths = CheckpointPaths::for_epoch(dir, state.epoch);
    model.save(&paths.weights)?;
    state.save(&paths.state)?;
    info!(path = %paths.weights.display(), epoch = state.epoch, "checkpoint saved");
    Ok(paths)
}

/// Restore weights and return the saved training state.
pub fn load_checkpoint(model: &mut HybridModel, paths: &CheckpointPaths) -> Result<CheckpointState> {
    model.load(&paths.weights)?;
    let state = CheckpointState::load(&paths.state)?;
    info!(path = %paths.weights.display(), epoch = state.epoch, "checkpoint restored");
    Ok(state)
}

fn epoch_from_path(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .strip_prefix(CHECKPOINT_PREFIX)?
        .parse()
        .ok()
}

/// Highest-epoch checkpoint in `dir` that has both weights and sidecar.
pub fn latest_checkpoint(dir: impl AsRef<Path>) -> Result<Option<CheckpointPaths>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut best: Option<(usize, CheckpointPaths)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("ot") {
            continue;
        }
        let Some(epoch) = epoch_from_path(&path) else {
            continue;
        };
        let paths = CheckpointPaths::from_weights(path);
        if !paths.state.exists() {
            continue;
        }
        if best.as_ref().map_or(true, |(e, _)| epoch > *e) {
            best = Some((epoch, paths));
        }
    }
    Ok(best.map(|(_, paths)| paths))
}

/// Accepts a checkpoint weights file or a directory of checkpoints.
pub fn resolve_resume(path: impl AsRef<Path>) -> Result<Option<CheckpointPaths>> {
    let path = path.as_ref();
    if path.is_dir() {
        latest_checkpoint(path)
    } else if path.exists() {
        Ok(Some(CheckpointPaths::from_weights(path)))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn state(epoch: usize) -> CheckpointState {
        let mut scheduler = CosineAnnealingLr::new(1e-5, 10);
        for _ in 0..=epoch {
            scheduler.step();
        }
        CheckpointState {
            epoch,
            loss: 0.5 / (epoch + 1) as f64,
            scheduler,
        }
    }

    fn touch_checkpoint(dir: &Path, epoch: usize, with_state: bool) {
        let paths = CheckpointPaths::for_epoch(dir, epoch);
        fs::write(&paths.weights, b"").unwrap();
        if with_state {
            state(epoch).save(&paths.state).unwrap();
        }
    }

    #[test]
    fn test_paths() {
        let paths = CheckpointPaths::for_epoch("ckpt", 3);
        assert_eq!(paths.weights, PathBuf::from("ckpt/lda_roberta_checkpoint_epoch_3.ot"));
        assert_eq!(paths.state, PathBuf::from("ckpt/lda_roberta_checkpoint_epoch_3.json"));
        assert_eq!(epoch_from_path(&paths.weights), Some(3));
        assert_eq!(epoch_from_path(Path::new("other.ot")), None);
    }

    #[test]
    fn test_state_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        state(4).save(&path).unwrap();
        assert_eq!(CheckpointState::load(&path).unwrap(), state(4));
    }

    #[test]
    fn test_latest_checkpoint_picks_highest_complete_epoch() {
        let dir = tempdir().unwrap();
        touch_checkpoint(dir.path(), 2, true);
        touch_checkpoint(dir.path(), 10, true);
        touch_checkpoint(dir.path(), 11, false);
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let latest = latest_checkpoint(dir.path()).unwrap().unwrap();
        assert_eq!(latest, CheckpointPaths::for_epoch(dir.path(), 10));
    }

    #[test]
    fn test_resolve_resume() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_resume(dir.path()).unwrap(), None);
        assert_eq!(resolve_resume(dir.path().join("missing.ot")).unwrap(), None);

        touch_checkpoint(dir.path(), 1, true);
        let weights = CheckpointPaths::for_epoch(dir.path(), 1).weights;
        assert_eq!(
            resolve_resume(&weights).unwrap().unwrap().state,
            CheckpointPaths::for_epoch(dir.path(), 1).state
        );
        assert!(resolve_resume(dir.path()).unwrap().is_some());
    }
}
