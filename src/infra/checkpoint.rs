// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Owns the training directory and everything persisted in it
// except the metrics log.
//
// File layout:
//   <train_dir>/
//     model.ckpt          ← current model weights (overwritten every epoch)
//     latest_epoch.json   ← last epoch whose weights are in model.ckpt
//     train_config.json   ← hyperparameters the weights were trained with
//
// The weights themselves are written by the execution engine
// (only it knows how to serialise its model); this manager just
// hands out the Checkpoint handle that says where.
//
// Why save the config?
//   Restoring needs the same network shape (patch size, channels,
//   hidden width). Comparing against the stored config turns a
//   confusing tensor-shape failure into a clear configuration error.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::PipelineError;
use crate::domain::sample::Checkpoint;

/// File name of the single current checkpoint
pub const CHECKPOINT_NAME: &str = "model.ckpt";

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE:       &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory (like `mkdir -p`)
    /// if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The one checkpoint saves overwrite and restores read.
    pub fn current(&self) -> Checkpoint {
        Checkpoint::new(CHECKPOINT_NAME, self.dir.join(CHECKPOINT_NAME))
    }

    /// Note that `epoch` has just been written to the current checkpoint.
    pub fn record_epoch(&self, epoch: usize) -> Result<()> {
        let path = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&path, serde_json::to_string(&epoch)?)
            .map_err(|e| PipelineError::io(&path, e))?;
        tracing::debug!("Recorded epoch {} in '{}'", epoch, path.display());
        Ok(())
    }

    /// Last epoch saved, or `None` when nothing has been trained here.
    pub fn latest_epoch(&self) -> Result<Option<usize>> {
        let path = self.dir.join(LATEST_EPOCH_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str::<usize>(&s)?))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json).map_err(|e| PipelineError::io(&path, e))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Has a model been trained in this directory?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Check that weights trained under the stored config can be
    /// loaded into a network built from `cfg`.
    ///
    /// A directory without a stored config passes; the weight load
    /// itself will catch a mismatch.
    pub fn ensure_compatible(&self, cfg: &TrainConfig) -> Result<()> {
        if !self.dir.join(CONFIG_FILE).exists() {
            tracing::warn!(
                "No {} in '{}'; skipping architecture check",
                CONFIG_FILE,
                self.dir.display()
            );
            return Ok(());
        }

        let stored = self.load_config()?;
        let same = stored.patch_size   == cfg.patch_size
            && stored.num_channels     == cfg.num_channels
            && stored.hidden_units     == cfg.hidden_units;
        if !same {
            return Err(PipelineError::Configuration(format!(
                "checkpoint was trained with patch_size={} num_channels={} hidden_units={}, \
                 but this run uses patch_size={} num_channels={} hidden_units={}",
                stored.patch_size, stored.num_channels, stored.hidden_units,
                cfg.patch_size, cfg.num_channels, cfg.hidden_units,
            ))
            .into());
        }
        Ok(())
    }
}
