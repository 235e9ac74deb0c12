// In-memory ExecutionContext used by the orchestrator and renderer
// tests. Records every call and never touches a tensor.

use anyhow::Result;
use std::{cell::RefCell, fs, path::PathBuf};

use crate::domain::error::PipelineError;
use crate::domain::image::Patch;
use crate::domain::label::Label;
use crate::domain::sample::{Checkpoint, StepOutput, TrainingBatch};
use crate::domain::traits::ExecutionContext;

#[derive(Default)]
pub struct RecordingEngine {
    pub initialized: usize,
    pub restored:    Vec<PathBuf>,
    /// Size of each batch passed to `step`, in call order
    pub batches:     Vec<usize>,
    /// First pixel of every patch in each batch; tests store a
    /// sample id there
    pub contents:    Vec<Vec<usize>>,
    pub saves:       RefCell<Vec<PathBuf>>,
    /// `step` fails on this call (0-based)
    pub fail_at:     Option<usize>,
}

impl RecordingEngine {
    pub fn failing_at(step: usize) -> Self {
        Self { fail_at: Some(step), ..Self::default() }
    }
}

impl ExecutionContext for RecordingEngine {
    fn initialize(&mut self) -> Result<()> {
        self.initialized += 1;
        Ok(())
    }

    fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if !checkpoint.exists() {
            return Err(PipelineError::MissingFile { path: checkpoint.path.clone() }.into());
        }
        self.restored.push(checkpoint.path.clone());
        Ok(())
    }

    fn step(&mut self, batch: &TrainingBatch) -> Result<StepOutput> {
        if self.fail_at == Some(self.batches.len()) {
            return Err(PipelineError::Execution("injected failure".to_string()).into());
        }
        self.batches.push(batch.len());
        self.contents
            .push(batch.patches.iter().map(|p| p.data[0] as usize).collect());
        Ok(StepOutput {
            loss:          1.0 / self.batches.len() as f64,
            learning_rate: 0.01,
            // always right
            predictions:   batch.labels.iter().map(|l| l.one_hot()).collect(),
        })
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        fs::write(&checkpoint.path, b"weights").map_err(|e| PipelineError::io(&checkpoint.path, e))?;
        self.saves.borrow_mut().push(checkpoint.path.clone());
        Ok(())
    }

    /// Bright patches are road.
    fn predict(&self, patches: &[Patch]) -> Result<Vec<Label>> {
        Ok(patches
            .iter()
            .map(|p| if p.mean() > 0.5 { Label::Road } else { Label::NotRoad })
            .collect())
    }
}
