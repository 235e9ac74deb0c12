use std::path::PathBuf;

use crate::domain::image::Patch;
use crate::domain::label::{Label, NUM_CLASSES};

/// One minibatch handed to the execution engine for a single
/// optimisation step. `patches[i]` is labelled by `labels[i]`.
#[derive(Debug, Clone, Default)]
pub struct TrainingBatch {
    pub patches: Vec<Patch>,
    pub labels:  Vec<Label>,
}

impl TrainingBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// What one optimisation step reports back.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Minibatch loss after the forward pass
    pub loss:          f64,
    /// Learning rate used for this update
    pub learning_rate: f64,
    /// Per-sample class probabilities, same order as the batch
    pub predictions:   Vec<[f32; NUM_CLASSES]>,
}

/// A named, persisted snapshot of the model's trainable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub name: String,
    pub path: PathBuf,
}

impl Checkpoint {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}
