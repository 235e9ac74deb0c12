// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The pipeline talks to its two external collaborators only
// through these traits:
//
//   ImageCodec        → decode / encode raster files
//                       (implemented by infra::codec::PngCodec)
//   ExecutionContext  → owns the model and runs the numerics
//                       (implemented by ml::engine::BurnEngine)
//
// The dataset builder, the training orchestrator and the
// prediction renderer are all generic over these traits, so
// their bookkeeping is unit-tested against small in-memory
// fakes with no GPU and no image files.

use anyhow::Result;
use std::path::Path;

use crate::domain::patches::PatchExtractor;
use crate::domain::image::{Image, Mask, Patch};
use crate::domain::label::Label;
use crate::domain::sample::{Checkpoint, StepOutput, TrainingBatch};

// ─── ImageCodec ───────────────────────────────────────────────────────────────
/// Reads and writes raster images.
///
/// Decoded values must be normalised to [0, 1]. Grayscale files
/// decode to one channel, everything else to three.
pub trait ImageCodec {
    fn decode(&self, path: &Path) -> Result<Image>;

    /// Write a 1- or 3-channel image. Values are clamped to [0, 1].
    fn encode(&self, image: &Image, path: &Path) -> Result<()>;
}

// ─── ExecutionContext ─────────────────────────────────────────────────────────
/// Owns the model's trainable state and performs every numeric
/// operation on it.
///
/// The orchestrator holds a `&mut` to the context and calls it
/// strictly in sequence, so the model is never touched by two
/// callers at once.
pub trait ExecutionContext {
    /// Fresh parameters, fresh optimiser history.
    fn initialize(&mut self) -> Result<()>;

    /// Replace the current parameters with the ones stored in `checkpoint`.
    fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()>;

    /// One forward + backward pass and one parameter update.
    fn step(&mut self, batch: &TrainingBatch) -> Result<StepOutput>;

    /// Persist the current parameters, overwriting any file at the path.
    fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Classify each patch independently. Does not change the model.
    fn predict(&self, patches: &[Patch]) -> Result<Vec<Label>>;

    /// Classify a whole image: tile it into `patch_size` patches,
    /// predict each one, and paint the result back at full resolution.
    fn infer(&self, image: &Image, patch_size: usize) -> Result<Mask> {
        let extractor = PatchExtractor::new(patch_size)?;
        let patches: Vec<Patch> = extractor.patches(image).collect();
        let labels = self.predict(&patches)?;
        Ok(Mask::from_patch_labels(image.width, image.height, patch_size, &labels))
    }
}
