// ============================================================
// Layer 5 - Burn Execution Engine
// ============================================================
// The concrete ExecutionContext: owns the RoadCnn parameters and
// the optimiser, and turns domain batches into Burn tensors.
//
// One step:
//   1. PatchBatcher stacks the batch into [N, C, P, P] + [N]
//   2. forward → cross-entropy loss
//   3. backward → GradientsParams → optimiser update
//   4. softmax of the logits is returned as the predictions
//
// Learning rate follows a staircase exponential decay keyed on
// samples seen, one decay per pass over the training set:
//
//   lr = base * decay ^ floor(samples_seen / train_size)
//
// Checkpoints are Burn records serialised to bytes at full
// precision, so a restored model reproduces predictions exactly.

use anyhow::{Context, Result};
use burn::{
    module::{AutodiffModule, Module},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{activation::softmax, backend::AutodiffBackend},
};
use std::fs;

use crate::data::batcher::PatchBatcher;
use crate::data::dataset::PatchSample;
use crate::domain::error::PipelineError;
use crate::domain::image::Patch;
use crate::domain::label::{Label, NUM_CLASSES};
use crate::domain::sample::{Checkpoint, StepOutput, TrainingBatch};
use crate::domain::traits::ExecutionContext;
use crate::ml::model::{RoadCnn, RoadCnnConfig};

/// Patches per forward pass when predicting whole images.
const INFERENCE_CHUNK: usize = 1024;

// ─── LearningRateSchedule ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRateSchedule {
    pub base:          f64,
    pub decay_rate:    f64,
    /// Samples per decay step, normally the training-set size
    pub decay_samples: usize,
}

impl LearningRateSchedule {
    pub fn exponential(base: f64, decay_rate: f64, decay_samples: usize) -> Self {
        Self { base, decay_rate, decay_samples }
    }

    pub fn rate(&self, samples_seen: usize) -> f64 {
        if self.decay_samples == 0 {
            return self.base;
        }
        let stairs = (samples_seen / self.decay_samples) as i32;
        self.base * self.decay_rate.powi(stairs)
    }
}

// ─── BurnEngine ───────────────────────────────────────────────────────────────
pub struct BurnEngine<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<RoadCnn<B>, B>,
{
    config:       RoadCnnConfig,
    model:        RoadCnn<B>,
    optim:        O,
    schedule:     LearningRateSchedule,
    batcher:      PatchBatcher<B>,
    /// Inference runs on the inner backend, outside the autodiff graph
    infer_batcher: PatchBatcher<B::InnerBackend>,
    device:       B::Device,
    samples_seen: usize,
}

impl<B, O> BurnEngine<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<RoadCnn<B>, B>,
{
    pub fn new(
        config:   RoadCnnConfig,
        optim:    O,
        schedule: LearningRateSchedule,
        device:   B::Device,
    ) -> Self {
        let model = config.init::<B>(&device);
        tracing::info!(
            "Model ready: patch_size={} channels={} hidden={} ({} parameters)",
            config.patch_size,
            config.num_channels,
            config.hidden_units,
            model.num_params(),
        );
        Self {
            batcher: PatchBatcher::new(device.clone()),
            infer_batcher: PatchBatcher::new(device.clone()),
            config,
            model,
            optim,
            schedule,
            device,
            samples_seen: 0,
        }
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    /// Every patch must match the input shape the network was built for.
    fn check_patches(&self, patches: &[Patch]) -> Result<(), PipelineError> {
        let (p, c) = (self.config.patch_size, self.config.num_channels);
        match patches.iter().find(|x| x.width != p || x.height != p || x.channels != c) {
            Some(bad) => Err(PipelineError::Execution(format!(
                "model expects {p}x{p}x{c} patches, got {}x{}x{}",
                bad.width, bad.height, bad.channels
            ))),
            None => Ok(()),
        }
    }
}

fn to_scores(flat: Vec<f32>) -> Vec<[f32; NUM_CLASSES]> {
    flat.chunks_exact(NUM_CLASSES)
        .map(|pair| [pair[0], pair[1]])
        .collect()
}

impl<B, O> ExecutionContext for BurnEngine<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<RoadCnn<B>, B>,
{
    fn initialize(&mut self) -> Result<()> {
        self.model = self.config.init::<B>(&self.device);
        self.samples_seen = 0;
        tracing::info!("Initialized fresh model parameters");
        Ok(())
    }

    fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        let bytes = fs::read(&checkpoint.path).map_err(|e| PipelineError::io(&checkpoint.path, e))?;
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let record = Recorder::<B>::load(&recorder, bytes, &self.device)
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .with_context(|| {
                format!("Cannot load checkpoint '{}'", checkpoint.path.display())
            })?;
        self.model = self.config.init::<B>(&self.device).load_record(record);
        tracing::info!("Model restored from '{}'", checkpoint.path.display());
        Ok(())
    }

    fn step(&mut self, batch: &TrainingBatch) -> Result<StepOutput> {
        if batch.is_empty() {
            return Err(PipelineError::Execution("empty training batch".to_string()).into());
        }
        self.check_patches(&batch.patches)?;

        let items = batch
            .patches
            .iter()
            .zip(&batch.labels)
            .map(|(patch, &label)| PatchSample { patch: patch.clone(), label })
            .collect();
        let tensors = self.batcher.batch_on_device(items);

        let (loss, logits) = self.model.forward_loss(tensors.images, tensors.targets);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            return Err(PipelineError::Execution(format!("loss diverged to {loss_val}")).into());
        }

        let learning_rate = self.schedule.rate(self.samples_seen);
        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self.optim.step(learning_rate, self.model.clone(), grads);
        self.samples_seen += batch.len();

        let probs = softmax(logits, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PipelineError::Execution(format!("cannot read predictions: {e:?}")))?;

        Ok(StepOutput {
            loss: loss_val,
            learning_rate,
            predictions: to_scores(probs),
        })
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let bytes: Vec<u8> = Recorder::<B>::record(&recorder, self.model.clone().into_record(), ())
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .with_context(|| "Cannot serialise model record")?;
        fs::write(&checkpoint.path, bytes).map_err(|e| PipelineError::io(&checkpoint.path, e))?;
        tracing::debug!("Wrote checkpoint '{}'", checkpoint.path.display());
        Ok(())
    }

    fn predict(&self, patches: &[Patch]) -> Result<Vec<Label>> {
        self.check_patches(patches)?;

        let model = self.model.valid();
        let mut labels = Vec::with_capacity(patches.len());
        for chunk in patches.chunks(INFERENCE_CHUNK) {
            let images = self.infer_batcher.images(chunk, self.infer_batcher.device());
            let classes = model
                .forward(images)
                .argmax(1)
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .map_err(|e| PipelineError::Execution(format!("cannot read classes: {e:?}")))?;
            labels.extend(
                classes
                    .into_iter()
                    .map(|c| Label::from_class_index(c as usize).unwrap_or(Label::NotRoad)),
            );
        }
        Ok(labels)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::Image;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;

    type TestBackend = Autodiff<NdArray>;

    fn engine() -> BurnEngine<TestBackend, impl Optimizer<RoadCnn<TestBackend>, TestBackend>> {
        let config = RoadCnnConfig::new(8).with_hidden_units(16);
        BurnEngine::new(
            config,
            AdamConfig::new().init::<TestBackend, RoadCnn<TestBackend>>(),
            LearningRateSchedule::exponential(0.01, 0.95, 8),
            Default::default(),
        )
    }

    fn batch() -> TrainingBatch {
        let patches: Vec<Patch> = (0..4)
            .map(|i| Image::filled(8, 8, 3, i as f32 / 4.0))
            .collect();
        TrainingBatch {
            patches,
            labels: vec![Label::NotRoad, Label::NotRoad, Label::Road, Label::Road],
        }
    }

    #[test]
    fn test_learning_rate_decays_per_pass() {
        let s = LearningRateSchedule::exponential(0.01, 0.5, 100);
        assert_eq!(s.rate(0), 0.01);
        assert_eq!(s.rate(99), 0.01);
        assert_eq!(s.rate(100), 0.005);
        assert_eq!(s.rate(250), 0.0025);
    }

    #[test]
    fn test_step_reports_loss_and_predictions() {
        let mut engine = engine();
        let out = engine.step(&batch()).unwrap();

        assert!(out.loss.is_finite());
        assert_eq!(out.learning_rate, 0.01);
        assert_eq!(out.predictions.len(), 4);
        for p in &out.predictions {
            assert!((p[0] + p[1] - 1.0).abs() < 1e-4);
        }
        assert_eq!(engine.samples_seen(), 4);
    }

    #[test]
    fn test_wrong_patch_shape_is_an_execution_failure() {
        let mut engine = engine();
        let bad = TrainingBatch {
            patches: vec![Image::filled(4, 4, 3, 0.0)],
            labels:  vec![Label::Road],
        };
        let err = engine.step(&bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Execution(_))
        ));
    }

    #[test]
    fn test_checkpoint_round_trip_reproduces_predictions() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = Checkpoint::new("model.ckpt", tmp.path().join("model.ckpt"));

        let mut trained = engine();
        trained.step(&batch()).unwrap();
        trained.save(&ckpt).unwrap();
        assert!(ckpt.exists());

        let mut restored = engine();
        restored.restore(&ckpt).unwrap();

        let patches = batch().patches;
        assert_eq!(trained.predict(&patches).unwrap(), restored.predict(&patches).unwrap());

        // and the raw logits match too
        let batcher = &trained.infer_batcher;
        let a = trained.model.valid().forward(batcher.images(&patches, batcher.device()));
        let b = restored.model.valid().forward(batcher.images(&patches, batcher.device()));
        let a = a.into_data().to_vec::<f32>().unwrap();
        let b = b.into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predict_uses_the_inner_backend_model() {
        let mut engine = engine();
        engine.step(&batch()).unwrap();

        let patches = batch().patches;
        let inner   = engine.model.valid();
        let images  = engine.infer_batcher.images(&patches, engine.infer_batcher.device());
        let scores  = inner.forward(images).into_data().to_vec::<f32>().unwrap();
        let expected: Vec<Label> = to_scores(scores).into_iter().map(Label::from_scores).collect();

        assert_eq!(engine.predict(&patches).unwrap(), expected);
    }

    #[test]
    fn test_restore_missing_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = Checkpoint::new("model.ckpt", tmp.path().join("model.ckpt"));
        let err = engine().restore(&ckpt).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Io { .. })
        ));
    }

    #[test]
    fn test_infer_produces_full_resolution_mask() {
        let engine = engine();
        let image  = Image::filled(20, 16, 3, 0.5);
        let mask   = engine.infer(&image, 8).unwrap();
        assert_eq!((mask.width, mask.height), (20, 16));
        // the last 4 columns are outside the 2x2 tile grid
        assert!(mask.data.iter().all(|&v| v <= 1));
        assert!((0..16).all(|y| mask.data[y * 20 + 19] == 0));
    }
}
