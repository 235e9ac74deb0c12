// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Runs the whole pipeline in order:
//
//   Step 1: Validate the config                    (Layer 2)
//   Step 2: Load images + ground truth as patches  (Layer 4 - data)
//   Step 3: Balance the two classes                (Layer 4 - data)
//   Step 4: Save config next to the checkpoint     (Layer 6 - infra)
//   Step 5: Train, checkpointing every epoch       (Layer 5 - ml)
//   Step 6: Render predictions and overlays        (Layer 5 - ml)
//
// With `restore` set, steps 2-5 are replaced by loading the
// current checkpoint, after checking it was trained with the same
// network shape.

use anyhow::Result;
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    optim::AdamConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    balancer::balance,
    loader::{DatasetBuilder, FilenamePattern},
    sampler::MinibatchSchedule,
};
use crate::domain::error::PipelineError;
use crate::domain::traits::ExecutionContext;
use crate::infra::{
    checkpoint::CheckpointManager,
    codec::PngCodec,
    metrics::MetricsLogger,
};
use crate::ml::{
    engine::{BurnEngine, LearningRateSchedule},
    model::{RoadCnn, RoadCnnConfig},
    renderer::PredictionRenderer,
    trainer::{TrainingOrchestrator, TrainingSummary},
};

type TrainBackend = Autodiff<Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run, built once from the CLI and passed by
// reference. Saved as train_config.json so a later restore can
// rebuild the same network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Holds images/ and groundtruth/
    pub data_dir:        PathBuf,
    /// Checkpoint, config, epoch marker and metrics log
    pub train_dir:       PathBuf,
    pub predictions_dir: PathBuf,
    pub image_prefix:    String,
    /// Side of a square patch in pixels, a multiple of 4
    pub patch_size:      usize,
    /// Number of images to load, indices 1..=training_size
    pub training_size:   usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    /// Log and record metrics every this many steps
    pub recording_step:  usize,
    /// Skip training and predict with the saved checkpoint
    pub restore:         bool,
    pub seed:            u64,
    pub learning_rate:   f64,
    /// Multiplier applied once per pass over the training set
    pub lr_decay:        f64,
    pub num_channels:    usize,
    pub hidden_units:    usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:        PathBuf::from("training"),
            train_dir:       PathBuf::from("train_dir"),
            predictions_dir: PathBuf::from("predictions_training"),
            image_prefix:    "satImage_".to_string(),
            patch_size:      16,
            training_size:   20,
            batch_size:      128,
            epochs:          5,
            recording_step:  1000,
            restore:         false,
            seed:            66478,
            learning_rate:   0.01,
            lr_decay:        0.95,
            num_channels:    3,
            hidden_units:    512,
        }
    }
}

impl TrainConfig {
    /// Reject values no run could succeed with. Whether the batch
    /// fits the dataset is only known after balancing and is checked
    /// there.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |msg: String| Err(PipelineError::Configuration(msg));

        if self.patch_size == 0 || self.patch_size % 4 != 0 {
            return fail(format!(
                "patch size must be a positive multiple of 4, got {}",
                self.patch_size
            ));
        }
        if self.batch_size == 0 {
            return fail("batch size must be greater than zero".to_string());
        }
        if self.recording_step == 0 {
            return fail("recording step must be greater than zero".to_string());
        }
        if self.num_channels != 1 && self.num_channels != 3 {
            return fail(format!("images must have 1 or 3 channels, got {}", self.num_channels));
        }
        if self.hidden_units == 0 {
            return fail("hidden layer must have at least one unit".to_string());
        }
        if !(self.learning_rate > 0.0) || !(self.lr_decay > 0.0) {
            return fail(format!(
                "learning rate ({}) and decay ({}) must be positive",
                self.learning_rate, self.lr_decay
            ));
        }
        Ok(())
    }

    pub fn filename_pattern(&self) -> FilenamePattern {
        FilenamePattern::new(self.image_prefix.clone())
    }

    pub fn model_config(&self) -> RoadCnnConfig {
        RoadCnnConfig::new(self.patch_size)
            .with_num_channels(self.num_channels)
            .with_hidden_units(self.hidden_units)
    }
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// `None` in restore mode
    pub training: Option<TrainingSummary>,
    /// Images that got a prediction and an overlay
    pub rendered: usize,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Run the pipeline on the WGPU backend.
    pub fn execute(&self) -> Result<RunReport> {
        let cfg    = &self.config;
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        self.run(|decay_samples| {
            // m = β1*m + (1-β1)*g        (mean)
            // v = β2*v + (1-β2)*g²       (variance)
            // θ = θ - lr * m / (√v + ε)  (update)
            let optim = AdamConfig::new()
                .with_epsilon(1e-8)
                .init::<TrainBackend, RoadCnn<TrainBackend>>();
            BurnEngine::<TrainBackend, _>::new(
                cfg.model_config(),
                optim,
                LearningRateSchedule::exponential(cfg.learning_rate, cfg.lr_decay, decay_samples),
                device,
            )
        })
    }

    /// The pipeline against any engine. `make_engine` receives the
    /// number of samples per learning-rate decay step.
    pub fn run<E, F>(&self, make_engine: F) -> Result<RunReport>
    where
        E: ExecutionContext,
        F: FnOnce(usize) -> E,
    {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        let codec       = PngCodec;
        let pattern     = cfg.filename_pattern();
        let checkpoints = CheckpointManager::new(&cfg.train_dir)?;
        let metrics     = MetricsLogger::new(&cfg.train_dir)?;

        let (engine, training) = if cfg.restore {
            // ── Restore: reuse the saved weights ──────────────────────────────
            checkpoints.ensure_compatible(cfg)?;
            let mut engine = make_engine(cfg.training_size.max(1));
            TrainingOrchestrator::new(cfg, &mut engine, &checkpoints, &metrics).prepare()?;
            (engine, None)
        } else {
            // ── Step 2: Load patches ──────────────────────────────────────────
            tracing::info!("Loading images from '{}'", cfg.data_dir.display());
            let loaded = DatasetBuilder::new(&codec, cfg.patch_size, pattern.clone())?
                .build(&cfg.data_dir, cfg.training_size)?;
            tracing::info!(
                "Loaded {} image(s), {} patches ({} per image)",
                loaded.image_indices.len(),
                loaded.dataset.sample_count(),
                loaded.patches_per_image,
            );

            // ── Step 3: Balance ───────────────────────────────────────────────
            let train = balance(&loaded.dataset);
            if train.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "no training patches: found {} loadable image(s) in '{}', and both classes are needed",
                    loaded.image_indices.len(),
                    cfg.data_dir.display()
                ))
                .into());
            }

            // ── Step 4: Save config for later restores ────────────────────────
            // The stored config must keep describing model.ckpt until
            // a new run is certain to start.
            MinibatchSchedule::new(train.sample_count(), cfg.batch_size)?;
            checkpoints.save_config(cfg)?;

            // ── Step 5: Train ─────────────────────────────────────────────────
            let mut engine = make_engine(train.sample_count());
            let summary = {
                let mut orch = TrainingOrchestrator::new(cfg, &mut engine, &checkpoints, &metrics);
                orch.prepare()?;
                orch.train(&train)?
            };
            tracing::info!("Training complete after {} step(s)", summary.steps);
            (engine, Some(summary))
        };

        // ── Step 6: Render ────────────────────────────────────────────────────
        let renderer = PredictionRenderer::new(
            &codec,
            &cfg.data_dir,
            &cfg.predictions_dir,
            pattern,
            cfg.patch_size,
        )?;
        let rendered = renderer.render_all(&engine, cfg.training_size)?;

        Ok(RunReport { training, rendered })
    }
}
