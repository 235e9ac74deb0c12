// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Drives the ExecutionContext through epochs and minibatches.
//
//   prepare()  → initialize fresh weights, or restore model.ckpt
//   train()    → for each epoch:
//                  permutation of 0..train_size (seeded StdRng)
//                  for each step:
//                    batch = MinibatchSchedule window into the permutation
//                    engine.step(batch)
//                    every recording_step steps → log + CSV row
//                  save model.ckpt, record the epoch
//
// The orchestrator only holds `&mut E`, so nothing else can touch
// the model while a run is in progress. Any step or checkpoint
// failure ends the run; there are no retries.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::PatchDataset;
use crate::data::sampler::{epoch_permutation, MinibatchSchedule};
use crate::domain::error::PipelineError;
use crate::domain::traits::ExecutionContext;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{error_rate, MetricsLogger, StepMetrics};

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub epochs:    usize,
    /// Optimisation steps across all epochs
    pub steps:     usize,
    /// Loss of the final step, `None` when no step ran
    pub last_loss: Option<f64>,
}

pub struct TrainingOrchestrator<'a, E: ExecutionContext> {
    config:      &'a TrainConfig,
    engine:      &'a mut E,
    checkpoints: &'a CheckpointManager,
    metrics:     &'a MetricsLogger,
}

impl<'a, E: ExecutionContext> TrainingOrchestrator<'a, E> {
    pub fn new(
        config:      &'a TrainConfig,
        engine:      &'a mut E,
        checkpoints: &'a CheckpointManager,
        metrics:     &'a MetricsLogger,
    ) -> Self {
        Self { config, engine, checkpoints, metrics }
    }

    /// Put the model in its starting state.
    pub fn prepare(&mut self) -> Result<()> {
        if self.config.restore {
            let ckpt = self.checkpoints.current();
            self.engine
                .restore(&ckpt)
                .with_context(|| format!("Cannot restore model from '{}'", ckpt.path.display()))?;
            tracing::info!("Model restored.");
        } else {
            self.engine.initialize()?;
            tracing::info!("Initialized!");
        }
        Ok(())
    }

    pub fn train(&mut self, dataset: &PatchDataset) -> Result<TrainingSummary> {
        let cfg = self.config;
        if cfg.recording_step == 0 {
            return Err(PipelineError::Configuration(
                "recording step must be greater than zero".to_string(),
            )
            .into());
        }

        let train_size = dataset.sample_count();
        let schedule   = MinibatchSchedule::new(train_size, cfg.batch_size)?;
        let mut rng    = StdRng::seed_from_u64(cfg.seed);

        tracing::info!(
            "Training on {} patches: {} epochs x {} steps (batch {})",
            train_size,
            cfg.epochs,
            schedule.steps_per_epoch(),
            cfg.batch_size,
        );

        let mut steps     = 0usize;
        let mut last_loss = None;

        for epoch in 1..=cfg.epochs {
            let permutation = epoch_permutation(&mut rng, train_size);

            for step in 0..schedule.steps_per_epoch() {
                let batch  = dataset.batch(schedule.batch_indices(&permutation, step));
                let output = self
                    .engine
                    .step(&batch)
                    .with_context(|| format!("Training step {step} of epoch {epoch} failed"))?;
                steps    += 1;
                last_loss = Some(output.loss);

                if step % cfg.recording_step == 0 {
                    let row = StepMetrics {
                        epoch,
                        step,
                        epoch_fraction: (epoch - 1) as f64 + schedule.epoch_fraction(step),
                        loss:           output.loss,
                        learning_rate:  output.learning_rate,
                        error_rate:     error_rate(&output.predictions, &batch.labels),
                    };
                    tracing::info!("Epoch {:.2}", row.epoch_fraction);
                    tracing::info!(
                        "Minibatch loss: {:.3}, learning rate: {:.6}",
                        row.loss,
                        row.learning_rate
                    );
                    tracing::info!("Minibatch error: {:.1}%", row.error_rate);
                    self.metrics.log(&row)?;
                }
            }

            let ckpt = self.checkpoints.current();
            self.engine.save(&ckpt)?;
            self.checkpoints.record_epoch(epoch)?;
            tracing::info!("Model saved in file: {}", ckpt.path.display());
        }

        Ok(TrainingSummary { epochs: cfg.epochs, steps, last_loss })
    }
}
