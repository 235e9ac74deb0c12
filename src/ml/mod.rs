// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// Everything that runs the network lives here. The rest of the
// crate only sees the ExecutionContext trait from the domain
// layer, so the orchestration logic is testable without a GPU.
//
//   model.rs     - RoadCnn: two conv + max-pool stages and two
//                  fully connected layers ending in 2 logits
//
//   engine.rs    - BurnEngine, the ExecutionContext backed by
//                  Burn: forward, cross-entropy, backward, Adam
//                  step with a decaying learning rate, byte
//                  checkpoints
//
//   trainer.rs   - The epoch / minibatch loop, periodic metrics
//                  and per-epoch checkpointing
//
//   renderer.rs  - Whole-image inference and the prediction /
//                  overlay PNGs

/// Patch classifier network
pub mod model;

/// Burn-backed ExecutionContext
pub mod engine;

/// Training loop with metrics and checkpointing
pub mod trainer;

/// Prediction masks and overlays
pub mod renderer;

#[cfg(test)]
pub mod testing;
