// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Concerns shared by several layers that touch the outside
// world:
//
//   codec.rs      - PNG decode / encode
//                   Implements the ImageCodec trait on top of
//                   the `image` crate.
//
//   checkpoint.rs - The training directory
//                   Hands out the current checkpoint handle,
//                   tracks the last saved epoch, and stores the
//                   run config so a restore can check that the
//                   network shape still matches.
//
//   metrics.rs    - Minibatch error rate and the CSV log the
//                   training loop appends to on recording steps.

/// PNG image codec
pub mod codec;

/// Checkpoint paths, epoch marker and run config persistence
pub mod checkpoint;

/// Error-rate metric and training CSV logger
pub mod metrics;
