// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system works
// with: images, patches, labels, batches, checkpoints, and the
// two seams to external collaborators (image codec, execution
// engine).
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Everything Burn-specific lives in Layer 5 (ml) and everything
// touching the filesystem lives in Layer 4 (data) or Layer 6
// (infra). That keeps this layer testable without a GPU.

// Raster image, patch and prediction mask types
pub mod image;

// Fixed-size, row-major image tiling
pub mod patches;

// The two-class road / not-road label
pub mod label;

// Training batches, step outputs and checkpoint handles
pub mod sample;

// Typed error taxonomy for the pipeline
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
