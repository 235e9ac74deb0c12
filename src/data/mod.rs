// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from PNG files on disk to the index lists the
// training loop consumes.
//
//   images/ + groundtruth/
//       │
//       ▼
//   DatasetBuilder    → decodes each pair, skips missing indices
//       │   ├── PatchExtractor  → row-major P x P tiles (domain)
//       │   └── LabelAssigner   → road / not-road per tile
//       ▼
//   PatchDataset      → aligned (patches, labels)
//       │
//       ▼
//   balancer          → equal class counts
//       │
//       ▼
//   MinibatchSchedule → per-epoch permutation and batch windows
//       │
//       ▼
//   PatchBatcher      → [N, C, P, P] tensors for Burn
//
// Each module owns one step so each can be tested on its own.

/// Ground-truth patch → one-hot label
pub mod labeler;

/// Loads image / ground-truth pairs by filename convention
pub mod loader;

/// Aligned patch + label storage, implements Burn's Dataset trait
pub mod dataset;

/// Equalises class counts
pub mod balancer;

/// Epoch permutations and the step → batch window formula
pub mod sampler;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
