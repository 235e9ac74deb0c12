// ============================================================
// Layer 4 - Minibatch Schedule
// ============================================================
// Decides which samples go into each optimisation step.
//
// Per epoch:
//   1. Draw a fresh permutation of 0..train_size
//      (Fisher-Yates via rand::seq::SliceRandom). This is the only
//      shuffling between epochs.
//   2. Run floor(train_size / batch_size) steps.
//   3. Step s reads batch_size consecutive permutation entries
//      starting at
//
//        offset = (s * batch_size) mod (train_size - batch_size)
//
// The modulus makes the window wrap instead of marching straight
// through the permutation. With train_size = 100, batch_size = 30:
//
//   step 0 → 0, step 1 → 30, step 2 → 60, step 3 → 90 mod 70 = 20
//
// so late steps can revisit slices an earlier step already used.
// That matches the reference baseline and is kept on purpose.
//
// When train_size == batch_size the modulus would be zero; every
// step then reads the whole permutation from offset 0.

use rand::{seq::SliceRandom, Rng};

use crate::domain::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinibatchSchedule {
    train_size: usize,
    batch_size: usize,
}

impl MinibatchSchedule {
    /// Fails when the batch is empty or larger than the dataset.
    pub fn new(train_size: usize, batch_size: usize) -> Result<Self, PipelineError> {
        if batch_size == 0 {
            return Err(PipelineError::Configuration(
                "batch size must be greater than zero".to_string(),
            ));
        }
        if batch_size > train_size {
            return Err(PipelineError::Configuration(format!(
                "batch size {batch_size} exceeds the balanced dataset size {train_size}"
            )));
        }
        Ok(Self { train_size, batch_size })
    }

    pub fn train_size(&self) -> usize { self.train_size }

    pub fn batch_size(&self) -> usize { self.batch_size }

    pub fn steps_per_epoch(&self) -> usize {
        self.train_size / self.batch_size
    }

    pub fn total_steps(&self, epochs: usize) -> usize {
        epochs * self.steps_per_epoch()
    }

    /// Start of the batch window for `step` within an epoch.
    pub fn offset(&self, step: usize) -> usize {
        let span = self.train_size - self.batch_size;
        if span == 0 {
            return 0;
        }
        (step * self.batch_size) % span
    }

    /// The sample indices for `step`, read from this epoch's permutation.
    pub fn batch_indices<'p>(&self, permutation: &'p [usize], step: usize) -> &'p [usize] {
        let offset = self.offset(step);
        &permutation[offset..offset + self.batch_size]
    }

    /// Fraction of an epoch completed at the start of `step`.
    pub fn epoch_fraction(&self, step: usize) -> f64 {
        (step * self.batch_size) as f64 / self.train_size as f64
    }
}

/// A uniformly random permutation of `0..n`.
pub fn epoch_permutation<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_offsets_wrap_around() {
        let s = MinibatchSchedule::new(100, 30).unwrap();
        let offsets: Vec<usize> = (0..4).map(|step| s.offset(step)).collect();
        assert_eq!(offsets, vec![0, 30, 60, 20]);
        assert_eq!(s.steps_per_epoch(), 3);
    }

    #[test]
    fn test_batch_window_stays_in_bounds() {
        let s    = MinibatchSchedule::new(97, 16).unwrap();
        let perm = (0..97).collect::<Vec<_>>();
        for step in 0..s.steps_per_epoch() * 3 {
            assert_eq!(s.batch_indices(&perm, step).len(), 16);
        }
    }

    #[test]
    fn test_batch_equal_to_dataset_reads_everything() {
        let s    = MinibatchSchedule::new(8, 8).unwrap();
        let perm = vec![7, 6, 5, 4, 3, 2, 1, 0];
        assert_eq!(s.steps_per_epoch(), 1);
        assert_eq!(s.offset(0), 0);
        assert_eq!(s.batch_indices(&perm, 0), perm.as_slice());
    }

    #[test]
    fn test_invalid_batch_sizes_are_configuration_errors() {
        assert!(matches!(
            MinibatchSchedule::new(10, 11),
            Err(PipelineError::Configuration(_))
        ));
        assert!(matches!(
            MinibatchSchedule::new(10, 0),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_permutation_is_a_permutation() {
        let mut rng  = StdRng::seed_from_u64(7);
        let mut perm = epoch_permutation(&mut rng, 50);
        perm.sort_unstable();
        assert_eq!(perm, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_permutation_is_reproducible_for_a_seed() {
        let a = epoch_permutation(&mut StdRng::seed_from_u64(66478), 20);
        let b = epoch_permutation(&mut StdRng::seed_from_u64(66478), 20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_epoch_fraction() {
        let s = MinibatchSchedule::new(100, 25).unwrap();
        assert!((s.epoch_fraction(2) - 0.5).abs() < 1e-12);
    }
}
