// ============================================================
// Layer 3 - Patch Extractor
// ============================================================
// Tiles an image into fixed-size, non-overlapping square patches.
//
// Tiles start at multiples of the patch size and are visited in
// row-major order (row outer, column inner):
//
//   ┌────┬────┬────┐
//   │ 0  │ 1  │ 2  │
//   ├────┼────┼────┤
//   │ 3  │ 4  │ 5  │
//   └────┴────┴────┘  ← leftover pixels past the last full tile
//                       in either direction are dropped
//
// The iterator is lazy and cheap to clone, so the same image can
// be walked again without re-allocating anything up front.

use crate::domain::error::PipelineError;
use crate::domain::image::{Image, Patch};

/// Splits images into `patch_size` x `patch_size` tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchExtractor {
    patch_size: usize,
}

impl PatchExtractor {
    /// Fails with a configuration error when `patch_size` is zero.
    pub fn new(patch_size: usize) -> Result<Self, PipelineError> {
        if patch_size == 0 {
            return Err(PipelineError::Configuration(
                "patch size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { patch_size })
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Number of full tiles as (rows, cols).
    pub fn grid(&self, width: usize, height: usize) -> (usize, usize) {
        (height / self.patch_size, width / self.patch_size)
    }

    /// Patches one image of this size produces.
    pub fn patches_per_image(&self, width: usize, height: usize) -> usize {
        let (rows, cols) = self.grid(width, height);
        rows * cols
    }

    /// Lazily walk the patches of `image` in row-major order.
    pub fn patches<'a>(&self, image: &'a Image) -> PatchIter<'a> {
        let (rows, cols) = self.grid(image.width, image.height);
        PatchIter {
            image,
            patch_size: self.patch_size,
            rows,
            cols,
            next: 0,
        }
    }
}

/// Iterator over the patches of one image. See [`PatchExtractor::patches`].
#[derive(Debug, Clone)]
pub struct PatchIter<'a> {
    image:      &'a Image,
    patch_size: usize,
    rows:       usize,
    cols:       usize,
    next:       usize,
}

impl Iterator for PatchIter<'_> {
    type Item = Patch;

    fn next(&mut self) -> Option<Patch> {
        if self.next >= self.rows * self.cols {
            return None;
        }
        let (row, col) = (self.next / self.cols, self.next % self.cols);
        self.next += 1;

        let p = self.patch_size;
        Some(self.image.crop(col * p, row * p, p, p))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows * self.cols - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PatchIter<'_> {}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Single-channel image whose pixel value is its linear index,
    /// so every pixel can be traced back to where it came from.
    fn indexed(width: usize, height: usize) -> Image {
        let data = (0..width * height).map(|v| v as f32).collect();
        Image::new(width, height, 1, data).unwrap()
    }

    #[test]
    fn test_zero_patch_size_is_rejected() {
        let err = PatchExtractor::new(0).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_patch_count_for_exact_multiples() {
        let ex  = PatchExtractor::new(4).unwrap();
        let img = indexed(16, 8);
        assert_eq!(ex.patches(&img).count(), (8 / 4) * (16 / 4));
        assert_eq!(ex.patches(&img).len(), 8);
        assert_eq!(ex.patches_per_image(16, 8), 8);
    }

    #[test]
    fn test_patches_are_row_major() {
        let ex  = PatchExtractor::new(2).unwrap();
        let img = indexed(4, 4);
        let firsts: Vec<f32> = ex.patches(&img).map(|p| p.data[0]).collect();
        // top-left pixel of each tile: (0,0) (2,0) (0,2) (2,2)
        assert_eq!(firsts, vec![0.0, 2.0, 8.0, 10.0]);
    }

    #[test]
    fn test_no_overlap_and_no_gaps() {
        let ex  = PatchExtractor::new(3).unwrap();
        let img = indexed(9, 6);
        let mut seen: Vec<f32> = ex.patches(&img).flat_map(|p| p.data).collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let all: Vec<f32> = (0..54).map(|v| v as f32).collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn test_remainder_is_dropped() {
        let ex      = PatchExtractor::new(4).unwrap();
        let img     = indexed(10, 7);
        let patches: Vec<Patch> = ex.patches(&img).collect();
        // floor(7/4) * floor(10/4) = 1 * 2
        assert_eq!(patches.len(), 2);
        assert!(patches.iter().all(|p| p.width == 4 && p.height == 4));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let ex   = PatchExtractor::new(2).unwrap();
        let img  = indexed(4, 2);
        let iter = ex.patches(&img);
        let a: Vec<Patch> = iter.clone().collect();
        let b: Vec<Patch> = iter.collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_image_smaller_than_patch_gives_nothing() {
        let ex = PatchExtractor::new(8).unwrap();
        assert_eq!(ex.patches(&indexed(4, 4)).count(), 0);
    }
}
