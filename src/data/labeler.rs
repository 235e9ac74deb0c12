// ============================================================
// Layer 4 - Label Assigner
// ============================================================
// Turns a ground-truth patch into a road / not-road label.
//
// Ground-truth masks are white (1.0) on road pixels and black
// (0.0) elsewhere. A patch counts as road when the mean pixel
// value is strictly above the foreground threshold, i.e. when
// more than 25% of the patch is road:
//
//   mean(patch) > 0.25  → Road     [0, 1]
//   otherwise           → NotRoad  [1, 0]
//
// The same rule is used for training labels and for any later
// evaluation against ground truth.

use crate::domain::image::Patch;
use crate::domain::label::Label;

/// Mean intensity above which a ground-truth patch is road.
pub const FOREGROUND_THRESHOLD: f32 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct LabelAssigner {
    threshold: f32,
}

impl Default for LabelAssigner {
    fn default() -> Self {
        Self { threshold: FOREGROUND_THRESHOLD }
    }
}

impl LabelAssigner {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn assign(&self, ground_truth: &Patch) -> Label {
        if ground_truth.mean() > self.threshold {
            Label::Road
        } else {
            Label::NotRoad
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::Image;

    /// 4x4 single-channel patch with `road_pixels` white pixels
    fn gt_patch(road_pixels: usize) -> Patch {
        let mut data = vec![0.0; 16];
        for v in data.iter_mut().take(road_pixels) {
            *v = 1.0;
        }
        Image::new(4, 4, 1, data).unwrap()
    }

    #[test]
    fn test_empty_patch_is_not_road() {
        assert_eq!(LabelAssigner::default().assign(&gt_patch(0)), Label::NotRoad);
    }

    #[test]
    fn test_exactly_at_threshold_is_not_road() {
        // 4 of 16 pixels → mean 0.25, not strictly above
        assert_eq!(LabelAssigner::default().assign(&gt_patch(4)), Label::NotRoad);
    }

    #[test]
    fn test_above_threshold_is_road() {
        assert_eq!(LabelAssigner::default().assign(&gt_patch(5)), Label::Road);
        assert_eq!(LabelAssigner::default().assign(&gt_patch(16)), Label::Road);
    }

    #[test]
    fn test_output_is_always_one_hot() {
        let assigner = LabelAssigner::default();
        for n in 0..=16 {
            let v = assigner.assign(&gt_patch(n)).one_hot();
            assert_eq!(v.iter().sum::<f32>(), 1.0);
        }
    }

    #[test]
    fn test_multichannel_ground_truth_uses_all_channels() {
        let gt = Image::filled(2, 2, 3, 0.3);
        assert_eq!(LabelAssigner::default().assign(&gt), Label::Road);
    }
}
