// ============================================================
// Layer 4 - Patch Batcher
// ============================================================
// Implements Burn's Batcher trait to stack PatchSamples into
// tensors the CNN can consume.
//
// Patches are stored HWC (pixel by pixel, channels interleaved)
// but Burn's Conv2d expects NCHW, so each patch is transposed
// while it is flattened:
//
//   HWC  data[(y * P + x) * C + c]
//   CHW  data[(c * P + y) * P + x]
//
// Input:  Vec of N PatchSamples, each P x P x C
// Output: PatchBatch { images: [N, C, P, P], targets: [N] }

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::PatchSample;
use crate::domain::image::Patch;

// ─── PatchBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PatchBatch<B: Backend> {
    /// Pixel values, shape [batch, channels, P, P]
    pub images:  Tensor<B, 4>,
    /// Class indices (0 = not road, 1 = road), shape [batch]
    pub targets: Tensor<B, 1, Int>,
}

// ─── PatchBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct PatchBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> PatchBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack patches alone, for inference where there are no targets.
    /// All patches must share one size and channel count.
    pub fn images(&self, patches: &[Patch], device: &B::Device) -> Tensor<B, 4> {
        let n = patches.len();
        let (side, channels) = patches
            .first()
            .map(|p| (p.width, p.channels))
            .unwrap_or((0, 0));

        let mut flat = Vec::with_capacity(n * channels * side * side);
        for patch in patches {
            flat.extend(hwc_to_chw(patch));
        }

        Tensor::<B, 1>::from_floats(flat.as_slice(), device)
            .reshape([n, channels, side, side])
    }
}

impl<B: Backend> Batcher<B, PatchSample, PatchBatch<B>> for PatchBatcher<B> {
    fn batch(&self, items: Vec<PatchSample>, device: &B::Device) -> PatchBatch<B> {
        let targets: Vec<i64> = items
            .iter()
            .map(|s| s.label.class_index() as i64)
            .collect();
        let patches: Vec<Patch> = items.into_iter().map(|s| s.patch).collect();

        PatchBatch {
            images:  self.images(&patches, device),
            targets: Tensor::<B, 1, Int>::from_ints(targets.as_slice(), device),
        }
    }
}

impl<B: Backend> PatchBatcher<B> {
    /// Batch on the device this batcher was created for.
    pub fn batch_on_device(&self, items: Vec<PatchSample>) -> PatchBatch<B> {
        self.batch(items, &self.device)
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

fn hwc_to_chw(patch: &Patch) -> impl Iterator<Item = f32> + '_ {
    let (w, h, c) = (patch.width, patch.height, patch.channels);
    (0..c).flat_map(move |ch| {
        (0..h).flat_map(move |y| (0..w).map(move |x| patch.data[(y * w + x) * c + ch]))
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::Image;
    use crate::domain::label::Label;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes() {
        let batcher = PatchBatcher::<TestBackend>::new(Default::default());
        let items = vec![
            PatchSample { patch: Image::filled(4, 4, 3, 0.5), label: Label::Road },
            PatchSample { patch: Image::filled(4, 4, 3, 0.1), label: Label::NotRoad },
        ];

        let batch = batcher.batch_on_device(items);
        assert_eq!(batch.images.dims(), [2, 3, 4, 4]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets = batch.targets.into_data().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![1, 0]);
    }

    #[test]
    fn test_channels_are_moved_first() {
        // 1x2 patch (two pixels), two channels: HWC = [a0 a1 b0 b1]
        let patch = Image::new(2, 1, 2, vec![1.0, 10.0, 2.0, 20.0]).unwrap();
        let chw: Vec<f32> = hwc_to_chw(&patch).collect();
        assert_eq!(chw, vec![1.0, 2.0, 10.0, 20.0]);
    }
}
