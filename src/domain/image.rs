// ============================================================
// Layer 3 - Image, Patch and Mask
// ============================================================
// An Image is a dense grid of f32 pixels stored row-major with
// interleaved channels (HWC):
//
//   data[(y * width + x) * channels + c]
//
// Values are normalised to [0, 1] by the codec before they get
// here. A Patch is just a small square Image, so both share the
// same type. A Mask is the binary road / not-road prediction for
// every pixel of a full-resolution image.

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;
use crate::domain::label::Label;

/// A decoded raster image with pixel values in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub width:    usize,
    pub height:   usize,
    pub channels: usize,
    /// HWC pixel buffer, `width * height * channels` long
    pub data:     Vec<f32>,
}

/// A square sub-tile of an [`Image`].
pub type Patch = Image;

impl Image {
    /// Build an image from a raw HWC buffer.
    /// Fails if the buffer length does not match the dimensions.
    pub fn new(
        width:    usize,
        height:   usize,
        channels: usize,
        data:     Vec<f32>,
    ) -> Result<Self, PipelineError> {
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(PipelineError::Configuration(format!(
                "pixel buffer has {} values, expected {}x{}x{} = {}",
                data.len(), width, height, channels, expected
            )));
        }
        Ok(Self { width, height, channels, data })
    }

    /// An image with every value set to `value`.
    pub fn filled(width: usize, height: usize, channels: usize, value: f32) -> Self {
        Self { width, height, channels, data: vec![value; width * height * channels] }
    }

    /// All channel values of the pixel at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Copy out the `w` x `h` region whose top-left corner is (x, y).
    /// The region must lie entirely inside the image.
    pub fn crop(&self, x: usize, y: usize, w: usize, h: usize) -> Image {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let row_len = w * self.channels;
        let mut data = Vec::with_capacity(h * row_len);
        for row in y..y + h {
            let start = (row * self.width + x) * self.channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Image { width: w, height: h, channels: self.channels, data }
    }

    /// Mean over every pixel and channel. 0.0 for an empty image.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Same dimensions and channel count as `other`.
    pub fn same_shape(&self, other: &Image) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.channels == other.channels
    }

    /// Convert to 8-bit samples, clamping to [0, 1] first.
    pub fn to_u8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}

/// Full-resolution binary prediction: 1 = road, 0 = not road.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub width:  usize,
    pub height: usize,
    pub data:   Vec<u8>,
}

impl Mask {
    /// Rebuild a mask from per-patch labels given in row-major patch order.
    ///
    /// Every pixel of patch k takes the class index of `labels[k]`.
    /// Pixels outside the last full tile in either direction stay 0.
    pub fn from_patch_labels(
        width:      usize,
        height:     usize,
        patch_size: usize,
        labels:     &[Label],
    ) -> Self {
        let mut data = vec![0u8; width * height];
        let cols = if patch_size == 0 { 0 } else { width / patch_size };

        for (k, label) in labels.iter().enumerate() {
            if cols == 0 {
                break;
            }
            let value = label.class_index() as u8;
            if value == 0 {
                continue;
            }
            let (py, px) = (k / cols, k % cols);
            for y in py * patch_size..(py + 1) * patch_size {
                let row = y * width;
                for x in px * patch_size..(px + 1) * patch_size {
                    data[row + x] = value;
                }
            }
        }

        Self { width, height, data }
    }

    /// Fraction of pixels predicted as road.
    pub fn road_fraction(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|&&v| v == 1).count() as f32 / self.data.len() as f32
    }

    /// Single-channel image with road pixels at 1.0 and the rest at 0.0.
    pub fn to_image(&self) -> Image {
        Image {
            width:    self.width,
            height:   self.height,
            channels: 1,
            data:     self.data.iter().map(|&v| v as f32).collect(),
        }
    }
}
