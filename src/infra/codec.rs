// ============================================================
// Layer 6 - PNG Codec
// ============================================================
// The only place that knows about image file formats. Uses the
// `image` crate to decode into our normalised f32 Image and to
// encode Images back to 8-bit PNGs.
//
//   grayscale (L8, La8, L16, La16) → 1 channel
//   anything else                   → 3 channels (alpha dropped)
//
// Samples are divided by 255, so values land in [0, 1].

use anyhow::{Context, Result};
use image::{ColorType, DynamicImage, GrayImage, RgbImage};
use std::path::Path;

use crate::domain::error::PipelineError;
use crate::domain::image::Image;
use crate::domain::traits::ImageCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, path: &Path) -> Result<Image> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(from_dynamic(&img))
    }

    fn encode(&self, image: &Image, path: &Path) -> Result<()> {
        let (w, h) = (image.width as u32, image.height as u32);
        let bytes  = image.to_u8();

        let dynamic = match image.channels {
            1 => GrayImage::from_raw(w, h, bytes).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgb8),
            c => {
                return Err(PipelineError::Configuration(format!(
                    "cannot encode an image with {c} channels"
                ))
                .into())
            }
        }
        .with_context(|| format!("Pixel buffer does not fit {}x{}", w, h))?;

        dynamic
            .save(path)
            .with_context(|| format!("Cannot write image '{}'", path.display()))?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

fn from_dynamic(img: &DynamicImage) -> Image {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let grayscale = matches!(
        img.color(),
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    );

    let (channels, raw) = if grayscale {
        (1, img.to_luma8().into_raw())
    } else {
        (3, img.to_rgb8().into_raw())
    };

    Image {
        width,
        height,
        channels,
        data: raw.into_iter().map(|v| v as f32 / 255.0).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_decodes_to_one_channel() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mask.png");
        GrayImage::from_fn(3, 2, |x, _| image::Luma([if x == 0 { 255 } else { 0 }]))
            .save(&path)
            .unwrap();

        let img = PngCodec.decode(&path).unwrap();
        assert_eq!((img.width, img.height, img.channels), (3, 2, 1));
        assert_eq!(img.data, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encoded_rgb_reads_back() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rgb.png");
        let img  = Image::new(1, 1, 3, vec![1.0, 0.0, 0.2]).unwrap();

        PngCodec.encode(&img, &path).unwrap();
        let back = PngCodec.decode(&path).unwrap();
        assert_eq!(back.channels, 3);
        assert_eq!(back.to_u8(), vec![255, 0, 51]);
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(PngCodec.decode(Path::new("/nonexistent/satImage_001.png")).is_err());
    }

    #[test]
    fn test_two_channel_images_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let img = Image::filled(2, 2, 2, 0.0);
        assert!(PngCodec.encode(&img, &tmp.path().join("x.png")).is_err());
    }
}
