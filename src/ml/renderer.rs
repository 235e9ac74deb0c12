// ============================================================
// Layer 5 - Prediction Renderer
// ============================================================
// After training (or a restore), run the model over every
// satellite image and write two files per image:
//
//   prediction_<i>.png   binary mask, 0 / 255 grayscale
//   overlay_<i>.png      red mask blended over the image
//
// Overlay pixel = (1 - ALPHA) * image + ALPHA * (road ? red : black)
//
// Only the images directory is read; ground truth plays no part.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::loader::{image_path, FilenamePattern};
use crate::domain::error::PipelineError;
use crate::domain::image::{Image, Mask};
use crate::domain::traits::{ExecutionContext, ImageCodec};

/// Weight of the red mask in the overlay
pub const OVERLAY_ALPHA: f32 = 0.2;

const RED: [f32; 3] = [1.0, 0.0, 0.0];

/// Blend a red road mask over `image`. Grayscale input is expanded
/// to RGB first; the result always has three channels.
pub fn overlay(image: &Image, mask: &Mask) -> Image {
    let (w, h) = (image.width, image.height);
    let mut data = Vec::with_capacity(w * h * 3);

    for y in 0..h {
        for x in 0..w {
            let px  = image.pixel(x, y);
            let rgb = if px.len() >= 3 { [px[0], px[1], px[2]] } else { [px[0]; 3] };
            let road = x < mask.width && y < mask.height && mask.data[y * mask.width + x] != 0;
            for c in 0..3 {
                let tint = if road { RED[c] } else { 0.0 };
                data.push((1.0 - OVERLAY_ALPHA) * rgb[c] + OVERLAY_ALPHA * tint);
            }
        }
    }

    Image { width: w, height: h, channels: 3, data }
}

pub struct PredictionRenderer<'a, C: ImageCodec> {
    codec:      &'a C,
    data_dir:   PathBuf,
    output_dir: PathBuf,
    pattern:    FilenamePattern,
    patch_size: usize,
}

impl<'a, C: ImageCodec> PredictionRenderer<'a, C> {
    /// Images are read from `<data_dir>/images`; `output_dir` is
    /// created if it does not exist.
    pub fn new(
        codec:      &'a C,
        data_dir:   &Path,
        output_dir: impl Into<PathBuf>,
        pattern:    FilenamePattern,
        patch_size: usize,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| PipelineError::io(&output_dir, e))?;
        Ok(Self {
            codec,
            data_dir:   data_dir.to_path_buf(),
            output_dir,
            pattern,
            patch_size,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render indices `1..=count`. Returns how many were written.
    pub fn render_all<E: ExecutionContext>(&self, engine: &E, count: usize) -> Result<usize> {
        tracing::info!("Running prediction on training set");
        let mut rendered = 0;

        for index in 1..=count {
            let path = image_path(&self.data_dir, &self.pattern, index);
            if !path.exists() {
                tracing::warn!("{}", PipelineError::MissingFile { path });
                continue;
            }
            self.render_one(engine, &path, index)?;
            rendered += 1;
        }

        tracing::info!(
            "Wrote {} prediction(s) to '{}'",
            rendered,
            self.output_dir.display()
        );
        Ok(rendered)
    }

    fn render_one<E: ExecutionContext>(&self, engine: &E, path: &Path, index: usize) -> Result<()> {
        let image = self
            .codec
            .decode(path)
            .with_context(|| format!("Cannot decode '{}'", path.display()))?;
        let mask = engine.infer(&image, self.patch_size)?;
        tracing::debug!(
            "{}: {:.1}% road",
            path.display(),
            100.0 * mask.road_fraction()
        );

        self.codec
            .encode(&mask.to_image(), &self.output_dir.join(format!("prediction_{index}.png")))?;
        self.codec
            .encode(&overlay(&image, &mask), &self.output_dir.join(format!("overlay_{index}.png")))?;
        Ok(())
    }
}
