// ============================================================
// Layer 4 - Dataset Builder
// ============================================================
// Loads satellite images and their ground-truth masks, tiles
// both into patches, and labels every ground-truth patch.
//
// Directory layout (indices are 1-based, zero-padded to 3):
//
//   <data_dir>/
//     images/       satImage_001.png  satImage_002.png ...
//     groundtruth/  satImage_001.png  satImage_002.png ...
//
// Ordering is what ties a patch to its label:
//   images in ascending index order, and inside each image the
//   patches in row-major order. Image patches and ground-truth
//   patches are walked with the same extractor, so patch i and
//   label i always come from the same pixels.
//
// Missing files are not fatal. If either the image or its
// ground truth is absent, the whole index is skipped with a
// warning and the dataset is simply smaller. Skipping the pair
// (not just one side) keeps patches and labels aligned.
//
// The first loaded image fixes the expected size. Any later
// image of a different size is a configuration error rather than
// being tiled into a different number of patches.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::data::dataset::PatchDataset;
use crate::data::labeler::LabelAssigner;
use crate::domain::patches::PatchExtractor;
use crate::domain::error::PipelineError;
use crate::domain::image::{Image, Patch};
use crate::domain::label::Label;
use crate::domain::traits::ImageCodec;

/// Sub-directory holding the satellite images
pub const IMAGES_SUBDIR: &str = "images";

/// Sub-directory holding the ground-truth masks
pub const GROUNDTRUTH_SUBDIR: &str = "groundtruth";

// ─── FilenamePattern ──────────────────────────────────────────────────────────
/// `<prefix><index:03>.<extension>`, e.g. `satImage_007.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern {
    prefix:    String,
    extension: String,
}

impl Default for FilenamePattern {
    fn default() -> Self {
        Self::new("satImage_")
    }
}

impl FilenamePattern {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), extension: "png".to_string() }
    }

    pub fn name(&self, index: usize) -> String {
        format!("{}{:03}.{}", self.prefix, index, self.extension)
    }
}

// ─── LoadedDataset ────────────────────────────────────────────────────────────
/// Everything the builder produces.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub dataset:           PatchDataset,
    /// (width / P) * (height / P) of the reference image
    pub patches_per_image: usize,
    /// Indices that were actually loaded, ascending
    pub image_indices:     Vec<usize>,
}

// ─── DatasetBuilder ───────────────────────────────────────────────────────────
pub struct DatasetBuilder<'a, C: ImageCodec> {
    codec:     &'a C,
    extractor: PatchExtractor,
    assigner:  LabelAssigner,
    pattern:   FilenamePattern,
}

/// Dimensions every image in one dataset must share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shape {
    width:    usize,
    height:   usize,
    channels: usize,
}

impl Shape {
    fn of(image: &Image) -> Self {
        Self { width: image.width, height: image.height, channels: image.channels }
    }
}

impl<'a, C: ImageCodec> DatasetBuilder<'a, C> {
    pub fn new(
        codec:      &'a C,
        patch_size: usize,
        pattern:    FilenamePattern,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            codec,
            extractor: PatchExtractor::new(patch_size)?,
            assigner:  LabelAssigner::default(),
            pattern,
        })
    }

    pub fn with_assigner(mut self, assigner: LabelAssigner) -> Self {
        self.assigner = assigner;
        self
    }

    /// Load indices `1..=count` from `data_dir` and build the dataset.
    pub fn build(&self, data_dir: &Path, count: usize) -> Result<LoadedDataset> {
        let mut patches: Vec<Patch> = Vec::new();
        let mut labels:  Vec<Label> = Vec::new();
        let mut loaded:  Vec<usize> = Vec::new();

        let mut image_shape: Option<Shape> = None;
        let mut truth_shape: Option<Shape> = None;

        for index in 1..=count {
            let (image_path, truth_path) = match self.locate_pair(data_dir, index) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!("Skipping index {}: {}", index, e);
                    continue;
                }
            };

            tracing::info!("Loading {}", image_path.display());
            let image = self.codec.decode(&image_path)?;
            let truth = self.codec.decode(&truth_path)?;

            check_shape(&mut image_shape, &image, &image_path)?;
            check_shape(&mut truth_shape, &truth, &truth_path)?;
            if (image.width, image.height) != (truth.width, truth.height) {
                return Err(PipelineError::Configuration(format!(
                    "ground truth {} is {}x{} but its image is {}x{}",
                    truth_path.display(), truth.width, truth.height,
                    image.width, image.height
                )).into());
            }

            patches.extend(self.extractor.patches(&image));
            labels.extend(
                self.extractor
                    .patches(&truth)
                    .map(|gt| self.assigner.assign(&gt)),
            );
            loaded.push(index);
        }

        let patches_per_image = image_shape
            .map(|s| self.extractor.patches_per_image(s.width, s.height))
            .unwrap_or(0);

        tracing::info!(
            "Loaded {} of {} image pairs → {} patches ({} per image)",
            loaded.len(),
            count,
            patches.len(),
            patches_per_image,
        );

        Ok(LoadedDataset {
            dataset: PatchDataset::new(patches, labels),
            patches_per_image,
            image_indices: loaded,
        })
    }

    /// Paths of the image and ground truth for `index`, or the
    /// first one found missing.
    fn locate_pair(&self, data_dir: &Path, index: usize) -> Result<(PathBuf, PathBuf), PipelineError> {
        let name  = self.pattern.name(index);
        let image = data_dir.join(IMAGES_SUBDIR).join(&name);
        let truth = data_dir.join(GROUNDTRUTH_SUBDIR).join(&name);

        for path in [&image, &truth] {
            if !path.is_file() {
                return Err(PipelineError::MissingFile { path: path.clone() });
            }
        }
        Ok((image, truth))
    }
}

/// Record the first shape seen, then insist every later image matches it.
fn check_shape(expected: &mut Option<Shape>, image: &Image, path: &Path) -> Result<()> {
    let shape = Shape::of(image);
    let first = *expected.get_or_insert(shape);
    if first == shape {
        return Ok(());
    }
    Err(PipelineError::Configuration(format!(
        "{} is {}x{}x{} but the dataset was sized from a {}x{}x{} image",
        path.display(),
        shape.width, shape.height, shape.channels,
        first.width, first.height, first.channels,
    )))
    .with_context(|| "mixed image sizes in one dataset")
}

/// Path of the satellite image for `index` under `data_dir`.
pub fn image_path(data_dir: &Path, pattern: &FilenamePattern, index: usize) -> PathBuf {
    data_dir.join(IMAGES_SUBDIR).join(pattern.name(index))
}
