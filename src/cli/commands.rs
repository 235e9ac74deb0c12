// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `predict`.
//
// Both share the path and model-shape flags (PathArgs,
// ModelArgs) so a `predict` run can rebuild exactly the network
// a `train` run saved.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the patch classifier, then render predictions
    Train(TrainArgs),

    /// Render predictions with the saved checkpoint, no training
    Predict(PredictArgs),
}

/// Where things are read from and written to.
#[derive(Args, Debug, Clone)]
pub struct PathArgs {
    /// Directory containing images/ and groundtruth/
    #[arg(long, default_value = "training")]
    pub data_dir: PathBuf,

    /// Directory for model.ckpt, train_config.json and training_log.csv
    #[arg(long, default_value = "train_dir")]
    pub train_dir: PathBuf,

    /// Directory for prediction_<i>.png and overlay_<i>.png
    #[arg(long, default_value = "predictions_training")]
    pub predictions_dir: PathBuf,

    /// File name prefix; files are <prefix><index:03>.png
    #[arg(long, default_value = "satImage_")]
    pub image_prefix: String,

    /// Number of images to use, indices 1..=N
    #[arg(long, default_value_t = 20)]
    pub training_size: usize,
}

/// Everything that fixes the network's shape.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Patch side in pixels, a multiple of 4
    #[arg(long, default_value_t = 16)]
    pub patch_size: usize,

    /// 1 for grayscale, 3 for RGB
    #[arg(long, default_value_t = 3)]
    pub num_channels: usize,

    /// Width of the fully connected hidden layer
    #[arg(long, default_value_t = 512)]
    pub hidden_units: usize,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Patches per optimisation step
    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Full passes over the balanced patch set
    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Log minibatch metrics every N steps
    #[arg(long, default_value_t = 1000)]
    pub recording_step: usize,

    /// Load the saved checkpoint instead of training
    #[arg(long)]
    pub restore: bool,

    /// Seed for the per-epoch shuffles
    #[arg(long, default_value_t = 66478)]
    pub seed: u64,

    /// Starting learning rate
    #[arg(long, default_value_t = 0.01)]
    pub learning_rate: f64,

    /// Learning-rate multiplier applied after each pass over the data
    #[arg(long, default_value_t = 0.95)]
    pub lr_decay: f64,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

fn base_config(paths: PathArgs, model: ModelArgs) -> TrainConfig {
    TrainConfig {
        data_dir:        paths.data_dir,
        train_dir:       paths.train_dir,
        predictions_dir: paths.predictions_dir,
        image_prefix:    paths.image_prefix,
        training_size:   paths.training_size,
        patch_size:      model.patch_size,
        num_channels:    model.num_channels,
        hidden_units:    model.hidden_units,
        ..TrainConfig::default()
    }
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            recording_step: a.recording_step,
            restore:        a.restore,
            seed:           a.seed,
            learning_rate:  a.learning_rate,
            lr_decay:       a.lr_decay,
            ..base_config(a.paths, a.model)
        }
    }
}

impl From<PredictArgs> for TrainConfig {
    fn from(a: PredictArgs) -> Self {
        TrainConfig { restore: true, ..base_config(a.paths, a.model) }
    }
}
