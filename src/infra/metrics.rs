// ============================================================
// Layer 6 - Training Metrics
// ============================================================
// Two things live here:
//
//   error_rate()   → percentage of a minibatch the model got wrong
//   MetricsLogger  → appends one CSV row per recording step
//
// Output file: <train_dir>/training_log.csv
//
// Example CSV output:
//   epoch,step,epoch_fraction,loss,learning_rate,error_rate
//   1,0,0.000000,0.693147,0.010000,50.000000
//   1,1000,0.640000,0.412871,0.010000,18.750000
//   ...
//
// The error rate is only ever logged. Nothing in the training
// loop branches on it.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::error::PipelineError;
use crate::domain::label::{Label, NUM_CLASSES};

const HEADER: &str = "epoch,step,epoch_fraction,loss,learning_rate,error_rate";

/// Percentage of samples whose argmax prediction differs from the
/// true class. 0.0 for an empty batch.
pub fn error_rate(predictions: &[[f32; NUM_CLASSES]], labels: &[Label]) -> f64 {
    let n = predictions.len().min(labels.len());
    if n == 0 {
        return 0.0;
    }
    let wrong = predictions
        .iter()
        .zip(labels)
        .filter(|(scores, truth)| Label::from_scores(**scores) != **truth)
        .count();
    100.0 * wrong as f64 / n as f64
}

/// One row of the metrics log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    /// 1-based epoch number
    pub epoch:          usize,
    /// Step within the epoch
    pub step:           usize,
    /// Epochs completed so far, e.g. 1.64
    pub epoch_fraction: f64,
    pub loss:           f64,
    pub learning_rate:  f64,
    /// Minibatch error in percent
    pub error_rate:     f64,
}

/// Appends StepMetrics rows to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header if the file is new, so several runs in
    /// the same directory append to one log.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        let csv_path = dir.join("training_log.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .map_err(|e| PipelineError::io(&csv_path, e))?;
            writeln!(f, "{HEADER}").map_err(|e| PipelineError::io(&csv_path, e))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| PipelineError::io(&self.csv_path, e))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.step, m.epoch_fraction, m.loss, m.learning_rate, m.error_rate,
        )
        .map_err(|e| PipelineError::io(&self.csv_path, e))?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_rate() {
        let preds  = [[0.9, 0.1], [0.2, 0.8], [0.6, 0.4], [0.3, 0.7]];
        let labels = [Label::NotRoad, Label::Road, Label::Road, Label::NotRoad];
        assert_eq!(error_rate(&preds, &labels), 50.0);
    }

    #[test]
    fn test_error_rate_perfect_and_empty() {
        let preds = [[0.0, 1.0]];
        assert_eq!(error_rate(&preds, &[Label::Road]), 0.0);
        assert_eq!(error_rate(&[], &[]), 0.0);
    }

    #[test]
    fn test_logger_appends_rows() {
        let tmp    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        let row = StepMetrics {
            epoch: 1, step: 0, epoch_fraction: 0.0,
            loss: 0.5, learning_rate: 0.01, error_rate: 25.0,
        };
        logger.log(&row).unwrap();
        logger.log(&StepMetrics { step: 10, ..row }).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("1,10,"));
    }

    #[test]
    fn test_second_logger_keeps_existing_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let row = StepMetrics {
            epoch: 2, step: 3, epoch_fraction: 1.5,
            loss: 0.1, learning_rate: 0.0095, error_rate: 0.0,
        };
        MetricsLogger::new(tmp.path()).unwrap().log(&row).unwrap();
        let again = MetricsLogger::new(tmp.path()).unwrap();
        let text  = fs::read_to_string(again.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
