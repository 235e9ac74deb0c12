use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::image::Patch;
use crate::domain::label::Label;
use crate::domain::sample::TrainingBatch;

/// One (patch, label) pair as handed out by the Burn Dataset trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSample {
    pub patch: Patch,
    pub label: Label,
}

/// Per-class sample counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub not_road: usize,
    pub road:     usize,
}

impl ClassCounts {
    pub fn of(labels: &[Label]) -> Self {
        labels.iter().fold(Self::default(), |mut acc, label| {
            match label {
                Label::NotRoad => acc.not_road += 1,
                Label::Road    => acc.road     += 1,
            }
            acc
        })
    }

    pub fn min(&self) -> usize {
        self.not_road.min(self.road)
    }

    pub fn total(&self) -> usize {
        self.not_road + self.road
    }
}

/// Ordered patches with their labels: `labels[i]` describes `patches[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchDataset {
    patches: Vec<Patch>,
    labels:  Vec<Label>,
}

impl PatchDataset {
    /// Panics if the two sequences are not the same length.
    pub fn new(patches: Vec<Patch>, labels: Vec<Label>) -> Self {
        assert_eq!(
            patches.len(),
            labels.len(),
            "every patch needs exactly one label"
        );
        Self { patches, labels }
    }

    pub fn patches(&self) -> &[Patch] { &self.patches }

    pub fn labels(&self) -> &[Label] { &self.labels }

    pub fn sample_count(&self) -> usize { self.labels.len() }

    pub fn is_empty(&self) -> bool { self.labels.is_empty() }

    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::of(&self.labels)
    }

    /// The samples at `indices`, in that order, read through the
    /// Burn `Dataset` interface. Indices past the end are skipped.
    pub fn samples(&self, indices: &[usize]) -> Vec<PatchSample> {
        indices.iter().filter_map(|&i| self.get(i)).collect()
    }

    /// New dataset holding the samples at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let (patches, labels) = split(self.samples(indices));
        Self { patches, labels }
    }

    /// Gather a training batch from the given sample indices.
    pub fn batch(&self, indices: &[usize]) -> TrainingBatch {
        let (patches, labels) = split(self.samples(indices));
        TrainingBatch { patches, labels }
    }
}

fn split(samples: Vec<PatchSample>) -> (Vec<Patch>, Vec<Label>) {
    samples.into_iter().map(|s| (s.patch, s.label)).unzip()
}

impl Dataset<PatchSample> for PatchDataset {
    fn get(&self, index: usize) -> Option<PatchSample> {
        Some(PatchSample {
            patch: self.patches.get(index)?.clone(),
            label: *self.labels.get(index)?,
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::Image;

    fn tiny(labels: &[Label]) -> PatchDataset {
        let patches = (0..labels.len())
            .map(|i| Image::filled(1, 1, 1, i as f32))
            .collect();
        PatchDataset::new(patches, labels.to_vec())
    }

    #[test]
    fn test_select_keeps_pairs_together() {
        let ds  = tiny(&[Label::Road, Label::NotRoad, Label::Road]);
        let sub = ds.select(&[2, 1]);
        assert_eq!(sub.labels(), &[Label::Road, Label::NotRoad]);
        assert_eq!(sub.patches()[0].data, vec![2.0]);
        assert_eq!(sub.patches()[1].data, vec![1.0]);
    }

    #[test]
    fn test_burn_dataset_get() {
        let ds = tiny(&[Label::NotRoad, Label::Road]);
        assert_eq!(Dataset::len(&ds), 2);
        assert_eq!(ds.get(1).unwrap().label, Label::Road);
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_batch_reads_samples_in_index_order() {
        let ds    = tiny(&[Label::NotRoad, Label::Road, Label::Road, Label::NotRoad]);
        let batch = ds.batch(&[3, 0, 2]);
        assert_eq!(batch.labels, vec![Label::NotRoad, Label::NotRoad, Label::Road]);
        let ids: Vec<f32> = batch.patches.iter().map(|p| p.data[0]).collect();
        assert_eq!(ids, vec![3.0, 0.0, 2.0]);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let ds = tiny(&[Label::Road, Label::NotRoad]);
        assert_eq!(ds.samples(&[1, 5]).len(), 1);
        assert_eq!(ds.batch(&[7]).len(), 0);
    }

    #[test]
    fn test_class_counts() {
        let counts = ClassCounts::of(&[Label::Road, Label::Road, Label::NotRoad]);
        assert_eq!(counts, ClassCounts { not_road: 1, road: 2 });
        assert_eq!(counts.min(), 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    #[should_panic]
    fn test_mismatched_lengths_panic() {
        let _ = PatchDataset::new(vec![Image::filled(1, 1, 1, 0.0)], vec![]);
    }
}
