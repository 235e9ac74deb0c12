// ============================================================
// Layer 4 - Class Balancer
// ============================================================
// Road patches are usually far rarer than background patches.
// Training on the raw mix would let the model score well by
// always answering "not road", so we cut both classes down to
// the size of the smaller one.
//
// Selection is deterministic, not random:
//
//   labels:   R N N R N N R N      (R = road, N = not road)
//   class 0:  1 2 4 5 7            → first 3: 1 2 4
//   class 1:  0 3 6                → first 3: 0 3 6
//   result:   1 2 4 0 3 6          (all class 0, then all class 1)
//
// The result is grouped by class, so the training loop must
// shuffle before batching. The epoch permutation does exactly that.

use crate::data::dataset::{ClassCounts, PatchDataset};
use crate::domain::label::Label;

/// Indices of a class-balanced subset: the first `min_c` not-road
/// samples followed by the first `min_c` road samples, each group
/// in original order.
pub fn balance_indices(labels: &[Label]) -> Vec<usize> {
    let class0: Vec<usize> = indices_of(labels, Label::NotRoad);
    let class1: Vec<usize> = indices_of(labels, Label::Road);
    let min_c = class0.len().min(class1.len());

    class0
        .into_iter()
        .take(min_c)
        .chain(class1.into_iter().take(min_c))
        .collect()
}

/// Apply [`balance_indices`] to both patches and labels.
pub fn balance(dataset: &PatchDataset) -> PatchDataset {
    let before  = dataset.class_counts();
    let indices = balance_indices(dataset.labels());
    let balanced = dataset.select(&indices);
    let after   = balanced.class_counts();

    log_counts("before balancing", before);
    log_counts("after balancing", after);
    balanced
}

fn indices_of(labels: &[Label], class: Label) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == class)
        .map(|(i, _)| i)
        .collect()
}

fn log_counts(stage: &str, counts: ClassCounts) {
    tracing::info!(
        "Data points per class {}: c0 = {} c1 = {}",
        stage,
        counts.not_road,
        counts.road
    );
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::Image;
    use crate::domain::label::Label::{NotRoad as N, Road as R};

    #[test]
    fn test_worked_example() {
        let labels = [R, N, N, R, N, N, R, N];
        assert_eq!(balance_indices(&labels), vec![1, 2, 4, 0, 3, 6]);
    }

    #[test]
    fn test_equal_counts_and_in_order_subsequence() {
        let labels = [N, R, R, N, R, R, R, N, R, R];
        let idx    = balance_indices(&labels);
        let counts = ClassCounts::of(&labels);

        let picked: Vec<Label> = idx.iter().map(|&i| labels[i]).collect();
        let got = ClassCounts::of(&picked);
        assert_eq!(got.not_road, counts.min());
        assert_eq!(got.road,     counts.min());

        // Within each class the indices are strictly increasing
        let (c0, c1) = idx.split_at(counts.min());
        assert!(c0.windows(2).all(|w| w[0] < w[1]));
        assert!(c1.windows(2).all(|w| w[0] < w[1]));
        // and they are the earliest occurrences
        assert_eq!(c1, &[1, 2, 4]);
    }

    #[test]
    fn test_missing_class_gives_empty_result() {
        assert!(balance_indices(&[R, R, R]).is_empty());
        assert!(balance_indices(&[]).is_empty());
    }

    #[test]
    fn test_balance_applies_to_patches_too() {
        let labels = vec![R, R, N];
        let patches = (0..3).map(|i| Image::filled(1, 1, 1, i as f32)).collect();
        let ds = PatchDataset::new(patches, labels);

        let balanced = balance(&ds);
        assert_eq!(balanced.labels(), &[N, R]);
        assert_eq!(balanced.patches()[0].data, vec![2.0]);
        assert_eq!(balanced.patches()[1].data, vec![0.0]);
    }
}
