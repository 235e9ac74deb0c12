// ============================================================
// Layer 3 - Patch Label
// ============================================================
// Each patch belongs to exactly one of two classes. Using an
// enum rather than a raw [f32; 2] means a label can never be
// "half road": the one-hot vector is derived on demand.
//
//   NotRoad → [1, 0]   (class index 0)
//   Road    → [0, 1]   (class index 1)

use serde::{Deserialize, Serialize};

/// Number of classes the model distinguishes.
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    NotRoad,
    Road,
}

impl Label {
    /// 0 for not-road, 1 for road. Matches the one-hot position.
    pub fn class_index(self) -> usize {
        match self {
            Label::NotRoad => 0,
            Label::Road    => 1,
        }
    }

    pub fn from_class_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::NotRoad),
            1 => Some(Label::Road),
            _ => None,
        }
    }

    pub fn one_hot(self) -> [f32; NUM_CLASSES] {
        match self {
            Label::NotRoad => [1.0, 0.0],
            Label::Road    => [0.0, 1.0],
        }
    }

    /// Pick the class with the highest score. Ties go to not-road,
    /// the same as a first-max argmax.
    pub fn from_scores(scores: [f32; NUM_CLASSES]) -> Self {
        if scores[1] > scores[0] { Label::Road } else { Label::NotRoad }
    }
}
