//! Closed emotion label set and fixed-size emotion vectors
//!
//! Emotion labels are a closed, versioned enum rather than an open
//! string-keyed map. Every vector in the engine is a fixed-length array
//! indexed by [`Emotion`], so a typo in a label is a compile error instead
//! of a silent "ghost" emotion dimension.

use serde::{Deserialize, Serialize};

/// Number of emotion labels in the current schema
pub const EMOTION_COUNT: usize = 8;

/// Version of the emotion label set. Bump when labels are added or
/// reordered; persisted vectors are positional.
pub const EMOTION_SCHEMA_VERSION: u8 = 1;

// ============================================================================
// EMOTION LABELS
// ============================================================================

/// The closed set of emotion labels tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    /// Joy, delight, contentment
    Joy,
    /// Sadness, grief, loss
    Sadness,
    /// Anger, irritation, resentment
    Anger,
    /// Fear, dread
    Fear,
    /// Anxiety, worry, unease
    Anxiety,
    /// Calm, relaxation, relief
    Calm,
    /// Surprise, astonishment
    Surprise,
    /// Disgust, aversion
    Disgust,
}

impl Emotion {
    /// All labels, in vector index order
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Anxiety,
        Emotion::Calm,
        Emotion::Surprise,
        Emotion::Disgust,
    ];

    /// Position of this label in an [`EmotionVector`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Anxiety => "anxiety",
            Emotion::Calm => "calm",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "joy" => Some(Emotion::Joy),
            "sadness" => Some(Emotion::Sadness),
            "anger" => Some(Emotion::Anger),
            "fear" => Some(Emotion::Fear),
            "anxiety" => Some(Emotion::Anxiety),
            "calm" => Some(Emotion::Calm),
            "surprise" => Some(Emotion::Surprise),
            "disgust" => Some(Emotion::Disgust),
            _ => None,
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// EMOTION VECTOR
// ============================================================================

/// A fixed-length vector over the closed emotion label set
///
/// Component `i` holds the weight for `Emotion::ALL[i]`. Serialized as a
/// plain positional array; the label order is part of
/// [`EMOTION_SCHEMA_VERSION`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EmotionVector(pub [f64; EMOTION_COUNT]);

impl EmotionVector {
    /// The zero vector
    pub fn zero() -> Self {
        Self([0.0; EMOTION_COUNT])
    }

    /// Build a vector with a single nonzero component
    pub fn single(emotion: Emotion, weight: f64) -> Self {
        let mut v = Self::zero();
        v.0[emotion.index()] = weight;
        v
    }

    /// Component for one label
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.0[emotion.index()]
    }

    /// Accumulate weight into one label's component
    pub fn add(&mut self, emotion: Emotion, weight: f64) {
        self.0[emotion.index()] += weight;
    }

    /// Sum of all components
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Euclidean (L2) magnitude
    pub fn magnitude(&self) -> f64 {
        self.0.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Scale every component so the vector sums to 1.
    /// The zero vector stays zero.
    pub fn normalized_to_sum(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return *self;
        }
        let mut out = *self;
        for x in out.0.iter_mut() {
            *x /= total;
        }
        out
    }

    /// Scale to unit Euclidean length. The zero vector stays zero.
    pub fn normalized_l2(&self) -> Self {
        let mag = self.magnitude();
        if mag <= 0.0 {
            return *self;
        }
        let mut out = *self;
        for x in out.0.iter_mut() {
            *x /= mag;
        }
        out
    }

    /// Euclidean distance to another vector
    pub fn euclidean_distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// The label with the largest component (ties resolve to the earlier
    /// label in enum order)
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::ALL[0];
        let mut best_value = self.0[0];
        for &emotion in Emotion::ALL.iter().skip(1) {
            let value = self.0[emotion.index()];
            if value > best_value {
                best = emotion;
                best_value = value;
            }
        }
        best
    }

    /// Largest single component. Used as the "intensity" of a snapshot.
    pub fn peak(&self) -> f64 {
        self.0.iter().fold(0.0_f64, |acc, &x| acc.max(x))
    }

    /// Mean of the components for the given labels only
    pub fn mean_over(&self, labels: &[Emotion]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        labels.iter().map(|e| self.get(*e)).sum::<f64>() / labels.len() as f64
    }

    /// Elementwise mean of a set of vectors. Empty input yields zero.
    pub fn mean_of(vectors: &[EmotionVector]) -> Self {
        if vectors.is_empty() {
            return Self::zero();
        }
        let mut out = Self::zero();
        for v in vectors {
            for (acc, x) in out.0.iter_mut().zip(v.0.iter()) {
                *acc += x;
            }
        }
        for x in out.0.iter_mut() {
            *x /= vectors.len() as f64;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip() {
        for emotion in Emotion::ALL {
            assert_eq!(Emotion::parse_name(emotion.as_str()), Some(emotion));
        }
        assert_eq!(Emotion::parse_name("boredom"), None);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, emotion) in Emotion::ALL.iter().enumerate() {
            assert_eq!(emotion.index(), i);
        }
    }

    #[test]
    fn test_sum_normalization() {
        let mut v = EmotionVector::zero();
        v.add(Emotion::Joy, 3.0);
        v.add(Emotion::Fear, 1.0);

        let n = v.normalized_to_sum();
        assert!((n.sum() - 1.0).abs() < 1e-9);
        assert!((n.get(Emotion::Joy) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vector_stays_zero() {
        let v = EmotionVector::zero();
        assert_eq!(v.normalized_to_sum(), EmotionVector::zero());
        assert_eq!(v.normalized_l2(), EmotionVector::zero());
    }

    #[test]
    fn test_dominant_and_peak() {
        let mut v = EmotionVector::zero();
        v.add(Emotion::Anxiety, 0.9);
        v.add(Emotion::Calm, 0.2);

        assert_eq!(v.dominant(), Emotion::Anxiety);
        assert!((v.peak() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = EmotionVector::single(Emotion::Joy, 1.0);
        let b = EmotionVector::single(Emotion::Sadness, 1.0);
        assert!((a.euclidean_distance(&b) - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!(a.euclidean_distance(&a) < 1e-12);
    }

    #[test]
    fn test_mean_of() {
        let a = EmotionVector::single(Emotion::Joy, 1.0);
        let b = EmotionVector::single(Emotion::Joy, 0.5);
        let mean = EmotionVector::mean_of(&[a, b]);
        assert!((mean.get(Emotion::Joy) - 0.75).abs() < 1e-9);
    }
}
