//! Face embeddings and the extractor that produces them.

use crate::Result;

use core::ops::Deref;
use std::path::Path;

/// A fixed-length real vector representing one face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    #[must_use]
    pub const fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Plaintext `Σ v[i]²`.
    #[must_use]
    pub fn sum_of_squares(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum()
    }

    /// Plaintext squared euclidean distance, `None` if dimensions differ.
    #[must_use]
    pub fn squared_distance(&self, other: &Self) -> Option<f64> {
        (self.dimension() == other.dimension()).then(|| {
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum()
        })
    }

    /// Random unit-norm embedding, shaped like the output of a face model.
    pub fn random_normalized(dimension: usize, rng: &mut impl rand::Rng) -> Self {
        let mut values: Vec<f64> = (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Self(values)
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl Deref for Embedding {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extracts a face embedding from an image file.
///
/// Implementations wrap a pretrained model. They must be deterministic
/// for a given image and return vectors of one fixed dimension.
pub trait Embedder: Send + Sync {
    /// ## Errors
    ///
    /// `InvalidImage` if the file cannot be read or holds no detectable face.
    fn embed(&self, image: &Path) -> Result<Embedding>;
}
