//! Commits a plaintext embedding to storage under an owner's public key.

use crate::{HomomorphicScheme, Result};

use rayon::prelude::*;

/// What gets stored for one enrolled face.
///
/// `ciphertexts[i]` hides `v[i]` and `sum_of_squares` hides `Σ v[i]²`,
/// all produced under the same public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedEmbedding<C> {
    ciphertexts: Vec<C>,
    sum_of_squares: C,
}

impl<C> EncryptedEmbedding<C> {
    #[must_use]
    pub const fn new(ciphertexts: Vec<C>, sum_of_squares: C) -> Self {
        Self {
            ciphertexts,
            sum_of_squares,
        }
    }

    #[must_use]
    pub fn ciphertexts(&self) -> &[C] {
        &self.ciphertexts
    }

    #[must_use]
    pub const fn sum_of_squares(&self) -> &C {
        &self.sum_of_squares
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.ciphertexts.len()
    }

    /// Iterates over every ciphertext of the record, sum included.
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        core::iter::once(&self.sum_of_squares).chain(self.ciphertexts.iter())
    }
}

/// Encrypts `embedding` entry-wise under `pk`, along with its sum of squares.
///
/// The sum of squares is computed in the clear and encrypted once,
/// it is not derived homomorphically from the entries.
///
/// ## Errors
///
/// `EncodingOverflow` if any entry, or the sum, is outside the codec range.
///
/// ## Examples
///
/// ```
/// use cryptoface::prelude::*;
///
/// let scheme = Paillier::new(Parameters::new(128, 32));
/// let (pk, sk) = scheme.generate_keys().unwrap();
///
/// let encrypted = encode_embedding(&scheme, &[0.6, -0.8], &pk).unwrap();
/// assert_eq!(encrypted.dimension(), 2);
/// let sum = scheme.decrypt(encrypted.sum_of_squares(), &sk).unwrap();
/// assert!((sum - 1.0).abs() < 1e-6);
/// ```
pub fn encode_embedding<S: HomomorphicScheme>(
    scheme: &S,
    embedding: &[f64],
    pk: &S::PublicKey,
) -> Result<EncryptedEmbedding<S::Ciphertext>> {
    let sum: f64 = embedding.iter().map(|v| v * v).sum();

    let ciphertexts = embedding
        .par_iter()
        .map(|&v| scheme.encrypt(v, pk))
        .collect::<Result<Vec<_>>>()?;
    let sum_of_squares = scheme.encrypt(sum, pk)?;

    Ok(EncryptedEmbedding::new(ciphertexts, sum_of_squares))
}
