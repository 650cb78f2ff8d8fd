//! Squared euclidean distance between a plaintext query and an encrypted embedding.
//!
//! Uses `‖q − t‖² = Σ q[i]² − 2·Σ q[i]·t[i] + Σ t[i]²` where only `t` is encrypted:
//!
//! - `Σ q[i]²` is computed in the clear and freshly encrypted,
//! - every cross term is the stored `Enc(t[i])` scaled by the plaintext `−2·q[i]`,
//! - the stored `Enc(Σ t[i]²)` is added once.
//!
//! Nothing is ever decrypted here. The fresh encryption also re-randomizes the result.

use crate::encoder::EncryptedEmbedding;
use crate::{Error, HomomorphicScheme, Result};

use rayon::prelude::*;

/// Computes `Enc(‖query − t‖²)` for the embedding `t` hidden in `target`.
///
/// ## Errors
///
/// * `DimensionMismatch` if `query` and `target` have different lengths.
/// * `KeyMismatch` if any stored ciphertext was not produced under `pk`.
/// * `EncodingOverflow` if a query entry is outside the codec range.
///
/// ## Examples
///
/// ```
/// use cryptoface::prelude::*;
///
/// let scheme = Paillier::new(Parameters::new(128, 32));
/// let (pk, sk) = scheme.generate_keys().unwrap();
///
/// let target = encode_embedding(&scheme, &[1.0, 2.0], &pk).unwrap();
/// let distance = secure_distance(&scheme, &[0.0, 4.0], &target, &pk).unwrap();
///
/// assert!((scheme.decrypt(&distance, &sk).unwrap() - 5.0).abs() < 1e-6);
/// ```
pub fn secure_distance<S: HomomorphicScheme>(
    scheme: &S,
    query: &[f64],
    target: &EncryptedEmbedding<S::Ciphertext>,
    pk: &S::PublicKey,
) -> Result<S::Ciphertext> {
    if query.len() != target.dimension() {
        return Err(Error::DimensionMismatch {
            expected: target.dimension(),
            actual: query.len(),
        });
    }
    for ciphertext in target.iter() {
        scheme.verify(ciphertext, pk)?;
    }

    let cross_terms = query
        .par_iter()
        .zip(target.ciphertexts().par_iter())
        .map(|(&q, t)| scheme.scale(t, -2.0 * q, pk))
        .collect::<Result<Vec<_>>>()?;

    let query_squares: f64 = query.iter().map(|q| q * q).sum();
    let mut distance = scheme.encrypt(query_squares, pk)?;
    distance = scheme.add(&distance, target.sum_of_squares(), pk)?;
    for cross_term in &cross_terms {
        distance = scheme.add(&distance, cross_term, pk)?;
    }

    Ok(distance)
}
