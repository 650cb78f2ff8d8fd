//! This module defines the capability trait every cryptosystem backend implements.
//!
//! The encoder and the distance engine only ever talk to a [`HomomorphicScheme`],
//! so another additively homomorphic scheme can be plugged in without touching them.
//!
//! A scheme is a plain value holding its construction parameters.
//! Keys are passed explicitly to every call: there is no process-wide state.
//!
//! Operations that combine ciphertexts must check that every operand was produced
//! under the supplied public key and fail with [`Error::KeyMismatch`](crate::Error::KeyMismatch)
//! otherwise. Most additively homomorphic schemes happily return garbage for
//! cross-key inputs, so the check cannot be left to the caller.

use crate::context::Fingerprinted;
use crate::Result;

/// An additively homomorphic public-key cryptosystem over fixed-point reals.
///
/// ## Example
///
/// ```rust
/// use cryptoface::prelude::*;
///
/// let scheme = Paillier::new(Parameters::new(128, 32));
/// let (pk, sk) = scheme.generate_keys().unwrap();
///
/// let a = scheme.encrypt(1.5, &pk).unwrap();
/// let b = scheme.encrypt(-0.25, &pk).unwrap();
/// let c = scheme.add(&a, &scheme.scale(&b, 2.0, &pk).unwrap(), &pk).unwrap();
///
/// let d = scheme.decrypt(&c, &sk).unwrap();
/// assert!((d - 1.0).abs() < 1e-6);
/// ```
pub trait HomomorphicScheme: Send + Sync {
    type PublicKey: Fingerprinted + Clone + Send + Sync;
    type PrivateKey;
    type Ciphertext: Fingerprinted + Clone + Send + Sync;

    /// Generates a fresh key pair from the scheme's parameters.
    ///
    /// ## Errors
    ///
    /// `KeyGeneration` if the parameters are invalid.
    fn generate_keys(&self) -> Result<(Self::PublicKey, Self::PrivateKey)>;

    /// Encrypts a real under `pk`.
    ///
    /// ## Errors
    ///
    /// `EncodingOverflow` if `plaintext` is outside the codec range.
    fn encrypt(&self, plaintext: f64, pk: &Self::PublicKey) -> Result<Self::Ciphertext>;

    /// Decrypts a ciphertext.
    ///
    /// ## Errors
    ///
    /// `Decryption` if the ciphertext was not produced under the matching
    /// public key or was tampered with.
    fn decrypt(&self, ciphertext: &Self::Ciphertext, sk: &Self::PrivateKey) -> Result<f64>;

    /// Checks that `ciphertext` was produced under `pk`.
    ///
    /// ## Errors
    ///
    /// `KeyMismatch` otherwise.
    fn verify(&self, ciphertext: &Self::Ciphertext, pk: &Self::PublicKey) -> Result<()>;

    /// `Enc(a) ⊕ Enc(b) = Enc(a + b)`
    ///
    /// ## Errors
    ///
    /// `KeyMismatch` if either operand was not produced under `pk`.
    fn add(
        &self,
        a: &Self::Ciphertext,
        b: &Self::Ciphertext,
        pk: &Self::PublicKey,
    ) -> Result<Self::Ciphertext>;

    /// `k ⊗ Enc(a) = Enc(k * a)` for a plaintext scalar `k`.
    ///
    /// ## Errors
    ///
    /// `KeyMismatch` if the operand was not produced under `pk`,
    /// `EncodingOverflow` if `scalar` is outside the codec range or the
    /// operand already is a product.
    fn scale(
        &self,
        ciphertext: &Self::Ciphertext,
        scalar: f64,
        pk: &Self::PublicKey,
    ) -> Result<Self::Ciphertext>;
}
