use crate::context::{mod_inverse, Fingerprinted, KeyPair, Parameters, PrivateKey, PublicKey};
use crate::{Ciphertext, Error, HomomorphicScheme, Result};

use num_bigint_dig::BigUint;

/// Paillier cryptosystem with `g = n + 1`.
///
/// Only key generation depends on the parameters held here: every other
/// operation takes the codec precision from the public key it is given.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Paillier {
    parameters: Parameters,
}

impl Paillier {
    /// Highest exponent a ciphertext of this scheme carries: fresh encryptions
    /// sit at 1 and one plaintext scaling lifts them to 2.
    pub const MAX_EXPONENT: u32 = 2;

    #[must_use]
    pub const fn new(parameters: Parameters) -> Self {
        Self { parameters }
    }

    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Moves `ciphertext` up to `exponent` by multiplying its plaintext by `2^(p*Δ)`.
    fn raise(ciphertext: &Ciphertext, exponent: u32, pk: &PublicKey) -> Result<Ciphertext> {
        if ciphertext.exponent() >= exponent {
            return Ok(ciphertext.clone());
        }
        let shift = pk
            .codec()
            .shift(exponent - ciphertext.exponent())
            .ok_or(Error::KeyMismatch)?;
        Ok(Ciphertext::from_raw(
            ciphertext.value().modpow(&shift, pk.n_squared()),
            exponent,
            pk.fingerprint(),
        ))
    }

    fn exponent_in_range(ciphertext: &Ciphertext) -> bool {
        (1..=Self::MAX_EXPONENT).contains(&ciphertext.exponent())
    }
}

impl HomomorphicScheme for Paillier {
    type PublicKey = PublicKey;
    type PrivateKey = PrivateKey;
    type Ciphertext = Ciphertext;

    fn generate_keys(&self) -> Result<(PublicKey, PrivateKey)> {
        let keys = KeyPair::generate(&self.parameters)?;
        Ok((keys.public_key().clone(), keys.private_key().clone()))
    }

    fn encrypt(&self, plaintext: f64, pk: &PublicKey) -> Result<Ciphertext> {
        let m = pk.codec().encode(plaintext, 1, pk.n())?;
        Ok(Ciphertext::encrypt_encoded(&m, 1, pk, &mut rand::thread_rng()))
    }

    fn decrypt(&self, ciphertext: &Ciphertext, sk: &PrivateKey) -> Result<f64> {
        let pk = sk.public_key();
        if !Self::exponent_in_range(ciphertext) {
            return Err(Error::Decryption(format!(
                "exponent {} is out of range",
                ciphertext.exponent()
            )));
        }
        let m = ciphertext.decrypt_encoded(sk)?;
        pk.codec().decode(&m, ciphertext.exponent(), pk.n())
    }

    fn verify(&self, ciphertext: &Ciphertext, pk: &PublicKey) -> Result<()> {
        if ciphertext.is_under(pk) && Self::exponent_in_range(ciphertext) {
            Ok(())
        } else {
            Err(Error::KeyMismatch)
        }
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext, pk: &PublicKey) -> Result<Ciphertext> {
        self.verify(a, pk)?;
        self.verify(b, pk)?;

        let exponent = a.exponent().max(b.exponent());
        let a = Self::raise(a, exponent, pk)?;
        let b = Self::raise(b, exponent, pk)?;
        let value = (a.value() * b.value()) % pk.n_squared();

        Ok(Ciphertext::from_raw(value, exponent, pk.fingerprint()))
    }

    fn scale(&self, ciphertext: &Ciphertext, scalar: f64, pk: &PublicKey) -> Result<Ciphertext> {
        self.verify(ciphertext, pk)?;
        if ciphertext.exponent() >= Self::MAX_EXPONENT {
            return Err(Error::EncodingOverflow(scalar));
        }

        let (negative, k) = pk.codec().encode_signed(scalar, 1, pk.n())?;
        // Negative scalars go through the inverse, which keeps the exponent
        // as small as |k| instead of n - |k|
        let base: BigUint = if negative {
            mod_inverse(ciphertext.value(), pk.n_squared()).ok_or(Error::KeyMismatch)?
        } else {
            ciphertext.value().clone()
        };
        let value = base.modpow(&k, pk.n_squared());

        Ok(Ciphertext::from_raw(
            value,
            ciphertext.exponent() + 1,
            pk.fingerprint(),
        ))
    }
}
