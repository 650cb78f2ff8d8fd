use crate::context::{Fingerprinted, KeyFingerprint, PrivateKey, PublicKey};
use crate::{Error, Result};

use num_bigint_dig::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// A Paillier ciphertext.
///
/// Besides the group element it records the fixed-point exponent of the
/// plaintext it hides and the fingerprint of the key it was produced under,
/// so ciphertexts from different keys are never combined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireCiphertext", into = "WireCiphertext")]
pub struct Ciphertext {
    value: BigUint,
    exponent: u32,
    key: KeyFingerprint,
}

impl Ciphertext {
    /// Creates a ciphertext from its raw parts.
    ///
    /// Nothing is checked here, operations check the ciphertext
    /// against the public key they are given.
    #[must_use]
    pub const fn from_raw(value: BigUint, exponent: u32, key: KeyFingerprint) -> Self {
        Self {
            value,
            exponent,
            key,
        }
    }

    #[must_use]
    pub const fn value(&self) -> &BigUint {
        &self.value
    }

    #[must_use]
    pub const fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Whether this ciphertext can have been produced under `pk`.
    ///
    /// The fingerprint must match and the value must be a unit of `Z/n²Z`.
    #[must_use]
    pub fn is_under(&self, pk: &PublicKey) -> bool {
        self.key == pk.fingerprint()
            && !self.value.is_zero()
            && self.value < *pk.n_squared()
            && self.value.gcd(pk.n()).is_one()
    }

    /// Encrypts an already encoded plaintext `m` of `Z/nZ`.
    ///
    /// `c = (1 + m*n) * r^n mod n²` with `r` drawn uniformly among the units of `Z/nZ`.
    pub(crate) fn encrypt_encoded(
        m: &BigUint,
        exponent: u32,
        pk: &PublicKey,
        rng: &mut impl rand::Rng,
    ) -> Self {
        let n = pk.n();
        let n_squared = pk.n_squared();
        let r = loop {
            let r = rng.gen_biguint_below(n);
            if !r.is_zero() && r.gcd(n).is_one() {
                break r;
            }
        };

        let gm = (BigUint::one() + m * n) % n_squared;
        let value = (gm * r.modpow(n, n_squared)) % n_squared;

        Self {
            value,
            exponent,
            key: pk.fingerprint(),
        }
    }

    /// Recovers the encoded plaintext of `Z/nZ`.
    ///
    /// ## Errors
    ///
    /// `Decryption` if the ciphertext was not produced under the key matching `sk`.
    pub(crate) fn decrypt_encoded(&self, sk: &PrivateKey) -> Result<BigUint> {
        let pk = sk.public_key();
        if !self.is_under(pk) {
            return Err(Error::Decryption(
                "ciphertext was not produced under this key".to_string(),
            ));
        }

        let n = pk.n();
        let u = self.value.modpow(sk.lambda(), pk.n_squared());
        let l = (u - BigUint::one()) / n;
        Ok((l * sk.mu()) % n)
    }
}

impl Fingerprinted for Ciphertext {
    fn fingerprint(&self) -> KeyFingerprint {
        self.key
    }
}

/// Ciphertexts cross the wire as a decimal integer so that
/// no JSON number precision is lost on the way.
#[derive(Clone, Serialize, Deserialize)]
struct WireCiphertext {
    value: String,
    exponent: u32,
    key: String,
}

impl From<Ciphertext> for WireCiphertext {
    fn from(c: Ciphertext) -> Self {
        Self {
            value: c.value.to_str_radix(10),
            exponent: c.exponent,
            key: c.key.to_string(),
        }
    }
}

impl TryFrom<WireCiphertext> for Ciphertext {
    type Error = Error;

    fn try_from(wire: WireCiphertext) -> Result<Self> {
        let value = BigUint::parse_bytes(wire.value.as_bytes(), 10)
            .ok_or_else(|| Error::Malformed("ciphertext is not a decimal integer".to_string()))?;
        Ok(Self::from_raw(value, wire.exponent, wire.key.parse()?))
    }
}
