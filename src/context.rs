use crate::codec::FixedPointCodec;
use crate::{Error, Result};

use core::fmt;
use core::str::FromStr;

use num_bigint_dig::{BigInt, BigUint, ModInverse, RandPrime, Sign, ToBigUint};
use num_integer::Integer;
use num_traits::One;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Parameters for key generation and fixed-point encoding.
///
/// ## Fields
///
/// * `prime_bits` - The size in bits of each Paillier prime, the modulus has twice as many.
/// * `precision` - The number of fractional bits kept by the fixed-point codec.
///
/// ## Examples
///
/// ```
/// use cryptoface::Parameters;
///
/// let parameters = Parameters::new(1024, 32);
/// assert!(parameters.validate().is_ok());
/// ```
///
/// ## Note
///
/// A squared distance is decoded at twice the precision,
/// so the modulus must leave room for `2*precision` bits plus the integer part.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Parameters {
    prime_bits: u32,
    precision: u32,
}

impl Parameters {
    pub const DEFAULT: Self = Self::new(1024, 32);

    /// Creates a new set of parameters.
    ///
    /// Parameters are only checked when keys are generated, see [`Parameters::validate`].
    #[must_use]
    pub const fn new(prime_bits: u32, precision: u32) -> Self {
        Self {
            prime_bits,
            precision,
        }
    }

    #[must_use]
    pub const fn prime_bits(&self) -> u32 {
        self.prime_bits
    }

    #[must_use]
    pub const fn precision(&self) -> u32 {
        self.precision
    }

    /// Checks that keys generated from these parameters can hold a squared distance.
    ///
    /// ## Errors
    ///
    /// `KeyGeneration` if the precision is zero or above 256 bits, the primes are
    /// smaller than 64 bits, or the modulus is too small for the precision.
    pub fn validate(&self) -> Result<()> {
        if self.precision == 0 || self.precision > 256 {
            return Err(Error::KeyGeneration(format!(
                "precision must be within 1..=256 bits, got {}",
                self.precision
            )));
        }
        if self.prime_bits < 64 {
            return Err(Error::KeyGeneration(format!(
                "primes must have at least 64 bits, got {}",
                self.prime_bits
            )));
        }
        if 2 * self.prime_bits < 2 * self.precision + 64 {
            return Err(Error::KeyGeneration(format!(
                "a {}-bit modulus cannot hold distances at {} bits of precision",
                2 * self.prime_bits,
                self.precision
            )));
        }
        Ok(())
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Identifies the public key a ciphertext was produced under.
///
/// The first 8 bytes of SHA-256 over the modulus and the precision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyFingerprint([u8; 8]);

impl KeyFingerprint {
    fn of(n: &BigUint, precision: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(n.to_bytes_be());
        hasher.update(precision.to_be_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for KeyFingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::Malformed(format!("key fingerprint: {e}")))?;
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::Malformed("key fingerprint must be 8 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

/// Values that are bound to one public key.
pub trait Fingerprinted {
    fn fingerprint(&self) -> KeyFingerprint;
}

/// Inverse of `a` modulo `m`, if it exists.
pub(crate) fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let inverse = a.clone().mod_inverse(m)?;
    let m = BigInt::from_biguint(Sign::Plus, m.clone());
    ((inverse % &m + &m) % &m).to_biguint()
}

/// The public key.
///
/// Holds the modulus `n` and the codec precision every party encoding
/// values under this key must use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WirePublicKey", into = "WirePublicKey")]
pub struct PublicKey {
    n: BigUint,
    n_squared: BigUint,
    precision: u32,
    fingerprint: KeyFingerprint,
}

impl PublicKey {
    /// Creates a public key from its modulus and codec precision.
    ///
    /// ## Errors
    ///
    /// `KeyGeneration` if the modulus is not an odd integer above 3
    /// or the precision is zero.
    ///
    /// ## Examples
    ///
    /// ```
    /// use cryptoface::PublicKey;
    /// use num_bigint_dig::BigUint;
    ///
    /// // INSECURE!!! Only for demonstration purposes
    /// let pk = PublicKey::new(BigUint::from(3233u32), 8).unwrap();
    /// assert_eq!(pk.precision(), 8);
    /// ```
    pub fn new(n: BigUint, precision: u32) -> Result<Self> {
        if n <= BigUint::from(3u32) || n.is_even() {
            return Err(Error::KeyGeneration(
                "modulus must be an odd integer above 3".to_string(),
            ));
        }
        if precision == 0 {
            return Err(Error::KeyGeneration(
                "precision must be strictly positive".to_string(),
            ));
        }
        let n_squared = &n * &n;
        let fingerprint = KeyFingerprint::of(&n, precision);
        Ok(Self {
            n,
            n_squared,
            precision,
            fingerprint,
        })
    }

    #[must_use]
    pub const fn n(&self) -> &BigUint {
        &self.n
    }

    #[must_use]
    pub const fn n_squared(&self) -> &BigUint {
        &self.n_squared
    }

    #[must_use]
    pub const fn precision(&self) -> u32 {
        self.precision
    }

    #[must_use]
    pub const fn codec(&self) -> FixedPointCodec {
        FixedPointCodec::new(self.precision)
    }
}

impl Fingerprinted for PublicKey {
    fn fingerprint(&self) -> KeyFingerprint {
        self.fingerprint
    }
}

#[derive(Serialize, Deserialize)]
struct WirePublicKey {
    n: String,
    precision: u32,
}

impl From<PublicKey> for WirePublicKey {
    fn from(pk: PublicKey) -> Self {
        Self {
            n: pk.n.to_str_radix(10),
            precision: pk.precision,
        }
    }
}

impl TryFrom<WirePublicKey> for PublicKey {
    type Error = Error;

    fn try_from(wire: WirePublicKey) -> Result<Self> {
        let n = BigUint::parse_bytes(wire.n.as_bytes(), 10)
            .ok_or_else(|| Error::Malformed("public key modulus is not a decimal integer".to_string()))?;
        Self::new(n, wire.precision).map_err(|e| Error::Malformed(e.to_string()))
    }
}

/// The private key.
///
/// Never crosses the owner/server boundary: it is neither serializable nor printable.
#[derive(Clone)]
pub struct PrivateKey {
    p: BigUint,
    q: BigUint,
    lambda: BigUint,
    mu: BigUint,
    public_key: PublicKey,
}

impl PrivateKey {
    /// Rebuilds a private key from its prime factors.
    ///
    /// ## Errors
    ///
    /// `KeyGeneration` if the factors are equal, trivial, or do not yield an
    /// invertible `λ` modulo `n`.
    pub fn from_primes(p: BigUint, q: BigUint, precision: u32) -> Result<Self> {
        let one = BigUint::one();
        if p == q || p <= one || q <= one {
            return Err(Error::KeyGeneration(
                "prime factors must be distinct and greater than one".to_string(),
            ));
        }
        let public_key = PublicKey::new(&p * &q, precision)?;
        let lambda = (&p - &one).lcm(&(&q - &one));
        let mu = mod_inverse(&lambda, public_key.n()).ok_or_else(|| {
            Error::KeyGeneration("lambda is not invertible modulo n".to_string())
        })?;

        Ok(Self {
            p,
            q,
            lambda,
            mu,
            public_key,
        })
    }

    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub(crate) const fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    pub(crate) const fn mu(&self) -> &BigUint {
        &self.mu
    }

    pub(crate) const fn primes(&self) -> (&BigUint, &BigUint) {
        (&self.p, &self.q)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &format_args!("{}", self.public_key.fingerprint))
            .finish_non_exhaustive()
    }
}

/// The private key is zeroized when dropped
/// because its content should not leak.
impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.p.zeroize();
        self.q.zeroize();
        self.lambda.zeroize();
        self.mu.zeroize();
    }
}

/// A public key together with its private key.
#[derive(Clone, Debug)]
pub struct KeyPair {
    public_key: PublicKey,
    private_key: PrivateKey,
}

impl KeyPair {
    /// Generates a fresh key pair.
    ///
    /// ## Errors
    ///
    /// `KeyGeneration` if the parameters are invalid.
    ///
    /// ## Examples
    ///
    /// ```
    /// use cryptoface::{KeyPair, Parameters};
    ///
    /// let keys = KeyPair::generate(&Parameters::new(128, 32)).unwrap();
    /// assert_eq!(keys.public_key(), keys.private_key().public_key());
    /// ```
    pub fn generate(parameters: &Parameters) -> Result<Self> {
        parameters.validate()?;

        let mut rng = rand::thread_rng();
        let bits = parameters.prime_bits() as usize;
        let p = rng.gen_prime(bits);
        let q = loop {
            let q = rng.gen_prime(bits);
            if q != p {
                break q;
            }
        };

        Ok(PrivateKey::from_primes(p, q, parameters.precision())?.into())
    }

    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    #[must_use]
    pub const fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl From<PrivateKey> for KeyPair {
    fn from(private_key: PrivateKey) -> Self {
        Self {
            public_key: private_key.public_key().clone(),
            private_key,
        }
    }
}
