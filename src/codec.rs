//! Fixed-point codec between reals and the integer plaintext space `Z/nZ`.
//!
//! A real `x` is stored as the integer `round(x * 2^(p*e))` where `p` is the
//! precision (fractional bits) and `e` the exponent carried by the ciphertext.
//! Negative values wrap around the modulus. Only magnitudes up to `n/3` are
//! representable, the remaining band is used to detect overflow on decode.

use crate::{Error, Result};

use num_bigint_dig::BigUint;
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FixedPointCodec {
    precision: u32,
}

impl FixedPointCodec {
    #[must_use]
    pub const fn new(precision: u32) -> Self {
        Self { precision }
    }

    #[must_use]
    pub const fn precision(&self) -> u32 {
        self.precision
    }

    /// Fractional bits of a plaintext at `exponent`, `None` past `i32::MAX`.
    fn bits(&self, exponent: u32) -> Option<i32> {
        self.precision
            .checked_mul(exponent)
            .and_then(|bits| i32::try_from(bits).ok())
    }

    fn scale(&self, exponent: u32) -> Option<f64> {
        self.bits(exponent).map(|bits| 2f64.powi(bits))
    }

    /// The integer by which a plaintext must be multiplied to move it
    /// `delta` exponents up, `None` if the shift is out of range.
    #[must_use]
    pub fn shift(&self, delta: u32) -> Option<BigUint> {
        let bits = usize::try_from(self.bits(delta)?).ok()?;
        Some(BigUint::one() << bits)
    }

    /// Largest magnitude representable under the modulus `n`.
    #[must_use]
    pub fn max_int(n: &BigUint) -> BigUint {
        n / &BigUint::from(3u32)
    }

    /// Encodes `value` as a sign and a magnitude at the given exponent.
    ///
    /// ## Errors
    ///
    /// `EncodingOverflow` if `value` is not finite or does not fit below `n/3`.
    pub fn encode_signed(&self, value: f64, exponent: u32, n: &BigUint) -> Result<(bool, BigUint)> {
        let scale = self.scale(exponent).ok_or(Error::EncodingOverflow(value))?;
        let scaled = (value * scale).round();
        if !scaled.is_finite() {
            return Err(Error::EncodingOverflow(value));
        }
        let magnitude = BigUint::from_f64(scaled.abs()).ok_or(Error::EncodingOverflow(value))?;
        if magnitude > Self::max_int(n) {
            return Err(Error::EncodingOverflow(value));
        }
        Ok((scaled < 0.0 && !magnitude.is_zero(), magnitude))
    }

    /// Encodes `value` as an element of `Z/nZ`.
    ///
    /// ## Errors
    ///
    /// `EncodingOverflow` if `value` is not representable.
    pub fn encode(&self, value: f64, exponent: u32, n: &BigUint) -> Result<BigUint> {
        let (negative, magnitude) = self.encode_signed(value, exponent, n)?;
        if negative {
            Ok(n - &magnitude)
        } else {
            Ok(magnitude)
        }
    }

    /// Decodes an element of `Z/nZ` produced at the given exponent.
    ///
    /// ## Errors
    ///
    /// `Decryption` if the plaintext lies in the overflow band or the exponent
    /// is out of range, which only happens for tampered ciphertexts or
    /// computations that overflowed.
    pub fn decode(&self, plaintext: &BigUint, exponent: u32, n: &BigUint) -> Result<f64> {
        let scale = self
            .scale(exponent)
            .ok_or_else(|| Error::Decryption(format!("exponent {exponent} is out of range")))?;
        let max_int = Self::max_int(n);
        let signed = if *plaintext <= max_int {
            plaintext.to_f64()
        } else if *plaintext >= n - &max_int && plaintext < n {
            (n - plaintext).to_f64().map(|v| -v)
        } else {
            return Err(Error::Decryption(
                "plaintext lies outside the codec range".to_string(),
            ));
        };
        let signed = signed
            .ok_or_else(|| Error::Decryption("plaintext is not a finite real".to_string()))?;
        Ok(signed / scale)
    }
}
