//! System constants and environment-driven configuration.

use crate::{Error, Parameters, Result};

use core::str::FromStr;
use std::path::PathBuf;

/// Decrypted distances strictly below this are a match.
pub const DISTANCE_THRESHOLD: f64 = 1.0;

/// Best match plus two runners-up.
pub const PODIUM_SIZE: usize = 3;

/// Output size of the face model (InceptionResnetV1 trained on VGGFace2).
pub const EMBEDDING_DIMENSION: usize = 512;

pub const ALLOWED_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Reads and parses an environment variable, `None` when unset.
fn env_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} has an invalid value {raw:?}"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config(format!("{key}: {e}"))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Dimension every extracted embedding must have.
    pub dimension: usize,
    /// Lowercase file extensions accepted for uploaded images.
    pub allowed_extensions: Vec<String>,
}

impl ServerConfig {
    /// Reads `CRYPTOFACE_DIMENSION`, falling back to the defaults.
    ///
    /// ## Errors
    ///
    /// `Config` if a variable is set to something unparsable or the dimension is zero.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(dimension) = env_var("CRYPTOFACE_DIMENSION")? {
            config.dimension = dimension;
        }
        if config.dimension == 0 {
            return Err(Error::Config("embedding dimension must be positive".to_string()));
        }
        Ok(config)
    }

    /// Whether a file name carries one of the allowed extensions.
    ///
    /// Returns the lowercase extension.
    #[must_use]
    pub fn allowed_extension(&self, filename: &str) -> Option<String> {
        let (stem, extension) = filename.rsplit_once('.')?;
        let extension = extension.to_ascii_lowercase();
        (!stem.is_empty() && self.allowed_extensions.contains(&extension)).then_some(extension)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dimension: EMBEDDING_DIMENSION,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Directory holding the owner's key material.
    pub key_dir: PathBuf,
    pub parameters: Parameters,
    pub threshold: f64,
}

impl ClientConfig {
    /// Reads `CRYPTOFACE_KEY_DIR`, `CRYPTOFACE_PRIME_BITS`, `CRYPTOFACE_PRECISION`
    /// and `CRYPTOFACE_THRESHOLD`, falling back to the defaults.
    ///
    /// ## Errors
    ///
    /// `Config` if a variable is set to something unparsable.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let prime_bits = env_var("CRYPTOFACE_PRIME_BITS")?.unwrap_or(defaults.parameters.prime_bits());
        let precision = env_var("CRYPTOFACE_PRECISION")?.unwrap_or(defaults.parameters.precision());

        Ok(Self {
            key_dir: env_var("CRYPTOFACE_KEY_DIR")?.unwrap_or(defaults.key_dir),
            parameters: Parameters::new(prime_bits, precision),
            threshold: env_var("CRYPTOFACE_THRESHOLD")?.unwrap_or(defaults.threshold),
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("./client"),
            parameters: Parameters::DEFAULT,
            threshold: DISTANCE_THRESHOLD,
        }
    }
}
