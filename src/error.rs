use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by key custody, encoding, matching and the catalog.
#[derive(Debug, Error)]
pub enum Error {
    /// No persisted key material exists for this identity.
    #[error("no key material for `{0}`, register first")]
    NotConfigured(String),

    #[error("owner `{0}` not found")]
    OwnerNotFound(String),

    #[error("user `{user}` not found for owner `{owner}`")]
    UserNotFound { owner: String, user: String },

    #[error("owner `{0}` is already registered")]
    DuplicateOwner(String),

    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// The embedding extractor could not read the image or find a face in it.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A ciphertext was combined with a public key it was not produced under.
    ///
    /// This is never caused by a client: it means the catalog served
    /// inconsistent key material.
    #[error("ciphertext was not produced under the supplied public key")]
    KeyMismatch,

    #[error("value {0} is outside the fixed-point codec range")]
    EncodingOverflow(f64),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("corrupt key file {}: {reason}", path.display())]
    CorruptKeyFile { path: PathBuf, reason: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error points at a server-side fault rather than a bad request.
    ///
    /// Internal errors must be reported as such and never retried as a
    /// validation failure.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::KeyMismatch | Self::EncodingOverflow(_) | Self::CorruptKeyFile { .. } | Self::Io(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, Error>;
