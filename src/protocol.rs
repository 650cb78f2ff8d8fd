//! Payloads exchanged between an owner and the server.
//!
//! Only public keys and ciphertexts ever appear here. Ciphertexts serialize as
//! `{ "value": "<decimal>", "exponent": e, "key": "<hex fingerprint>" }`.

use crate::{Ciphertext, PublicKey};

use core::fmt;
use serde::{Deserialize, Serialize};

/// An uploaded image: its client-side file name and raw content.
///
/// The file name only selects the image type. It is never used as a path.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOwner {
    pub name: String,
    pub public_key: PublicKey,
}

/// Replaces the public key of an existing owner. Its users are purged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotateOwnerKey {
    pub name: String,
    pub public_key: PublicKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotated {
    pub purged: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOwner {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removed {
    /// Users deleted along with the owner.
    pub users: usize,
}

/// Enrolls a user's face, or replaces it if the user already exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollUser {
    pub owner: String,
    pub user: String,
    pub face: Upload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrolled {
    /// Whether a previous face was replaced.
    pub replaced: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveUser {
    pub owner: String,
    pub user: String,
}

/// Does `probe` match `user`?
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticate {
    pub owner: String,
    pub user: String,
    pub probe: Upload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    /// Encrypted squared distance between the probe and the enrolled face.
    pub distance: Ciphertext,
}

/// Which of the owner's users does `probe` match?
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recognize {
    pub owner: String,
    pub probe: Upload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedDistance {
    pub name: String,
    pub distance: Ciphertext,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizeResponse {
    /// One entry per enrolled user, sorted by name.
    pub distances: Vec<NamedDistance>,
}
