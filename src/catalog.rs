//! In-memory catalog binding owners to their public key and enrolled users.
//!
//! Every mutation is a single write under one lock and is all-or-nothing.
//! Records are stored behind [`Arc`], so readers get a whole snapshot of a
//! record and never observe a half-replaced embedding. Encoding and distance
//! computation happen outside the lock, on those snapshots.

use crate::context::{Fingerprinted, KeyFingerprint};
use crate::encoder::EncryptedEmbedding;
use crate::{Error, HomomorphicScheme, Result};

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

const MAX_NAME_LEN: usize = 64;

/// Checks an owner or user name.
///
/// Names are non-empty, at most 64 bytes of ASCII alphanumerics, `-`, `_`
/// and `.`, and do not start with a dot, so they are also safe file stems.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

/// One enrolled user: the latest encrypted embedding, bound to the key it was produced under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord<C> {
    owner: String,
    name: String,
    key: KeyFingerprint,
    embedding: EncryptedEmbedding<C>,
}

impl<C> UserRecord<C> {
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fingerprint of the owner key the embedding was encrypted under.
    #[must_use]
    pub const fn key(&self) -> KeyFingerprint {
        self.key
    }

    #[must_use]
    pub const fn embedding(&self) -> &EncryptedEmbedding<C> {
        &self.embedding
    }
}

struct OwnerEntry<S: HomomorphicScheme> {
    public_key: S::PublicKey,
    users: BTreeMap<String, Arc<UserRecord<S::Ciphertext>>>,
}

/// Owners, their current public key, and their users.
///
/// User names are unique per owner. Removing an owner, or rotating its key,
/// drops every one of its users in the same write.
pub struct Catalog<S: HomomorphicScheme> {
    owners: RwLock<BTreeMap<String, OwnerEntry<S>>>,
}

impl<S: HomomorphicScheme> Catalog<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            owners: RwLock::new(BTreeMap::new()),
        }
    }

    // No write can panic between two mutations, a poisoned map is still consistent
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, OwnerEntry<S>>> {
        self.owners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, OwnerEntry<S>>> {
        self.owners.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new owner.
    ///
    /// ## Errors
    ///
    /// * `InvalidName` if the name is not acceptable.
    /// * `DuplicateOwner` if the name is taken. Use [`Catalog::rotate_owner_key`] to re-key.
    pub fn register_owner(&self, name: &str, public_key: S::PublicKey) -> Result<()> {
        validate_name(name)?;

        let mut owners = self.write();
        if owners.contains_key(name) {
            return Err(Error::DuplicateOwner(name.to_string()));
        }
        info!(owner = name, key = %public_key.fingerprint(), "owner registered");
        owners.insert(
            name.to_string(),
            OwnerEntry {
                public_key,
                users: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Replaces an owner's public key and purges its users.
    ///
    /// Stored embeddings were encrypted under the old key and cannot be served
    /// under the new one. Returns how many users were purged.
    ///
    /// ## Errors
    ///
    /// `OwnerNotFound` if the owner is unknown.
    pub fn rotate_owner_key(&self, name: &str, public_key: S::PublicKey) -> Result<usize> {
        let mut owners = self.write();
        let entry = owners
            .get_mut(name)
            .ok_or_else(|| Error::OwnerNotFound(name.to_string()))?;

        let purged = entry.users.len();
        info!(
            owner = name,
            old_key = %entry.public_key.fingerprint(),
            new_key = %public_key.fingerprint(),
            purged,
            "owner key rotated"
        );
        entry.public_key = public_key;
        entry.users.clear();
        Ok(purged)
    }

    /// Removes an owner and every one of its users. Returns how many users were removed.
    ///
    /// ## Errors
    ///
    /// `OwnerNotFound` if the owner is unknown.
    pub fn remove_owner(&self, name: &str) -> Result<usize> {
        let entry = self
            .write()
            .remove(name)
            .ok_or_else(|| Error::OwnerNotFound(name.to_string()))?;
        info!(owner = name, users = entry.users.len(), "owner removed");
        Ok(entry.users.len())
    }

    /// The owner's current public key.
    ///
    /// ## Errors
    ///
    /// `OwnerNotFound` if the owner is unknown.
    pub fn owner_key(&self, name: &str) -> Result<S::PublicKey> {
        self.read()
            .get(name)
            .map(|entry| entry.public_key.clone())
            .ok_or_else(|| Error::OwnerNotFound(name.to_string()))
    }

    /// Stores `embedding` for `user`, replacing any previous record whole.
    ///
    /// Returns whether a previous record was replaced.
    ///
    /// ## Errors
    ///
    /// * `InvalidName` if the user name is not acceptable.
    /// * `OwnerNotFound` if the owner is unknown.
    /// * `KeyMismatch` if any ciphertext was not produced under the owner's
    ///   current key, e.g. because the key was rotated while encoding.
    pub fn put_user(
        &self,
        owner: &str,
        user: &str,
        embedding: EncryptedEmbedding<S::Ciphertext>,
    ) -> Result<bool> {
        validate_name(user)?;

        let mut owners = self.write();
        let entry = owners
            .get_mut(owner)
            .ok_or_else(|| Error::OwnerNotFound(owner.to_string()))?;

        let key = entry.public_key.fingerprint();
        if embedding.iter().any(|c| c.fingerprint() != key) {
            return Err(Error::KeyMismatch);
        }

        let record = UserRecord {
            owner: owner.to_string(),
            name: user.to_string(),
            key,
            embedding,
        };
        let replaced = entry
            .users
            .insert(user.to_string(), Arc::new(record))
            .is_some();
        debug!(owner, user, replaced, "user stored");
        Ok(replaced)
    }

    /// ## Errors
    ///
    /// `OwnerNotFound` or `UserNotFound`.
    pub fn remove_user(&self, owner: &str, user: &str) -> Result<()> {
        let mut owners = self.write();
        let entry = owners
            .get_mut(owner)
            .ok_or_else(|| Error::OwnerNotFound(owner.to_string()))?;
        if entry.users.remove(user).is_none() {
            return Err(Error::UserNotFound {
                owner: owner.to_string(),
                user: user.to_string(),
            });
        }
        debug!(owner, user, "user removed");
        Ok(())
    }

    /// A user's record together with the owner key it must be matched under.
    ///
    /// ## Errors
    ///
    /// `OwnerNotFound` or `UserNotFound`.
    pub fn user(
        &self,
        owner: &str,
        user: &str,
    ) -> Result<(S::PublicKey, Arc<UserRecord<S::Ciphertext>>)> {
        let owners = self.read();
        let entry = owners
            .get(owner)
            .ok_or_else(|| Error::OwnerNotFound(owner.to_string()))?;
        let record = entry.users.get(user).ok_or_else(|| Error::UserNotFound {
            owner: owner.to_string(),
            user: user.to_string(),
        })?;
        Ok((entry.public_key.clone(), Arc::clone(record)))
    }

    /// Every user of an owner, sorted by name, together with the owner key.
    ///
    /// ## Errors
    ///
    /// `OwnerNotFound` if the owner is unknown.
    pub fn users(&self, owner: &str) -> Result<(S::PublicKey, Vec<Arc<UserRecord<S::Ciphertext>>>)> {
        let owners = self.read();
        let entry = owners
            .get(owner)
            .ok_or_else(|| Error::OwnerNotFound(owner.to_string()))?;
        Ok((
            entry.public_key.clone(),
            entry.users.values().cloned().collect(),
        ))
    }
}

impl<S: HomomorphicScheme> Default for Catalog<S> {
    fn default() -> Self {
        Self::new()
    }
}
