//! Owner-side custody of key pairs.
//!
//! One key file per identity, `<dir>/<identity>.key`, encoded with `bincode`.
//! Writes go to a temporary file in the same directory which is synced and then
//! renamed over the target, so a crash leaves either the old or the new file.
//! The temporary file is created with mode `0600` on Unix and the mode survives the rename.

use crate::catalog::validate_name;
use crate::context::{Fingerprinted, KeyPair, Parameters, PrivateKey};
use crate::{Error, Result};

use bincode::{config, Decode, Encode};
use num_bigint_dig::BigUint;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use zeroize::{Zeroize, Zeroizing};

#[derive(Encode, Decode)]
struct KeyFile {
    name: String,
    precision: u32,
    /// Little-endian bytes.
    n: Vec<u8>,
    p: Vec<u8>,
    q: Vec<u8>,
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        self.p.zeroize();
        self.q.zeroize();
    }
}

/// Creates, persists and reloads the key pairs of owner identities.
#[derive(Clone, Debug)]
pub struct KeyCustodian {
    dir: PathBuf,
}

impl KeyCustodian {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{identity}.key"))
    }

    /// Generates a fresh key pair for `identity`. Nothing is written.
    ///
    /// ## Errors
    ///
    /// * `InvalidName` if the identity is not acceptable.
    /// * `KeyGeneration` if the parameters are invalid.
    pub fn create(&self, identity: &str, parameters: &Parameters) -> Result<KeyPair> {
        validate_name(identity)?;
        let keys = KeyPair::generate(parameters)?;
        info!(
            identity,
            key = %keys.public_key().fingerprint(),
            prime_bits = parameters.prime_bits(),
            "key pair generated"
        );
        Ok(keys)
    }

    /// Atomically writes `keys` as the key pair of `identity`, replacing any previous one.
    ///
    /// ## Errors
    ///
    /// * `InvalidName` if the identity is not acceptable.
    /// * `Io` if the directory or file cannot be written. The previous key file,
    ///   if any, is then left untouched.
    pub fn persist(&self, identity: &str, keys: &KeyPair) -> Result<()> {
        validate_name(identity)?;
        fs::create_dir_all(&self.dir)?;

        let public_key = keys.public_key();
        let (p, q) = keys.private_key().primes();
        let file = KeyFile {
            name: identity.to_string(),
            precision: public_key.precision(),
            n: public_key.n().to_bytes_le(),
            p: p.to_bytes_le(),
            q: q.to_bytes_le(),
        };
        let bytes = Zeroizing::new(
            bincode::encode_to_vec(&file, config::standard())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?,
        );

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path(identity)).map_err(|e| e.error)?;

        info!(identity, key = %public_key.fingerprint(), "key pair persisted");
        Ok(())
    }

    /// Reads back the key pair of `identity`.
    ///
    /// ## Errors
    ///
    /// * `NotConfigured` if no key was ever persisted for `identity`.
    /// * `CorruptKeyFile` if the file does not decode, belongs to another
    ///   identity, or its modulus does not match its prime factors.
    pub fn reload(&self, identity: &str) -> Result<KeyPair> {
        validate_name(identity)?;

        let path = self.path(identity);
        let bytes = match fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotConfigured(identity.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let corrupt = |reason: String| Error::CorruptKeyFile {
            path: path.clone(),
            reason,
        };

        let (file, _): (KeyFile, usize) =
            bincode::decode_from_slice(&bytes, config::standard())
                .map_err(|e| corrupt(e.to_string()))?;
        if file.name != identity {
            return Err(corrupt(format!("holds the key of `{}`", file.name)));
        }

        let n = BigUint::from_bytes_le(&file.n);
        let private_key = PrivateKey::from_primes(
            BigUint::from_bytes_le(&file.p),
            BigUint::from_bytes_le(&file.q),
            file.precision,
        )
        .map_err(|e| corrupt(e.to_string()))?;
        if private_key.public_key().n() != &n {
            return Err(corrupt("modulus does not match its prime factors".to_string()));
        }

        Ok(private_key.into())
    }

    /// Deletes the key file of `identity`.
    ///
    /// ## Errors
    ///
    /// `NotConfigured` if there is no key file to delete.
    pub fn forget(&self, identity: &str) -> Result<()> {
        validate_name(identity)?;
        match fs::remove_file(self.path(identity)) {
            Ok(()) => {
                info!(identity, "key pair forgotten");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotConfigured(identity.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HomomorphicScheme, Paillier};

    const TEST_PARAMETERS: Parameters = Parameters::new(128, 32);

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path());
        let keys = custodian.create("acme", &TEST_PARAMETERS).unwrap();
        custodian.persist("acme", &keys).unwrap();

        let reloaded = custodian.reload("acme").unwrap();
        assert_eq!(reloaded.public_key(), keys.public_key());

        // The reloaded private key decrypts what the first public key encrypted
        let scheme = Paillier::new(TEST_PARAMETERS);
        let c = scheme.encrypt(-3.25, keys.public_key()).unwrap();
        assert_eq!(scheme.decrypt(&c, reloaded.private_key()).unwrap(), -3.25);
    }

    #[test]
    fn test_reload_missing() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path().join("not-yet-created"));
        assert!(matches!(
            custodian.reload("acme"),
            Err(Error::NotConfigured(name)) if name == "acme"
        ));
        assert!(matches!(custodian.forget("acme"), Err(Error::NotConfigured(_))));
    }

    #[test]
    fn test_persist_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path());
        let first = custodian.create("acme", &TEST_PARAMETERS).unwrap();
        let second = custodian.create("acme", &TEST_PARAMETERS).unwrap();

        custodian.persist("acme", &first).unwrap();
        custodian.persist("acme", &second).unwrap();
        assert_eq!(custodian.reload("acme").unwrap().public_key(), second.public_key());

        // No temporary file is left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path());

        fs::write(dir.path().join("garbage.key"), b"definitely not a key").unwrap();
        assert!(matches!(
            custodian.reload("garbage"),
            Err(Error::CorruptKeyFile { .. })
        ));

        // A file copied under another identity's name
        let keys = custodian.create("acme", &TEST_PARAMETERS).unwrap();
        custodian.persist("acme", &keys).unwrap();
        fs::copy(dir.path().join("acme.key"), dir.path().join("globex.key")).unwrap();
        assert!(matches!(
            custodian.reload("globex"),
            Err(Error::CorruptKeyFile { .. })
        ));

        // Factors that do not multiply to the stored modulus
        let (p, q) = keys.private_key().primes();
        let file = KeyFile {
            name: "forged".to_string(),
            precision: 32,
            n: (keys.public_key().n() + &BigUint::from(2u32)).to_bytes_le(),
            p: p.to_bytes_le(),
            q: q.to_bytes_le(),
        };
        let bytes = bincode::encode_to_vec(&file, config::standard()).unwrap();
        fs::write(dir.path().join("forged.key"), bytes).unwrap();
        assert!(matches!(
            custodian.reload("forged"),
            Err(Error::CorruptKeyFile { .. })
        ));
    }

    #[test]
    fn test_forget() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path());
        let keys = custodian.create("acme", &TEST_PARAMETERS).unwrap();
        custodian.persist("acme", &keys).unwrap();

        custodian.forget("acme").unwrap();
        assert!(matches!(custodian.reload("acme"), Err(Error::NotConfigured(_))));
    }

    #[test]
    fn test_identity_is_not_a_path() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path());
        assert!(matches!(
            custodian.reload("../outside"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            custodian.create("", &TEST_PARAMETERS),
            Err(Error::InvalidName(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path());
        let keys = custodian.create("acme", &TEST_PARAMETERS).unwrap();
        custodian.persist("acme", &keys).unwrap();

        let mode = fs::metadata(dir.path().join("acme.key")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
