//! The owner side: the only holder of a private key.
//!
//! Builds registration payloads from its key pair and turns the server's
//! encrypted distances into verdicts and rankings.

use crate::catalog::validate_name;
use crate::context::{KeyPair, Parameters, PublicKey};
use crate::protocol::{
    AuthenticateResponse, RecognizeResponse, RegisterOwner, RemoveOwner, RotateOwnerKey,
};
use crate::ranker::{Candidate, Ranker, Ranking, Verdict};
use crate::{Ciphertext, Error, HomomorphicScheme, KeyCustodian, Paillier, Result};

use tracing::debug;

/// Exponent of every `secure_distance` output: the scaled cross terms lift the sum to 2.
const DISTANCE_EXPONENT: u32 = 2;

#[derive(Clone, Debug)]
pub struct Owner {
    name: String,
    keys: KeyPair,
    scheme: Paillier,
}

impl Owner {
    /// A new owner with a freshly generated key pair.
    ///
    /// ## Errors
    ///
    /// * `InvalidName` if the name is not acceptable.
    /// * `KeyGeneration` if the parameters are invalid.
    pub fn create(name: &str, parameters: Parameters) -> Result<Self> {
        validate_name(name)?;
        Ok(Self::from_keys(name, KeyPair::generate(&parameters)?))
    }

    #[must_use]
    pub fn from_keys(name: impl Into<String>, keys: KeyPair) -> Self {
        Self {
            name: name.into(),
            keys,
            scheme: Paillier::default(),
        }
    }

    /// Reloads a previously saved owner.
    ///
    /// ## Errors
    ///
    /// `NotConfigured` if the owner was never saved, see [`KeyCustodian::reload`].
    pub fn load(custodian: &KeyCustodian, name: &str) -> Result<Self> {
        Ok(Self::from_keys(name, custodian.reload(name)?))
    }

    /// ## Errors
    ///
    /// See [`KeyCustodian::persist`].
    pub fn save(&self, custodian: &KeyCustodian) -> Result<()> {
        custodian.persist(&self.name, &self.keys)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    #[must_use]
    pub fn registration(&self) -> RegisterOwner {
        RegisterOwner {
            name: self.name.clone(),
            public_key: self.public_key().clone(),
        }
    }

    #[must_use]
    pub fn removal(&self) -> RemoveOwner {
        RemoveOwner {
            name: self.name.clone(),
        }
    }

    /// Switches to a fresh key pair and returns the request announcing it.
    ///
    /// Every user enrolled under the previous key has to be enrolled again.
    ///
    /// ## Errors
    ///
    /// `KeyGeneration` if the parameters are invalid. The current keys are kept then.
    pub fn rotate(&mut self, parameters: Parameters) -> Result<RotateOwnerKey> {
        self.keys = KeyPair::generate(&parameters)?;
        Ok(RotateOwnerKey {
            name: self.name.clone(),
            public_key: self.public_key().clone(),
        })
    }

    /// ## Errors
    ///
    /// `Decryption` if the ciphertext was not produced under this owner's key,
    /// does not carry the exponent of a secure distance, or was tampered with.
    pub fn decrypt_distance(&self, distance: &Ciphertext) -> Result<f64> {
        if distance.exponent() != DISTANCE_EXPONENT {
            return Err(Error::Decryption(format!(
                "a distance has exponent {DISTANCE_EXPONENT}, got {}",
                distance.exponent()
            )));
        }
        self.scheme.decrypt(distance, self.keys.private_key())
    }

    /// ## Errors
    ///
    /// See [`Owner::decrypt_distance`].
    pub fn authenticate(&self, response: &AuthenticateResponse, ranker: &Ranker) -> Result<Verdict> {
        let distance = self.decrypt_distance(&response.distance)?;
        let verdict = ranker.verdict(distance);
        debug!(owner = %self.name, %verdict, "authentication decided");
        Ok(verdict)
    }

    /// ## Errors
    ///
    /// See [`Owner::decrypt_distance`]. One undecryptable distance fails the whole ranking.
    pub fn recognize(&self, response: &RecognizeResponse, ranker: &Ranker) -> Result<Ranking> {
        let candidates = response
            .distances
            .iter()
            .map(|d| Ok(Candidate::new(d.name.as_str(), self.decrypt_distance(&d.distance)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(ranker.rank(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Fingerprinted;
    use crate::protocol::NamedDistance;

    const TEST_PARAMETERS: Parameters = Parameters::new(128, 32);

    /// `Enc(value)` at the exponent the server's distances have.
    fn distance(value: f64, owner: &Owner) -> Ciphertext {
        let scheme = Paillier::default();
        let pk = owner.public_key();
        scheme.scale(&scheme.encrypt(value, pk).unwrap(), 1.0, pk).unwrap()
    }

    #[test]
    fn test_authenticate() {
        let owner = Owner::create("acme", TEST_PARAMETERS).unwrap();
        let ranker = Ranker::default();

        let close = AuthenticateResponse {
            distance: distance(0.4, &owner),
        };
        let far = AuthenticateResponse {
            distance: distance(1.0, &owner),
        };
        assert_eq!(owner.authenticate(&close, &ranker).unwrap(), Verdict::Confirmed);
        assert_eq!(owner.authenticate(&far, &ranker).unwrap(), Verdict::NotConfirmed);
    }

    #[test]
    fn test_recognize() {
        let owner = Owner::create("acme", TEST_PARAMETERS).unwrap();
        let response = RecognizeResponse {
            distances: [("alice", 5.0), ("bob", 2.0), ("carol", 9.0)]
                .into_iter()
                .map(|(name, d)| NamedDistance {
                    name: name.to_string(),
                    distance: distance(d, &owner),
                })
                .collect(),
        };

        let Ranking::Ranked { best, runners_up } =
            owner.recognize(&response, &Ranker::default()).unwrap()
        else {
            panic!("expected a ranking");
        };
        assert_eq!(best.name, "bob");
        assert!((best.distance - 2.0).abs() < 1e-9);
        let names: Vec<_> = runners_up.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["alice", "carol"]);

        let empty = RecognizeResponse {
            distances: Vec::new(),
        };
        assert_eq!(
            owner.recognize(&empty, &Ranker::default()).unwrap(),
            Ranking::NoCandidates
        );
    }

    #[test]
    fn test_foreign_distance() {
        let owner = Owner::create("acme", TEST_PARAMETERS).unwrap();
        let other = Owner::create("globex", TEST_PARAMETERS).unwrap();
        let response = AuthenticateResponse {
            distance: distance(0.1, &other),
        };
        assert!(matches!(
            owner.authenticate(&response, &Ranker::default()),
            Err(Error::Decryption(_))
        ));
    }

    #[test]
    fn test_distance_exponent_is_checked() {
        let owner = Owner::create("acme", TEST_PARAMETERS).unwrap();
        let genuine = distance(5.0, &owner);
        assert!((owner.decrypt_distance(&genuine).unwrap() - 5.0).abs() < 1e-9);

        // Each exponent step divides the decoded value by 2^32, 3 would turn 5.0 into a match
        for exponent in [1, 3, 200_000_000, u32::MAX] {
            let rewritten = Ciphertext::from_raw(
                genuine.value().clone(),
                exponent,
                genuine.fingerprint(),
            );
            assert!(matches!(
                owner.decrypt_distance(&rewritten),
                Err(Error::Decryption(_))
            ));
            let response = AuthenticateResponse {
                distance: rewritten.clone(),
            };
            assert!(matches!(
                owner.authenticate(&response, &Ranker::default()),
                Err(Error::Decryption(_))
            ));
            let response = RecognizeResponse {
                distances: vec![NamedDistance {
                    name: "alice".to_string(),
                    distance: rewritten,
                }],
            };
            assert!(matches!(
                owner.recognize(&response, &Ranker::default()),
                Err(Error::Decryption(_))
            ));
        }
    }

    #[test]
    fn test_rotate() {
        let mut owner = Owner::create("acme", TEST_PARAMETERS).unwrap();
        let old = owner.public_key().clone();
        let request = owner.rotate(TEST_PARAMETERS).unwrap();
        assert_eq!(request.name, "acme");
        assert_eq!(&request.public_key, owner.public_key());
        assert_ne!(&old, owner.public_key());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let custodian = KeyCustodian::new(dir.path());

        assert!(matches!(
            Owner::load(&custodian, "acme"),
            Err(Error::NotConfigured(_))
        ));
        let owner = Owner::create("acme", TEST_PARAMETERS).unwrap();
        owner.save(&custodian).unwrap();

        let loaded = Owner::load(&custodian, "acme").unwrap();
        assert_eq!(loaded.name(), "acme");
        assert_eq!(loaded.registration(), owner.registration());
    }

    #[test]
    fn test_invalid_name() {
        assert!(matches!(
            Owner::create("no/slashes", TEST_PARAMETERS),
            Err(Error::InvalidName(_))
        ));
    }
}
