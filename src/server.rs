//! Server-side request handling.
//!
//! Every operation looks the owner up first, then extracts the embedding from the
//! uploaded image and runs the encoder or the distance engine on catalog
//! snapshots, without holding any catalog lock. Only the final store is a write.

use crate::catalog::{validate_name, Catalog};
use crate::config::ServerConfig;
use crate::embedding::{Embedder, Embedding};
use crate::protocol::{
    Authenticate, AuthenticateResponse, EnrollUser, Enrolled, NamedDistance, Recognize,
    RecognizeResponse, RegisterOwner, RemoveOwner, RemoveUser, Removed, RotateOwnerKey, Rotated,
    Upload,
};
use crate::{encode_embedding, secure_distance, Error, Paillier, Result};

use rayon::prelude::*;
use std::fs;
use tracing::{debug, error, info, warn};

/// Logs a failed request: internal errors as errors, everything else as a rejection.
fn report<T>(operation: &'static str, owner: &str, result: Result<T>) -> Result<T> {
    match &result {
        Err(e) if e.is_internal() => error!(operation, owner, error = %e, "internal error"),
        Err(e) => warn!(operation, owner, error = %e, "request rejected"),
        Ok(_) => {}
    }
    result
}

pub struct Server<E> {
    catalog: Catalog<Paillier>,
    embedder: E,
    config: ServerConfig,
    scheme: Paillier,
}

impl<E: Embedder> Server<E> {
    #[must_use]
    pub fn new(embedder: E, config: ServerConfig) -> Self {
        Self {
            catalog: Catalog::new(),
            embedder,
            config,
            scheme: Paillier::default(),
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog<Paillier> {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Writes the upload to a private temporary directory and runs the extractor on it.
    ///
    /// The directory is removed when this returns, whatever the outcome.
    fn extract(&self, upload: &Upload) -> Result<Embedding> {
        if upload.filename.is_empty() {
            return Err(Error::InvalidUpload("missing file".to_string()));
        }
        let extension = self
            .config
            .allowed_extension(&upload.filename)
            .ok_or_else(|| {
                Error::InvalidUpload(format!("file {:?} not permitted", upload.filename))
            })?;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join(format!("upload.{extension}"));
        fs::write(&path, &upload.bytes)?;
        let embedding = self.embedder.embed(&path)?;
        dir.close()?;

        if embedding.dimension() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(embedding)
    }

    /// ## Errors
    ///
    /// `InvalidName` or `DuplicateOwner`.
    pub fn register_owner(&self, request: RegisterOwner) -> Result<()> {
        let name = request.name;
        let result = self.catalog.register_owner(&name, request.public_key);
        report("register_owner", &name, result)
    }

    /// ## Errors
    ///
    /// `OwnerNotFound`.
    pub fn rotate_owner_key(&self, request: RotateOwnerKey) -> Result<Rotated> {
        let name = request.name;
        let result = self
            .catalog
            .rotate_owner_key(&name, request.public_key)
            .map(|purged| Rotated { purged });
        report("rotate_owner_key", &name, result)
    }

    /// ## Errors
    ///
    /// `OwnerNotFound`.
    pub fn remove_owner(&self, request: &RemoveOwner) -> Result<Removed> {
        let result = self
            .catalog
            .remove_owner(&request.name)
            .map(|users| Removed { users });
        report("remove_owner", &request.name, result)
    }

    /// Extracts and encrypts the face under the owner's key, replacing any previous one.
    ///
    /// ## Errors
    ///
    /// * `OwnerNotFound`, `InvalidName`, `InvalidUpload`, `InvalidImage` or
    ///   `DimensionMismatch` for a bad request. Nothing is stored then.
    /// * `KeyMismatch` if the owner key was rotated while encoding.
    pub fn enroll(&self, request: &EnrollUser) -> Result<Enrolled> {
        report("enroll", &request.owner, self.try_enroll(request))
    }

    fn try_enroll(&self, request: &EnrollUser) -> Result<Enrolled> {
        let public_key = self.catalog.owner_key(&request.owner)?;
        validate_name(&request.user)?;

        let embedding = self.extract(&request.face)?;
        let encrypted = encode_embedding(&self.scheme, &embedding, &public_key)?;
        let replaced = self
            .catalog
            .put_user(&request.owner, &request.user, encrypted)?;

        info!(owner = %request.owner, user = %request.user, replaced, "user enrolled");
        Ok(Enrolled { replaced })
    }

    /// ## Errors
    ///
    /// `OwnerNotFound` or `UserNotFound`.
    pub fn remove_user(&self, request: &RemoveUser) -> Result<()> {
        let result = self.catalog.remove_user(&request.owner, &request.user);
        report("remove_user", &request.owner, result)
    }

    /// Encrypted distance between the probe and one enrolled user.
    ///
    /// ## Errors
    ///
    /// * `OwnerNotFound`, `UserNotFound`, `InvalidUpload`, `InvalidImage` or
    ///   `DimensionMismatch` for a bad request.
    /// * `KeyMismatch` if the stored record is inconsistent with the owner key.
    pub fn authenticate(&self, request: &Authenticate) -> Result<AuthenticateResponse> {
        report("authenticate", &request.owner, self.try_authenticate(request))
    }

    fn try_authenticate(&self, request: &Authenticate) -> Result<AuthenticateResponse> {
        let (public_key, record) = self.catalog.user(&request.owner, &request.user)?;
        let query = self.extract(&request.probe)?;
        let distance = secure_distance(&self.scheme, &query, record.embedding(), &public_key)?;

        debug!(owner = %request.owner, user = %request.user, "distance computed");
        Ok(AuthenticateResponse { distance })
    }

    /// Encrypted distances between the probe and every user of the owner.
    ///
    /// ## Errors
    ///
    /// As [`Server::authenticate`]. A single inconsistent record fails the whole request.
    pub fn recognize(&self, request: &Recognize) -> Result<RecognizeResponse> {
        report("recognize", &request.owner, self.try_recognize(request))
    }

    fn try_recognize(&self, request: &Recognize) -> Result<RecognizeResponse> {
        let (public_key, users) = self.catalog.users(&request.owner)?;
        let query = self.extract(&request.probe)?;

        let distances = users
            .par_iter()
            .map(|record| {
                let distance =
                    secure_distance(&self.scheme, &query, record.embedding(), &public_key)?;
                Ok(NamedDistance {
                    name: record.name().to_string(),
                    distance,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(owner = %request.owner, candidates = distances.len(), "distances computed");
        Ok(RecognizeResponse { distances })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Fingerprinted;
    use crate::{HomomorphicScheme, Parameters, PrivateKey, PublicKey};

    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    const DIMENSION: usize = 4;

    /// Reads the embedding as a JSON array and remembers every path it was given.
    #[derive(Default)]
    struct JsonEmbedder {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl Embedder for JsonEmbedder {
        fn embed(&self, image: &Path) -> Result<Embedding> {
            self.seen.lock().unwrap().push(image.to_path_buf());
            let bytes = fs::read(image).map_err(|e| Error::InvalidImage(e.to_string()))?;
            serde_json::from_slice::<Vec<f64>>(&bytes)
                .map(Embedding::from)
                .map_err(|e| Error::InvalidImage(e.to_string()))
        }
    }

    fn face(values: &[f64]) -> Upload {
        Upload::new("face.jpg", serde_json::to_vec(values).unwrap())
    }

    fn setup() -> (Server<JsonEmbedder>, PublicKey, PrivateKey) {
        let config = ServerConfig {
            dimension: DIMENSION,
            ..ServerConfig::default()
        };
        let server = Server::new(JsonEmbedder::default(), config);
        let (pk, sk) = Paillier::new(Parameters::new(128, 32))
            .generate_keys()
            .unwrap();
        server
            .register_owner(RegisterOwner {
                name: "acme".to_string(),
                public_key: pk.clone(),
            })
            .unwrap();
        (server, pk, sk)
    }

    fn enroll(server: &Server<JsonEmbedder>, user: &str, values: &[f64]) -> Result<Enrolled> {
        server.enroll(&EnrollUser {
            owner: "acme".to_string(),
            user: user.to_string(),
            face: face(values),
        })
    }

    #[test]
    fn test_authenticate() {
        let (server, pk, sk) = setup();
        enroll(&server, "alice", &[0.5, 0.5, 0.5, 0.5]).unwrap();

        let response = server
            .authenticate(&Authenticate {
                owner: "acme".to_string(),
                user: "alice".to_string(),
                probe: face(&[0.5, 0.5, 0.5, -0.5]),
            })
            .unwrap();
        assert_eq!(response.distance.fingerprint(), pk.fingerprint());
        let distance = Paillier::default().decrypt(&response.distance, &sk).unwrap();
        assert!((distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_recognize() {
        let (server, _, sk) = setup();
        enroll(&server, "alice", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        enroll(&server, "bob", &[0.0, 1.0, 0.0, 0.0]).unwrap();

        let response = server
            .recognize(&Recognize {
                owner: "acme".to_string(),
                probe: face(&[0.0, 1.0, 0.0, 0.0]),
            })
            .unwrap();
        let decrypted: Vec<(String, f64)> = response
            .distances
            .iter()
            .map(|d| {
                let v = Paillier::default().decrypt(&d.distance, &sk).unwrap();
                (d.name.clone(), (v * 1e6).round() / 1e6)
            })
            .collect();
        assert_eq!(
            decrypted,
            [("alice".to_string(), 2.0), ("bob".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_recognize_without_users() {
        let (server, _, _) = setup();
        let response = server
            .recognize(&Recognize {
                owner: "acme".to_string(),
                probe: face(&[0.0; DIMENSION]),
            })
            .unwrap();
        assert!(response.distances.is_empty());
    }

    #[test]
    fn test_enroll_replaces() {
        let (server, _, _) = setup();
        assert!(!enroll(&server, "alice", &[0.1; DIMENSION]).unwrap().replaced);
        assert!(enroll(&server, "alice", &[0.2; DIMENSION]).unwrap().replaced);
        assert_eq!(server.catalog().users("acme").unwrap().1.len(), 1);
    }

    #[test]
    fn test_rejected_uploads_store_nothing() {
        let (server, _, _) = setup();

        let mut request = EnrollUser {
            owner: "acme".to_string(),
            user: "alice".to_string(),
            face: Upload::new("face.gif", serde_json::to_vec(&[0.1; DIMENSION]).unwrap()),
        };
        assert!(matches!(server.enroll(&request), Err(Error::InvalidUpload(_))));

        request.face.filename = String::new();
        assert!(matches!(server.enroll(&request), Err(Error::InvalidUpload(_))));

        request.face = Upload::new("face.png", b"no face in here".to_vec());
        assert!(matches!(server.enroll(&request), Err(Error::InvalidImage(_))));

        request.face = face(&[0.1, 0.2]);
        assert!(matches!(
            server.enroll(&request),
            Err(Error::DimensionMismatch {
                expected: DIMENSION,
                actual: 2
            })
        ));

        request.user = "../alice".to_string();
        request.face = face(&[0.1; DIMENSION]);
        assert!(matches!(server.enroll(&request), Err(Error::InvalidName(_))));

        assert!(server.catalog().users("acme").unwrap().1.is_empty());
    }

    #[test]
    fn test_client_filename_is_not_a_path() {
        let (server, _, _) = setup();
        let mut upload = face(&[0.1; DIMENSION]);
        upload.filename = "../../etc/passwd.jpg".to_string();
        server
            .enroll(&EnrollUser {
                owner: "acme".to_string(),
                user: "alice".to_string(),
                face: upload,
            })
            .unwrap();

        let seen = server.embedder.seen.lock().unwrap();
        assert_eq!(seen[0].file_name().unwrap(), "upload.jpg");
    }

    #[test]
    fn test_temporary_files_are_removed() {
        let (server, _, _) = setup();
        enroll(&server, "alice", &[0.1; DIMENSION]).unwrap();
        let _ = server.authenticate(&Authenticate {
            owner: "acme".to_string(),
            user: "alice".to_string(),
            probe: face(&[0.1, 0.2]),
        });
        let _ = server.enroll(&EnrollUser {
            owner: "acme".to_string(),
            user: "bob".to_string(),
            face: Upload::new("face.png", b"garbage".to_vec()),
        });

        let seen = server.embedder.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        for path in seen.iter() {
            assert!(!path.exists(), "{} was left behind", path.display());
            assert!(!path.parent().unwrap().exists());
        }
    }

    #[test]
    fn test_unknown_owner_and_user() {
        let (server, _, _) = setup();
        assert!(matches!(
            server.recognize(&Recognize {
                owner: "nobody".to_string(),
                probe: face(&[0.0; DIMENSION]),
            }),
            Err(Error::OwnerNotFound(_))
        ));
        assert!(matches!(
            server.authenticate(&Authenticate {
                owner: "acme".to_string(),
                user: "ghost".to_string(),
                probe: face(&[0.0; DIMENSION]),
            }),
            Err(Error::UserNotFound { .. })
        ));
        assert!(matches!(
            server.remove_user(&RemoveUser {
                owner: "acme".to_string(),
                user: "ghost".to_string(),
            }),
            Err(Error::UserNotFound { .. })
        ));
    }

    #[test]
    fn test_owner_lifecycle() {
        let (server, pk, _) = setup();
        enroll(&server, "alice", &[0.1; DIMENSION]).unwrap();
        enroll(&server, "bob", &[0.2; DIMENSION]).unwrap();

        assert!(matches!(
            server.register_owner(RegisterOwner {
                name: "acme".to_string(),
                public_key: pk.clone(),
            }),
            Err(Error::DuplicateOwner(_))
        ));

        let (new_pk, _) = Paillier::new(Parameters::new(128, 32))
            .generate_keys()
            .unwrap();
        let rotated = server
            .rotate_owner_key(RotateOwnerKey {
                name: "acme".to_string(),
                public_key: new_pk,
            })
            .unwrap();
        assert_eq!(rotated.purged, 2);

        enroll(&server, "carol", &[0.3; DIMENSION]).unwrap();
        let removed = server
            .remove_owner(&RemoveOwner {
                name: "acme".to_string(),
            })
            .unwrap();
        assert_eq!(removed.users, 1);
        assert!(matches!(
            server.catalog().owner_key("acme"),
            Err(Error::OwnerNotFound(_))
        ));
    }
}
