//! Encrypted face-embedding storage and secure distance matching.
//!
//! # Usage
//!
//! An owner (e.g. a building operator) holds a Paillier key pair and registers its
//! public key with a server. The server extracts an embedding from every face it
//! is sent, encrypts it under the owner's public key and stores only ciphertexts.
//!
//! Later, given a probe image, the server computes the *encrypted* squared euclidean
//! distance between the probe and one or all enrolled faces, without ever decrypting
//! anything. Only the owner can decrypt those distances and decide who matched.
//!
//! The cryptosystem sits behind the [`HomomorphicScheme`] trait. Reals are mapped to
//! the plaintext space by a fixed-point codec whose precision is part of the public key.
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```
//! use cryptoface::prelude::*;
//!
//! let scheme = Paillier::new(Parameters::new(128, 32));
//! let (pk, sk) = scheme.generate_keys().unwrap();
//!
//! // Stored on the server: ciphertexts only
//! let enrolled = encode_embedding(&scheme, &[0.6, 0.8, 0.0], &pk).unwrap();
//!
//! // Computed on the server from a fresh probe
//! let distance = secure_distance(&scheme, &[0.6, 0.0, 0.8], &enrolled, &pk).unwrap();
//!
//! // Decrypted on the owner side
//! let distance = scheme.decrypt(&distance, &sk).unwrap();
//! assert!((distance - 1.28).abs() < 1e-6);
//! assert_eq!(Ranker::default().verdict(distance), Verdict::NotConfirmed);
//! ```
//!
//! ## Owner and server
//!
//! The server runs an [`Embedder`] on uploaded images. Here the "image" is simply
//! the embedding itself, as little-endian floats.
//!
//! ```
//! use cryptoface::prelude::*;
//! use cryptoface::protocol::{Authenticate, EnrollUser, Upload};
//! use std::path::Path;
//!
//! struct RawEmbedder;
//!
//! impl Embedder for RawEmbedder {
//!     fn embed(&self, image: &Path) -> cryptoface::Result<Embedding> {
//!         let bytes = std::fs::read(image)?;
//!         Ok(bytes
//!             .chunks_exact(8)
//!             .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
//!             .collect::<Vec<_>>()
//!             .into())
//!     }
//! }
//!
//! fn face(values: &[f64]) -> Upload {
//!     Upload::new("face.png", values.iter().flat_map(|v| v.to_le_bytes()).collect())
//! }
//!
//! let config = ServerConfig { dimension: 2, ..ServerConfig::default() };
//! let server = Server::new(RawEmbedder, config);
//!
//! let owner = Owner::create("acme", Parameters::new(128, 32)).unwrap();
//! server.register_owner(owner.registration()).unwrap();
//!
//! server.enroll(&EnrollUser {
//!     owner: "acme".into(),
//!     user: "alice".into(),
//!     face: face(&[0.6, 0.8]),
//! }).unwrap();
//!
//! let response = server.authenticate(&Authenticate {
//!     owner: "acme".into(),
//!     user: "alice".into(),
//!     probe: face(&[0.8, 0.6]),
//! }).unwrap();
//!
//! let verdict = owner.authenticate(&response, &Ranker::default()).unwrap();
//! assert_eq!(verdict, Verdict::Confirmed);
//! ```
//!
//! ## Save keys
//!
//! ```no_run
//! use cryptoface::prelude::*;
//!
//! let custodian = KeyCustodian::new("./client");
//! let owner = Owner::create("acme", Parameters::DEFAULT).unwrap();
//! owner.save(&custodian).unwrap();
//!
//! // Later, possibly in another process
//! let owner = Owner::load(&custodian, "acme").unwrap();
//! ```

mod catalog;
mod cipher;
mod codec;
pub mod config;
mod context;
mod custodian;
mod distance;
mod embedding;
mod encoder;
mod error;
pub mod impls;
pub mod operations;
mod owner;
pub mod prelude;
pub mod protocol;
mod ranker;
mod server;

pub use catalog::{Catalog, UserRecord};
pub use cipher::Ciphertext;
pub use codec::FixedPointCodec;
pub use config::{ClientConfig, ServerConfig};
pub use context::{Fingerprinted, KeyFingerprint, KeyPair, Parameters, PrivateKey, PublicKey};
pub use custodian::KeyCustodian;
pub use distance::secure_distance;
pub use embedding::{Embedder, Embedding};
pub use encoder::{encode_embedding, EncryptedEmbedding};
pub use error::{Error, Result};
pub use impls::paillier::Paillier;
pub use operations::HomomorphicScheme;
pub use owner::Owner;
pub use ranker::{Candidate, Ranker, Ranking, Verdict};
pub use server::Server;
