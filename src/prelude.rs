//! Usage: `use cryptoface::prelude::*;`

pub use crate::operations::*;
pub use crate::{
    encode_embedding, secure_distance, Candidate, Ciphertext, ClientConfig, Embedder, Embedding,
    EncryptedEmbedding, Fingerprinted, KeyCustodian, KeyPair, Owner, Paillier, Parameters,
    PrivateKey, PublicKey, Ranker, Ranking, Server, ServerConfig, Verdict,
};
