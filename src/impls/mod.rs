//! Cryptosystem backends implementing [`HomomorphicScheme`](crate::HomomorphicScheme).

pub mod paillier;
