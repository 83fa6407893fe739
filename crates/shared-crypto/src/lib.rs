//! # Shared Crypto Crate
//!
//! Cryptographic primitives used across Corvus Chain:
//!
//! - [`hashing`]: the 256-bit content hash (double SHA-256) used for block,
//!   transaction and seed hashing.
//! - [`merkle`]: the block merkle tree over transaction hashes.
//! - [`ecdsa`]: secp256k1 signing and verification for delegate block
//!   signatures.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod merkle;

pub use ecdsa::{Secp256k1KeyPair, verify_signature};
pub use errors::CryptoError;
pub use hashing::{hash256, hash256_concat, Hash};
pub use merkle::build_merkle_root;
