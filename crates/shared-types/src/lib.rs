//! # Shared Types Crate
//!
//! Core chain primitives shared by every Corvus Chain subsystem: identifiers,
//! coin domains, accounts and the per-network chain parameters.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types are defined here once.
//! - **Plain data**: no I/O, no async; everything is `Clone` + `serde`-ready.
//! - **No hidden globals**: network constants travel inside [`ChainParams`],
//!   which callers thread through explicitly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod coin;
pub mod ids;
pub mod params;

pub use account::Account;
pub use coin::{CoinPricePair, CoinType, ParseCoinError};
pub use ids::{Hash, KeyId, PublicKey, RegId, Signature, TxId};
pub use params::{ChainParams, Network};
