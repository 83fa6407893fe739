//! Adapters: concrete implementations of the outbound ports.
//!
//! Only in-memory reference adapters live here; the node runtime provides
//! the persistent chain store, the gossip-fed mempool and the encrypted
//! wallet behind the same traits.

pub mod memory;

pub use memory::{MemoryChain, MemoryMempool, MemoryWallet, PlainTransferTx, StaticNetwork};
