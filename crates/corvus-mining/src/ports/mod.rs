//! Hexagonal architecture ports.
//!
//! - [`inbound`]: the mining API exposed to the node runtime.
//! - [`outbound`]: contracts this core requires from its collaborators
//!   (chain store, mempool, wallet, network).

pub mod inbound;
pub mod outbound;

pub use inbound::{MinerControl, MinerStatus};
pub use outbound::{ChainStore, MempoolView, NetworkInfo, WalletKeystore};
