//! Chain identifiers: hashes, account registration ids, key ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte hash (double SHA-256 content hash).
pub type Hash = [u8; 32];

/// A transaction id (content hash of the serialized transaction).
pub type TxId = Hash;

/// A compressed secp256k1 public key (33 bytes).
pub type PublicKey = [u8; 33];

/// A variable-length ECDSA signature as attached to block headers.
///
/// Block validation bounds the length to `(0, MAX_BLOCK_SIGNATURE_SIZE]`.
pub type Signature = Vec<u8>;

/// Stable on-chain identifier of a registered account.
///
/// A `RegId` pins the account to the block height and intra-block index of
/// its registration transaction, rendered as `"height-index"`. The empty id
/// (`0-0`) marks an account that has not been registered on chain.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RegId {
    /// Height of the block containing the registration.
    pub height: u32,
    /// Index of the registration transaction within that block.
    pub index: u16,
}

impl RegId {
    /// Creates a new registration id.
    pub fn new(height: u32, index: u16) -> Self {
        Self { height, index }
    }

    /// Returns true for the unregistered sentinel (`0-0`).
    pub fn is_empty(&self) -> bool {
        self.height == 0 && self.index == 0
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

/// A 20-byte account key id, derived from the compressed public key.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct KeyId(pub [u8; 20]);

impl KeyId {
    /// Derives the key id from a compressed public key (truncated SHA-256).
    pub fn from_pubkey(pubkey: &PublicKey) -> Self {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(pubkey);
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);
        Self(id)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regid_display() {
        assert_eq!(RegId::new(100, 2).to_string(), "100-2");
        assert_eq!(RegId::default().to_string(), "0-0");
    }

    #[test]
    fn regid_empty_sentinel() {
        assert!(RegId::default().is_empty());
        assert!(!RegId::new(1, 0).is_empty());
        assert!(!RegId::new(0, 1).is_empty());
    }

    #[test]
    fn regid_ordering_by_height_then_index() {
        assert!(RegId::new(1, 5) < RegId::new(2, 0));
        assert!(RegId::new(2, 1) < RegId::new(2, 2));
    }

    #[test]
    fn keyid_is_deterministic() {
        let pubkey = [0x02u8; 33];
        assert_eq!(KeyId::from_pubkey(&pubkey), KeyId::from_pubkey(&pubkey));
    }

    #[test]
    fn keyid_differs_per_pubkey() {
        let a = KeyId::from_pubkey(&[0x02u8; 33]);
        let b = KeyId::from_pubkey(&[0x03u8; 33]);
        assert_ne!(a, b);
    }

    #[test]
    fn keyid_hex_display() {
        let id = KeyId([0xABu8; 20]);
        assert_eq!(id.to_string(), "ab".repeat(20));
    }
}
