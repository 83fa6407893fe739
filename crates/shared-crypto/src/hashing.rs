//! # Content Hashing
//!
//! The chain's 256-bit content hash: `SHA-256(SHA-256(data))`. Blocks,
//! transactions and shuffle seeds all hash through this function, so every
//! node derives identical digests for identical content.

use sha2::{Digest, Sha256};

/// Content hash output (256-bit).
pub type Hash = [u8; 32];

/// Double SHA-256 (one-shot).
pub fn hash256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Double SHA-256 over the concatenation of multiple inputs.
pub fn hash256_concat(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    let first = hasher.finalize();
    Sha256::digest(first).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(hash256(b"corvus"), hash256(b"corvus"));
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(hash256(b"a"), hash256(b"b"));
    }

    #[test]
    fn concat_matches_oneshot() {
        assert_eq!(hash256(b"hello world"), hash256_concat(&[b"hello ", b"world"]));
    }

    #[test]
    fn known_vector() {
        // sha256d of the empty string.
        let digest = hash256(b"");
        assert_eq!(
            hex::encode(digest),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }
}
