//! # ECDSA Signatures (secp256k1)
//!
//! Delegate block signatures on the secp256k1 curve.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Constant-time operations
//!
//! ## Use Cases
//!
//! - Delegate block signatures (owner key or registered miner-only key)
//! - Wallet-held key material

use crate::CryptoError;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use zeroize::Zeroize;

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the compressed public key (33 bytes).
    pub fn public_key(&self) -> [u8; 33] {
        let verifying_key = self.signing_key.verifying_key();
        let sec1_bytes = verifying_key.to_sec1_bytes();
        // SEC1 compressed public key is always exactly 33 bytes.
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(&sec1_bytes[..33]);
        bytes
    }

    /// Sign a message (deterministic RFC 6979); returns the 64-byte `r||s`
    /// signature as a vector, the form block headers carry.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let sig: Signature = self.signing_key.sign(message);
        sig.to_bytes().to_vec()
    }

    /// Secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

/// Verify a `r||s` signature against a compressed public key.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8; 33],
) -> Result<(), CryptoError> {
    let verifying_key =
        VerifyingKey::from_sec1_bytes(public_key).map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignatureFormat)?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Secp256k1KeyPair::generate();
        let message = b"corvus block signature hash";

        let signature = keypair.sign(message);
        assert!(verify_signature(message, &signature, &keypair.public_key()).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Secp256k1KeyPair::generate();
        let signature = keypair.sign(b"message1");
        assert!(verify_signature(b"message2", &signature, &keypair.public_key()).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair = Secp256k1KeyPair::generate();
        let other = Secp256k1KeyPair::generate();
        let signature = keypair.sign(b"message");
        assert!(verify_signature(b"message", &signature, &other.public_key()).is_err());
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let sig1 = keypair.sign(b"deterministic test");
        let sig2 = keypair.sign(b"deterministic test");
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        assert!(verify_signature(b"message", &[0u8; 10], &keypair.public_key()).is_err());
    }

    #[test]
    fn test_roundtrip_bytes() {
        let original = Secp256k1KeyPair::generate();
        let restored = Secp256k1KeyPair::from_bytes(original.to_bytes()).unwrap();
        assert_eq!(original.public_key(), restored.public_key());
    }
}
