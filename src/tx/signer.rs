//! ECDSA signing over secp256k1.
//!
//! Wraps `k256`'s recoverable signature API so the envelope builders only
//! ever deal in `(v, r, s)` triples, never the curve types directly.

use alloy_primitives::{keccak256, Address, B256, U256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::error::SignerError;

/// An ECDSA key pair plus its derived Ethereum address.
pub struct Signer {
    key: SigningKey,
    address: Address,
}

/// A raw ECDSA signature split into its three wire components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    pub r: U256,
    pub s: U256,
    pub recovery_id: u8,
}

impl Signer {
    /// Builds a signer from a 32-byte private key.
    pub fn from_bytes(private_key: &[u8]) -> Result<Self, SignerError> {
        let key = SigningKey::from_slice(private_key).map_err(|_| SignerError::InvalidKey)?;
        let address = address_from_verifying_key(key.verifying_key());
        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte digest, returning the signature in its
    /// recovery-id-plus-(r,s) wire shape. Signing is deterministic (RFC 6979)
    /// so the same digest always produces the same signature.
    pub fn sign_digest(&self, digest: B256) -> Result<RawSignature, SignerError> {
        let (signature, recovery_id): (Signature, RecoveryId) =
            self.key.sign_prehash_recoverable(digest.as_slice())?;
        let bytes = signature.to_bytes();
        Ok(RawSignature {
            r: U256::from_be_slice(&bytes[0..32]),
            s: U256::from_be_slice(&bytes[32..64]),
            recovery_id: recovery_id.to_byte(),
        })
    }

    /// Signs an arbitrary message per `personal_sign`: the digest is
    /// `keccak256("\x19Ethereum Signed Message:\n" ++ decimal_len(message) ++
    /// message)`, and `v` is biased by 27 rather than left as a bare
    /// recovery id.
    pub fn sign_message(&self, message: &[u8]) -> Result<(RawSignature, u8), SignerError> {
        let digest = personal_message_hash(message);
        let sig = self.sign_digest(digest)?;
        Ok((sig, sig.recovery_id + 27))
    }
}

/// `keccak256("\x19Ethereum Signed Message:\n" ++ decimal_len(message) ++ message)`.
pub fn personal_message_hash(message: &[u8]) -> B256 {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut buf = Vec::with_capacity(prefix.len() + message.len());
    buf.extend_from_slice(prefix.as_bytes());
    buf.extend_from_slice(message);
    keccak256(buf)
}

fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    Address::from_slice(&hash[12..32])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fixed test private key; only its resulting address matters here.
    const TEST_KEY: [u8; 32] = [
        0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23,
        0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23,
    ];

    #[test]
    fn signing_is_deterministic() {
        let signer = Signer::from_bytes(&TEST_KEY).unwrap();
        let digest = keccak256(b"hello world");
        let a = signer.sign_digest(digest).unwrap();
        let b = signer.sign_digest(digest).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn personal_sign_v_is_biased_by_27() {
        let signer = Signer::from_bytes(&TEST_KEY).unwrap();
        let (_, v) = signer.sign_message(b"hello").unwrap();
        assert!(v == 27 || v == 28);
    }
}
