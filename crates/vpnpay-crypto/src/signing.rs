use ed25519_dalek::Signer;
use ed25519_dalek::Verifier;
use vpnpay_core::{SignatureVerifier, VoucherSigner};

use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};

/// Ed25519 signature (64 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl Signature {
    /// Get the raw bytes (64 bytes).
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }

    /// Create from raw bytes (64 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_arr: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidInput(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        let inner = ed25519_dalek::Signature::from_bytes(&bytes_arr);
        Ok(Self { inner })
    }

    /// Encode as hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Sign a message using Ed25519.
pub fn sign(message: &[u8], keypair: &KeyPair) -> Signature {
    let sig = keypair.signing_key().sign(message);
    Signature { inner: sig }
}

/// Verify an Ed25519 signature.
pub fn verify(message: &[u8], signature: &Signature, pubkey: &PublicKey) -> Result<(), CryptoError> {
    pubkey
        .verifying_key()
        .verify(message, &signature.inner)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

impl VoucherSigner for KeyPair {
    fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key().as_bytes().to_vec()
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        sign(message, self).to_bytes().to_vec()
    }
}

/// Ed25519 implementation of the host's verification primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(pubkey) = PublicKey::from_bytes(public_key) else {
            tracing::debug!(len = public_key.len(), "rejecting malformed public key");
            return false;
        };
        let Ok(sig) = Signature::from_bytes(signature) else {
            tracing::debug!(len = signature.len(), "rejecting malformed signature");
            return false;
        };
        verify(message, &sig, &pubkey).is_ok()
    }

    fn is_valid_public_key(&self, public_key: &[u8]) -> bool {
        PublicKey::from_bytes(public_key).is_ok()
    }
}
