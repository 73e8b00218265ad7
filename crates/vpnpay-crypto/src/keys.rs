use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

/// Ed25519 key pair.
///
/// Used as the client's session key: one fresh pair per payment session,
/// never the client's main account key. Private key material is zeroized
/// on drop by `ed25519-dalek`.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair using OS-provided entropy.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create a key pair from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(bytes);
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        Ok(kp)
    }

    /// Restore a key pair from a hex-encoded secret.
    pub fn from_secret_hex(secret: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            hex::decode(secret.trim())
                .map_err(|e| CryptoError::InvalidInput(format!("invalid hex: {}", e)))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Hex-encoded secret, wiped when the returned value is dropped.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.signing_key.to_bytes());
        Zeroizing::new(hex::encode(&*bytes))
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key for verification operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        let verifying_key = VerifyingKey::from_bytes(&bytes_arr)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid public key: {}", e)))?;
        Ok(Self { verifying_key })
    }

    /// Get the raw bytes (32 bytes).
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    /// Encode as hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Decode from hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair() {
        let kp = KeyPair::generate();
        assert_eq!(kp.public_key().as_bytes().len(), 32);
    }

    #[test]
    fn test_session_keys_are_fresh() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_from_seed_deterministic() {
        let seed = [42u8; 32];
        assert_eq!(
            KeyPair::from_seed(&seed).public_key(),
            KeyPair::from_seed(&seed).public_key()
        );
    }

    #[test]
    fn test_secret_hex_roundtrip() {
        let kp = KeyPair::generate();
        let secret = kp.secret_hex();
        assert_eq!(secret.len(), 64);
        let restored = KeyPair::from_secret_hex(&secret).unwrap();
        assert_eq!(restored.public_key(), kp.public_key());
    }

    #[test]
    fn test_from_bytes_invalid_length() {
        assert!(matches!(
            KeyPair::from_bytes(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 16 })
        ));
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let pk = KeyPair::generate().public_key();
        assert_eq!(PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
    }

    #[test]
    fn test_public_key_from_bytes_invalid() {
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
        assert!(PublicKey::from_hex("not-hex").is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let kp = KeyPair::from_seed(&[7u8; 32]);
        let rendered = format!("{:?}", kp);
        assert!(!rendered.contains(kp.secret_hex().as_str()));
    }
}
