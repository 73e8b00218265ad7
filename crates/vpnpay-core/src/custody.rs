//! Key custody seams.
//!
//! The protocol never touches key material: the client's session key sits
//! behind [`VoucherSigner`], and hosts check signatures through
//! [`SignatureVerifier`].

/// Signs canonical voucher payloads with a session-scoped key.
pub trait VoucherSigner: Send + Sync {
    /// Raw public key bytes recorded on the session.
    fn public_key_bytes(&self) -> Vec<u8>;

    /// Sign `message`, returning raw signature bytes.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Verifies signatures produced by a [`VoucherSigner`].
pub trait SignatureVerifier: Send + Sync {
    /// Whether `signature` over `message` verifies under `public_key`.
    /// Malformed keys or signatures verify as `false`.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;

    /// Whether `public_key` is structurally valid for this scheme.
    fn is_valid_public_key(&self, public_key: &[u8]) -> bool {
        !public_key.is_empty()
    }
}
