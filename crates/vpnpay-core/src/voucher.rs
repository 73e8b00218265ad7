use serde::{Deserialize, Serialize};

use crate::codec;
use crate::custody::{SignatureVerifier, VoucherSigner};
use crate::error::CoreError;
use crate::types::{hex_bytes, SessionId};

/// A cumulative payment claim against one session.
///
/// `amount` is the total owed since the session opened, not a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Session this claim is drawn against.
    pub session_id: SessionId,
    /// Cumulative amount owed to the provider.
    pub amount: u64,
    /// Client-side monotonic counter.
    pub counter: u64,
    /// Whether this voucher closes the session.
    pub is_final: bool,
}

impl Voucher {
    pub fn new(session_id: SessionId, amount: u64, counter: u64, is_final: bool) -> Self {
        Self {
            session_id,
            amount,
            counter,
            is_final,
        }
    }

    /// The canonical bytes that are signed and verified.
    pub fn signing_payload(&self) -> Vec<u8> {
        codec::encode(self.amount, &self.session_id, self.counter, self.is_final)
    }

    /// Rebuild a voucher from a canonical payload.
    pub fn from_signing_payload(bytes: &[u8]) -> Result<Self, CoreError> {
        codec::decode(bytes)
    }

    /// Sign the canonical payload with a session key.
    pub fn sign(self, signer: &dyn VoucherSigner) -> SignedVoucher {
        let signature = signer.sign(&self.signing_payload());
        SignedVoucher {
            voucher: self,
            signature,
        }
    }
}

/// A voucher together with the client's session-key signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVoucher {
    #[serde(flatten)]
    pub voucher: Voucher,
    /// Signature over `voucher.signing_payload()`.
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl SignedVoucher {
    /// Check the signature against a public key.
    pub fn verify(&self, verifier: &dyn SignatureVerifier, public_key: &[u8]) -> bool {
        verifier.verify(public_key, &self.voucher.signing_payload(), &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Toy signer: the "signature" is the payload reversed, keyed by a tag byte.
    struct ReverseSigner(u8);

    impl VoucherSigner for ReverseSigner {
        fn public_key_bytes(&self) -> Vec<u8> {
            vec![self.0]
        }

        fn sign(&self, message: &[u8]) -> Vec<u8> {
            let mut sig: Vec<u8> = message.iter().rev().copied().collect();
            sig.push(self.0);
            sig
        }
    }

    struct ReverseVerifier;

    impl SignatureVerifier for ReverseVerifier {
        fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
            ReverseSigner(public_key[0]).sign(message) == signature
        }
    }

    fn voucher() -> Voucher {
        Voucher::new(SessionId::from_bytes(vec![9, 9]), 300, 1, false)
    }

    #[test]
    fn test_signing_payload_matches_codec() {
        let v = voucher();
        assert_eq!(v.signing_payload(), codec::encode(300, &v.session_id, 1, false));
        assert_eq!(Voucher::from_signing_payload(&v.signing_payload()).unwrap(), v);
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = ReverseSigner(7);
        let signed = voucher().sign(&signer);
        assert!(signed.verify(&ReverseVerifier, &signer.public_key_bytes()));
        assert!(!signed.verify(&ReverseVerifier, &[8]));
    }

    #[test]
    fn test_tampered_amount_fails_verification() {
        let signer = ReverseSigner(7);
        let mut signed = voucher().sign(&signer);
        signed.voucher.amount = 301;
        assert!(!signed.verify(&ReverseVerifier, &[7]));
    }

    #[test]
    fn test_signed_voucher_json_shape() {
        let signed = SignedVoucher {
            voucher: voucher(),
            signature: vec![0xab, 0xcd],
        };
        let value = serde_json::to_value(&signed).unwrap();
        assert_eq!(value["session_id"], "0909");
        assert_eq!(value["amount"], 300);
        assert_eq!(value["counter"], 1);
        assert_eq!(value["is_final"], false);
        assert_eq!(value["signature"], "abcd");

        let back: SignedVoucher = serde_json::from_value(value).unwrap();
        assert_eq!(back, signed);
    }
}
