//! Compact binary transport form of a signed voucher (protobuf).
//!
//! The wire form carries the same four fields as the canonical payload
//! plus the signature; the signature is always checked against
//! `Voucher::signing_payload`, never against these bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use prost::Message;

use crate::error::CoreError;
use crate::types::SessionId;
use crate::voucher::{SignedVoucher, Voucher};

/// `vpnpay.v1.SignedVoucher`
#[derive(Clone, PartialEq, Message)]
pub struct SignedVoucherProto {
    #[prost(bytes = "vec", tag = "1")]
    pub session_id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub amount: u64,
    #[prost(uint64, tag = "3")]
    pub counter: u64,
    #[prost(bool, tag = "4")]
    pub is_final: bool,
    #[prost(bytes = "vec", tag = "5")]
    pub signature: Vec<u8>,
}

impl SignedVoucher {
    /// Convert to the protobuf message.
    pub fn to_proto(&self) -> SignedVoucherProto {
        SignedVoucherProto {
            session_id: self.voucher.session_id.as_bytes().to_vec(),
            amount: self.voucher.amount,
            counter: self.voucher.counter,
            is_final: self.voucher.is_final,
            signature: self.signature.clone(),
        }
    }

    /// Create from the protobuf message.
    pub fn from_proto(proto: SignedVoucherProto) -> Result<Self, CoreError> {
        if proto.session_id.is_empty() {
            return Err(CoreError::MalformedVoucher("missing session_id".into()));
        }
        if proto.signature.is_empty() {
            return Err(CoreError::MalformedVoucher("missing signature".into()));
        }
        Ok(Self {
            voucher: Voucher {
                session_id: SessionId::from_bytes(proto.session_id),
                amount: proto.amount,
                counter: proto.counter,
                is_final: proto.is_final,
            },
            signature: proto.signature,
        })
    }

    /// Encode to protobuf bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }

    /// Decode from protobuf bytes.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, CoreError> {
        let proto = SignedVoucherProto::decode(bytes)?;
        Self::from_proto(proto)
    }

    /// Protobuf bytes armoured as standard base64, for text transports.
    pub fn to_wire_base64(&self) -> String {
        STANDARD.encode(self.to_wire())
    }

    pub fn from_wire_base64(encoded: &str) -> Result<Self, CoreError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CoreError::MalformedVoucher(format!("invalid base64: {}", e)))?;
        Self::from_wire(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed() -> SignedVoucher {
        SignedVoucher {
            voucher: Voucher::new(SessionId::from_bytes(vec![1, 2, 3, 4]), 900, 2, true),
            signature: vec![0x55; 64],
        }
    }

    #[test]
    fn test_wire_preserves_signing_payload() {
        let sv = signed();
        let back = SignedVoucher::from_wire(&sv.to_wire()).unwrap();
        assert_eq!(back, sv);
        assert_eq!(back.voucher.signing_payload(), sv.voucher.signing_payload());
    }

    #[test]
    fn test_wire_base64() {
        let sv = signed();
        let encoded = sv.to_wire_base64();
        let back = SignedVoucher::from_wire_base64(&format!("  {}\n", encoded)).unwrap();
        assert_eq!(back, sv);
    }

    #[test]
    fn test_from_wire_rejects_truncated_bytes() {
        let bytes = signed().to_wire();
        let result = SignedVoucher::from_wire(&bytes[..bytes.len() - 3]);
        assert!(matches!(result, Err(CoreError::MalformedVoucher(_))));
    }

    #[test]
    fn test_from_wire_rejects_missing_signature() {
        let mut proto = signed().to_proto();
        proto.signature.clear();
        let result = SignedVoucher::from_wire(&proto.encode_to_vec());
        assert!(matches!(result, Err(CoreError::MalformedVoucher(_))));
    }

    #[test]
    fn test_from_wire_base64_rejects_bad_armour() {
        assert!(matches!(
            SignedVoucher::from_wire_base64("!!not base64!!"),
            Err(CoreError::MalformedVoucher(_))
        ));
    }
}
