//! Canonical voucher encoding.
//!
//! The signed payload is a compact JSON object with keys in lexicographic
//! order and no whitespace:
//!
//! ```text
//! {"amount":300,"counter":1,"is_final":false,"session_id":"0a1b"}
//! ```
//!
//! Signer and verifier both derive their bytes from [`encode`], so any
//! representation the client and provider exchange must reduce to this
//! exact byte string. [`decode`] only accepts input that is already in
//! canonical form.

use serde::Deserialize;

use crate::error::CoreError;
use crate::types::SessionId;
use crate::voucher::Voucher;

/// Structural shape of the canonical payload. Field order is irrelevant
/// for decoding; `encode` fixes it.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CanonicalVoucher {
    amount: u64,
    counter: u64,
    is_final: bool,
    session_id: String,
}

/// Produce the canonical signing payload for a voucher claim.
pub fn encode(amount: u64, session_id: &SessionId, counter: u64, is_final: bool) -> Vec<u8> {
    format!(
        "{{\"amount\":{},\"counter\":{},\"is_final\":{},\"session_id\":\"{}\"}}",
        amount,
        counter,
        is_final,
        session_id.to_hex()
    )
    .into_bytes()
}

/// Reconstruct a voucher from its canonical payload.
pub fn decode(bytes: &[u8]) -> Result<Voucher, CoreError> {
    let raw: CanonicalVoucher = serde_json::from_slice(bytes)
        .map_err(|e| CoreError::MalformedVoucher(e.to_string()))?;

    let session_id = SessionId::from_hex(&raw.session_id)
        .map_err(|e| CoreError::MalformedVoucher(e.to_string()))?;

    let voucher = Voucher {
        session_id,
        amount: raw.amount,
        counter: raw.counter,
        is_final: raw.is_final,
    };

    if encode(voucher.amount, &voucher.session_id, voucher.counter, voucher.is_final) != bytes {
        tracing::debug!(len = bytes.len(), "rejecting non-canonical voucher payload");
        return Err(CoreError::MalformedVoucher(
            "payload is not in canonical form".into(),
        ));
    }

    Ok(voucher)
}
