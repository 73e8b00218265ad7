use vpnpay_core::Voucher;

/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Fingerprint of a voucher: BLAKE3 over its canonical signing payload.
pub fn hash_voucher(voucher: &Voucher) -> Hash {
    hash(&voucher.signing_payload())
}

/// Hex form of [`hash_voucher`], as used in logs and settlement results.
pub fn voucher_digest_hex(voucher: &Voucher) -> String {
    hex::encode(hash_voucher(voucher))
}
