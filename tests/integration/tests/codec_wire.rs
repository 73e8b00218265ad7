//! Integration test: canonical encoding, wire forms and signatures agree
//! across crates.

use chrono::Utc;
use vpnpay_core::{codec, SessionId, SignedVoucher, Voucher, VoucherSigner};
use vpnpay_crypto::{hash_voucher, Ed25519Verifier, KeyPair};
use vpnpay_integration_tests::Harness;
use vpnpay_settlement::SettlementError;

#[test]
fn test_codec_roundtrip_for_issued_vouchers() {
    let kp = KeyPair::generate();
    let sid = SessionId::new();
    for (amount, counter, is_final) in [(0, 1, false), (42, 7, false), (u64::MAX, u64::MAX, true)] {
        let bytes = codec::encode(amount, &sid, counter, is_final);
        let decoded = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, Voucher::new(sid.clone(), amount, counter, is_final));

        let signed = decoded.sign(&kp);
        assert!(signed.verify(&Ed25519Verifier, &kp.public_key_bytes()));
        assert!(!signed.verify(&Ed25519Verifier, &KeyPair::generate().public_key_bytes()));
    }
}

#[test]
fn test_json_and_wire_forms_preserve_signature() {
    let kp = KeyPair::generate();
    let signed = Voucher::new(SessionId::new(), 900, 2, true).sign(&kp);

    let json = serde_json::to_string(&signed).unwrap();
    let from_json: SignedVoucher = serde_json::from_str(&json).unwrap();
    let from_wire = SignedVoucher::from_wire_base64(&signed.to_wire_base64()).unwrap();

    for copy in [from_json, from_wire] {
        assert_eq!(copy, signed);
        assert_eq!(hash_voucher(&copy.voucher), hash_voucher(&signed.voucher));
        assert!(copy.verify(&Ed25519Verifier, &kp.public_key_bytes()));
    }
}

#[test]
fn test_wire_voucher_settles_like_json() {
    let h = Harness::new(1000);
    let mut issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();

    let wire = issuer.issue(250, 1, false).unwrap().to_wire_base64();
    let decoded = SignedVoucher::from_wire_base64(&wire).unwrap();
    let result = h.manager.settle(&sid, &decoded, Utc::now()).unwrap();
    assert_eq!(result.paid_to_provider, 250);
    assert_eq!(result.voucher_digest.len(), 64);
}

#[test]
fn test_tampered_wire_voucher_fails_signature() {
    let h = Harness::new(1000);
    let mut issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();

    let signed = issuer.issue(250, 1, false).unwrap();
    let mut proto = signed.to_proto();
    proto.amount = 260;
    let tampered = SignedVoucher::from_proto(proto).unwrap();

    assert!(matches!(
        h.manager.settle(&sid, &tampered, Utc::now()),
        Err(SettlementError::SignatureInvalid(_))
    ));
}

#[test]
fn test_non_canonical_payload_rejected() {
    let sid = SessionId::from_bytes(vec![0xab, 0xcd]);
    let canonical = codec::encode(5, &sid, 1, false);
    let mut spaced = String::from_utf8(canonical).unwrap();
    spaced.insert(1, ' ');
    assert!(codec::decode(spaced.as_bytes()).is_err());
}
