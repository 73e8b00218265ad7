//! Integration test: every voucher rejection leaves the ledger untouched,
//! and acceptance does not depend on arrival order.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use vpnpay_core::{SessionId, Voucher};
use vpnpay_crypto::KeyPair;
use vpnpay_integration_tests::{Harness, PROVIDER};
use vpnpay_settlement::SettlementError;

#[test]
fn test_replay_is_stale_and_harmless() {
    let h = Harness::new(1000);
    let mut issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();

    let v1 = issuer.issue(300, 1, false).unwrap();
    h.manager.settle(&sid, &v1, Utc::now()).unwrap();
    let before = h.manager.session(&sid).unwrap();

    for _ in 0..3 {
        assert!(matches!(
            h.manager.settle(&sid, &v1, Utc::now()),
            Err(SettlementError::StaleVoucher {
                counter: 1,
                high_watermark: 1
            })
        ));
    }
    assert_eq!(h.manager.session(&sid).unwrap(), before);
    assert_eq!(h.balance(PROVIDER), 300);
}

#[test]
fn test_over_collateral_with_and_without_valid_signature() {
    let h = Harness::new(1000);
    let issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();
    let before = h.manager.session(&sid).unwrap();

    let unsigned = Voucher::new(sid.clone(), 1001, 1, false);
    let forged = unsigned.clone().sign(&KeyPair::generate());
    let mut garbage = forged.clone();
    garbage.signature = vec![0xee; 3];

    for signed in [forged, garbage] {
        assert!(matches!(
            h.manager.settle(&sid, &signed, Utc::now()),
            Err(SettlementError::OverCollateral {
                amount: 1001,
                total_locked: 1000
            })
        ));
    }
    assert_eq!(h.manager.session(&sid).unwrap(), before);
}

#[test]
fn test_voucher_signed_by_other_key_rejected() {
    let h = Harness::new(1000);
    let issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();

    let forged = Voucher::new(sid.clone(), 500, 1, true).sign(&KeyPair::generate());
    assert!(matches!(
        h.manager.settle(&sid, &forged, Utc::now()),
        Err(SettlementError::SignatureInvalid(_))
    ));
    assert_eq!(h.balance(PROVIDER), 0);
    assert_eq!(h.escrowed(&sid), 1000);
}

#[test]
fn test_voucher_for_other_session_rejected() {
    let h = Harness::new(2000);
    let mut a = h.open(1000, Utc::now());
    let b = h.open(1000, Utc::now());

    let for_a = a.issue(100, 1, false).unwrap();
    assert!(matches!(
        h.manager.settle(b.session_id(), &for_a, Utc::now()),
        Err(SettlementError::SessionMismatch { .. })
    ));
    assert_eq!(h.manager.session(b.session_id()).unwrap().released, 0);
    assert_eq!(h.manager.session(a.session_id()).unwrap().released, 0);
}

#[test]
fn test_unknown_session_reported_closed() {
    let h = Harness::new(0);
    let sid = SessionId::new();
    let v = Voucher::new(sid.clone(), 1, 1, false).sign(&KeyPair::generate());
    assert!(matches!(
        h.manager.settle(&sid, &v, Utc::now()),
        Err(SettlementError::SessionClosed(_))
    ));
}

// =========================================================================
// Counter 5 / counter 3 submitted concurrently
// =========================================================================

#[test]
fn test_higher_counter_first_makes_lower_stale() {
    let h = Harness::new(1000);
    let mut issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();
    let v3 = issuer.issue(300, 3, false).unwrap();
    let v5 = issuer.issue(500, 5, false).unwrap();

    h.manager.settle(&sid, &v5, Utc::now()).unwrap();
    assert!(matches!(
        h.manager.settle(&sid, &v3, Utc::now()),
        Err(SettlementError::StaleVoucher { .. })
    ));
    let entry = h.manager.session(&sid).unwrap();
    assert_eq!((entry.released, entry.counter_high_watermark), (500, 5));
}

#[test]
fn test_concurrent_counters_converge() {
    for _ in 0..20 {
        let h = Arc::new(Harness::new(1000));
        let mut issuer = h.open(1000, Utc::now());
        let sid = issuer.session_id().clone();
        let v3 = issuer.issue(300, 3, false).unwrap();
        let v5 = issuer.issue(500, 5, false).unwrap();

        let handles: Vec<_> = [v3, v5]
            .into_iter()
            .map(|v| {
                let h = h.clone();
                let sid = sid.clone();
                std::thread::spawn(move || h.manager.settle(&sid, &v, Utc::now()))
            })
            .collect();
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) | Err(SettlementError::StaleVoucher { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let entry = h.manager.session(&sid).unwrap();
        assert_eq!(entry.counter_high_watermark, 5);
        assert_eq!(entry.released, 500);
        assert_eq!(h.balance(PROVIDER), 500);
        assert_eq!(h.escrowed(&sid), 500);
    }
}

// =========================================================================
// Monotonicity under arbitrary submissions
// =========================================================================

#[test]
fn test_random_submissions_preserve_ledger_bounds() {
    let mut rng = rand::thread_rng();
    let h = Harness::new(10_000);
    let mut issuer = h.open(10_000, Utc::now());
    let sid = issuer.session_id().clone();

    let mut issued = Vec::new();
    let mut amount = 0u64;
    for counter in 1..=40u64 {
        amount = (amount + rng.gen_range(0..400)).min(10_000);
        issued.push(issuer.issue(amount, counter, false).unwrap());
    }

    let mut last_released = 0;
    let mut last_counter = 0;
    for _ in 0..200 {
        let pick = &issued[rng.gen_range(0..issued.len())];
        let _ = h.manager.settle(&sid, pick, Utc::now());

        let entry = h.manager.session(&sid).unwrap();
        assert!(entry.released >= last_released);
        assert!(entry.counter_high_watermark >= last_counter);
        assert!(entry.released <= entry.total_locked);
        assert_eq!(h.escrowed(&sid) + h.balance(PROVIDER), 10_000);
        last_released = entry.released;
        last_counter = entry.counter_high_watermark;
    }
}
