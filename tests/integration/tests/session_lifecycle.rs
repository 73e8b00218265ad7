//! Integration test: session open, settle, final close and timeout refund
//! across the core, crypto and settlement crates.

use std::sync::Arc;

use chrono::{Duration, Utc};
use vpnpay_core::{SessionPolicy, SessionStatus, Voucher};
use vpnpay_crypto::KeyPair;
use vpnpay_integration_tests::{Harness, CLIENT, PROVIDER};
use vpnpay_settlement::{Command, CommandOutcome, SettlementError};

// =========================================================================
// Final voucher closes the session and returns the remainder
// =========================================================================

#[test]
fn test_incremental_then_final_settlement() {
    let h = Harness::new(1000);
    let mut issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();
    assert_eq!(h.balance(CLIENT), 0);
    assert_eq!(h.escrowed(&sid), 1000);

    let v1 = issuer.issue(300, 1, false).unwrap();
    let r1 = h.manager.settle(&sid, &v1, Utc::now()).unwrap();
    assert_eq!(r1.paid_to_provider, 300);
    assert_eq!(r1.status, SessionStatus::Active);
    assert_eq!(h.balance(PROVIDER), 300);

    let v2 = issuer.issue(900, 2, true).unwrap();
    let r2 = h.manager.settle(&sid, &v2, Utc::now()).unwrap();
    assert_eq!(r2.paid_to_provider, 600);
    assert_eq!(r2.refunded_to_client, 100);
    assert_eq!(r2.status, SessionStatus::Closed);

    assert_eq!(h.balance(PROVIDER), 900);
    assert_eq!(h.balance(CLIENT), 100);
    assert_eq!(h.escrowed(&sid), 0);

    let entry = h.manager.session(&sid).unwrap();
    assert_eq!(entry.released, 900);
    assert_eq!(entry.counter_high_watermark, 2);
    assert_eq!(entry.status, SessionStatus::Closed);
}

#[test]
fn test_closed_session_rejects_everything() {
    let h = Harness::new(1000);
    let mut issuer = h.open(1000, Utc::now());
    let sid = issuer.session_id().clone();
    let last = issuer.issue(1000, 1, true).unwrap();
    h.manager.settle(&sid, &last, Utc::now()).unwrap();

    // The issuer refuses to sign past a final voucher.
    assert!(matches!(
        issuer.issue(1000, 2, false),
        Err(SettlementError::SessionClosed(_))
    ));

    // Anything else submitted for the session is rejected before the
    // signature is even looked at.
    let stray = Voucher::new(sid.clone(), 1000, 2, false).sign(&KeyPair::generate());
    assert!(matches!(
        h.manager.settle(&sid, &stray, Utc::now()),
        Err(SettlementError::SessionClosed(_))
    ));
    assert_eq!(h.manager.session(&sid).unwrap().counter_high_watermark, 1);

    let later = Utc::now() + Duration::days(2);
    assert!(matches!(
        h.manager.refund(&sid, later),
        Err(SettlementError::SessionClosed(_))
    ));
}

// =========================================================================
// Timeout refund
// =========================================================================

#[test]
fn test_refund_after_partial_settlement() {
    let policy = SessionPolicy {
        refund_timeout_secs: 3600,
        ..SessionPolicy::default()
    };
    let h = Harness::with_policy(1000, policy.clone());
    let opened = Utc::now();
    let mut issuer = h.open(1000, opened);
    let sid = issuer.session_id().clone();

    let v = issuer.issue(500, 1, false).unwrap();
    h.manager.settle(&sid, &v, opened).unwrap();

    let at_timeout = opened + Duration::seconds(3600);
    assert!(matches!(
        h.manager.refund(&sid, at_timeout),
        Err(SettlementError::TimeoutNotElapsed { .. })
    ));

    let after = opened + Duration::seconds(3601);
    let outcome = h
        .manager
        .dispatch(Command::Refund { session_id: sid.clone() }, after)
        .unwrap();
    let CommandOutcome::Refunded(result) = outcome else {
        panic!("expected a refund");
    };
    assert_eq!(result.refunded_to_client, 500);
    assert_eq!(result.released, 500);
    assert_eq!(h.balance(CLIENT), 500);
    assert_eq!(h.balance(PROVIDER), 500);
    assert_eq!(h.manager.session(&sid).unwrap().status, SessionStatus::Closed);

    // The provider cannot settle after the refund.
    let v2 = issuer.issue(600, 2, false).unwrap();
    assert!(matches!(
        h.manager.settle(&sid, &v2, after),
        Err(SettlementError::SessionClosed(_))
    ));
}

#[test]
fn test_untouched_session_refunds_all_collateral() {
    let h = Harness::new(500);
    let opened = Utc::now();
    let mut issuer = h.open(500, opened);
    let sid = issuer.session_id().clone();
    assert_eq!(h.balance(CLIENT), 0);

    let after = opened + h.manager.policy().refund_timeout() + Duration::seconds(1);
    let result = h.manager.refund(&sid, after).unwrap();
    assert_eq!(result.refunded_to_client, 500);
    assert_eq!(result.released, 0);
    assert_eq!(result.status, SessionStatus::Closed);
    assert_eq!(h.balance(CLIENT), 500);
    assert_eq!(h.balance(PROVIDER), 0);
    assert_eq!(h.escrowed(&sid), 0);

    // The first voucher ever signed for the session arrives too late.
    let late = issuer.issue(100, 1, false).unwrap();
    assert!(matches!(
        h.manager.settle(&sid, &late, after),
        Err(SettlementError::SessionClosed(_))
    ));
    let entry = h.manager.session(&sid).unwrap();
    assert_eq!(entry.released, 0);
    assert_eq!(entry.counter_high_watermark, 0);
    assert_eq!(h.balance(CLIENT), 500);
    assert_eq!(h.balance(PROVIDER), 0);
}

#[test]
fn test_default_refund_window_is_one_day() {
    let h = Harness::new(1000);
    let opened = Utc::now();
    let issuer = h.open(1000, opened);
    let sid = issuer.session_id().clone();

    assert!(h.manager.refund(&sid, opened + Duration::hours(23)).is_err());
    let result = h
        .manager
        .refund(&sid, opened + Duration::hours(24) + Duration::seconds(1))
        .unwrap();
    assert_eq!(result.refunded_to_client, 1000);
    assert_eq!(h.balance(CLIENT), 1000);
}

// =========================================================================
// Exactly one closer
// =========================================================================

#[test]
fn test_final_voucher_and_refund_race_has_one_winner() {
    for _ in 0..20 {
        let policy = SessionPolicy {
            refund_timeout_secs: 1,
            ..SessionPolicy::default()
        };
        let h = Arc::new(Harness::with_policy(1000, policy));
        let opened = Utc::now() - Duration::seconds(10);
        let mut issuer = h.open(1000, opened);
        let sid = issuer.session_id().clone();
        let last = issuer.issue(700, 1, true).unwrap();

        let settle = {
            let h = h.clone();
            let sid = sid.clone();
            std::thread::spawn(move || h.manager.settle(&sid, &last, Utc::now()).is_ok())
        };
        let refund = {
            let h = h.clone();
            let sid = sid.clone();
            std::thread::spawn(move || h.manager.refund(&sid, Utc::now()).is_ok())
        };
        let settled = settle.join().unwrap();
        let refunded = refund.join().unwrap();

        assert!(settled ^ refunded, "exactly one closer must win");
        assert_eq!(h.balance(CLIENT) + h.balance(PROVIDER), 1000);
        assert_eq!(h.escrowed(&sid), 0);
        if settled {
            assert_eq!(h.balance(PROVIDER), 700);
        } else {
            assert_eq!(h.balance(CLIENT), 1000);
        }
    }
}
