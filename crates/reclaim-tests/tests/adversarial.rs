//! Adversarial test suite for the claim ledger.
//!
//! Every test here tries to move value that should not move: claims by the
//! wrong key, replays, premature or out-of-order dilutions, races between
//! concurrent claimers, and malformed signatures. After each failed attempt
//! the ledger must be exactly as it was.
//!
//! Attack vectors tested:
//! - Foreign signer or redirected target
//! - Replay of a successful claim
//! - Dilution before threshold or out of order
//! - Settlement failure mid-operation
//! - Concurrent claims on one row
//! - Non-canonical R/S lengths under strict and lenient policies

use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;

use reclaim_core::address::LegacyAddress;
use reclaim_core::constants::{COIN, DILUTE1_OFFSET_SECS, DILUTE2_OFFSET_SECS};
use reclaim_core::error::{DilutionError, LedgerError, ReclaimError, SignatureError};
use reclaim_core::eth::EthAddress;
use reclaim_core::recovery::{public_key_of, sign_message};
use reclaim_core::signature::SignaturePolicy;
use reclaim_core::types::DilutionStage;
use reclaim_ledger::{ClaimRequest, ClaimSettings, LedgerConfig, LedgerService, MemoryTransfer, verify_claim};
use reclaim_tests::helpers::*;

fn settings_of(service: &LedgerService<MemoryTransfer>) -> ClaimSettings {
    service.with_ledger(|l| l.settings().clone())
}

/// Snapshot of everything a failed operation must leave untouched.
fn state(service: &LedgerService<MemoryTransfer>) -> (u128, u128, DilutionStage, u128) {
    service.with_ledger(|l| {
        (
            l.pool_total(),
            l.custody_balance(),
            l.current_stage(),
            l.transfer().total_paid(),
        )
    })
}

// ---------------------------------------------------------------------------
// Wrong signer
// ---------------------------------------------------------------------------

#[test]
fn foreign_key_cannot_claim() {
    let config = test_config();
    let (service, _clock) = test_service(&config);
    let settings = settings_of(&service);
    fund_all(&service, &[(1, 10 * COIN), (2, COIN)]);
    let before = state(&service);

    let forged = claim_signed_by(&settings, 1, 2, target(2), "");
    assert!(matches!(
        service.claim(&forged),
        Err(ReclaimError::Ledger(LedgerError::SignatureMismatch(_)))
    ));
    assert_eq!(state(&service), before);
    assert_eq!(service.balance_of(&legacy_address(1).hash160()), 10 * COIN);
}

#[test]
fn redirected_target_fails() {
    let config = test_config();
    let (service, _clock) = test_service(&config);
    let settings = settings_of(&service);
    fund_all(&service, &[(1, COIN)]);

    let mut request = signed_claim(&settings, 1, target(1));
    request.target = target(66);
    assert!(service.claim(&request).is_err());

    let mut request = signed_claim(&settings, 1, target(1));
    request.postfix = "tampered".into();
    assert!(service.claim(&request).is_err());

    assert_eq!(service.balance_of(&legacy_address(1).hash160()), COIN);
}

#[test]
fn claim_prefix_is_part_of_the_message() {
    // Signed for a ledger without a prefix, submitted to one with a prefix.
    let bare = ClaimSettings::from_config(&LedgerConfig::default());
    let request = signed_claim(&bare, 1, target(1));

    let config = test_config();
    let (service, _clock) = test_service(&config);
    fund_all(&service, &[(1, COIN)]);
    assert!(matches!(
        service.claim(&request),
        Err(ReclaimError::Ledger(LedgerError::SignatureMismatch(_)))
    ));
}

#[test]
fn malformed_signatures_surface_codec_errors() {
    let config = test_config();
    let (service, _clock) = test_service(&config);
    fund_all(&service, &[(1, COIN)]);
    let address = legacy_address(1);

    let not_base64 = ClaimRequest::new(address, target(1), "***");
    assert!(matches!(
        service.claim(&not_base64),
        Err(ReclaimError::Signature(SignatureError::InvalidEncoding(_)))
    ));

    // First byte claims a 255-byte R in a 3-byte input.
    let oversized_r = ClaimRequest::new(address, target(1), "/wAA");
    assert!(matches!(
        service.claim(&oversized_r),
        Err(ReclaimError::Signature(SignatureError::RComponentTooLarge { r_len: 255, len: 3 }))
    ));

    assert_eq!(service.balance_of(&address.hash160()), COIN);
}

// ---------------------------------------------------------------------------
// Dilution gating
// ---------------------------------------------------------------------------

#[test]
fn early_dilution_moves_no_value() {
    let config = test_config();
    let (service, clock) = test_service(&config);
    fund_all(&service, &[(1, 100 * COIN)]);
    let before = state(&service);

    clock.set(DEPLOY + DILUTE1_OFFSET_SECS - 1);
    assert!(matches!(
        service.dilute(DilutionStage::Stage1),
        Err(ReclaimError::Dilution(DilutionError::DiluteTimeNotReached { stage: 1, .. }))
    ));
    assert_eq!(state(&service), before);
}

#[test]
fn out_of_order_dilution_moves_no_value() {
    let config = test_config();
    let (service, clock) = test_service(&config);
    fund_all(&service, &[(1, 100 * COIN)]);
    let before = state(&service);

    clock.set(DEPLOY + DILUTE2_OFFSET_SECS + 1);
    for stage in [DilutionStage::Stage2, DilutionStage::Stage3] {
        assert!(matches!(
            service.dilute(stage),
            Err(ReclaimError::Dilution(DilutionError::DiluteOutOfOrder { .. }))
        ));
    }
    assert_eq!(state(&service), before);

    service.dilute(DilutionStage::Stage1).unwrap();
    service.dilute(DilutionStage::Stage2).unwrap();
    assert_eq!(service.current_stage(), DilutionStage::Stage2);
}

// ---------------------------------------------------------------------------
// Settlement failures
// ---------------------------------------------------------------------------

#[test]
fn failed_claim_settlement_changes_nothing() {
    let config = test_config();
    let (service, _clock) = test_service(&config);
    let settings = settings_of(&service);
    fund_all(&service, &[(1, COIN)]);
    let before = state(&service);

    service.with_ledger_mut(|l| l.transfer_mut().fail_for(target(1)));
    let request = signed_claim(&settings, 1, target(1));
    assert!(matches!(
        service.claim(&request),
        Err(ReclaimError::Ledger(LedgerError::TransferFailed(_)))
    ));
    assert_eq!(state(&service), before);

    // The same claim succeeds once the recipient accepts value again.
    service.with_ledger_mut(|l| l.transfer_mut().clear_failures());
    assert_eq!(service.claim(&request).unwrap().payout, COIN);
}

#[test]
fn failed_pot_settlement_changes_nothing() {
    let config = test_config();
    let (service, clock) = test_service(&config);
    fund_all(&service, &[(1, 10 * COIN)]);
    let before = state(&service);

    let reinsert = service.with_ledger(|l| l.beneficiaries().reinsert_pot);
    service.with_ledger_mut(|l| l.transfer_mut().fail_for(reinsert));
    clock.set(DEPLOY + DILUTE1_OFFSET_SECS);
    assert!(service.dilute(DilutionStage::Stage1).is_err());
    assert_eq!(state(&service), before);
    service.with_ledger(|l| {
        assert_eq!(l.transfer().balance_of(&l.beneficiaries().dao_pot), 0);
    });
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_claims_on_one_row_pay_once() {
    const THREADS: usize = 8;
    let config = test_config();
    let (service, _clock) = test_service(&config);
    let settings = settings_of(&service);
    fund_all(&service, &[(1, 40 * COIN)]);

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let service = service.clone();
            let barrier = Arc::clone(&barrier);
            let request = signed_claim(&settings, 1, target(i as u8));
            thread::spawn(move || {
                barrier.wait();
                service.claim(&request)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for r in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            r,
            Err(ReclaimError::Ledger(LedgerError::ClaimErrorNoBalance(_)))
        ));
    }
    service.with_ledger(|l| assert_eq!(l.transfer().total_paid(), 40 * COIN));
    assert_eq!(service.pool_total(), 0);
}

#[test]
fn concurrent_claims_on_distinct_rows_all_succeed() {
    let config = test_config();
    let (service, _clock) = test_service(&config);
    let settings = settings_of(&service);
    let seeds: Vec<u8> = (1..=6).collect();
    let rows: Vec<(u8, u128)> = seeds.iter().map(|s| (*s, u128::from(*s) * COIN)).collect();
    fund_all(&service, &rows);

    let handles: Vec<_> = seeds
        .iter()
        .map(|seed| {
            let service = service.clone();
            let request = signed_claim(&settings, *seed, target(*seed));
            thread::spawn(move || service.claim(&request))
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    assert_eq!(service.pool_total(), 0);
    assert_eq!(service.custody_balance(), 0);
    service.with_ledger(|l| {
        for seed in &seeds {
            assert_eq!(l.transfer().balance_of(&target(*seed)), u128::from(*seed) * COIN);
        }
    });
}

// ---------------------------------------------------------------------------
// Signature policy
// ---------------------------------------------------------------------------

#[test]
fn strict_policy_rejects_short_r_wallet_signatures() {
    let address: LegacyAddress = DIAMOND_WALLET_ADDRESS.parse().unwrap();
    let strict = ClaimSettings {
        policy: SignaturePolicy::Strict,
        ..ClaimSettings::default()
    };
    let lenient = ClaimSettings::default();

    for (to, sig) in DIAMOND_WALLET_CLAIMS {
        let request = ClaimRequest::new(address, EthAddress::parse(to).unwrap(), sig);
        assert!(verify_claim(&lenient, &request).is_ok(), "{to}");

        let strict_result = verify_claim(&strict, &request);
        if sig.starts_with('H') {
            assert!(matches!(
                strict_result,
                Err(ReclaimError::Signature(SignatureError::NonCanonicalComponents {
                    r_len: 31,
                    s_len: 33
                }))
            ));
        } else {
            assert!(strict_result.is_ok(), "{to}");
        }
    }
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn arbitrary_key_cannot_claim_another_row(victim in any::<[u8; 32]>(), attacker in any::<[u8; 32]>()) {
        prop_assume!(victim != attacker);
        let victim_key = public_key_of(&victim);
        prop_assume!(victim_key.is_ok() && public_key_of(&attacker).is_ok());
        let victim_address = victim_key.unwrap().to_legacy_address(0x5a);

        let mut ledger = test_ledger(&test_config());
        ledger.fund(victim_address.hash160(), 100).unwrap();
        let message = ledger.settings().message_for(&target(1), "");
        let sig = sign_message(&attacker, &message, ledger.settings().scheme).unwrap();

        let request = ClaimRequest::new(victim_address, target(1), sig);
        prop_assert!(ledger.claim(&request, DEPLOY).is_err());
        prop_assert_eq!(ledger.current_balance(&victim_address), 100);
        prop_assert_eq!(ledger.transfer().total_paid(), 0);
    }

    #[test]
    fn random_signature_text_never_pays(sig in "[A-Za-z0-9+/]{86}==") {
        let mut ledger = test_ledger(&test_config());
        let address = legacy_address(1);
        ledger.fund(address.hash160(), 100).unwrap();
        let request = ClaimRequest::new(address, target(1), sig);
        prop_assert!(ledger.claim(&request, DEPLOY).is_err());
        prop_assert_eq!(ledger.current_balance(&address), 100);
    }

    #[test]
    fn replay_after_success_always_fails(postfix in "[a-z ]{0,12}") {
        let mut ledger = test_ledger(&test_config());
        let settings = ledger.settings().clone();
        ledger.fund(legacy_address(3).hash160(), 500).unwrap();
        let request = claim_signed_by(&settings, 3, 3, target(3), &postfix);
        prop_assert_eq!(ledger.claim(&request, DEPLOY).unwrap().payout, 500);
        prop_assert!(ledger.claim(&request, DEPLOY + 1).is_err());
        prop_assert_eq!(ledger.transfer().total_paid(), 500);
    }
}
