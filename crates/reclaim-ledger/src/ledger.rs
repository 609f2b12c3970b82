//! The claim ledger state machine.
//!
//! A [`ClaimLedger`] holds one row per funded legacy address (keyed by its
//! HASH160), the last fired dilution stage, and two running totals:
//!
//! - `total_unclaimed`: raw value of every row not yet claimed. Only `fund`
//!   raises it and only `claim` lowers it; dilution never touches it.
//! - `custody`: value held by the ledger. Raised by `fund`, lowered by every
//!   payout (claims and pot transfers).
//!
//! Every mutating operation computes its full effect first, then settles the
//! value transfer, and only then writes state. A failed transfer leaves the
//! ledger untouched.
//!
//! The ledger is not thread-safe on its own; see
//! [`LedgerService`](crate::service::LedgerService) for the serialized wrapper.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use reclaim_core::address::LegacyAddress;
use reclaim_core::constants::RECOVERY_HEADERS;
use reclaim_core::derivation::{PublicKeyPoint, matches_legacy};
use reclaim_core::error::{DilutionError, LedgerError, ReclaimError};
use reclaim_core::eth::EthAddress;
use reclaim_core::message::{SigningScheme, claim_message, magic_hash};
use reclaim_core::recovery::recover_point;
use reclaim_core::signature::{SignaturePolicy, parse_variable};
use reclaim_core::traits::{DilutionCalculator, Payout, ValueTransfer};
use reclaim_core::types::{Amount, Beneficiaries, DilutionStage, Hash160, PotSplit, Timestamp};
use reclaim_dilution::{DilutionEngine, DilutionSchedule};

use crate::config::LedgerConfig;

/// Parameters fixed per ledger that determine how a claim is verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimSettings {
    pub claim_prefix: String,
    pub scheme: SigningScheme,
    pub policy: SignaturePolicy,
    pub legacy_version: u8,
}

impl ClaimSettings {
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            claim_prefix: config.claim_prefix.clone(),
            scheme: config.signing_scheme,
            policy: config.signature_policy,
            legacy_version: config.legacy_version,
        }
    }

    /// The exact text a claimant must sign to send funds to `target`.
    pub fn message_for(&self, target: &EthAddress, postfix: &str) -> String {
        claim_message(&self.claim_prefix, &target.to_checksum(), postfix)
    }
}

impl Default for ClaimSettings {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    pub legacy_address: LegacyAddress,
    pub target: EthAddress,
    /// Base64 of the 65-byte recoverable signature.
    pub signature: String,
    /// Free text the claimant appended after the target address.
    pub postfix: String,
    /// Overrides the ledger's signing scheme for this claim.
    pub scheme: Option<SigningScheme>,
}

impl ClaimRequest {
    pub fn new(legacy_address: LegacyAddress, target: EthAddress, signature: impl Into<String>) -> Self {
        Self {
            legacy_address,
            target,
            signature: signature.into(),
            postfix: String::new(),
            scheme: None,
        }
    }

    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = postfix.into();
        self
    }

    pub fn with_scheme(mut self, scheme: SigningScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }
}

/// Check that `request.signature` was made by the key behind
/// `request.legacy_address` over the claim message for `request.target`.
///
/// The signature header is not trusted for the recovery id. Both ids are
/// probed in turn and the first whose key hashes to the claimed address wins.
/// Pure: touches no ledger state.
pub fn verify_claim(
    settings: &ClaimSettings,
    request: &ClaimRequest,
) -> Result<PublicKeyPoint, ReclaimError> {
    let message = settings.message_for(&request.target, &request.postfix);
    let scheme = request.scheme.unwrap_or(settings.scheme);
    let digest = magic_hash(&message, scheme);
    let compact = parse_variable(&request.signature)?.compact(settings.policy)?;

    for header in RECOVERY_HEADERS {
        let recovery_id = header - RECOVERY_HEADERS[0];
        match recover_point(&compact, recovery_id, &digest) {
            Ok(point) if matches_legacy(&point, &request.legacy_address) => {
                debug!(recovery_id, address = %request.legacy_address, "recovery id matched");
                return Ok(point);
            }
            Ok(point) => {
                debug!(recovery_id, recovered = %point.hash160(), "recovery id did not match");
            }
            Err(e) => {
                debug!(recovery_id, "recovery failed: {e}");
            }
        }
    }

    Err(LedgerError::SignatureMismatch(
        request.legacy_address.with_version(settings.legacy_version).to_string(),
    )
    .into())
}

/// Outcome of a successful claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub legacy_address: LegacyAddress,
    pub target: EthAddress,
    /// Row value before the claim.
    #[serde(with = "crate::amount")]
    pub raw_value: Amount,
    /// Value sent to `target` after dilution.
    #[serde(with = "crate::amount")]
    pub payout: Amount,
    pub stage: DilutionStage,
    pub claimed_at: Timestamp,
}

/// Outcome of a fired dilution stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DilutionReceipt {
    pub stage: DilutionStage,
    /// Unclaimed raw total the forfeit was computed from.
    #[serde(with = "crate::amount")]
    pub pool: Amount,
    #[serde(with = "crate::amount")]
    pub forfeited: Amount,
    pub split: PotSplit,
    pub fired_at: Timestamp,
}

pub struct ClaimLedger<T: ValueTransfer> {
    settings: ClaimSettings,
    schedule: DilutionSchedule,
    beneficiaries: Beneficiaries,
    calculator: Box<dyn DilutionCalculator>,
    balances: HashMap<Hash160, Amount>,
    stage: DilutionStage,
    total_unclaimed: Amount,
    custody: Amount,
    transfer: T,
}

impl<T: ValueTransfer> ClaimLedger<T> {
    /// Build an empty ledger. Fails if either pot is the zero address or the
    /// schedule is not strictly increasing.
    pub fn new(config: &LedgerConfig, transfer: T) -> Result<Self, ReclaimError> {
        Self::with_calculator(config, transfer, Box::new(DilutionEngine::new()))
    }

    pub fn with_calculator(
        config: &LedgerConfig,
        transfer: T,
        calculator: Box<dyn DilutionCalculator>,
    ) -> Result<Self, ReclaimError> {
        let beneficiaries = config.beneficiaries()?;
        let schedule = config.schedule()?;
        info!(
            reinsert_pot = %beneficiaries.reinsert_pot,
            dao_pot = %beneficiaries.dao_pot,
            thresholds = ?schedule.timestamps(),
            "claim ledger created"
        );
        Ok(Self {
            settings: ClaimSettings::from_config(config),
            schedule,
            beneficiaries,
            calculator,
            balances: HashMap::new(),
            stage: DilutionStage::Active,
            total_unclaimed: 0,
            custody: 0,
            transfer,
        })
    }

    // --- mutations ---

    /// Create the row for `hash` holding `amount`, taking `amount` into custody.
    ///
    /// Rows are single-shot: a second call for the same hash fails even after
    /// the first row was claimed.
    pub fn fund(&mut self, hash: Hash160, amount: Amount) -> Result<(), ReclaimError> {
        let version = self.settings.legacy_version;
        let label = || LegacyAddress::from_hash160(hash, version).to_string();

        if self.balances.contains_key(&hash) {
            return Err(LedgerError::AccountAlreadyDefined(label()).into());
        }
        if amount == 0 {
            return Err(LedgerError::ZeroFunding(label()).into());
        }
        if self.stage != DilutionStage::Active {
            return Err(LedgerError::FundingClosed(self.stage.index()).into());
        }

        let total_unclaimed = self
            .total_unclaimed
            .checked_add(amount)
            .ok_or(DilutionError::ArithmeticOverflow)?;
        let custody = self
            .custody
            .checked_add(amount)
            .ok_or(DilutionError::ArithmeticOverflow)?;

        self.transfer.receive(amount)?;

        self.balances.insert(hash, amount);
        self.total_unclaimed = total_unclaimed;
        self.custody = custody;
        info!(address = %label(), amount, "funded");
        Ok(())
    }

    /// Verify and pay a claim at `now`.
    ///
    /// The balance check runs before signature recovery, so an unfunded or
    /// already claimed address reports `ClaimErrorNoBalance` whatever the
    /// signature.
    pub fn claim(&mut self, request: &ClaimRequest, now: Timestamp) -> Result<ClaimReceipt, ReclaimError> {
        let raw = self.current_balance(&request.legacy_address);
        if raw == 0 {
            return Err(self.no_balance(&request.legacy_address).into());
        }
        verify_claim(&self.settings, request)?;
        self.settle_claim(&request.legacy_address, raw, request.target, now)
    }

    /// Pay out the row for `address`, provided it still holds exactly
    /// `expected_raw`. Signature verification is the caller's job.
    pub(crate) fn settle_claim(
        &mut self,
        address: &LegacyAddress,
        expected_raw: Amount,
        target: EthAddress,
        now: Timestamp,
    ) -> Result<ClaimReceipt, ReclaimError> {
        let hash = address.hash160();
        let raw = self.balances.get(&hash).copied().unwrap_or(0);
        if raw == 0 || raw != expected_raw {
            return Err(self.no_balance(address).into());
        }

        // Gated on the fired stage, not on wall-clock time.
        let payout = self.calculator.payout(raw, self.stage)?;
        let total_unclaimed = self
            .total_unclaimed
            .checked_sub(raw)
            .ok_or(DilutionError::ArithmeticOverflow)?;
        let custody = self.custody.checked_sub(payout).ok_or(LedgerError::CustodyUnderflow {
            have: self.custody,
            need: payout,
        })?;

        if payout > 0 {
            self.transfer.settle(&[Payout { to: target, amount: payout }])?;
        }

        self.balances.insert(hash, 0);
        self.total_unclaimed = total_unclaimed;
        self.custody = custody;

        let receipt = ClaimReceipt {
            legacy_address: address.with_version(self.settings.legacy_version),
            target,
            raw_value: raw,
            payout,
            stage: self.stage,
            claimed_at: now,
        };
        info!(
            address = %receipt.legacy_address,
            %target,
            raw_value = raw,
            payout,
            stage = %self.stage,
            "claimed"
        );
        Ok(receipt)
    }

    /// Fire `stage` at `now`, sending its forfeit to the two pots in a single
    /// batch.
    ///
    /// The terminal stage forfeits everything left in custody: claims pay
    /// nothing after it, so the rounding left over by earlier stages and
    /// floored payouts goes to the pots with the rest.
    pub fn dilute(&mut self, stage: DilutionStage, now: Timestamp) -> Result<DilutionReceipt, ReclaimError> {
        self.schedule.check_fire(self.stage, stage, now)?;

        let pool = self.total_unclaimed;
        let forfeited = if stage.is_terminal() {
            self.custody
        } else {
            self.calculator.forfeit(pool, stage)?
        };
        let split = self.calculator.split(forfeited);
        let custody = self.custody.checked_sub(forfeited).ok_or(LedgerError::CustodyUnderflow {
            have: self.custody,
            need: forfeited,
        })?;

        let batch: Vec<Payout> = [
            Payout { to: self.beneficiaries.reinsert_pot, amount: split.reinsert },
            Payout { to: self.beneficiaries.dao_pot, amount: split.dao },
        ]
        .into_iter()
        .filter(|p| p.amount > 0)
        .collect();
        if !batch.is_empty() {
            self.transfer.settle(&batch)?;
        }

        self.stage = stage;
        self.custody = custody;
        info!(
            %stage,
            pool,
            forfeited,
            reinsert = split.reinsert,
            dao = split.dao,
            "dilution fired"
        );
        Ok(DilutionReceipt {
            stage,
            pool,
            forfeited,
            split,
            fired_at: now,
        })
    }

    pub fn dilute1(&mut self, now: Timestamp) -> Result<DilutionReceipt, ReclaimError> {
        self.dilute(DilutionStage::Stage1, now)
    }

    pub fn dilute2(&mut self, now: Timestamp) -> Result<DilutionReceipt, ReclaimError> {
        self.dilute(DilutionStage::Stage2, now)
    }

    pub fn dilute3(&mut self, now: Timestamp) -> Result<DilutionReceipt, ReclaimError> {
        self.dilute(DilutionStage::Stage3, now)
    }

    // --- queries ---

    /// Raw value of the row for `address`; zero if unfunded or claimed.
    pub fn current_balance(&self, address: &LegacyAddress) -> Amount {
        self.balance_of(&address.hash160())
    }

    pub fn balance_of(&self, hash: &Hash160) -> Amount {
        self.balances.get(hash).copied().unwrap_or(0)
    }

    /// Whether a row was ever created for `hash`.
    pub fn is_funded(&self, hash: &Hash160) -> bool {
        self.balances.contains_key(hash)
    }

    /// What a claim for `address` would pay right now.
    pub fn claimable(&self, address: &LegacyAddress) -> Result<Amount, DilutionError> {
        self.calculator.payout(self.current_balance(address), self.stage)
    }

    /// Last fired stage.
    pub fn current_stage(&self) -> DilutionStage {
        self.stage
    }

    /// Raw value of all unclaimed rows.
    pub fn pool_total(&self) -> Amount {
        self.total_unclaimed
    }

    pub fn custody_balance(&self) -> Amount {
        self.custody
    }

    pub fn row_count(&self) -> usize {
        self.balances.len()
    }

    pub fn dilution_timestamp(&self, stage: DilutionStage) -> Option<Timestamp> {
        self.schedule.threshold(stage)
    }

    pub fn seconds_until(&self, stage: DilutionStage, now: Timestamp) -> u64 {
        self.schedule.seconds_until(stage, now)
    }

    pub fn schedule(&self) -> &DilutionSchedule {
        &self.schedule
    }

    pub fn beneficiaries(&self) -> &Beneficiaries {
        &self.beneficiaries
    }

    pub fn settings(&self) -> &ClaimSettings {
        &self.settings
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    pub fn transfer_mut(&mut self) -> &mut T {
        &mut self.transfer
    }

    fn no_balance(&self, address: &LegacyAddress) -> LedgerError {
        LedgerError::ClaimErrorNoBalance(address.with_version(self.settings.legacy_version).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::MemoryTransfer;
    use reclaim_core::constants::COIN;
    use reclaim_core::recovery::{public_key_of, sign_message};

    const T1: Timestamp = 1_000;
    const T2: Timestamp = 2_000;
    const T3: Timestamp = 3_000;

    fn config() -> LedgerConfig {
        LedgerConfig {
            dilution_timestamps: Some([T1, T2, T3]),
            ..Default::default()
        }
    }

    fn ledger() -> ClaimLedger<MemoryTransfer> {
        ClaimLedger::new(&config(), MemoryTransfer::new()).unwrap()
    }

    fn secret(n: u8) -> [u8; 32] {
        let mut s = [0u8; 32];
        s[31] = n;
        s
    }

    fn address_of(n: u8) -> LegacyAddress {
        public_key_of(&secret(n)).unwrap().to_legacy_address(0x5a)
    }

    fn target(n: u8) -> EthAddress {
        EthAddress([0x10 + n; 20])
    }

    fn signed_request(ledger: &ClaimLedger<MemoryTransfer>, n: u8, to: EthAddress) -> ClaimRequest {
        let message = ledger.settings().message_for(&to, "");
        let sig = sign_message(&secret(n), &message, ledger.settings().scheme).unwrap();
        ClaimRequest::new(address_of(n), to, sig)
    }

    // --- construction ---

    #[test]
    fn new_ledger_is_empty_and_active() {
        let l = ledger();
        assert_eq!(l.current_stage(), DilutionStage::Active);
        assert_eq!(l.pool_total(), 0);
        assert_eq!(l.custody_balance(), 0);
        assert_eq!(l.dilution_timestamp(DilutionStage::Stage2), Some(T2));
    }

    #[test]
    fn zero_pot_rejected_at_construction() {
        let cfg = LedgerConfig {
            dao_pot: EthAddress::ZERO.to_string(),
            ..config()
        };
        assert!(matches!(
            ClaimLedger::new(&cfg, MemoryTransfer::new()),
            Err(ReclaimError::Ledger(LedgerError::InvalidBeneficiary(_)))
        ));
    }

    // --- fund ---

    #[test]
    fn fund_creates_row_and_custody() {
        let mut l = ledger();
        let a = address_of(1);
        l.fund(a.hash160(), 5 * COIN).unwrap();
        assert_eq!(l.current_balance(&a), 5 * COIN);
        assert_eq!(l.pool_total(), 5 * COIN);
        assert_eq!(l.custody_balance(), 5 * COIN);
        assert_eq!(l.transfer().total_received(), 5 * COIN);
    }

    #[test]
    fn fund_twice_rejected() {
        let mut l = ledger();
        let h = address_of(1).hash160();
        l.fund(h, 5).unwrap();
        assert!(matches!(
            l.fund(h, 7),
            Err(ReclaimError::Ledger(LedgerError::AccountAlreadyDefined(_)))
        ));
        assert_eq!(l.balance_of(&h), 5);
    }

    #[test]
    fn fund_zero_rejected() {
        let mut l = ledger();
        assert!(matches!(
            l.fund(address_of(1).hash160(), 0),
            Err(ReclaimError::Ledger(LedgerError::ZeroFunding(_)))
        ));
        assert!(!l.is_funded(&address_of(1).hash160()));
    }

    #[test]
    fn fund_closed_after_first_dilution() {
        let mut l = ledger();
        l.dilute1(T1).unwrap();
        assert!(matches!(
            l.fund(address_of(1).hash160(), 5),
            Err(ReclaimError::Ledger(LedgerError::FundingClosed(1)))
        ));
    }

    #[test]
    fn fund_transfer_failure_leaves_no_row() {
        let mut l = ledger();
        l.transfer_mut().set_fail_all(true);
        assert!(l.fund(address_of(1).hash160(), 5).is_err());
        assert!(!l.is_funded(&address_of(1).hash160()));
        assert_eq!(l.pool_total(), 0);
    }

    // --- claim ---

    #[test]
    fn claim_pays_full_value_while_active() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 10 * COIN).unwrap();
        let req = signed_request(&l, 1, target(1));
        let receipt = l.claim(&req, 10).unwrap();
        assert_eq!(receipt.payout, 10 * COIN);
        assert_eq!(receipt.raw_value, 10 * COIN);
        assert_eq!(receipt.stage, DilutionStage::Active);
        assert_eq!(l.transfer().balance_of(&target(1)), 10 * COIN);
        assert_eq!(l.current_balance(&address_of(1)), 0);
        assert_eq!(l.pool_total(), 0);
        assert_eq!(l.custody_balance(), 0);
    }

    #[test]
    fn second_claim_has_no_balance() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), COIN).unwrap();
        let req = signed_request(&l, 1, target(1));
        l.claim(&req, 10).unwrap();
        assert!(matches!(
            l.claim(&req, 11),
            Err(ReclaimError::Ledger(LedgerError::ClaimErrorNoBalance(_)))
        ));
        assert_eq!(l.transfer().balance_of(&target(1)), COIN);
    }

    #[test]
    fn unfunded_claim_has_no_balance() {
        let mut l = ledger();
        let req = signed_request(&l, 1, target(1));
        assert!(matches!(
            l.claim(&req, 0),
            Err(ReclaimError::Ledger(LedgerError::ClaimErrorNoBalance(_)))
        ));
    }

    #[test]
    fn claim_signed_by_other_key_mismatches() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), COIN).unwrap();
        let mut req = signed_request(&l, 2, target(1));
        req.legacy_address = address_of(1);
        assert!(matches!(
            l.claim(&req, 0),
            Err(ReclaimError::Ledger(LedgerError::SignatureMismatch(_)))
        ));
        assert_eq!(l.current_balance(&address_of(1)), COIN);
    }

    #[test]
    fn claim_redirected_to_other_target_mismatches() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), COIN).unwrap();
        let mut req = signed_request(&l, 1, target(1));
        req.target = target(2);
        assert!(l.claim(&req, 0).is_err());
        assert_eq!(l.transfer().total_paid(), 0);
    }

    #[test]
    fn claim_with_postfix() {
        let mut l = ledger();
        l.fund(address_of(3).hash160(), COIN).unwrap();
        let message = l.settings().message_for(&target(3), " nonce 7");
        let sig = sign_message(&secret(3), &message, SigningScheme::Diamond).unwrap();
        let req = ClaimRequest::new(address_of(3), target(3), sig.clone()).with_postfix(" nonce 7");
        let without = ClaimRequest::new(address_of(3), target(3), sig);
        assert!(l.claim(&without, 0).is_err());
        assert_eq!(l.claim(&req, 0).unwrap().payout, COIN);
    }

    #[test]
    fn claim_with_scheme_override() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), COIN).unwrap();
        let message = l.settings().message_for(&target(1), "");
        let sig = sign_message(&secret(1), &message, SigningScheme::Bitcoin).unwrap();
        let req = ClaimRequest::new(address_of(1), target(1), sig);
        assert!(l.claim(&req, 0).is_err());
        assert!(l.claim(&req.with_scheme(SigningScheme::Bitcoin), 0).is_ok());
    }

    #[test]
    fn claim_uses_fired_stage_not_clock() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 100).unwrap();
        let req = signed_request(&l, 1, target(1));
        // Past t2 but nothing fired
        assert_eq!(l.claim(&req, T2 + 1).unwrap().payout, 100);
    }

    #[test]
    fn claim_transfer_failure_is_atomic() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), COIN).unwrap();
        let req = signed_request(&l, 1, target(1));
        l.transfer_mut().fail_for(target(1));
        assert!(matches!(
            l.claim(&req, 0),
            Err(ReclaimError::Ledger(LedgerError::TransferFailed(_)))
        ));
        assert_eq!(l.current_balance(&address_of(1)), COIN);
        assert_eq!(l.pool_total(), COIN);
        assert_eq!(l.custody_balance(), COIN);
    }

    #[test]
    fn settle_requires_expected_value() {
        let mut l = ledger();
        let a = address_of(1);
        l.fund(a.hash160(), 10).unwrap();
        assert!(l.settle_claim(&a, 9, target(1), 0).is_err());
        assert!(l.settle_claim(&a, 10, target(1), 0).is_ok());
        assert!(l.settle_claim(&a, 10, target(1), 0).is_err());
    }

    // --- dilution ---

    #[test]
    fn dilution_splits_forfeit_between_pots() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 1_001).unwrap();
        let r = l.dilute1(T1).unwrap();
        // 25% of 1001 = 250.25
        assert_eq!(r.forfeited, 250);
        assert_eq!(r.split, PotSplit { reinsert: 125, dao: 125 });
        let pots = *l.beneficiaries();
        assert_eq!(l.transfer().balance_of(&pots.reinsert_pot), 125);
        assert_eq!(l.transfer().balance_of(&pots.dao_pot), 125);
        assert_eq!(l.pool_total(), 1_001);
        assert_eq!(l.custody_balance(), 751);
        assert_eq!(l.current_balance(&address_of(1)), 1_001);
        assert_eq!(l.claimable(&address_of(1)).unwrap(), 750);
    }

    #[test]
    fn odd_forfeit_remainder_goes_to_dao() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 4).unwrap();
        let r = l.dilute1(T1).unwrap();
        assert_eq!(r.forfeited, 1);
        assert_eq!(r.split, PotSplit { reinsert: 0, dao: 1 });
        assert_eq!(l.transfer().history().len(), 1);
    }

    #[test]
    fn terminal_dilution_empties_custody() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 3).unwrap();
        assert_eq!(l.dilute1(T1).unwrap().forfeited, 0);
        assert_eq!(l.dilute2(T2).unwrap().forfeited, 0);
        let r = l.dilute3(T3).unwrap();
        assert_eq!(r.forfeited, 3);
        assert_eq!(r.split, PotSplit { reinsert: 1, dao: 2 });
        assert_eq!(l.custody_balance(), 0);
        assert_eq!(l.transfer().total_paid(), 3);
    }

    #[test]
    fn terminal_dilution_collects_payout_rounding() {
        let mut l = ledger();
        for n in 1..=3 {
            l.fund(address_of(n).hash160(), 3).unwrap();
        }
        l.dilute1(T1).unwrap();
        // floor(3 * 0.75) = 2, one unit stays behind
        let req = signed_request(&l, 1, target(1));
        assert_eq!(l.claim(&req, T1).unwrap().payout, 2);
        l.dilute2(T2).unwrap();
        let req = signed_request(&l, 2, target(2));
        assert_eq!(l.claim(&req, T2).unwrap().payout, 1);
        l.dilute3(T3).unwrap();
        assert_eq!(l.custody_balance(), 0);
        let req = signed_request(&l, 3, target(3));
        assert_eq!(l.claim(&req, T3).unwrap().payout, 0);
        assert_eq!(l.custody_balance(), 0);
        assert_eq!(l.transfer().total_paid(), 9);
    }

    #[test]
    fn dilute_rejects_active() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 100).unwrap();
        assert!(matches!(
            l.dilute(DilutionStage::Active, T3),
            Err(ReclaimError::Dilution(DilutionError::NotADilutionStage(DilutionStage::Active)))
        ));
        assert_eq!(l.transfer().total_paid(), 0);
    }

    #[test]
    fn dilute_early_moves_nothing() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 100).unwrap();
        assert!(matches!(
            l.dilute1(T1 - 1),
            Err(ReclaimError::Dilution(DilutionError::DiluteTimeNotReached { .. }))
        ));
        assert_eq!(l.current_stage(), DilutionStage::Active);
        assert_eq!(l.transfer().total_paid(), 0);
    }

    #[test]
    fn dilute_out_of_order_moves_nothing() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 100).unwrap();
        assert!(matches!(
            l.dilute2(T3),
            Err(ReclaimError::Dilution(DilutionError::DiluteOutOfOrder { stage: 2, required: 1 }))
        ));
        assert_eq!(l.transfer().total_paid(), 0);
    }

    #[test]
    fn dilute_transfer_failure_is_atomic() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 100).unwrap();
        let dao = l.beneficiaries().dao_pot;
        l.transfer_mut().fail_for(dao);
        assert!(l.dilute1(T1).is_err());
        assert_eq!(l.current_stage(), DilutionStage::Active);
        assert_eq!(l.custody_balance(), 100);
        assert_eq!(l.transfer().balance_of(&l.beneficiaries().reinsert_pot), 0);
    }

    #[test]
    fn empty_pool_dilution_still_fires() {
        let mut l = ledger();
        let r = l.dilute1(T1).unwrap();
        assert_eq!(r.forfeited, 0);
        assert_eq!(l.current_stage(), DilutionStage::Stage1);
        assert!(l.transfer().history().is_empty());
    }

    #[test]
    fn claim_after_terminal_pays_zero() {
        let mut l = ledger();
        l.fund(address_of(1).hash160(), 100).unwrap();
        l.dilute1(T1).unwrap();
        l.dilute2(T2).unwrap();
        l.dilute3(T3).unwrap();
        assert_eq!(l.custody_balance(), 0);

        let req = signed_request(&l, 1, target(1));
        let receipt = l.claim(&req, T3).unwrap();
        assert_eq!(receipt.payout, 0);
        assert_eq!(l.transfer().balance_of(&target(1)), 0);
        assert_eq!(l.current_balance(&address_of(1)), 0);
        assert_eq!(l.pool_total(), 0);
    }

    #[test]
    fn seconds_until_queries() {
        let l = ledger();
        assert_eq!(l.seconds_until(DilutionStage::Stage1, 400), 600);
        assert_eq!(l.seconds_until(DilutionStage::Stage3, 5_000), 0);
    }

    #[test]
    fn receipt_serializes_amounts_as_strings() {
        let r = DilutionReceipt {
            stage: DilutionStage::Stage1,
            pool: 4,
            forfeited: 1,
            split: PotSplit { reinsert: 0, dao: 1 },
            fired_at: T1,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["stage"], "stage1");
        assert_eq!(json["pool"], "4");
    }

    // --- properties ---

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]

        #[test]
        fn custody_plus_paid_is_funded(
            amounts in proptest::collection::vec(1u128..1_000_000 * COIN, 3),
            claim_at in proptest::collection::vec(0usize..4, 3),
        ) {
            let mut l = ledger();
            for (i, amount) in amounts.iter().enumerate() {
                l.fund(address_of(i as u8 + 1).hash160(), *amount).unwrap();
            }
            let funded: Amount = amounts.iter().sum();

            // Claims land before stage `claim_at[i]` fires; 3 means after the last one.
            let times = [T1, T2, T3];
            for step in 0..4 {
                for (i, at) in claim_at.iter().enumerate() {
                    if *at == step {
                        let n = i as u8 + 1;
                        let now = if step == 0 { 0 } else { times[step - 1] };
                        let req = signed_request(&l, n, target(n));
                        l.claim(&req, now).unwrap();
                    }
                }
                if step < 3 {
                    l.dilute(DilutionStage::ALL[step + 1], times[step]).unwrap();
                }
                proptest::prop_assert_eq!(l.custody_balance() + l.transfer().total_paid(), funded);
            }
            proptest::prop_assert_eq!(l.custody_balance(), 0);
        }
    }
}
