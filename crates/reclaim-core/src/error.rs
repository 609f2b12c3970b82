//! Error types for the Reclaim protocol.
use thiserror::Error;

use crate::types::DilutionStage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed hex: {0}")] MalformedHex(String),
    #[error("value too large: {len} bytes > {max}")] ValueTooLarge { len: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58 encoding: {0}")] InvalidEncoding(String),
    #[error("checksum mismatch")] ChecksumMismatch,
    #[error("invalid length: {0}")] InvalidLength(usize),
    #[error("unknown version byte: {0:#04x}")] UnknownVersion(u8),
    #[error("invalid eth address: {0}")] InvalidEthAddress(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid base64 signature: {0}")] InvalidEncoding(String),
    #[error("invalid signature length: {0}")] InvalidSignatureLength(usize),
    #[error("invalid recovery flag: {0}")] InvalidRecoveryFlag(u8),
    #[error("R component too large: {r_len} > {len}")] RComponentTooLarge { r_len: usize, len: usize },
    #[error("non-canonical components: r={r_len} s={s_len}")] NonCanonicalComponents { r_len: usize, s_len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("public key recovery failed: {0}")] RecoveryFailed(String),
    #[error("invalid public key")] InvalidPublicKey,
    #[error("invalid secret key")] InvalidSecretKey,
    #[error(transparent)] Signature(#[from] SignatureError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DilutionError {
    #[error("dilute{stage} threshold {threshold} not reached (now {now})")] DiluteTimeNotReached { stage: u8, threshold: u64, now: u64 },
    #[error("dilute{0} already happened")] DiluteAlreadyHappened(u8),
    #[error("{0} is not a dilution stage")] NotADilutionStage(DilutionStage),
    #[error("dilute{stage} requires dilute{required} first")] DiluteOutOfOrder { stage: u8, required: u8 },
    #[error("invalid schedule: {0}")] InvalidSchedule(String),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("balance already defined for {0}")] AccountAlreadyDefined(String),
    #[error("no balance for {0}")] ClaimErrorNoBalance(String),
    #[error("signature does not match {0}")] SignatureMismatch(String),
    #[error("zero funding for {0}")] ZeroFunding(String),
    #[error("funding closed after dilution stage {0}")] FundingClosed(u8),
    #[error("transfer failed: {0}")] TransferFailed(String),
    #[error("custody underflow: have {have}, need {need}")] CustodyUnderflow { have: u128, need: u128 },
    #[error("invalid beneficiary: {0}")] InvalidBeneficiary(String),
}

#[derive(Error, Debug)]
pub enum ReclaimError {
    #[error(transparent)] Codec(#[from] CodecError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Signature(#[from] SignatureError),
    #[error(transparent)] Recovery(#[from] RecoveryError),
    #[error(transparent)] Dilution(#[from] DilutionError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error("config: {0}")] Config(String),
    #[error("snapshot: {0}")] Snapshot(String),
}
