//! Protocol constants. All monetary values in base units (1 coin = 10^18 units).

pub const COIN: u128 = 1_000_000_000_000_000_000;

/// Denominator for all fractional amounts (basis points).
pub const BPS_PRECISION: u128 = 10_000;

/// Retained fraction of an unclaimed balance before any dilution stage fires.
pub const RETAINED_ACTIVE_BPS: u128 = 10_000;
/// Retained fraction after stage 1 (75%).
pub const RETAINED_STAGE1_BPS: u128 = 7_500;
/// Retained fraction after stage 2 (50%).
pub const RETAINED_STAGE2_BPS: u128 = 5_000;
/// Retained fraction after stage 3. Nothing is left to claim.
pub const RETAINED_STAGE3_BPS: u128 = 0;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Stage 1 fires 92 days (two 31-day months plus one 30-day month) after deployment.
pub const DILUTE1_OFFSET_SECS: u64 = SECONDS_PER_DAY * 2 * 31 + SECONDS_PER_DAY * 30;

/// Stage 2 fires 183 days (three 31-day and three 30-day months) after deployment.
pub const DILUTE2_OFFSET_SECS: u64 = SECONDS_PER_DAY * 3 * 31 + SECONDS_PER_DAY * 3 * 30;

/// Stage 3 fires after four common years and one leap year.
pub const DILUTE3_OFFSET_SECS: u64 = SECONDS_PER_DAY * 4 * 365 + SECONDS_PER_DAY * 366;

/// Version byte of Bitcoin P2PKH addresses (`1...`).
pub const VERSION_BITCOIN: u8 = 0x00;

/// Version byte of Diamond legacy addresses (`d...`).
pub const VERSION_DIAMOND: u8 = 0x5a;

/// Alternate Diamond version byte used by some V3 deployments.
pub const VERSION_DIAMOND_ALT: u8 = 0x0d;

/// Recovery header bytes probed by a claim: 27 (`0x1b`) and 28 (`0x1c`).
pub const RECOVERY_HEADERS: [u8; 2] = [0x1b, 0x1c];

/// Length of a compact recoverable signature: header byte + r + s.
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// Expected byte length of each of the R and S components.
pub const SIGNATURE_COMPONENT_LEN: usize = 32;

/// Snapshot entries below this value are treated as dust and skipped.
pub const DEFAULT_MIN_SNAPSHOT_VALUE: u128 = COIN;
