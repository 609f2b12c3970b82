//! # reclaim-core
//! Identity bridging between legacy Base58Check addresses and signed
//! messages, plus the shared types and traits of the Reclaim ledger.

pub mod address;
pub mod codec;
pub mod constants;
pub mod derivation;
pub mod error;
pub mod eth;
pub mod hash;
pub mod message;
pub mod recovery;
pub mod signature;
pub mod traits;
pub mod types;
