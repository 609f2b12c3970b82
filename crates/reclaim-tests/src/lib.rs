//! Cross-crate test suite for Reclaim.
//!
//! `tests/e2e.rs` walks a ledger through its whole life; `tests/adversarial.rs`
//! tries to extract value it should not. Shared fixtures live in [`helpers`].

pub mod helpers;
