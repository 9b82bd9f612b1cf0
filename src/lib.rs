//! HTLC Atomic Swaps for Bitcoin, Bytom and Vapor
//!
//! Builds, signs, decodes and submits the three transactions of a
//! hash-time-locked atomic swap:
//!
//! 1. **Fund** - lock coins into an HTLC
//! 2. **Claim** - the recipient spends the HTLC with the secret
//! 3. **Refund** - the sender takes the coins back after the lock expires
//!
//! Unsigned and signed transactions travel between parties as
//! *transaction raws*: base64 encoded JSON envelopes (see
//! [`transaction_raw`]).
//!
//! ## Providers
//!
//! - [`bitcoin`] - P2SH HTLCs, Esplora chain data, local signing
//! - [`bytom`] - Bytom and Vapor HTLCs built by the Blockcenter API and
//!   signed with ChainKD ed25519 keys

pub mod bitcoin;
pub mod bytom;
pub mod cli;
pub mod common;
pub mod transaction_raw;
pub mod types;

// Re-exports: shared infrastructure
pub use common::{Chain, Network, Result, SwapConfig, SwapError, BTM_ASSET};

// Re-exports: amounts
pub use types::{amount_converter, SpendAmount, Unit};

// Re-exports: transaction raws
pub use transaction_raw::{TransactionKind, TransactionType};
