//! Bitcoin Provider
//!
//! This module provides the Bitcoin side of an atomic swap:
//! - Esplora API client for UTXOs, balances and broadcasting
//! - P2SH HTLC redeem scripts
//! - Wallets from mnemonics, passphrases and keys
//! - Fund/claim/refund transaction builders, solvers and signatures

pub mod client;
pub mod htlc;
pub mod signature;
pub mod solver;
pub mod transaction;
pub mod utils;
pub mod wallet;

pub use client::{
    BitcoinApi, EsploraClient, EsploraError, OutputInfo, TransactionInfo, UtxoInfo, MAINNET_URL,
    TESTNET_URL,
};
pub use htlc::Htlc;
pub use signature::Signature;
pub use solver::{ClaimSolver, FundSolver, RefundSolver, Solver};
pub use transaction::{Transaction, TransactionBuilder};
pub use utils::{
    decode_transaction_raw, fee_calculator, get_address_type, is_address, is_network,
    submit_transaction_raw,
};
pub use wallet::Wallet;
