//! Bytom and Vapor Provider
//!
//! Vapor is Bytom's sidechain and shares its keys, contracts and
//! Blockcenter API, so every type here takes the [`Chain`](crate::common::Chain)
//! it works on:
//! - ChainKD ed25519 key derivation and signing
//! - Blockcenter API client
//! - HTLC contract bytecode and P2WSH addresses
//! - Wallets, transaction builders, solvers and signatures

pub mod chainkd;
pub mod client;
pub mod htlc;
pub mod signature;
pub mod solver;
pub mod transaction;
pub mod utils;
pub mod wallet;

pub use chainkd::{ChainKdError, XPrv, XPub, DEFAULT_PATH};
pub use client::{BlockcenterApi, BlockcenterClient, BlockcenterError, BuildRequest, BuiltTransaction};
pub use htlc::Htlc;
pub use signature::Signature;
pub use solver::{ClaimSolver, FundSolver, RefundSolver, Solver};
pub use transaction::{Transaction, TransactionBuilder};
pub use utils::{
    decode_transaction_raw, get_address_type, get_program, is_address, is_network,
    submit_transaction_raw,
};
pub use wallet::Wallet;
