//! Bitcoin Signature
//!
//! Signs a transaction raw produced elsewhere (for example by the `fund`
//! CLI command) without rebuilding it from chain data.

use crate::bitcoin::solver::Solver;
use crate::bitcoin::transaction::Transaction;
use crate::common::{Chain, Network, Result, SwapError};
use crate::transaction_raw::{self, BitcoinTransactionRaw};

/// Signer for Bitcoin transaction raws
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    network: Network,
}

impl Signature {
    pub fn new(network: Network) -> Result<Self> {
        Ok(Self {
            network: Chain::Bitcoin.check_network(network)?,
        })
    }

    /// Decode an unsigned transaction raw and sign it
    pub fn sign(&self, transaction_raw: &str, solver: &Solver) -> Result<Transaction> {
        let envelope: BitcoinTransactionRaw =
            transaction_raw::decode(transaction_raw, Chain::Bitcoin)?;
        if envelope.network != self.network {
            return Err(SwapError::network(
                format!("Wrong Bitcoin transaction raw '{}' network", envelope.network),
                format!("this signature is for the {} network.", self.network),
            ));
        }
        if envelope.transaction_type.is_signed() {
            return Err(SwapError::transaction_raw(format!(
                "Transaction raw is already signed ({}).",
                envelope.transaction_type
            )));
        }
        Transaction::from_envelope(envelope)?.sign(solver)
    }
}
