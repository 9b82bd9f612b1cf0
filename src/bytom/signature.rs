//! Bytom/Vapor Signature
//!
//! Signs a transaction raw produced elsewhere without asking the
//! Blockcenter again.

use crate::bytom::solver::Solver;
use crate::bytom::transaction::Transaction;
use crate::common::{Chain, Network, Result, SwapError};
use crate::transaction_raw::{self, BytomTransactionRaw};

/// Signer for Bytom/Vapor transaction raws
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    chain: Chain,
    network: Network,
}

impl Signature {
    pub fn new(chain: Chain, network: Network) -> Result<Self> {
        if chain == Chain::Bitcoin {
            return Err(SwapError::transaction(
                "Bitcoin transaction raws use the bitcoin signature.",
            ));
        }
        Ok(Self {
            chain,
            network: chain.check_network(network)?,
        })
    }

    /// Decode an unsigned transaction raw and sign it
    pub fn sign(&self, transaction_raw: &str, solver: &Solver) -> Result<Transaction> {
        let envelope: BytomTransactionRaw = transaction_raw::decode(transaction_raw, self.chain)?;
        if envelope.network != self.network {
            return Err(SwapError::network(
                format!("Wrong {} transaction raw '{}' network", self.chain, envelope.network),
                format!("this signature is for the {} network.", self.network),
            ));
        }
        if envelope.transaction_type.is_signed() {
            return Err(SwapError::transaction_raw(format!(
                "Transaction raw is already signed ({}).",
                envelope.transaction_type
            )));
        }
        Transaction::from_envelope(envelope).sign(solver)
    }
}
