//! Bytom/Vapor Fund/Claim/Refund Transactions
//!
//! The Blockcenter builds the raw transaction and reports what every input
//! has to sign; signing fills in the witness arguments with a [`Solver`].

use tracing::debug;

use crate::bytom::chainkd;
use crate::bytom::client::{BlockcenterApi, BuildRequest, BuiltTransaction};
use crate::bytom::htlc::Htlc;
use crate::bytom::solver::Solver;
use crate::bytom::utils::{get_address_type, get_program, is_address};
use crate::common::{log_transaction_event, Chain, Network, Result, SwapError, BTM_ASSET};
use crate::transaction_raw::{
    self, BytomTransactionRaw, TransactionKind, TransactionType, UnsignedData,
};
use crate::types::SpendAmount;

/// A built Bytom or Vapor transaction, unsigned or signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    network: Network,
    transaction_type: TransactionType,
    address: String,
    raw: String,
    hash: Option<String>,
    fee: u64,
    unsigned_datas: Vec<UnsignedData>,
    signatures: Vec<Vec<String>>,
}

impl Transaction {
    /// Rebuild a transaction from a decoded transaction raw
    pub fn from_envelope(envelope: BytomTransactionRaw) -> Self {
        Self {
            network: envelope.network,
            transaction_type: envelope.transaction_type,
            address: envelope.address,
            raw: envelope.raw,
            hash: envelope.hash,
            fee: envelope.fee,
            unsigned_datas: envelope.unsigned_datas,
            signatures: envelope.signatures,
        }
    }

    /// Fee in NEU
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Transaction id, when the Blockcenter reported one
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Transaction hex
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Transaction decoded by the core API
    pub async fn json(&self, api: &dyn BlockcenterApi) -> Result<serde_json::Value> {
        Ok(api.decode_raw_transaction(&self.raw).await?)
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn chain(&self) -> Chain {
        self.transaction_type.chain
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Address the transaction was built for
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn unsigned_datas(&self) -> &[UnsignedData] {
        &self.unsigned_datas
    }

    pub fn signatures(&self) -> &[Vec<String>] {
        &self.signatures
    }

    /// Base64 transaction raw
    pub fn transaction_raw(&self) -> Result<String> {
        transaction_raw::encode(&BytomTransactionRaw {
            fee: self.fee,
            address: self.address.clone(),
            transaction_type: self.transaction_type,
            raw: self.raw.clone(),
            hash: self.hash.clone(),
            unsigned_datas: self.unsigned_datas.clone(),
            signatures: self.signatures.clone(),
            network: self.network,
        })
    }

    /// Sign with a solver of the same kind
    pub fn sign(&self, solver: &Solver) -> Result<Transaction> {
        if self.transaction_type.is_signed() {
            return Err(SwapError::transaction(format!(
                "Transaction is already signed ({}).",
                self.transaction_type
            )));
        }
        if solver.kind() != self.transaction_type.kind {
            return Err(SwapError::solver(format!(
                "Invalid solver, {} transactions need a {} solver.",
                self.transaction_type.kind.as_str(),
                self.transaction_type.kind.as_str()
            )));
        }

        let signed = Transaction {
            transaction_type: self.transaction_type.into_signed(),
            signatures: solver.solve(&self.unsigned_datas)?,
            ..self.clone()
        };
        log_transaction_event(
            signed.chain().tag(),
            &signed.transaction_type.to_string(),
            signed.fee,
            signed.hash(),
            None,
        );
        Ok(signed)
    }
}

/// Builds unsigned HTLC transactions through the Blockcenter
pub struct TransactionBuilder<'a> {
    api: &'a dyn BlockcenterApi,
    chain: Chain,
    network: Network,
    /// Fee in NEU
    fee: u64,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(api: &'a dyn BlockcenterApi, chain: Chain, network: Network) -> Result<Self> {
        if chain == Chain::Bitcoin {
            return Err(SwapError::transaction(
                "Bitcoin transactions use the bitcoin module.",
            ));
        }
        Ok(Self {
            api,
            chain,
            network: chain.check_network(network)?,
            fee: crate::common::config::DEFAULT_BYTOM_FEE,
        })
    }

    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    fn check_address(&self, address: &str) -> Result<()> {
        if !is_address(address, self.chain, Some(self.network)) {
            return Err(SwapError::address(format!(
                "Invalid {} '{}' {} address.",
                self.chain, address, self.network
            )));
        }
        Ok(())
    }

    fn check_asset(&self, asset: &str) -> Result<()> {
        let valid = asset.len() == 64 && asset.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(SwapError::transaction(format!(
                "Invalid {} asset '{}', must be 32 bytes hex.",
                self.chain, asset
            )));
        }
        Ok(())
    }

    /// Lock `amount` of `asset` from `address` into the HTLC
    pub async fn fund(&self, address: &str, htlc: &Htlc, amount: u64, asset: &str) -> Result<Transaction> {
        self.check_address(address)?;
        self.check_asset(asset)?;
        if amount == 0 {
            return Err(SwapError::transaction("Fund amount must be greater than zero."));
        }
        if htlc.chain() != self.chain || htlc.network() != self.network {
            return Err(SwapError::htlc(format!(
                "HTLC is for {} {}, not {} {}.",
                htlc.chain(),
                htlc.network(),
                self.chain,
                self.network
            )));
        }

        let request = BuildRequest::new(self.fee)
            .spend_wallet(amount, asset)
            .control_program(amount, asset, &htlc.program());
        let built = self.api.build_transaction(address, &request).await?;

        debug!(
            chain = self.chain.tag(),
            amount,
            fee = built.fee,
            "Built fund transaction"
        );
        self.finish(TransactionKind::Fund, address, built)
    }

    /// Spend the HTLC output of `transaction_id` to the recipient `address`
    pub async fn claim(
        &self,
        transaction_id: &str,
        address: &str,
        amount: SpendAmount,
        asset: &str,
    ) -> Result<Transaction> {
        self.spend_htlc(TransactionKind::Claim, transaction_id, address, amount, asset)
            .await
    }

    /// Return the HTLC output of `transaction_id` to the sender `address`
    pub async fn refund(
        &self,
        transaction_id: &str,
        address: &str,
        amount: SpendAmount,
        asset: &str,
    ) -> Result<Transaction> {
        self.spend_htlc(TransactionKind::Refund, transaction_id, address, amount, asset)
            .await
    }

    async fn spend_htlc(
        &self,
        kind: TransactionKind,
        transaction_id: &str,
        address: &str,
        amount: SpendAmount,
        asset: &str,
    ) -> Result<Transaction> {
        self.check_address(address)?;
        self.check_asset(asset)?;
        let funded = self.api.get_transaction(transaction_id).await?;

        let utxo = funded
            .outputs
            .iter()
            .find(|output| {
                get_address_type(&output.address, self.chain)
                    .map(|kind| kind == "p2wsh")
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                SwapError::transaction(format!(
                    "Transaction {} has no HTLC output to spend.",
                    transaction_id
                ))
            })?;
        if utxo.asset != asset {
            return Err(SwapError::transaction(format!(
                "HTLC output holds asset {}, not {}.",
                utxo.asset, asset
            )));
        }

        // the fee comes out of the HTLC output only when it holds BTM
        let available = if asset == BTM_ASSET {
            utxo.amount.checked_sub(self.fee).filter(|left| *left > 0).ok_or_else(|| {
                SwapError::balance(format!(
                    "HTLC amount {} NEU does not cover the {} NEU fee.",
                    utxo.amount, self.fee
                ))
            })?
        } else {
            utxo.amount
        };

        let program = get_program(address, self.chain, Some(self.network))?;
        let mut request = BuildRequest::new(self.fee).spend_utxo(&utxo.utxo_id);
        match amount {
            SpendAmount::Max => {
                request = request.control_program(available, asset, &program);
            }
            SpendAmount::Exact(amount) => {
                if amount == 0 || amount > available {
                    return Err(SwapError::balance(format!(
                        "Insufficient HTLC amount, you can spend maximum {} amount.",
                        available
                    )));
                }
                request = request.control_program(amount, asset, &program);
                let remainder = available - amount;
                if remainder > 0 {
                    let htlc_program = get_program(&utxo.address, self.chain, None)?;
                    request = request.control_program(remainder, asset, &htlc_program);
                }
            }
        }
        let built = self.api.build_transaction(address, &request).await?;

        debug!(
            chain = self.chain.tag(),
            kind = kind.as_str(),
            utxo = utxo.utxo_id.as_str(),
            fee = built.fee,
            "Built HTLC spend transaction"
        );
        self.finish(kind, address, built)
    }

    fn finish(&self, kind: TransactionKind, address: &str, built: BuiltTransaction) -> Result<Transaction> {
        let unsigned_datas = built
            .signing_instructions
            .into_iter()
            .map(|instruction| {
                let path = if instruction.derivation_path.is_empty() {
                    None
                } else {
                    let indexes = chainkd::parse_indexes(&instruction.derivation_path)?;
                    Some(chainkd::indexes_to_path(&indexes))
                };
                Ok(UnsignedData {
                    datas: instruction.sign_data,
                    public_key: instruction.pubkey,
                    network: self.network,
                    path,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let transaction = Transaction {
            network: self.network,
            transaction_type: TransactionType::unsigned(self.chain, kind),
            address: address.to_string(),
            raw: built.raw_transaction,
            hash: built.hash,
            fee: built.fee,
            unsigned_datas,
            signatures: Vec::new(),
        };
        log_transaction_event(
            self.chain.tag(),
            &transaction.transaction_type.to_string(),
            transaction.fee,
            transaction.hash(),
            None,
        );
        Ok(transaction)
    }
}
