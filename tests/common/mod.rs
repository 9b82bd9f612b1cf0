//! In-memory chain APIs shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use swap::bitcoin::{BitcoinApi, EsploraError, OutputInfo, TransactionInfo, UtxoInfo};
use swap::bytom::client::{OutputDetail, TransactionDetail};
use swap::bytom::{BlockcenterApi, BlockcenterError, BuildRequest, BuiltTransaction};
use swap::cli::Connector;
use swap::{Chain, Network};

pub const SECRET: &str = "Hello Meheret!";
/// sha256 of the secret, locked by Bytom and Vapor HTLCs
pub const SECRET_HASH: &str = "3a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb";
/// Double sha256 of the secret, locked by Bitcoin HTLCs
pub const BITCOIN_SECRET_HASH: &str = "821124b554d13f247b1e5d10b84e44fb1296f18f38bbaa1bea34a12c843e0158";

/// Bitcoin chain state keyed by address and txid
#[derive(Default)]
pub struct FakeBitcoin {
    pub utxos: HashMap<String, Vec<UtxoInfo>>,
    pub transactions: HashMap<String, Vec<OutputInfo>>,
    pub broadcasts: Mutex<Vec<String>>,
}

impl FakeBitcoin {
    pub fn with_utxos(mut self, address: &str, utxos: Vec<UtxoInfo>) -> Self {
        self.utxos.insert(address.to_string(), utxos);
        self
    }

    pub fn with_transaction(mut self, txid: &str, outputs: Vec<OutputInfo>) -> Self {
        self.transactions.insert(txid.to_string(), outputs);
        self
    }
}

#[async_trait]
impl BitcoinApi for FakeBitcoin {
    async fn get_address_utxos(&self, address: &str) -> Result<Vec<UtxoInfo>, EsploraError> {
        Ok(self.utxos.get(address).cloned().unwrap_or_default())
    }

    async fn get_transaction(&self, txid: &str) -> Result<TransactionInfo, EsploraError> {
        let vout = self
            .transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| EsploraError::TxNotFound(txid.to_string()))?;
        Ok(TransactionInfo {
            txid: txid.to_string(),
            vout,
        })
    }

    async fn get_balance(&self, address: &str) -> Result<u64, EsploraError> {
        Ok(self
            .utxos
            .get(address)
            .map(|utxos| utxos.iter().map(|u| u.value).sum())
            .unwrap_or(0))
    }

    async fn broadcast_tx(&self, tx_hex: &str) -> Result<String, EsploraError> {
        self.broadcasts.lock().unwrap().push(tx_hex.to_string());
        Ok("f".repeat(64))
    }
}

/// Blockcenter that answers every build with the same transaction
pub struct FakeBlockcenter {
    pub built: BuiltTransaction,
    pub transactions: HashMap<String, Vec<OutputDetail>>,
    pub balance: u64,
    pub requests: Mutex<Vec<(String, BuildRequest)>>,
    pub payments: Mutex<Vec<(String, String, Vec<Vec<String>>)>>,
}

impl FakeBlockcenter {
    pub fn new(built: BuiltTransaction) -> Self {
        Self {
            built,
            transactions: HashMap::new(),
            balance: 0,
            requests: Mutex::new(Vec::new()),
            payments: Mutex::new(Vec::new()),
        }
    }

    pub fn with_transaction(mut self, tx_id: &str, outputs: Vec<OutputDetail>) -> Self {
        self.transactions.insert(tx_id.to_string(), outputs);
        self
    }

    pub fn with_balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }

    pub fn last_request(&self) -> Option<BuildRequest> {
        self.requests.lock().unwrap().last().map(|(_, r)| r.clone())
    }
}

#[async_trait]
impl BlockcenterApi for FakeBlockcenter {
    async fn build_transaction(
        &self,
        address: &str,
        request: &BuildRequest,
    ) -> Result<BuiltTransaction, BlockcenterError> {
        self.requests
            .lock()
            .unwrap()
            .push((address.to_string(), request.clone()));
        Ok(self.built.clone())
    }

    async fn get_transaction(&self, tx_id: &str) -> Result<TransactionDetail, BlockcenterError> {
        let outputs = self.transactions.get(tx_id).cloned().ok_or_else(|| BlockcenterError::Api {
            code: 300,
            message: format!("transaction {} not found", tx_id),
        })?;
        Ok(TransactionDetail {
            tx_id: Some(tx_id.to_string()),
            outputs,
        })
    }

    async fn get_balance(&self, _address: &str, _asset: &str) -> Result<u64, BlockcenterError> {
        Ok(self.balance)
    }

    async fn submit_payment(
        &self,
        address: &str,
        raw_transaction: &str,
        signatures: &[Vec<String>],
    ) -> Result<String, BlockcenterError> {
        self.payments.lock().unwrap().push((
            address.to_string(),
            raw_transaction.to_string(),
            signatures.to_vec(),
        ));
        Ok("2".repeat(64))
    }

    async fn decode_raw_transaction(
        &self,
        raw_transaction: &str,
    ) -> Result<serde_json::Value, BlockcenterError> {
        Ok(serde_json::json!({ "tx_id": "2".repeat(64), "size": raw_transaction.len() / 2 }))
    }
}

/// Boxes clones of prepared fakes for CLI commands
pub struct FakeConnector {
    pub bitcoin: fn() -> FakeBitcoin,
    pub blockcenter: fn() -> FakeBlockcenter,
}

impl Connector for FakeConnector {
    fn bitcoin(&self, _network: Network) -> swap::Result<Box<dyn BitcoinApi>> {
        Ok(Box::new((self.bitcoin)()))
    }

    fn blockcenter(&self, _chain: Chain, _network: Network) -> swap::Result<Box<dyn BlockcenterApi>> {
        Ok(Box::new((self.blockcenter)()))
    }
}
