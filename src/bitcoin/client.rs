//! Esplora API Client for Bitcoin Network Interaction
//!
//! Provides the chain data the builders need (UTXOs, previous transactions,
//! balances) and broadcasts signed transactions.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::common::{log_api_call, Network, SwapConfig, SwapError};

/// Esplora API endpoints
pub const MAINNET_URL: &str = "https://blockstream.info/api";
pub const TESTNET_URL: &str = "https://blockstream.info/testnet/api";

/// Bitcoin chain access used by wallets, builders and utils
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BitcoinApi: Send + Sync {
    /// Unspent outputs of an address
    async fn get_address_utxos(&self, address: &str) -> Result<Vec<UtxoInfo>, EsploraError>;

    /// Outputs of a transaction
    async fn get_transaction(&self, txid: &str) -> Result<TransactionInfo, EsploraError>;

    /// Confirmed plus unconfirmed balance in satoshi
    async fn get_balance(&self, address: &str) -> Result<u64, EsploraError>;

    /// Broadcast a raw transaction, returns the txid
    async fn broadcast_tx(&self, tx_hex: &str) -> Result<String, EsploraError>;
}

/// Esplora HTTP client
#[derive(Debug, Clone)]
pub struct EsploraClient {
    client: Client,
    base_url: String,
}

impl EsploraClient {
    /// Create a new client with custom URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client with a request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, EsploraError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client for a network from configuration
    pub fn from_config(config: &SwapConfig, network: Network) -> Result<Self, SwapError> {
        let base_url = config.bitcoin_api(network)?;
        Ok(Self::with_timeout(base_url, config.timeout)?)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<Response, EsploraError> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        let resp = self.client.get(&url).send().await?;
        log_api_call(
            "GET",
            &url,
            resp.status().as_u16(),
            started.elapsed().as_millis() as u64,
        );
        Ok(resp)
    }
}

#[async_trait]
impl BitcoinApi for EsploraClient {
    async fn get_address_utxos(&self, address: &str) -> Result<Vec<UtxoInfo>, EsploraError> {
        let resp = self.get(&format!("/address/{}/utxo", address)).await?;

        if !resp.status().is_success() {
            return Err(EsploraError::AddressNotFound(address.to_string()));
        }

        let utxos: Vec<EsploraUtxo> = resp.json().await?;

        Ok(utxos
            .into_iter()
            .map(|u| UtxoInfo {
                txid: u.txid,
                vout: u.vout,
                value: u.value,
                block_height: u.status.block_height,
            })
            .collect())
    }

    async fn get_transaction(&self, txid: &str) -> Result<TransactionInfo, EsploraError> {
        let resp = self.get(&format!("/tx/{}", txid)).await?;

        if !resp.status().is_success() {
            return Err(EsploraError::TxNotFound(txid.to_string()));
        }

        Ok(resp.json().await?)
    }

    async fn get_balance(&self, address: &str) -> Result<u64, EsploraError> {
        let resp = self.get(&format!("/address/{}", address)).await?;

        if !resp.status().is_success() {
            return Err(EsploraError::AddressNotFound(address.to_string()));
        }

        let info: EsploraAddress = resp.json().await?;
        Ok(info.chain_stats.balance() + info.mempool_stats.balance())
    }

    async fn broadcast_tx(&self, tx_hex: &str) -> Result<String, EsploraError> {
        let url = format!("{}/tx", self.base_url);
        let started = Instant::now();
        let resp = self.client.post(&url).body(tx_hex.to_string()).send().await?;
        log_api_call(
            "POST",
            &url,
            resp.status().as_u16(),
            started.elapsed().as_millis() as u64,
        );

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EsploraError::BroadcastFailed(status, error_text));
        }

        Ok(resp.text().await?.trim().to_string())
    }
}

/// Transaction status
#[derive(Debug, Clone, Deserialize)]
struct EsploraTxStatus {
    block_height: Option<u64>,
}

/// UTXO information from Esplora
#[derive(Debug, Clone, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    status: EsploraTxStatus,
}

#[derive(Debug, Clone, Deserialize)]
struct EsploraAddress {
    chain_stats: EsploraStats,
    mempool_stats: EsploraStats,
}

#[derive(Debug, Clone, Deserialize)]
struct EsploraStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

impl EsploraStats {
    fn balance(&self) -> u64 {
        self.funded_txo_sum.saturating_sub(self.spent_txo_sum)
    }
}

/// UTXO information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoInfo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub block_height: Option<u64>,
}

/// Transaction as returned by `/tx/{txid}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionInfo {
    pub txid: String,
    pub vout: Vec<OutputInfo>,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputInfo {
    /// Script pubkey hex
    pub scriptpubkey: String,
    #[serde(default)]
    pub scriptpubkey_type: Option<String>,
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

/// Esplora error types
#[derive(Debug, thiserror::Error)]
pub enum EsploraError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Transaction not found: {0}")]
    TxNotFound(String),

    #[error("Address not found: {0}")]
    AddressNotFound(String),

    #[error("Broadcast failed: {1}")]
    BroadcastFailed(u16, String),
}

impl From<EsploraError> for SwapError {
    fn from(err: EsploraError) -> Self {
        match err {
            EsploraError::HttpError(e) => SwapError::Http(e),
            EsploraError::TxNotFound(_) | EsploraError::AddressNotFound(_) => {
                SwapError::api(err.to_string(), 404)
            }
            EsploraError::BroadcastFailed(status, message) => {
                SwapError::api(message, status as i64)
            }
        }
    }
}
