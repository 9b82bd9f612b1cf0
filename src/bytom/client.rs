//! Blockcenter API Client for Bytom and Vapor
//!
//! Bytom-family transactions are built by the Blockcenter service, which
//! returns the raw transaction plus the messages each input has to sign.
//! Decoding goes through the node's core API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::common::{log_api_call, Chain, Network, SwapConfig, SwapError};

/// Bytom-family chain access used by wallets, builders and utils
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockcenterApi: Send + Sync {
    /// Build an unsigned transaction paid for by `address`
    async fn build_transaction(
        &self,
        address: &str,
        request: &BuildRequest,
    ) -> Result<BuiltTransaction, BlockcenterError>;

    /// Outputs of a transaction
    async fn get_transaction(&self, tx_id: &str) -> Result<TransactionDetail, BlockcenterError>;

    /// Balance of an asset in NEU
    async fn get_balance(&self, address: &str, asset: &str) -> Result<u64, BlockcenterError>;

    /// Submit a raw transaction with its signatures, returns the transaction id
    async fn submit_payment(
        &self,
        address: &str,
        raw_transaction: &str,
        signatures: &[Vec<String>],
    ) -> Result<String, BlockcenterError>;

    /// Decode a raw transaction with the core API
    async fn decode_raw_transaction(
        &self,
        raw_transaction: &str,
    ) -> Result<serde_json::Value, BlockcenterError>;
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Transaction input for the Blockcenter builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildInput {
    /// Let the Blockcenter pick wallet UTXOs
    SpendWallet { amount: u64, asset: String },
    /// Spend one specific UTXO
    SpendUtxo { output_id: String },
}

/// Transaction output for the Blockcenter builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildOutput {
    ControlProgram {
        amount: u64,
        asset: String,
        control_program: String,
    },
}

/// Build transaction request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRequest {
    pub fee: u64,
    pub confirmations: u64,
    pub inputs: Vec<BuildInput>,
    pub outputs: Vec<BuildOutput>,
    pub forbid_chain_tx: bool,
}

impl BuildRequest {
    pub fn new(fee: u64) -> Self {
        Self {
            fee,
            confirmations: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            forbid_chain_tx: false,
        }
    }

    pub fn spend_wallet(mut self, amount: u64, asset: &str) -> Self {
        self.inputs.push(BuildInput::SpendWallet {
            amount,
            asset: asset.to_string(),
        });
        self
    }

    pub fn spend_utxo(mut self, output_id: &str) -> Self {
        self.inputs.push(BuildInput::SpendUtxo {
            output_id: output_id.to_string(),
        });
        self
    }

    pub fn control_program(mut self, amount: u64, asset: &str, control_program: &str) -> Self {
        self.outputs.push(BuildOutput::ControlProgram {
            amount,
            asset: asset.to_string(),
            control_program: control_program.to_string(),
        });
        self
    }
}

/// What one input has to sign
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigningInstruction {
    /// Hex selectors of the signing key, empty for contract inputs
    #[serde(default)]
    pub derivation_path: Vec<String>,
    pub sign_data: Vec<String>,
    #[serde(default)]
    pub pubkey: Option<String>,
}

/// Unsigned transaction from the Blockcenter builder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuiltTransaction {
    pub raw_transaction: String,
    pub signing_instructions: Vec<SigningInstruction>,
    pub fee: u64,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Transaction output as listed by the Blockcenter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputDetail {
    pub utxo_id: String,
    pub address: String,
    pub amount: u64,
    pub asset: String,
}

/// Transaction as returned by `get-transaction`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionDetail {
    #[serde(default)]
    pub tx_id: Option<String>,
    pub outputs: Vec<OutputDetail>,
}

#[derive(Debug, Deserialize)]
struct Reply<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    #[serde(default)]
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    balance: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct CoreReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    code: Option<String>,
    data: Option<serde_json::Value>,
}

// ============================================================================
// HTTP Client
// ============================================================================

/// Blockcenter and core API HTTP client for one chain and network
#[derive(Debug, Clone)]
pub struct BlockcenterClient {
    client: Client,
    chain: Chain,
    blockcenter: Option<String>,
    core: String,
}

impl BlockcenterClient {
    pub fn new(chain: Chain, blockcenter: Option<&str>, core: &str) -> Self {
        Self {
            client: Client::new(),
            chain,
            blockcenter: blockcenter.map(|url| url.trim_end_matches('/').to_string()),
            core: core.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client with a request timeout
    pub fn with_timeout(
        chain: Chain,
        blockcenter: Option<&str>,
        core: &str,
        timeout: Duration,
    ) -> Result<Self, BlockcenterError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            ..Self::new(chain, blockcenter, core)
        })
    }

    /// Create a client for a chain and network from configuration
    pub fn from_config(config: &SwapConfig, chain: Chain, network: Network) -> Result<Self, SwapError> {
        let network = chain.check_network(network)?;
        let endpoints = config.endpoints(chain, network);
        Ok(Self::with_timeout(
            chain,
            endpoints.blockcenter.as_deref(),
            &endpoints.core,
            config.timeout,
        )?)
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn blockcenter_url(&self) -> Option<&str> {
        self.blockcenter.as_deref()
    }

    pub fn core_url(&self) -> &str {
        &self.core
    }

    fn blockcenter(&self) -> Result<&str, BlockcenterError> {
        self.blockcenter
            .as_deref()
            .ok_or(BlockcenterError::Unavailable(self.chain))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<reqwest::Response, BlockcenterError> {
        let started = Instant::now();
        let resp = self.client.post(url).query(query).json(body).send().await?;
        log_api_call(
            "POST",
            url,
            resp.status().as_u16(),
            started.elapsed().as_millis() as u64,
        );
        Ok(resp)
    }

    /// POST to the Blockcenter and unwrap its `{code, msg, data}` reply
    async fn call<B, T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, BlockcenterError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.blockcenter()?, path);
        let reply: Reply<T> = self.post(&url, query, body).await?.json().await?;
        if reply.code != 200 {
            return Err(BlockcenterError::Api {
                code: reply.code,
                message: reply.msg.unwrap_or_else(|| "Blockcenter request failed".to_string()),
            });
        }
        reply
            .data
            .ok_or_else(|| BlockcenterError::MissingData(path.to_string()))
    }
}

#[async_trait]
impl BlockcenterApi for BlockcenterClient {
    async fn build_transaction(
        &self,
        address: &str,
        request: &BuildRequest,
    ) -> Result<BuiltTransaction, BlockcenterError> {
        let built: Vec<BuiltTransaction> = self
            .call("/merchant/build-advanced-tx", &[("address", address)], request)
            .await?;
        built
            .into_iter()
            .next()
            .ok_or_else(|| BlockcenterError::MissingData("build-advanced-tx".to_string()))
    }

    async fn get_transaction(&self, tx_id: &str) -> Result<TransactionDetail, BlockcenterError> {
        self.call(
            "/merchant/get-transaction",
            &[],
            &serde_json::json!({ "tx_id": tx_id }),
        )
        .await
    }

    async fn get_balance(&self, address: &str, asset: &str) -> Result<u64, BlockcenterError> {
        let infos: Vec<AddressInfo> = self
            .call(
                "/account/address",
                &[],
                &serde_json::json!({ "address": address }),
            )
            .await?;
        let balance = infos
            .iter()
            .flat_map(|info| info.balances.iter())
            .find(|balance| balance.asset == asset)
            .map(|balance| balance.balance.as_str())
            .unwrap_or("0");
        balance
            .parse()
            .map_err(|_| BlockcenterError::MissingData(format!("balance '{}'", balance)))
    }

    async fn submit_payment(
        &self,
        address: &str,
        raw_transaction: &str,
        signatures: &[Vec<String>],
    ) -> Result<String, BlockcenterError> {
        let result: SubmitResult = self
            .call(
                "/merchant/submit-payment",
                &[("address", address)],
                &serde_json::json!({
                    "raw_transaction": raw_transaction,
                    "signatures": signatures,
                }),
            )
            .await?;
        Ok(result.tx_hash)
    }

    async fn decode_raw_transaction(
        &self,
        raw_transaction: &str,
    ) -> Result<serde_json::Value, BlockcenterError> {
        let url = format!("{}/decode-raw-transaction", self.core);
        let resp = self
            .post(&url, &[], &serde_json::json!({ "raw_transaction": raw_transaction }))
            .await?;
        let status = resp.status().as_u16();
        let reply: CoreReply = resp.json().await?;

        if status == 400 || reply.status.as_deref() == Some("fail") {
            let code = reply
                .code
                .as_deref()
                .and_then(|code| code.trim_start_matches(|c: char| c.is_alphabetic()).parse().ok())
                .unwrap_or(status as i64);
            return Err(BlockcenterError::Api {
                code,
                message: reply.msg.unwrap_or_else(|| "decode failed".to_string()),
            });
        }
        reply
            .data
            .ok_or_else(|| BlockcenterError::MissingData("decode-raw-transaction".to_string()))
    }
}

/// Blockcenter error types
#[derive(Debug, thiserror::Error)]
pub enum BlockcenterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { code: i64, message: String },

    #[error("missing data in {0} response")]
    MissingData(String),

    #[error("{0} Blockcenter is not available on this network")]
    Unavailable(Chain),
}

impl From<BlockcenterError> for SwapError {
    fn from(err: BlockcenterError) -> Self {
        match err {
            BlockcenterError::Http(e) => SwapError::Http(e),
            BlockcenterError::Api { code, message } => SwapError::api(message, code),
            BlockcenterError::MissingData(_) => SwapError::api(err.to_string(), 500),
            BlockcenterError::Unavailable(_) => SwapError::api(err.to_string(), 503),
        }
    }
}
