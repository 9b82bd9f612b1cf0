//! Bytom/Vapor Utilities
//!
//! Bech32 addresses, control programs, and decoding/submitting
//! transaction raws. Every function takes the chain so the same code
//! serves Bytom and Vapor.

use bech32::{segwit, Hrp};
use serde::Serialize;

use crate::bytom::client::BlockcenterApi;
use crate::common::{log_transaction_event, Chain, Network, Result, SwapError};
use crate::transaction_raw::{self, BytomTransactionRaw, TransactionType, UnsignedData};

/// Human-readable address prefix for a chain and network
pub fn hrp(chain: Chain, network: Network) -> Result<&'static str> {
    let network = chain.check_network(network)?;
    match (chain, network) {
        (Chain::Bytom, Network::Mainnet) => Ok("bm"),
        (Chain::Bytom, Network::Solonet) => Ok("sm"),
        (Chain::Bytom, Network::Testnet) => Ok("tm"),
        (Chain::Vapor, Network::Mainnet) => Ok("vp"),
        (Chain::Vapor, Network::Solonet) => Ok("sp"),
        (Chain::Vapor, Network::Testnet) => Ok("tp"),
        _ => Err(SwapError::network(
            format!("{} has no bech32 addresses", chain),
            "use the bitcoin utilities instead.",
        )),
    }
}

/// Check a Bytom/Vapor network name
pub fn is_network(network: &str) -> bool {
    matches!(network, "mainnet" | "solonet" | "testnet")
}

/// Network an address belongs to, by its prefix
fn address_network(address: &str, chain: Chain) -> Option<(Network, Vec<u8>)> {
    let (prefix, version, program) = segwit::decode(address).ok()?;
    if version != segwit::VERSION_0 {
        return None;
    }
    let prefix = prefix.to_lowercase();
    chain
        .networks()
        .iter()
        .find(|network| hrp(chain, **network).map(|h| h == prefix).unwrap_or(false))
        .map(|network| (*network, program))
}

/// Check an address, optionally for a specific network
pub fn is_address(address: &str, chain: Chain, network: Option<Network>) -> bool {
    match (address_network(address, chain), network) {
        (Some((found, _)), Some(network)) => found == network,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

fn witness_program(address: &str, chain: Chain, network: Option<Network>) -> Result<Vec<u8>> {
    if !is_address(address, chain, network) {
        return Err(SwapError::address(format!(
            "Invalid {} '{}' address.",
            chain, address
        )));
    }
    address_network(address, chain)
        .map(|(_, program)| program)
        .ok_or_else(|| SwapError::address(format!("Invalid {} '{}' address.", chain, address)))
}

/// Address type ("p2wpkh" or "p2wsh")
pub fn get_address_type(address: &str, chain: Chain) -> Result<&'static str> {
    match witness_program(address, chain, None)?.len() {
        20 => Ok("p2wpkh"),
        32 => Ok("p2wsh"),
        _ => Err(SwapError::address(format!(
            "Unknown {} '{}' address type.",
            chain, address
        ))),
    }
}

/// Control program hex of an address
pub fn get_program(address: &str, chain: Chain, network: Option<Network>) -> Result<String> {
    let program = witness_program(address, chain, network)?;
    Ok(format!("00{:02x}{}", program.len(), hex::encode(program)))
}

/// Bech32 address of a witness program (20-byte key hash or 32-byte script hash)
pub fn encode_address(program: &[u8], chain: Chain, network: Network) -> Result<String> {
    let prefix = Hrp::parse(hrp(chain, network)?).map_err(|e| SwapError::address(e.to_string()))?;
    segwit::encode_v0(prefix, program).map_err(|e| SwapError::address(e.to_string()))
}

/// Decoded transaction raw
#[derive(Debug, Clone, Serialize)]
pub struct DecodedTransactionRaw {
    pub fee: u64,
    pub address: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Transaction as decoded by the core API
    pub tx: serde_json::Value,
    pub unsigned_datas: Vec<UnsignedData>,
    pub signatures: Vec<Vec<String>>,
    pub network: Network,
}

/// Result of submitting a transaction raw
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedTransaction {
    pub fee: u64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub transaction_id: String,
    pub network: Network,
    pub date: String,
}

/// Network of a transaction raw, needed to pick the API endpoints
pub fn transaction_raw_network(transaction_raw: &str, chain: Chain) -> Result<Network> {
    let envelope: BytomTransactionRaw = transaction_raw::decode(transaction_raw, chain)?;
    Ok(envelope.network)
}

/// Decode a transaction raw with the core API
pub async fn decode_transaction_raw(
    api: &dyn BlockcenterApi,
    transaction_raw: &str,
    chain: Chain,
) -> Result<DecodedTransactionRaw> {
    let envelope: BytomTransactionRaw = transaction_raw::decode(transaction_raw, chain)?;
    let tx = api.decode_raw_transaction(&envelope.raw).await?;
    Ok(DecodedTransactionRaw {
        fee: envelope.fee,
        address: envelope.address,
        transaction_type: envelope.transaction_type,
        tx,
        unsigned_datas: envelope.unsigned_datas,
        signatures: envelope.signatures,
        network: envelope.network,
    })
}

/// Submit a signed transaction raw to the Blockcenter
pub async fn submit_transaction_raw(
    api: &dyn BlockcenterApi,
    transaction_raw: &str,
    chain: Chain,
) -> Result<SubmittedTransaction> {
    let envelope: BytomTransactionRaw = transaction_raw::decode(transaction_raw, chain)?;
    let type_name = envelope.transaction_type.to_string();
    if !envelope.transaction_type.is_signed() || envelope.signatures.is_empty() {
        return Err(SwapError::transaction_raw(format!(
            "Transaction raw is not signed ({}).",
            type_name
        )));
    }

    let submitted = api
        .submit_payment(&envelope.address, &envelope.raw, &envelope.signatures)
        .await
        .map_err(SwapError::from);
    let transaction_id = match submitted {
        Ok(transaction_id) => transaction_id,
        Err(err) => {
            log_transaction_event(chain.tag(), &type_name, envelope.fee, None, Some(&err.to_string()));
            return Err(err);
        }
    };
    log_transaction_event(chain.tag(), &type_name, envelope.fee, Some(&transaction_id), None);

    Ok(SubmittedTransaction {
        fee: envelope.fee,
        transaction_type: envelope.transaction_type,
        transaction_id,
        network: envelope.network,
        date: chrono::Utc::now().to_string(),
    })
}
