//! Bitcoin Utilities
//!
//! Network and address checks, the fee calculator, and decoding/submitting
//! transaction raws.

use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::consensus::encode::deserialize_hex;
use bitcoin::{Address, AddressType, Transaction};
use serde::Serialize;

use crate::bitcoin::client::BitcoinApi;
use crate::common::{log_transaction_event, Chain, Network, Result, SwapError};
use crate::transaction_raw::{self, BitcoinTransactionRaw, PreviousOutput, TransactionType};

/// Check a Bitcoin network name
pub fn is_network(network: &str) -> bool {
    matches!(network, "mainnet" | "testnet")
}

/// Parse an address and require it to belong to `network`
pub fn parse_address(address: &str, network: Network) -> Result<Address> {
    let network = Chain::Bitcoin.check_network(network)?;
    Address::<NetworkUnchecked>::from_str(address)
        .ok()
        .and_then(|unchecked| unchecked.require_network(network.bitcoin_network()).ok())
        .ok_or_else(|| SwapError::address(format!("Invalid Bitcoin '{}' {} address.", address, network)))
}

/// Check a Bitcoin address, optionally for a specific network
pub fn is_address(address: &str, network: Option<Network>) -> bool {
    match network {
        Some(network) => parse_address(address, network).is_ok(),
        None => Chain::Bitcoin
            .networks()
            .iter()
            .any(|network| parse_address(address, *network).is_ok()),
    }
}

/// Address type ("p2pkh", "p2sh", "p2wpkh", "p2wsh" or "p2tr")
pub fn get_address_type(address: &str) -> Result<&'static str> {
    let parsed = Address::<NetworkUnchecked>::from_str(address)
        .map_err(|_| SwapError::address(format!("Invalid Bitcoin '{}' address.", address)))?;
    match parsed.assume_checked().address_type() {
        Some(AddressType::P2pkh) => Ok("p2pkh"),
        Some(AddressType::P2sh) => Ok("p2sh"),
        Some(AddressType::P2wpkh) => Ok("p2wpkh"),
        Some(AddressType::P2wsh) => Ok("p2wsh"),
        Some(AddressType::P2tr) => Ok("p2tr"),
        _ => Err(SwapError::address(format!(
            "Unknown Bitcoin '{}' address type.",
            address
        ))),
    }
}

/// Fee in satoshi for a transaction with the given input and output counts
pub fn fee_calculator(inputs: usize, outputs: usize) -> u64 {
    let inputs = inputs.max(1) as u64;
    let outputs = outputs.max(1) as u64;
    576 + (inputs - 1) * 444 + (outputs - 1) * 102
}

/// Decoded transaction input
#[derive(Debug, Clone, Serialize)]
pub struct DecodedInput {
    pub txid: String,
    pub vout: u32,
    pub sequence: u32,
    pub script_sig: String,
}

/// Decoded transaction output
#[derive(Debug, Clone, Serialize)]
pub struct DecodedOutput {
    pub n: usize,
    pub value: u64,
    pub script: String,
    pub address: Option<String>,
}

/// JSON view of a Bitcoin transaction
#[derive(Debug, Clone, Serialize)]
pub struct DecodedTx {
    pub txid: String,
    pub hash: String,
    pub version: i32,
    pub locktime: u32,
    pub size: usize,
    pub vsize: usize,
    pub inputs: Vec<DecodedInput>,
    pub outputs: Vec<DecodedOutput>,
}

impl DecodedTx {
    pub fn new(tx: &Transaction, network: Network) -> Self {
        let network = network.bitcoin_network();
        Self {
            txid: tx.compute_txid().to_string(),
            hash: tx.compute_wtxid().to_string(),
            version: tx.version.0,
            locktime: tx.lock_time.to_consensus_u32(),
            size: tx.total_size(),
            vsize: tx.vsize(),
            inputs: tx
                .input
                .iter()
                .map(|input| DecodedInput {
                    txid: input.previous_output.txid.to_string(),
                    vout: input.previous_output.vout,
                    sequence: input.sequence.0,
                    script_sig: hex::encode(input.script_sig.as_bytes()),
                })
                .collect(),
            outputs: tx
                .output
                .iter()
                .enumerate()
                .map(|(n, output)| DecodedOutput {
                    n,
                    value: output.value.to_sat(),
                    script: hex::encode(output.script_pubkey.as_bytes()),
                    address: Address::from_script(&output.script_pubkey, network)
                        .ok()
                        .map(|address| address.to_string()),
                })
                .collect(),
        }
    }
}

/// Decoded transaction raw
#[derive(Debug, Clone, Serialize)]
pub struct DecodedTransactionRaw {
    pub fee: u64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub tx: DecodedTx,
    pub network: Network,
    pub outputs: Vec<PreviousOutput>,
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

/// Decode a Bitcoin transaction raw locally
pub fn decode_transaction_raw(transaction_raw: &str) -> Result<DecodedTransactionRaw> {
    let envelope: BitcoinTransactionRaw = transaction_raw::decode(transaction_raw, Chain::Bitcoin)?;
    let tx: Transaction = deserialize_hex(&envelope.raw).map_err(SwapError::bitcoin)?;
    Ok(DecodedTransactionRaw {
        fee: envelope.fee,
        transaction_type: envelope.transaction_type,
        tx: DecodedTx::new(&tx, envelope.network),
        network: envelope.network,
        outputs: envelope.outputs,
    })
}

/// Broadcast a Bitcoin transaction raw
pub async fn submit_transaction_raw(
    api: &dyn BitcoinApi,
    transaction_raw: &str,
) -> Result<SubmittedTransaction> {
    let envelope: BitcoinTransactionRaw = transaction_raw::decode(transaction_raw, Chain::Bitcoin)?;
    let transaction_id = match api.broadcast_tx(&envelope.raw).await {
        Ok(txid) => txid,
        Err(err) => {
            let err = SwapError::from(err);
            log_transaction_event(
                Chain::Bitcoin.tag(),
                &envelope.transaction_type.to_string(),
                envelope.fee,
                None,
                Some(&err.to_string()),
            );
            return Err(err);
        }
    };
    log_transaction_event(
        Chain::Bitcoin.tag(),
        &envelope.transaction_type.to_string(),
        envelope.fee,
        Some(&transaction_id),
        None,
    );
    Ok(SubmittedTransaction {
        fee: envelope.fee,
        transaction_type: envelope.transaction_type,
        transaction_id,
        network: envelope.network,
        date: chrono::Utc::now().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::client::{EsploraError, MockBitcoinApi};
    use crate::transaction_raw::TransactionKind;

    #[test]
    fn test_fee_calculator() {
        assert_eq!(fee_calculator(1, 1), 576);
        assert_eq!(fee_calculator(1, 2), 678);
        assert_eq!(fee_calculator(2, 2), 1122);
        assert_eq!(fee_calculator(3, 1), 1464);
    }

    #[test]
    fn test_addresses() {
        assert!(is_network("testnet"));
        assert!(!is_network("solonet"));

        assert!(is_address("muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB", Some(Network::Testnet)));
        assert!(!is_address("muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB", Some(Network::Mainnet)));
        assert!(is_address("1EwqNcFEc3udUXroK9593QHLmzLHq5iBUs", None));
        assert!(!is_address("L5tUq6mCbE84XobZ1mphBPZf15cRFcvg7Q", None));

        assert_eq!(get_address_type("mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q").unwrap(), "p2pkh");
        assert_eq!(get_address_type("2N4RDopFewK97hYgAJD21KZ2ohn3BGSUCu5").unwrap(), "p2sh");
        assert!(get_address_type("bm1q9ndylx02syfwd7npehfxz4lddhzqsve2fu6vc7").is_err());
    }

    #[test]
    fn test_solonet_is_rejected() {
        let err = parse_address("muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB", Network::Solonet).unwrap_err();
        assert_eq!(err.error_code(), "NETWORK_ERROR");
    }

    fn unsigned_raw() -> String {
        // version 2, no inputs, one empty output, locktime 0
        let envelope = BitcoinTransactionRaw {
            fee: 678,
            transaction_type: TransactionType::unsigned(Chain::Bitcoin, TransactionKind::Fund),
            raw: "02000000000100000000000000000000000000".to_string(),
            outputs: vec![],
            network: Network::Testnet,
        };
        transaction_raw::encode(&envelope).unwrap()
    }

    #[tokio::test]
    async fn test_submit_transaction_raw() {
        let mut api = MockBitcoinApi::new();
        api.expect_broadcast_tx()
            .withf(|hex| hex.starts_with("02000000"))
            .times(1)
            .returning(|_| Ok("ab".repeat(32)));

        let submitted = submit_transaction_raw(&api, &unsigned_raw()).await.unwrap();
        assert_eq!(submitted.transaction_id, "ab".repeat(32));
        assert_eq!(submitted.fee, 678);
        assert_eq!(submitted.network, Network::Testnet);
        assert_eq!(submitted.transaction_type.to_string(), "bitcoin_fund_unsigned");
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let mut api = MockBitcoinApi::new();
        api.expect_broadcast_tx()
            .returning(|_| Err(EsploraError::BroadcastFailed(400, "bad-txns-inputs-missingorspent".to_string())));

        let err = submit_transaction_raw(&api, &unsigned_raw()).await.unwrap_err();
        assert_eq!(err.error_code(), "API_ERROR");
        assert!(err.to_string().contains("bad-txns-inputs-missingorspent"));
    }

    #[test]
    fn test_decode_rejects_other_chains() {
        let err = decode_transaction_raw("eyJ0eXBlIjogInZhcG9yX2Z1bmRfdW5zaWduZWQifQ==").unwrap_err();
        assert_eq!(err.to_string(), "Invalid Bitcoin transaction raw.");
    }
}
