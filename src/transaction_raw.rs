//! Transaction Raw Codec
//!
//! A transaction raw is the base64 encoding of a JSON envelope that carries
//! a transaction together with everything a signer or a submitter needs:
//! the fee, the transaction type, the network and, for Bytom/Vapor, the
//! data to sign and the signatures collected so far.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::{Chain, Network, Result, SwapError};

// ============================================================================
// Transaction Type
// ============================================================================

/// What a transaction does with the HTLC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Lock funds into the HTLC
    Fund,
    /// Spend the HTLC with the secret
    Claim,
    /// Spend the HTLC after the timelock
    Refund,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Fund => "fund",
            TransactionKind::Claim => "claim",
            TransactionKind::Refund => "refund",
        }
    }
}

/// Signing state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Unsigned,
    Signed,
}

/// Transaction type, rendered as "<chain>_<kind>_<state>"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionType {
    pub chain: Chain,
    pub kind: TransactionKind,
    pub state: TransactionState,
}

impl TransactionType {
    pub fn unsigned(chain: Chain, kind: TransactionKind) -> Self {
        Self {
            chain,
            kind,
            state: TransactionState::Unsigned,
        }
    }

    pub fn signed(chain: Chain, kind: TransactionKind) -> Self {
        Self {
            chain,
            kind,
            state: TransactionState::Signed,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.state == TransactionState::Signed
    }

    /// The same transaction type after signing
    pub fn into_signed(self) -> Self {
        Self::signed(self.chain, self.kind)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            TransactionState::Unsigned => "unsigned",
            TransactionState::Signed => "signed",
        };
        write!(f, "{}_{}_{}", self.chain.tag(), self.kind.as_str(), state)
    }
}

impl FromStr for TransactionType {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SwapError::transaction_raw(format!("Invalid '{}' transaction type.", s));
        let mut parts = s.split('_');
        let (chain, kind, state) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(chain), Some(kind), Some(state), None) => (chain, kind, state),
            _ => return Err(invalid()),
        };
        let chain = match chain {
            "bitcoin" => Chain::Bitcoin,
            "bytom" => Chain::Bytom,
            "vapor" => Chain::Vapor,
            _ => return Err(invalid()),
        };
        let kind = match kind {
            "fund" => TransactionKind::Fund,
            "claim" => TransactionKind::Claim,
            "refund" => TransactionKind::Refund,
            _ => return Err(invalid()),
        };
        let state = match state {
            "unsigned" => TransactionState::Unsigned,
            "signed" => TransactionState::Signed,
            _ => return Err(invalid()),
        };
        Ok(Self { chain, kind, state })
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Envelopes
// ============================================================================

/// Previous output spent by a Bitcoin transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousOutput {
    /// Value in satoshi
    pub amount: u64,
    /// Output index
    pub n: u32,
    /// Script pubkey hex
    pub script: String,
    pub tx_id: String,
}

/// Bitcoin transaction raw envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinTransactionRaw {
    /// Fee in satoshi
    pub fee: u64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Transaction hex
    pub raw: String,
    pub outputs: Vec<PreviousOutput>,
    pub network: Network,
}

/// One group of data a Bytom/Vapor signer has to sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedData {
    /// Hex messages, one signature each
    pub datas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub network: Network,
    /// Derivation path of the signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Bytom/Vapor transaction raw envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytomTransactionRaw {
    /// Fee in NEU
    pub fee: u64,
    /// Address the Blockcenter built the transaction for
    pub address: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Transaction hex
    pub raw: String,
    /// Transaction id reported by the Blockcenter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub unsigned_datas: Vec<UnsignedData>,
    #[serde(default)]
    pub signatures: Vec<Vec<String>>,
    pub network: Network,
}

/// Envelope types that can be checked against a chain
pub trait Envelope: Serialize + DeserializeOwned {
    fn transaction_type(&self) -> TransactionType;
    fn network(&self) -> Network;
}

impl Envelope for BitcoinTransactionRaw {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn network(&self) -> Network {
        self.network
    }
}

impl Envelope for BytomTransactionRaw {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn network(&self) -> Network {
        self.network
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Encode an envelope into a transaction raw
pub fn encode<T: Serialize>(envelope: &T) -> Result<String> {
    let json = serde_json::to_vec(envelope)?;
    Ok(STANDARD.encode(json))
}

/// Strip whitespace and restore missing base64 padding
pub fn clean_transaction_raw(transaction_raw: &str) -> String {
    let mut cleaned: String = transaction_raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    while cleaned.len() % 4 != 0 {
        cleaned.push('=');
    }
    cleaned
}

fn load(transaction_raw: &str) -> Option<serde_json::Value> {
    let bytes = STANDARD.decode(clean_transaction_raw(transaction_raw)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Check whether a string is a transaction raw of `chain`
pub fn is_transaction_raw(transaction_raw: &str, chain: Chain) -> bool {
    load(transaction_raw)
        .and_then(|value| value.get("type")?.as_str()?.parse::<TransactionType>().ok())
        .map(|transaction_type| transaction_type.chain == chain)
        .unwrap_or(false)
}

/// Decode a transaction raw of `chain` into its envelope
pub fn decode<T: Envelope>(transaction_raw: &str, chain: Chain) -> Result<T> {
    let invalid = || SwapError::transaction_raw(format!("Invalid {} transaction raw.", chain));
    if !is_transaction_raw(transaction_raw, chain) {
        return Err(invalid());
    }
    let value = load(transaction_raw).ok_or_else(invalid)?;
    let envelope: T = serde_json::from_value(value).map_err(|_| invalid())?;
    chain.check_network(envelope.network())?;
    Ok(envelope)
}
