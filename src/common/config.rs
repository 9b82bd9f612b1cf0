//! Environment-based Configuration
//!
//! Chains, networks and remote endpoints used by the wallets, builders and
//! the CLI. Every endpoint has a default and can be overridden from the
//! environment (a `.env` file is honored by the binary).
//!
//! # Environment Variables
//!
//! ## General
//! - `SWAP_NETWORK` - Default network for CLI commands (default: "mainnet")
//! - `SWAP_TIMEOUT_SECS` - HTTP request timeout (default: 60)
//! - `SWAP_LOG_LEVEL` - Logging level (default: "warn")
//! - `SWAP_LOG_JSON` - Set to "1" for JSON log lines
//!
//! ## Bitcoin
//! - `SWAP_BITCOIN_MAINNET_API` / `SWAP_BITCOIN_TESTNET_API` - Esplora API URLs
//! - `SWAP_BITCOIN_FEE_RATE` - Multiplier applied to the fee calculator (default: 1)
//!
//! ## Bytom / Vapor
//! - `SWAP_<CHAIN>_<NETWORK>_BLOCKCENTER` - Blockcenter API URL
//! - `SWAP_<CHAIN>_<NETWORK>_CORE` - Full node API URL
//! - `SWAP_BYTOM_FEE` / `SWAP_VAPOR_FEE` - Default fee in NEU (default: 10000000)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::error::SwapError;

/// BTM asset id on both Bytom and Vapor
pub const BTM_ASSET: &str = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

/// Default Bytom/Vapor fee in NEU
pub const DEFAULT_BYTOM_FEE: u64 = 10_000_000;

/// Default HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("{0} endpoint is not available for {1}")]
    EndpointUnavailable(String, String),
}

/// Supported blockchains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Bitcoin,
    Bytom,
    Vapor,
}

impl Chain {
    /// Lower-case tag used in transaction types and env vars
    pub fn tag(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Bytom => "bytom",
            Chain::Vapor => "vapor",
        }
    }

    /// Networks this chain runs on
    pub fn networks(&self) -> &'static [Network] {
        match self {
            Chain::Bitcoin => &[Network::Mainnet, Network::Testnet],
            Chain::Bytom | Chain::Vapor => &[Network::Mainnet, Network::Solonet, Network::Testnet],
        }
    }

    /// Check if the chain runs on a network
    pub fn supports(&self, network: Network) -> bool {
        self.networks().contains(&network)
    }

    /// Parse a network name for this chain
    pub fn parse_network(&self, network: &str) -> Result<Network, SwapError> {
        match network.parse::<Network>() {
            Ok(parsed) if self.supports(parsed) => Ok(parsed),
            _ => Err(self.invalid_network(network)),
        }
    }

    /// Ensure a parsed network is valid for this chain
    pub fn check_network(&self, network: Network) -> Result<Network, SwapError> {
        if self.supports(network) {
            Ok(network)
        } else {
            Err(self.invalid_network(network.as_str()))
        }
    }

    fn invalid_network(&self, network: &str) -> SwapError {
        let hint = match self {
            Chain::Bitcoin => "choose only 'mainnet' or 'testnet' networks.",
            Chain::Bytom | Chain::Vapor => {
                "choose only 'mainnet', 'solonet' or 'testnet' networks."
            }
        };
        SwapError::network(format!("Invalid {} '{}' network", self, network), hint)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Bitcoin => write!(f, "Bitcoin"),
            Chain::Bytom => write!(f, "Bytom"),
            Chain::Vapor => write!(f, "Vapor"),
        }
    }
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "bytom" | "btm" => Ok(Chain::Bytom),
            "vapor" => Ok(Chain::Vapor),
            _ => Err(ConfigError::InvalidValue(
                "chain".to_string(),
                format!("unknown chain: {}", s),
            )),
        }
    }
}

/// Network environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
    Solonet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Solonet => "solonet",
        }
    }

    /// Map to the bitcoin crate network
    pub fn bitcoin_network(&self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet | Network::Solonet => bitcoin::Network::Testnet,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "solonet" => Ok(Network::Solonet),
            _ => Err(ConfigError::InvalidValue(
                "SWAP_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl serde::Serialize for Network {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Network {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Remote endpoints of a Bytom-family chain on one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytomEndpoints {
    /// Blockcenter API (transaction building, balances, submission)
    pub blockcenter: Option<String>,
    /// Full node API (raw transaction decoding)
    pub core: String,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct SwapConfig {
    /// Default network for CLI commands
    pub network: Network,

    /// HTTP timeout
    pub timeout: Duration,

    /// Esplora API for Bitcoin mainnet
    pub bitcoin_mainnet_api: String,

    /// Esplora API for Bitcoin testnet
    pub bitcoin_testnet_api: String,

    /// Fee calculator multiplier
    pub bitcoin_fee_rate: u64,

    /// Bytom endpoints (mainnet, solonet, testnet)
    pub bytom: [BytomEndpoints; 3],

    /// Vapor endpoints (mainnet, solonet, testnet)
    pub vapor: [BytomEndpoints; 3],

    /// Default Bytom fee in NEU
    pub bytom_fee: u64,

    /// Default Vapor fee in NEU
    pub vapor_fee: u64,

    /// Log level
    pub log_level: String,

    /// JSON log output
    pub log_json: bool,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bitcoin_mainnet_api: crate::bitcoin::MAINNET_URL.to_string(),
            bitcoin_testnet_api: crate::bitcoin::TESTNET_URL.to_string(),
            bitcoin_fee_rate: 1,
            bytom: [
                BytomEndpoints {
                    blockcenter: Some("https://bcapi.bystack.com/bytom/v3".to_string()),
                    core: "http://localhost:9888".to_string(),
                },
                BytomEndpoints {
                    blockcenter: None,
                    core: "http://localhost:9888".to_string(),
                },
                BytomEndpoints {
                    blockcenter: Some("https://bcapi.bystack.com/bytom/v3".to_string()),
                    core: "http://localhost:9888".to_string(),
                },
            ],
            vapor: [
                BytomEndpoints {
                    blockcenter: Some("https://bcapi.bystack.com/vapor/v3".to_string()),
                    core: "http://localhost:9889".to_string(),
                },
                BytomEndpoints {
                    blockcenter: None,
                    core: "http://localhost:9889".to_string(),
                },
                BytomEndpoints {
                    blockcenter: Some("https://bcapi.bystack.com/vapor/v3".to_string()),
                    core: "http://localhost:9889".to_string(),
                },
            ],
            bytom_fee: DEFAULT_BYTOM_FEE,
            vapor_fee: DEFAULT_BYTOM_FEE,
            log_level: "warn".to_string(),
            log_json: false,
        }
    }
}

impl SwapConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(network) = env::var("SWAP_NETWORK") {
            config.network = network.parse()?;
        }

        if let Some(secs) = parse_env::<u64>("SWAP_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(url) = env::var("SWAP_BITCOIN_MAINNET_API") {
            config.bitcoin_mainnet_api = url;
        }
        if let Ok(url) = env::var("SWAP_BITCOIN_TESTNET_API") {
            config.bitcoin_testnet_api = url;
        }
        if let Some(rate) = parse_env::<u64>("SWAP_BITCOIN_FEE_RATE")? {
            if rate == 0 {
                return Err(ConfigError::InvalidValue(
                    "SWAP_BITCOIN_FEE_RATE".to_string(),
                    "must be at least 1".to_string(),
                ));
            }
            config.bitcoin_fee_rate = rate;
        }

        for chain in [Chain::Bytom, Chain::Vapor] {
            for network in chain.networks() {
                let prefix = format!(
                    "SWAP_{}_{}",
                    chain.tag().to_uppercase(),
                    network.as_str().to_uppercase()
                );
                let endpoints = config.endpoints_mut(chain, *network);
                if let Ok(url) = env::var(format!("{}_BLOCKCENTER", prefix)) {
                    endpoints.blockcenter = Some(url);
                }
                if let Ok(url) = env::var(format!("{}_CORE", prefix)) {
                    endpoints.core = url;
                }
            }
        }

        if let Some(fee) = parse_env::<u64>("SWAP_BYTOM_FEE")? {
            config.bytom_fee = fee;
        }
        if let Some(fee) = parse_env::<u64>("SWAP_VAPOR_FEE")? {
            config.vapor_fee = fee;
        }

        config.log_level = env::var("SWAP_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        config.log_json = env::var("SWAP_LOG_JSON").map(|v| v == "1").unwrap_or(false);

        Ok(config)
    }

    /// Esplora API URL for a Bitcoin network
    pub fn bitcoin_api(&self, network: Network) -> Result<&str, ConfigError> {
        match network {
            Network::Mainnet => Ok(&self.bitcoin_mainnet_api),
            Network::Testnet => Ok(&self.bitcoin_testnet_api),
            Network::Solonet => Err(ConfigError::EndpointUnavailable(
                "Bitcoin Esplora".to_string(),
                network.to_string(),
            )),
        }
    }

    /// Endpoints for a Bytom-family chain
    pub fn endpoints(&self, chain: Chain, network: Network) -> &BytomEndpoints {
        let table = match chain {
            Chain::Vapor => &self.vapor,
            _ => &self.bytom,
        };
        &table[network_index(network)]
    }

    fn endpoints_mut(&mut self, chain: Chain, network: Network) -> &mut BytomEndpoints {
        let table = match chain {
            Chain::Vapor => &mut self.vapor,
            _ => &mut self.bytom,
        };
        &mut table[network_index(network)]
    }

    /// Blockcenter URL, if the network has one
    pub fn blockcenter(&self, chain: Chain, network: Network) -> Result<&str, ConfigError> {
        self.endpoints(chain, network)
            .blockcenter
            .as_deref()
            .ok_or_else(|| {
                ConfigError::EndpointUnavailable(
                    format!("{} Blockcenter", chain),
                    network.to_string(),
                )
            })
    }

    /// Default fee in NEU for a Bytom-family chain
    pub fn fee(&self, chain: Chain) -> u64 {
        match chain {
            Chain::Vapor => self.vapor_fee,
            _ => self.bytom_fee,
        }
    }
}

fn network_index(network: Network) -> usize {
    match network {
        Network::Mainnet => 0,
        Network::Solonet => 1,
        Network::Testnet => 2,
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), value)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert!(matches!("mainnet".parse::<Network>(), Ok(Network::Mainnet)));
        assert!(matches!("TESTNET".parse::<Network>(), Ok(Network::Testnet)));
        assert!(matches!("solonet".parse::<Network>(), Ok(Network::Solonet)));
        assert!("regtest".parse::<Network>().is_err());
    }

    #[test]
    fn test_chain_networks() {
        assert!(Chain::Bitcoin.supports(Network::Testnet));
        assert!(!Chain::Bitcoin.supports(Network::Solonet));
        assert!(Chain::Vapor.supports(Network::Solonet));

        let err = Chain::Bitcoin.parse_network("solonet").unwrap_err();
        assert!(err.to_string().contains("Invalid Bitcoin 'solonet' network"));
    }

    #[test]
    fn test_default_endpoints() {
        let config = SwapConfig::default();
        assert!(config.blockcenter(Chain::Bytom, Network::Mainnet).is_ok());
        assert!(config.blockcenter(Chain::Vapor, Network::Solonet).is_err());
        assert_eq!(
            config.endpoints(Chain::Vapor, Network::Mainnet).core,
            "http://localhost:9889"
        );
        assert!(config.bitcoin_api(Network::Solonet).is_err());
        assert_eq!(config.fee(Chain::Vapor), DEFAULT_BYTOM_FEE);
    }
}
