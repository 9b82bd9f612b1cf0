//! Command Line Interface
//!
//! `swap [--log-level L] <bitcoin|bytom|vapor> <command> [options]`
//!
//! Every command returns the text to print on stdout. Chain access goes
//! through a [`Connector`] so commands can run against any API
//! implementation.

pub mod bitcoin;
pub mod bytom;

use clap::{Parser, Subcommand};

use crate::bitcoin::{BitcoinApi, EsploraClient};
use crate::bytom::{BlockcenterApi, BlockcenterClient};
use crate::common::{Chain, EventCategory, LogEvent, LogLevel, Network, Result, SwapConfig};
use crate::types::{to_base_units, Unit};

#[derive(Debug, Parser)]
#[command(name = "swap")]
#[command(about = "Atomic swap (HTLC) transactions for Bitcoin, Bytom and Vapor")]
#[command(version)]
pub struct Cli {
    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, env = "SWAP_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bitcoin HTLC commands
    Bitcoin {
        #[command(subcommand)]
        command: bitcoin::BitcoinCommand,
    },
    /// Bytom HTLC commands
    Bytom {
        #[command(subcommand)]
        command: bytom::BytomCommand,
    },
    /// Vapor HTLC commands
    Vapor {
        #[command(subcommand)]
        command: bytom::BytomCommand,
    },
}

impl Command {
    pub fn chain(&self) -> Chain {
        match self {
            Command::Bitcoin { .. } => Chain::Bitcoin,
            Command::Bytom { .. } => Chain::Bytom,
            Command::Vapor { .. } => Chain::Vapor,
        }
    }
}

/// Opens API clients for the commands that need chain data
pub trait Connector {
    fn bitcoin(&self, network: Network) -> Result<Box<dyn BitcoinApi>>;

    fn blockcenter(&self, chain: Chain, network: Network) -> Result<Box<dyn BlockcenterApi>>;
}

/// HTTP clients built from configuration
pub struct HttpConnector<'a> {
    config: &'a SwapConfig,
}

impl<'a> HttpConnector<'a> {
    pub fn new(config: &'a SwapConfig) -> Self {
        Self { config }
    }
}

impl Connector for HttpConnector<'_> {
    fn bitcoin(&self, network: Network) -> Result<Box<dyn BitcoinApi>> {
        Ok(Box::new(EsploraClient::from_config(self.config, network)?))
    }

    fn blockcenter(&self, chain: Chain, network: Network) -> Result<Box<dyn BlockcenterApi>> {
        Ok(Box::new(BlockcenterClient::from_config(self.config, chain, network)?))
    }
}

/// Run a parsed command with HTTP clients
pub async fn execute(cli: Cli, config: &SwapConfig) -> Result<String> {
    execute_with(cli, config, &HttpConnector::new(config)).await
}

/// Run a parsed command with the given connector
pub async fn execute_with(cli: Cli, config: &SwapConfig, connector: &dyn Connector) -> Result<String> {
    let chain = cli.command.chain();
    let event = LogEvent::new(LogLevel::Debug, EventCategory::Cli, "command").with_chain(chain.tag());
    tracing::debug!(target: "swap::cli", "{}", event.to_json());

    match cli.command {
        Command::Bitcoin { command } => bitcoin::run(command, config, connector).await,
        Command::Bytom { command } => bytom::run(command, Chain::Bytom, config, connector).await,
        Command::Vapor { command } => bytom::run(command, Chain::Vapor, config, connector).await,
    }
}

/// Network from a flag, or the configured default
pub(crate) fn resolve_network(chain: Chain, network: Option<&str>, config: &SwapConfig) -> Result<Network> {
    match network {
        Some(network) => chain.parse_network(network),
        None => chain.check_network(config.network),
    }
}

/// Amount in base units; base unit amounts are truncated
pub(crate) fn base_amount(amount: f64, unit: &str, chain: Chain) -> Result<u64> {
    to_base_units(amount, Unit::parse_for(unit, chain)?)
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from([
            "swap",
            "--log-level",
            "debug",
            "vapor",
            "claim",
            "--address",
            "vp1q3plwvmvy4qhjmp5zffzmk50aagpujt6flnf63h",
            "--transaction-id",
            "ab",
            "--max-amount",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.command.chain(), Chain::Vapor);

        assert!(Cli::try_parse_from(["swap", "litecoin", "htlc"]).is_err());
        assert!(Cli::try_parse_from(["swap", "bytom", "fund", "--amount", "1"]).is_err());
    }

    #[test]
    fn test_amounts_and_networks() {
        assert_eq!(base_amount(0.1, "BTM", Chain::Bytom).unwrap(), 10_000_000);
        assert_eq!(base_amount(1000.9, "NEU", Chain::Vapor).unwrap(), 1000);
        assert_eq!(base_amount(0.001, "BTC", Chain::Bitcoin).unwrap(), 100_000);
        assert!(base_amount(1.0, "BTM", Chain::Bitcoin).is_err());

        let config = SwapConfig::default();
        assert_eq!(resolve_network(Chain::Bytom, Some("solonet"), &config).unwrap(), Network::Solonet);
        assert!(resolve_network(Chain::Bitcoin, Some("solonet"), &config).is_err());
        assert_eq!(resolve_network(Chain::Bitcoin, None, &config).unwrap(), config.network);
    }
}
