//! `swap` - HTLC atomic swap command line tool
//!
//! Usage:
//!   swap bitcoin htlc --secret-hash <hex> --recipient-address <addr> --sender-address <addr>
//!   swap bytom fund --address <addr> --amount 0.1 --unit BTM --bytecode <hex>
//!   swap vapor sign --xprivate-key <hex> --transaction-raw <raw> --secret <secret> --bytecode <hex>
//!   swap <bitcoin|bytom|vapor> submit --transaction-raw <raw>
//!
//! Endpoints, fees and the default network come from `SWAP_*` environment
//! variables (a `.env` file is read when present).

use std::process::ExitCode;

use clap::Parser;
use swap::cli::{self, Cli};
use swap::common::{init_logging, LogLevel, SwapConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match SwapConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    if let Err(e) = init_logging(LogLevel::from(level), config.log_json) {
        eprintln!("Warning: {}", e);
    }

    match cli::execute(cli, &config).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
