//! `swap bytom ...` and `swap vapor ...` commands

use clap::Subcommand;

use crate::bytom::utils::transaction_raw_network;
use crate::bytom::{
    decode_transaction_raw, submit_transaction_raw, ClaimSolver, FundSolver, Htlc, RefundSolver,
    Signature, Solver, TransactionBuilder,
};
use crate::cli::{base_amount, resolve_network, to_json, Connector};
use crate::common::{Chain, Network, Result, SwapConfig, SwapError, BTM_ASSET};
use crate::transaction_raw::{self, BytomTransactionRaw, TransactionKind};
use crate::types::SpendAmount;

#[derive(Debug, Subcommand)]
pub enum BytomCommand {
    /// Build an HTLC and print its bytecode
    Htlc {
        /// SHA-256 hash of the secret (hex)
        #[arg(long)]
        secret_hash: String,
        /// Recipient ed25519 public key (hex)
        #[arg(long)]
        recipient_public_key: String,
        /// Sender ed25519 public key (hex)
        #[arg(long)]
        sender_public_key: String,
        /// Relative lock time in blocks
        #[arg(long, default_value_t = 1000)]
        sequence: u64,
        #[arg(short, long)]
        network: Option<String>,
    },
    /// Build an unsigned fund transaction
    Fund {
        /// Sender address
        #[arg(short, long)]
        address: String,
        #[arg(long, alias = "am")]
        amount: f64,
        #[arg(short, long, default_value = "NEU")]
        unit: String,
        #[arg(long, alias = "as", default_value = BTM_ASSET)]
        asset: String,
        /// HTLC bytecode (hex)
        #[arg(short, long)]
        bytecode: String,
        #[arg(short, long)]
        network: Option<String>,
    },
    /// Build an unsigned claim transaction
    Claim {
        #[command(flatten)]
        spend: SpendArgs,
    },
    /// Build an unsigned refund transaction
    Refund {
        #[command(flatten)]
        spend: SpendArgs,
    },
    /// Decode a transaction raw
    Decode {
        #[arg(long)]
        transaction_raw: String,
    },
    /// Sign a transaction raw
    Sign {
        /// Root xprivate key (hex)
        #[arg(long)]
        xprivate_key: String,
        #[arg(long)]
        transaction_raw: String,
        /// HTLC bytecode, for claim and refund transactions
        #[arg(short, long)]
        bytecode: Option<String>,
        /// Secret preimage, for claim transactions
        #[arg(long)]
        secret: Option<String>,
        /// Derivation path of the signing key
        #[arg(long)]
        path: Option<String>,
    },
    /// Submit a signed transaction raw
    Submit {
        #[arg(long)]
        transaction_raw: String,
    },
}

/// Options shared by claim and refund
#[derive(Debug, clap::Args)]
pub struct SpendArgs {
    /// Address receiving the HTLC funds
    #[arg(short, long)]
    pub address: String,
    /// Funded transaction id
    #[arg(long, alias = "ti")]
    pub transaction_id: String,
    #[arg(long, alias = "am", conflicts_with = "max_amount")]
    pub amount: Option<f64>,
    /// Spend the whole HTLC output less the fee, the default without --amount
    #[arg(long, alias = "ma")]
    pub max_amount: bool,
    #[arg(short, long, default_value = "NEU")]
    pub unit: String,
    #[arg(long, alias = "as", default_value = BTM_ASSET)]
    pub asset: String,
    #[arg(short, long)]
    pub network: Option<String>,
}

impl SpendArgs {
    fn spend_amount(&self, chain: Chain) -> Result<SpendAmount> {
        let amount = match self.amount {
            Some(amount) => Some(base_amount(amount, &self.unit, chain)?),
            None => None,
        };
        Ok(SpendAmount::from_flags(amount, self.max_amount))
    }
}

pub async fn run(
    command: BytomCommand,
    chain: Chain,
    config: &SwapConfig,
    connector: &dyn Connector,
) -> Result<String> {
    match command {
        BytomCommand::Htlc {
            secret_hash,
            recipient_public_key,
            sender_public_key,
            sequence,
            network,
        } => {
            let network = resolve_network(chain, network.as_deref(), config)?;
            let htlc = Htlc::build(
                &secret_hash,
                &recipient_public_key,
                &sender_public_key,
                sequence,
                chain,
                network,
            )?;
            Ok(htlc.bytecode())
        }
        BytomCommand::Fund {
            address,
            amount,
            unit,
            asset,
            bytecode,
            network,
        } => {
            let network = resolve_network(chain, network.as_deref(), config)?;
            let htlc = Htlc::from_bytecode(&bytecode, chain, network)?;
            let amount = base_amount(amount, &unit, chain)?;
            let api = connector.blockcenter(chain, network)?;
            let transaction = TransactionBuilder::new(api.as_ref(), chain, network)?
                .with_fee(config.fee(chain))
                .fund(&address, &htlc, amount, &asset)
                .await?;
            transaction.transaction_raw()
        }
        BytomCommand::Claim { spend } => {
            spend_htlc(TransactionKind::Claim, spend, chain, config, connector).await
        }
        BytomCommand::Refund { spend } => {
            spend_htlc(TransactionKind::Refund, spend, chain, config, connector).await
        }
        BytomCommand::Decode { transaction_raw } => {
            let network = transaction_raw_network(&transaction_raw, chain)?;
            let api = connector.blockcenter(chain, network)?;
            to_json(&decode_transaction_raw(api.as_ref(), &transaction_raw, chain).await?)
        }
        BytomCommand::Sign {
            xprivate_key,
            transaction_raw,
            bytecode,
            secret,
            path,
        } => {
            let envelope: BytomTransactionRaw = transaction_raw::decode(&transaction_raw, chain)?;
            let network = envelope.network;
            let solver = solver(
                envelope.transaction_type.kind,
                &xprivate_key,
                secret,
                bytecode,
                path.as_deref(),
                chain,
                network,
            )?;
            let signed = Signature::new(chain, network)?.sign(&transaction_raw, &solver)?;
            signed.transaction_raw()
        }
        BytomCommand::Submit { transaction_raw } => {
            let network = transaction_raw_network(&transaction_raw, chain)?;
            let api = connector.blockcenter(chain, network)?;
            to_json(&submit_transaction_raw(api.as_ref(), &transaction_raw, chain).await?)
        }
    }
}

async fn spend_htlc(
    kind: TransactionKind,
    spend: SpendArgs,
    chain: Chain,
    config: &SwapConfig,
    connector: &dyn Connector,
) -> Result<String> {
    let network = resolve_network(chain, spend.network.as_deref(), config)?;
    let amount = spend.spend_amount(chain)?;
    let api = connector.blockcenter(chain, network)?;
    let builder = TransactionBuilder::new(api.as_ref(), chain, network)?.with_fee(config.fee(chain));
    let transaction = match kind {
        TransactionKind::Refund => {
            builder
                .refund(&spend.transaction_id, &spend.address, amount, &spend.asset)
                .await?
        }
        _ => {
            builder
                .claim(&spend.transaction_id, &spend.address, amount, &spend.asset)
                .await?
        }
    };
    transaction.transaction_raw()
}

fn solver(
    kind: TransactionKind,
    xprivate_key: &str,
    secret: Option<String>,
    bytecode: Option<String>,
    path: Option<&str>,
    chain: Chain,
    network: Network,
) -> Result<Solver> {
    let htlc = || {
        bytecode
            .as_deref()
            .ok_or_else(|| SwapError::solver("--bytecode is required to sign HTLC spends."))
            .and_then(|bytecode| Htlc::from_bytecode(bytecode, chain, network))
    };
    Ok(match kind {
        TransactionKind::Fund => FundSolver::new(xprivate_key, path)?.into(),
        TransactionKind::Claim => {
            let secret = secret
                .ok_or_else(|| SwapError::solver("--secret is required to sign claim transactions."))?;
            ClaimSolver::new(xprivate_key, &secret, &htlc()?, path)?.into()
        }
        TransactionKind::Refund => RefundSolver::new(xprivate_key, &htlc()?, path)?.into(),
    })
}
