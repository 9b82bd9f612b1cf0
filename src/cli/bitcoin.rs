//! `swap bitcoin ...` commands

use clap::Subcommand;

use crate::bitcoin::{
    decode_transaction_raw, submit_transaction_raw, ClaimSolver, FundSolver, Htlc, RefundSolver,
    Signature, Solver, TransactionBuilder, Wallet,
};
use crate::cli::{base_amount, resolve_network, to_json, Connector};
use crate::common::{Chain, Network, Result, SwapConfig, SwapError};
use crate::transaction_raw::{self, BitcoinTransactionRaw, TransactionKind};
use crate::types::SpendAmount;

#[derive(Debug, Subcommand)]
pub enum BitcoinCommand {
    /// Build an HTLC and print its bytecode
    Htlc {
        /// Double SHA-256 hash of the secret (hex)
        #[arg(long)]
        secret_hash: String,
        /// Recipient P2PKH address
        #[arg(long)]
        recipient_address: String,
        /// Sender P2PKH address
        #[arg(long)]
        sender_address: String,
        /// Relative lock time in blocks
        #[arg(long, default_value_t = 1000)]
        sequence: u32,
        #[arg(short, long)]
        network: Option<String>,
    },
    /// Build an unsigned fund transaction
    Fund {
        #[arg(long)]
        sender_address: String,
        #[arg(long)]
        amount: f64,
        #[arg(short, long, default_value = "SATOSHI")]
        unit: String,
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
        #[arg(long)]
        transaction_raw: String,
        /// Private key (hex)
        #[arg(long, conflicts_with = "root_xprivate_key")]
        private_key: Option<String>,
        /// Root extended private key (xprv/tprv)
        #[arg(long)]
        root_xprivate_key: Option<String>,
        /// Derivation path of the root xprivate key
        #[arg(long, requires = "root_xprivate_key")]
        path: Option<String>,
        /// Secret preimage, for claim transactions
        #[arg(long)]
        secret: Option<String>,
        /// HTLC bytecode, for claim and refund transactions
        #[arg(short, long)]
        bytecode: Option<String>,
    },
    /// Broadcast a signed transaction raw
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
    #[arg(long)]
    pub transaction_id: String,
    /// HTLC bytecode (hex)
    #[arg(short, long)]
    pub bytecode: String,
    #[arg(long, conflicts_with = "max_amount")]
    pub amount: Option<f64>,
    /// Spend the whole HTLC output less the fee, the default without --amount
    #[arg(long)]
    pub max_amount: bool,
    #[arg(short, long, default_value = "SATOSHI")]
    pub unit: String,
    #[arg(short, long)]
    pub network: Option<String>,
}

impl SpendArgs {
    pub(crate) fn spend_amount(&self, chain: Chain) -> Result<SpendAmount> {
        let amount = match self.amount {
            Some(amount) => Some(base_amount(amount, &self.unit, chain)?),
            None => None,
        };
        Ok(SpendAmount::from_flags(amount, self.max_amount))
    }
}

pub async fn run(command: BitcoinCommand, config: &SwapConfig, connector: &dyn Connector) -> Result<String> {
    let chain = Chain::Bitcoin;
    match command {
        BitcoinCommand::Htlc {
            secret_hash,
            recipient_address,
            sender_address,
            sequence,
            network,
        } => {
            let network = resolve_network(chain, network.as_deref(), config)?;
            let htlc = Htlc::build(&secret_hash, &recipient_address, &sender_address, sequence, network)?;
            Ok(htlc.bytecode())
        }
        BitcoinCommand::Fund {
            sender_address,
            amount,
            unit,
            bytecode,
            network,
        } => {
            let network = resolve_network(chain, network.as_deref(), config)?;
            let htlc = Htlc::from_bytecode(&bytecode, network)?;
            let amount = base_amount(amount, &unit, chain)?;
            let api = connector.bitcoin(network)?;
            let transaction = TransactionBuilder::new(api.as_ref(), network)?
                .with_fee_rate(config.bitcoin_fee_rate)
                .fund(&sender_address, &htlc, amount)
                .await?;
            transaction.transaction_raw()
        }
        BitcoinCommand::Claim { spend } => spend_htlc(TransactionKind::Claim, spend, config, connector).await,
        BitcoinCommand::Refund { spend } => spend_htlc(TransactionKind::Refund, spend, config, connector).await,
        BitcoinCommand::Decode { transaction_raw } => to_json(&decode_transaction_raw(&transaction_raw)?),
        BitcoinCommand::Sign {
            transaction_raw,
            private_key,
            root_xprivate_key,
            path,
            secret,
            bytecode,
        } => {
            let envelope: BitcoinTransactionRaw = transaction_raw::decode(&transaction_raw, chain)?;
            let network = envelope.network;
            let wallet = match (private_key, root_xprivate_key) {
                (Some(private_key), _) => Wallet::from_private_key(&private_key, network)?,
                (None, Some(root)) => Wallet::from_root_xprivate_key(&root, path.as_deref())?,
                (None, None) => {
                    return Err(SwapError::wallet(
                        "Either --private-key or --root-xprivate-key is required.",
                    ))
                }
            };
            let solver = solver(envelope.transaction_type.kind, &wallet, secret, bytecode, network)?;
            let signed = Signature::new(network)?.sign(&transaction_raw, &solver)?;
            signed.transaction_raw()
        }
        BitcoinCommand::Submit { transaction_raw } => {
            let envelope: BitcoinTransactionRaw = transaction_raw::decode(&transaction_raw, chain)?;
            let api = connector.bitcoin(envelope.network)?;
            to_json(&submit_transaction_raw(api.as_ref(), &transaction_raw).await?)
        }
    }
}

async fn spend_htlc(
    kind: TransactionKind,
    spend: SpendArgs,
    config: &SwapConfig,
    connector: &dyn Connector,
) -> Result<String> {
    let network = resolve_network(Chain::Bitcoin, spend.network.as_deref(), config)?;
    let htlc = Htlc::from_bytecode(&spend.bytecode, network)?;
    let amount = spend.spend_amount(Chain::Bitcoin)?;
    let api = connector.bitcoin(network)?;
    let builder = TransactionBuilder::new(api.as_ref(), network)?.with_fee_rate(config.bitcoin_fee_rate);
    let transaction = match kind {
        TransactionKind::Refund => {
            builder
                .refund(&spend.transaction_id, &spend.address, &htlc, amount)
                .await?
        }
        _ => {
            builder
                .claim(&spend.transaction_id, &spend.address, &htlc, amount)
                .await?
        }
    };
    transaction.transaction_raw()
}

fn solver(
    kind: TransactionKind,
    wallet: &Wallet,
    secret: Option<String>,
    bytecode: Option<String>,
    network: Network,
) -> Result<Solver> {
    let htlc = || {
        bytecode
            .as_deref()
            .ok_or_else(|| SwapError::solver("--bytecode is required to sign HTLC spends."))
            .and_then(|bytecode| Htlc::from_bytecode(bytecode, network))
    };
    Ok(match kind {
        TransactionKind::Fund => FundSolver::new(wallet)?.into(),
        TransactionKind::Claim => {
            let secret = secret
                .ok_or_else(|| SwapError::solver("--secret is required to sign claim transactions."))?;
            ClaimSolver::new(wallet, &secret, htlc()?)?.into()
        }
        TransactionKind::Refund => RefundSolver::new(wallet, htlc()?)?.into(),
    })
}
