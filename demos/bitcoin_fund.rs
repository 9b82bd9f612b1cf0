//! Bitcoin fund transaction
//!
//! Locks 0.0001 BTC from the sender into an HTLC on testnet.
//!
//! Run with: cargo run --example bitcoin_fund

use swap::bitcoin::{EsploraClient, FundSolver, Htlc, Signature, TransactionBuilder, Wallet};
use swap::common::{Network, SwapConfig};
use swap::transaction_raw::TransactionKind;

const NETWORK: Network = Network::Testnet;
const SENDER_PASSPHRASE: &str = "meheret tesfaye batu bayou";
const RECIPIENT_ADDRESS: &str = "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB";
const SECRET_HASH: &str = "821124b554d13f247b1e5d10b84e44fb1296f18f38bbaa1bea34a12c843e0158";
const SEQUENCE: u32 = 1000;
const AMOUNT: u64 = 10_000;

#[tokio::main]
async fn main() -> swap::Result<()> {
    dotenv::dotenv().ok();
    let config = SwapConfig::from_env()?;
    let api = EsploraClient::from_config(&config, NETWORK)?;

    let sender = Wallet::from_passphrase(SENDER_PASSPHRASE, NETWORK)?;
    println!("=== Sender Wallet ===");
    println!("Address: {}", sender.address());
    println!("Public Key: {}", sender.public_key().unwrap_or_default());
    println!("Hash: {}", sender.hash().unwrap_or_default());
    println!("Balance: {} SATOSHI", sender.balance(&api).await?);

    let htlc = Htlc::build(SECRET_HASH, RECIPIENT_ADDRESS, &sender.address(), SEQUENCE, NETWORK)?;
    println!("\n=== HTLC ===");
    println!("Bytecode: {}", htlc.bytecode());
    println!("Address: {}", htlc.address()?);

    let builder = TransactionBuilder::new(&api, NETWORK)?.with_fee_rate(config.bitcoin_fee_rate);
    let unsigned = builder.fund(&sender.address(), &htlc, AMOUNT).await?;
    assert_eq!(unsigned.transaction_type().kind, TransactionKind::Fund);
    println!("\n=== Unsigned Fund Transaction ===");
    println!("Fee: {} SATOSHI", unsigned.fee());
    println!("Hash: {}", unsigned.hash());
    println!("Json: {}", serde_json::to_string_pretty(&unsigned.json())?);
    let unsigned_raw = unsigned.transaction_raw()?;
    println!("Transaction Raw: {}", unsigned_raw);

    let solver = FundSolver::new(&sender)?.into();
    let signed = unsigned.sign(&solver)?;
    println!("\n=== Signed Fund Transaction ===");
    println!("Hash: {}", signed.hash());
    println!("Raw: {}", signed.raw());
    println!("Transaction Raw: {}", signed.transaction_raw()?);

    let signature = Signature::new(NETWORK)?.sign(&unsigned_raw, &solver)?;
    println!("\n=== Fund Signature ===");
    println!("Type: {}", signature.transaction_type());
    println!("Transaction Raw: {}", signature.transaction_raw()?);

    assert_eq!(signed.transaction_raw()?, signature.transaction_raw()?);

    // let submitted = swap::bitcoin::submit_transaction_raw(&api, &signed.transaction_raw()?).await?;
    // println!("Submitted: {}", serde_json::to_string_pretty(&submitted)?);
    Ok(())
}
