//! Bitcoin claim transaction
//!
//! The recipient spends a funded testnet HTLC with the secret.
//!
//! Run with: cargo run --example bitcoin_claim

use swap::bitcoin::{ClaimSolver, EsploraClient, Htlc, Signature, TransactionBuilder, Wallet};
use swap::common::{Network, SwapConfig};
use swap::SpendAmount;

const NETWORK: Network = Network::Testnet;
const RECIPIENT_PASSPHRASE: &str = "meheret";
const SENDER_ADDRESS: &str = "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q";
const SECRET: &str = "Hello Meheret!";
const SECRET_HASH: &str = "821124b554d13f247b1e5d10b84e44fb1296f18f38bbaa1bea34a12c843e0158";
const SEQUENCE: u32 = 1000;
// Funded transaction id of the bitcoin_fund example
const TRANSACTION_ID: &str = "a211d21110756b266925fee2fbf2dc81529beef5e410311b38578dc3a076fb31";

#[tokio::main]
async fn main() -> swap::Result<()> {
    dotenv::dotenv().ok();
    let config = SwapConfig::from_env()?;
    let api = EsploraClient::from_config(&config, NETWORK)?;

    let recipient = Wallet::from_passphrase(RECIPIENT_PASSPHRASE, NETWORK)?;
    println!("=== Recipient Wallet ===");
    println!("Address: {}", recipient.address());
    println!("Public Key: {}", recipient.public_key().unwrap_or_default());
    println!("Balance: {} SATOSHI", recipient.balance(&api).await?);

    let htlc = Htlc::build(SECRET_HASH, &recipient.address(), SENDER_ADDRESS, SEQUENCE, NETWORK)?;
    println!("\n=== HTLC ===");
    println!("Bytecode: {}", htlc.bytecode());
    println!("Opcode: {}", htlc.opcode());
    println!("Address: {}", htlc.address()?);

    let builder = TransactionBuilder::new(&api, NETWORK)?.with_fee_rate(config.bitcoin_fee_rate);
    let unsigned = builder
        .claim(TRANSACTION_ID, &recipient.address(), &htlc, SpendAmount::Max)
        .await?;
    println!("\n=== Unsigned Claim Transaction ===");
    println!("Fee: {} SATOSHI", unsigned.fee());
    println!("Hash: {}", unsigned.hash());
    println!("Json: {}", serde_json::to_string_pretty(&unsigned.json())?);
    let unsigned_raw = unsigned.transaction_raw()?;
    println!("Transaction Raw: {}", unsigned_raw);

    let solver = ClaimSolver::new(&recipient, SECRET, htlc)?.into();
    let signed = unsigned.sign(&solver)?;
    println!("\n=== Signed Claim Transaction ===");
    println!("Hash: {}", signed.hash());
    println!("Raw: {}", signed.raw());
    println!("Transaction Raw: {}", signed.transaction_raw()?);

    let signature = Signature::new(NETWORK)?.sign(&unsigned_raw, &solver)?;
    println!("\n=== Claim Signature ===");
    println!("Type: {}", signature.transaction_type());
    println!("Transaction Raw: {}", signature.transaction_raw()?);

    assert_eq!(signed.transaction_raw()?, signature.transaction_raw()?);

    // let submitted = swap::bitcoin::submit_transaction_raw(&api, &signed.transaction_raw()?).await?;
    // println!("Submitted: {}", serde_json::to_string_pretty(&submitted)?);
    Ok(())
}
