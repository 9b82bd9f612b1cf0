//! Bytom claim transaction
//!
//! The recipient spends a funded mainnet HTLC with the secret.
//!
//! Run with: cargo run --example bytom_claim

use swap::bytom::{
    BlockcenterClient, ClaimSolver, Htlc, Signature, TransactionBuilder, Wallet, DEFAULT_PATH,
};
use swap::common::{Chain, Network, SwapConfig, BTM_ASSET};
use swap::SpendAmount;

const CHAIN: Chain = Chain::Bytom;
const NETWORK: Network = Network::Mainnet;
const RECIPIENT_MNEMONIC: &str =
    "hint excuse upgrade sleep easily deputy erase cluster section other ugly limit";
const SENDER_PUBLIC_KEY: &str = "91ff7f525ff40874c4f47f0cab42e46e3bf53adad59adef9558ad1b6448f22e2";
const SECRET: &str = "Hello Meheret!";
const SECRET_HASH: &str = "3a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb";
const SEQUENCE: u64 = 1000;
// Funded transaction id
const TRANSACTION_ID: &str = "0dbf27e5e0dcfff583e1db18265e367f7e66556979e194213ad859383ea3f6dc";

#[tokio::main]
async fn main() -> swap::Result<()> {
    dotenv::dotenv().ok();
    let config = SwapConfig::from_env()?;
    let api = BlockcenterClient::from_config(&config, CHAIN, NETWORK)?;

    let recipient = Wallet::from_mnemonic(RECIPIENT_MNEMONIC, None, CHAIN, NETWORK)?.from_path(DEFAULT_PATH)?;
    let xprivate_key = recipient.xprivate_key().unwrap_or_default();
    println!("=== Recipient Wallet ===");
    println!("XPublic Key: {}", recipient.xpublic_key().unwrap_or_default());
    println!("Public Key: {}", recipient.public_key());
    println!("Path: {}", recipient.path().unwrap_or_default());
    println!("Address: {}", recipient.address(None)?);
    println!("Balance: {} NEU", recipient.balance(&api, BTM_ASSET).await?);

    let htlc = Htlc::build(SECRET_HASH, &recipient.public_key(), SENDER_PUBLIC_KEY, SEQUENCE, CHAIN, NETWORK)?;
    println!("\n=== HTLC ===");
    println!("Bytecode: {}", htlc.bytecode());
    println!("Address: {}", htlc.address()?);

    let builder = TransactionBuilder::new(&api, CHAIN, NETWORK)?.with_fee(config.fee(CHAIN));
    let unsigned = builder
        .claim(TRANSACTION_ID, &recipient.address(None)?, SpendAmount::Max, BTM_ASSET)
        .await?;
    println!("\n=== Unsigned Claim Transaction ===");
    println!("Fee: {} NEU", unsigned.fee());
    println!("Raw: {}", unsigned.raw());
    println!("Json: {}", serde_json::to_string_pretty(&unsigned.json(&api).await?)?);
    println!("Unsigned Datas: {}", serde_json::to_string_pretty(unsigned.unsigned_datas())?);
    let unsigned_raw = unsigned.transaction_raw()?;
    println!("Transaction Raw: {}", unsigned_raw);

    let solver = ClaimSolver::new(&xprivate_key, SECRET, &htlc, Some(DEFAULT_PATH))?.into();
    let signed = unsigned.sign(&solver)?;
    println!("\n=== Signed Claim Transaction ===");
    println!("Signatures: {:?}", signed.signatures());
    println!("Transaction Raw: {}", signed.transaction_raw()?);

    let signature = Signature::new(CHAIN, NETWORK)?.sign(&unsigned_raw, &solver)?;
    println!("\n=== Claim Signature ===");
    println!("Type: {}", signature.transaction_type());
    println!("Transaction Raw: {}", signature.transaction_raw()?);

    assert_eq!(signed.transaction_raw()?, signature.transaction_raw()?);

    // let submitted = swap::bytom::submit_transaction_raw(&api, &signed.transaction_raw()?, CHAIN).await?;
    // println!("Submitted: {}", serde_json::to_string_pretty(&submitted)?);
    Ok(())
}
