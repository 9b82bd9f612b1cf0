//! Vapor refund transaction
//!
//! After the lock expires the sender takes the HTLC funds back.
//!
//! Run with: cargo run --example vapor_refund

use swap::bytom::{BlockcenterClient, Htlc, RefundSolver, Signature, TransactionBuilder, Wallet, DEFAULT_PATH};
use swap::common::{Chain, Network, SwapConfig, BTM_ASSET};
use swap::SpendAmount;

const CHAIN: Chain = Chain::Vapor;
const NETWORK: Network = Network::Mainnet;
const SENDER_MNEMONIC: &str = "indicate warm sock mistake code spot acid ribbon sing over taxi toast";
const RECIPIENT_PUBLIC_KEY: &str = "3e0a377ae4afa031d4551599d9bb7d5b27f4736d77f78cac4d476f0ffba5ae3e";
const SECRET_HASH: &str = "3a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb";
const SEQUENCE: u64 = 1000;
// Funded transaction id of the vapor_fund example
const TRANSACTION_ID: &str = "96db48d3f3a4d9f3e490bcb3e1ad1cc8b11f8e51ceee816ecf6085374c824f0e";

#[tokio::main]
async fn main() -> swap::Result<()> {
    dotenv::dotenv().ok();
    let config = SwapConfig::from_env()?;
    let api = BlockcenterClient::from_config(&config, CHAIN, NETWORK)?;

    let sender = Wallet::from_mnemonic(SENDER_MNEMONIC, None, CHAIN, NETWORK)?.from_path(DEFAULT_PATH)?;
    let xprivate_key = sender.xprivate_key().unwrap_or_default();
    println!("=== Sender Wallet ===");
    println!("Public Key: {}", sender.public_key());
    println!("Address: {}", sender.address(None)?);
    println!("Balance: {} NEU", sender.balance(&api, BTM_ASSET).await?);

    let htlc = Htlc::build(SECRET_HASH, RECIPIENT_PUBLIC_KEY, &sender.public_key(), SEQUENCE, CHAIN, NETWORK)?;
    println!("\n=== HTLC ===");
    println!("Bytecode: {}", htlc.bytecode());
    println!("Address: {}", htlc.address()?);

    let builder = TransactionBuilder::new(&api, CHAIN, NETWORK)?.with_fee(config.fee(CHAIN));
    let unsigned = builder
        .refund(TRANSACTION_ID, &sender.address(None)?, SpendAmount::Max, BTM_ASSET)
        .await?;
    println!("\n=== Unsigned Refund Transaction ===");
    println!("Fee: {} NEU", unsigned.fee());
    println!("Raw: {}", unsigned.raw());
    println!("Unsigned Datas: {}", serde_json::to_string_pretty(unsigned.unsigned_datas())?);
    let unsigned_raw = unsigned.transaction_raw()?;
    println!("Transaction Raw: {}", unsigned_raw);

    let solver = RefundSolver::new(&xprivate_key, &htlc, Some(DEFAULT_PATH))?.into();
    let signed = unsigned.sign(&solver)?;
    println!("\n=== Signed Refund Transaction ===");
    println!("Signatures: {:?}", signed.signatures());
    println!("Transaction Raw: {}", signed.transaction_raw()?);

    let signature = Signature::new(CHAIN, NETWORK)?.sign(&unsigned_raw, &solver)?;
    println!("\n=== Refund Signature ===");
    println!("Type: {}", signature.transaction_type());
    println!("Transaction Raw: {}", signature.transaction_raw()?);

    assert_eq!(signed.transaction_raw()?, signature.transaction_raw()?);

    // let submitted = swap::bytom::submit_transaction_raw(&api, &signed.transaction_raw()?, CHAIN).await?;
    // println!("Submitted: {}", serde_json::to_string_pretty(&submitted)?);
    Ok(())
}
