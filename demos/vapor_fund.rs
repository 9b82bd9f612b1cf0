//! Vapor fund transaction
//!
//! Locks 0.1 BTM from the sender into an HTLC on the Vapor mainnet.
//!
//! Run with: cargo run --example vapor_fund

use swap::bytom::{BlockcenterClient, FundSolver, Htlc, Signature, TransactionBuilder, Wallet, DEFAULT_PATH};
use swap::common::{Chain, Network, SwapConfig, BTM_ASSET};
use swap::types::{to_base_units, Unit};

const CHAIN: Chain = Chain::Vapor;
const NETWORK: Network = Network::Mainnet;
const SENDER_MNEMONIC: &str = "indicate warm sock mistake code spot acid ribbon sing over taxi toast";
const RECIPIENT_PUBLIC_KEY: &str = "3e0a377ae4afa031d4551599d9bb7d5b27f4736d77f78cac4d476f0ffba5ae3e";
const SECRET_HASH: &str = "3a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb";
const SEQUENCE: u64 = 1000;

#[tokio::main]
async fn main() -> swap::Result<()> {
    dotenv::dotenv().ok();
    let config = SwapConfig::from_env()?;
    let api = BlockcenterClient::from_config(&config, CHAIN, NETWORK)?;

    let sender = Wallet::from_mnemonic(SENDER_MNEMONIC, None, CHAIN, NETWORK)?.from_path(DEFAULT_PATH)?;
    let xprivate_key = sender.xprivate_key().unwrap_or_default();
    println!("=== Sender Wallet ===");
    println!("XPublic Key: {}", sender.xpublic_key().unwrap_or_default());
    println!("Public Key: {}", sender.public_key());
    println!("Program: {}", sender.program());
    println!("Address: {}", sender.address(None)?);
    println!("Balance: {} NEU", sender.balance(&api, BTM_ASSET).await?);

    let htlc = Htlc::build(SECRET_HASH, RECIPIENT_PUBLIC_KEY, &sender.public_key(), SEQUENCE, CHAIN, NETWORK)?;
    println!("\n=== HTLC ===");
    println!("Bytecode: {}", htlc.bytecode());
    println!("Address: {}", htlc.address()?);

    let amount = to_base_units(0.1, Unit::Btm)?;
    let builder = TransactionBuilder::new(&api, CHAIN, NETWORK)?.with_fee(config.fee(CHAIN));
    let unsigned = builder
        .fund(&sender.address(None)?, &htlc, amount, BTM_ASSET)
        .await?;
    println!("\n=== Unsigned Fund Transaction ===");
    println!("Fee: {} NEU", unsigned.fee());
    println!("Raw: {}", unsigned.raw());
    println!("Unsigned Datas: {}", serde_json::to_string_pretty(unsigned.unsigned_datas())?);
    let unsigned_raw = unsigned.transaction_raw()?;
    println!("Transaction Raw: {}", unsigned_raw);

    let solver = FundSolver::new(&xprivate_key, Some(DEFAULT_PATH))?.into();
    let signed = unsigned.sign(&solver)?;
    println!("\n=== Signed Fund Transaction ===");
    println!("Signatures: {:?}", signed.signatures());
    println!("Transaction Raw: {}", signed.transaction_raw()?);

    let signature = Signature::new(CHAIN, NETWORK)?.sign(&unsigned_raw, &solver)?;
    println!("\n=== Fund Signature ===");
    println!("Type: {}", signature.transaction_type());
    println!("Transaction Raw: {}", signature.transaction_raw()?);

    assert_eq!(signed.transaction_raw()?, signature.transaction_raw()?);

    // let submitted = swap::bytom::submit_transaction_raw(&api, &signed.transaction_raw()?, CHAIN).await?;
    // println!("Submitted: {}", serde_json::to_string_pretty(&submitted)?);
    Ok(())
}
