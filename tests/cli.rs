//! `swap` commands run through `execute_with` and in-memory APIs

mod common;

use clap::Parser;

use common::{FakeBitcoin, FakeBlockcenter, FakeConnector, BITCOIN_SECRET_HASH, SECRET_HASH};
use swap::bytom::client::SigningInstruction;
use swap::bitcoin::OutputInfo;
use swap::bytom::BuiltTransaction;
use swap::cli::{execute_with, Cli};
use swap::transaction_raw::{self, BytomTransactionRaw};
use swap::{Chain, Network, SwapConfig, BTM_ASSET};

const SENDER_XPRV: &str = "205b15f70e253399da90b127b074ea02904594be9d54678207872ec1ba31ee51ef4490504bd2b6f997113671892458830de09518e6bd5958d5d5dd97624cfa4b";
const SENDER_PUBLIC_KEY: &str = "91ff7f525ff40874c4f47f0cab42e46e3bf53adad59adef9558ad1b6448f22e2";
const RECIPIENT_PUBLIC_KEY: &str = "3e0a377ae4afa031d4551599d9bb7d5b27f4736d77f78cac4d476f0ffba5ae3e";
const SENDER_ADDRESS: &str = "bm1q9ndylx02syfwd7npehfxz4lddhzqsve2fu6vc7";

fn blockcenter() -> FakeBlockcenter {
    FakeBlockcenter::new(BuiltTransaction {
        raw_transaction: "0701dfd5c8d505010161015f".to_string(),
        signing_instructions: vec![SigningInstruction {
            derivation_path: ["2c000000", "99000000", "01000000", "00000000", "01000000"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sign_data: vec![
                "37727d44af9801e9723eb325592f4d55cc8d7e3815b1d663d61b7f1af9fc13a7".to_string(),
            ],
            pubkey: Some(SENDER_PUBLIC_KEY.to_string()),
        }],
        fee: 10_000_000,
        hash: None,
    })
}

fn connector() -> FakeConnector {
    FakeConnector {
        bitcoin: FakeBitcoin::default,
        blockcenter,
    }
}

async fn run(args: &[&str]) -> swap::Result<String> {
    let cli = Cli::try_parse_from(std::iter::once("swap").chain(args.iter().copied()))
        .expect("arguments should parse");
    execute_with(cli, &SwapConfig::default(), &connector()).await
}

fn bytom_htlc() -> String {
    swap::bytom::Htlc::build(
        SECRET_HASH,
        RECIPIENT_PUBLIC_KEY,
        SENDER_PUBLIC_KEY,
        1000,
        Chain::Bytom,
        Network::Mainnet,
    )
    .unwrap()
    .bytecode()
}

#[tokio::test]
async fn test_htlc_commands() {
    let output = run(&[
        "bitcoin",
        "htlc",
        "--secret-hash",
        SECRET_HASH,
        "--recipient-address",
        "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB",
        "--sender-address",
        "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q",
        "--network",
        "testnet",
    ])
    .await
    .unwrap();
    let expected = swap::bitcoin::Htlc::build(
        SECRET_HASH,
        "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB",
        "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q",
        1000,
        Network::Testnet,
    )
    .unwrap();
    assert_eq!(output, expected.bytecode());

    let output = run(&[
        "bytom",
        "htlc",
        "--secret-hash",
        SECRET_HASH,
        "--recipient-public-key",
        RECIPIENT_PUBLIC_KEY,
        "--sender-public-key",
        SENDER_PUBLIC_KEY,
        "--network",
        "mainnet",
    ])
    .await
    .unwrap();
    assert_eq!(output, bytom_htlc());

    let err = run(&[
        "bytom",
        "htlc",
        "--secret-hash",
        "abcd",
        "--recipient-public-key",
        RECIPIENT_PUBLIC_KEY,
        "--sender-public-key",
        SENDER_PUBLIC_KEY,
        "--network",
        "mainnet",
    ])
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "HTLC_ERROR");
}

#[tokio::test]
async fn test_bytom_fund_then_sign() {
    let bytecode = bytom_htlc();
    let unsigned = run(&[
        "bytom",
        "fund",
        "--address",
        SENDER_ADDRESS,
        "--amount",
        "0.1",
        "--unit",
        "BTM",
        "--bytecode",
        &bytecode,
        "--network",
        "mainnet",
    ])
    .await
    .unwrap();

    let envelope: BytomTransactionRaw = transaction_raw::decode(&unsigned, Chain::Bytom).unwrap();
    assert_eq!(envelope.transaction_type.to_string(), "bytom_fund_unsigned");
    assert_eq!(envelope.address, SENDER_ADDRESS);
    assert_eq!(envelope.unsigned_datas[0].path.as_deref(), Some("m/44/153/1/0/1"));

    let signed = run(&[
        "bytom",
        "sign",
        "--xprivate-key",
        SENDER_XPRV,
        "--transaction-raw",
        &unsigned,
    ])
    .await
    .unwrap();
    let envelope: BytomTransactionRaw = transaction_raw::decode(&signed, Chain::Bytom).unwrap();
    assert_eq!(envelope.transaction_type.to_string(), "bytom_fund_signed");
    assert_eq!(envelope.signatures.len(), 1);

    let submitted = run(&["bytom", "submit", "--transaction-raw", &signed]).await.unwrap();
    let submitted: serde_json::Value = serde_json::from_str(&submitted).unwrap();
    assert_eq!(submitted["transaction_id"], "2".repeat(64));

    // a bytom raw is not a vapor raw
    let err = run(&["vapor", "decode", "--transaction-raw", &signed]).await.unwrap_err();
    assert_eq!(err.error_code(), "TRANSACTION_RAW_ERROR");
}

const FUNDED_TXID: &str = "a211d21110756b266925fee2fbf2dc81529beef5e410311b38578dc3a076fb31";

fn bitcoin_htlc() -> swap::bitcoin::Htlc {
    swap::bitcoin::Htlc::build(
        BITCOIN_SECRET_HASH,
        "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB",
        "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q",
        1000,
        Network::Testnet,
    )
    .unwrap()
}

fn funded_bitcoin() -> FakeBitcoin {
    FakeBitcoin::default().with_transaction(
        FUNDED_TXID,
        vec![OutputInfo {
            scriptpubkey: hex::encode(bitcoin_htlc().script_pubkey().as_bytes()),
            scriptpubkey_type: Some("p2sh".to_string()),
            scriptpubkey_address: Some(bitcoin_htlc().address().unwrap().to_string()),
            value: 10_000,
        }],
    )
}

#[tokio::test]
async fn test_claim_defaults_to_max_amount() {
    let connector = FakeConnector {
        bitcoin: funded_bitcoin,
        blockcenter,
    };
    let claim = |extra: &'static [&'static str]| {
        let bytecode = bitcoin_htlc().bytecode();
        let mut args = vec![
            "swap".to_string(),
            "bitcoin".to_string(),
            "claim".to_string(),
            "--address".to_string(),
            "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB".to_string(),
            "--transaction-id".to_string(),
            FUNDED_TXID.to_string(),
            "--bytecode".to_string(),
            bytecode,
            "--network".to_string(),
            "testnet".to_string(),
        ];
        args.extend(extra.iter().map(|arg| arg.to_string()));
        Cli::try_parse_from(args).expect("arguments should parse")
    };

    let config = SwapConfig::default();
    let default = execute_with(claim(&[]), &config, &connector).await.unwrap();
    let max = execute_with(claim(&["--max-amount"]), &config, &connector).await.unwrap();
    assert_eq!(default, max);

    let decoded = swap::bitcoin::decode_transaction_raw(&default).unwrap();
    assert_eq!(decoded.tx.outputs.len(), 1);
    assert_eq!(decoded.tx.outputs[0].value, 10_000 - 576);

    let exact = execute_with(claim(&["--amount", "4000"]), &config, &connector)
        .await
        .unwrap();
    let decoded = swap::bitcoin::decode_transaction_raw(&exact).unwrap();
    assert_eq!(decoded.tx.outputs[0].value, 4_000);
}

#[tokio::test]
async fn test_sign_claim_requires_secret() {
    let bytecode = bytom_htlc();
    let unsigned = transaction_raw::encode(&BytomTransactionRaw {
        fee: 10_000_000,
        address: SENDER_ADDRESS.to_string(),
        transaction_type: swap::TransactionType::unsigned(Chain::Bytom, swap::TransactionKind::Claim),
        raw: "0701dfd5c8d505010161015f".to_string(),
        hash: None,
        unsigned_datas: Vec::new(),
        signatures: Vec::new(),
        network: Network::Mainnet,
    })
    .unwrap();

    let err = run(&[
        "bytom",
        "sign",
        "--xprivate-key",
        SENDER_XPRV,
        "--transaction-raw",
        &unsigned,
        "--bytecode",
        &bytecode,
    ])
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "SOLVER_ERROR");
}

#[test]
fn test_binary_exit_status() {
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_swap"))
        .args([
            "bitcoin",
            "htlc",
            "--secret-hash",
            "not hex",
            "--recipient-address",
            "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB",
            "--sender-address",
            "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q",
            "--network",
            "testnet",
        ])
        .output()
        .expect("swap binary should run");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr)
        .lines()
        .any(|line| line.starts_with("Error: ")));
    assert!(output.stdout.is_empty());

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_swap"))
        .args([
            "bitcoin",
            "htlc",
            "--secret-hash",
            BITCOIN_SECRET_HASH,
            "--recipient-address",
            "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB",
            "--sender-address",
            "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q",
            "--network",
            "testnet",
        ])
        .output()
        .expect("swap binary should run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), bitcoin_htlc().bytecode());
}
