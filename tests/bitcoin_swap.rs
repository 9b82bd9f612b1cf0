//! Bitcoin swap end to end: fund, submit, then claim or refund the HTLC

mod common;

use common::{FakeBitcoin, BITCOIN_SECRET_HASH, SECRET};
use swap::bitcoin::{
    decode_transaction_raw, submit_transaction_raw, ClaimSolver, FundSolver, Htlc, OutputInfo,
    RefundSolver, Signature, TransactionBuilder, UtxoInfo, Wallet,
};
use swap::{Network, SpendAmount, TransactionKind};

const NETWORK: Network = Network::Testnet;

fn sender() -> Wallet {
    Wallet::from_passphrase("meheret tesfaye batu bayou", NETWORK).unwrap()
}

fn recipient() -> Wallet {
    Wallet::from_passphrase("meheret", NETWORK).unwrap()
}

fn htlc() -> Htlc {
    Htlc::build(BITCOIN_SECRET_HASH, &recipient().address(), &sender().address(), 1000, NETWORK).unwrap()
}

/// Fund the HTLC and return the chain with the funded transaction confirmed
async fn funded_chain() -> (FakeBitcoin, String) {
    let sender = sender();
    let chain = FakeBitcoin::default().with_utxos(
        &sender.address(),
        vec![UtxoInfo {
            txid: "11".repeat(32),
            vout: 0,
            value: 50_000,
            block_height: Some(2_000_000),
        }],
    );

    let unsigned = TransactionBuilder::new(&chain, NETWORK)
        .unwrap()
        .fund(&sender.address(), &htlc(), 10_000)
        .await
        .unwrap();
    let signed = Signature::new(NETWORK)
        .unwrap()
        .sign(&unsigned.transaction_raw().unwrap(), &FundSolver::new(&sender).unwrap().into())
        .unwrap();

    let submitted = submit_transaction_raw(&chain, &signed.transaction_raw().unwrap())
        .await
        .unwrap();
    assert_eq!(submitted.transaction_type.kind, TransactionKind::Fund);
    assert_eq!(chain.broadcasts.lock().unwrap().as_slice(), [signed.raw()]);

    let decoded = decode_transaction_raw(&signed.transaction_raw().unwrap()).unwrap();
    let outputs = decoded
        .tx
        .outputs
        .iter()
        .map(|output| OutputInfo {
            scriptpubkey: output.script.clone(),
            scriptpubkey_type: None,
            scriptpubkey_address: output.address.clone(),
            value: output.value,
        })
        .collect();
    let txid = decoded.tx.txid.clone();
    (chain.with_transaction(&txid, outputs), txid)
}

#[tokio::test]
async fn test_fund_and_claim() {
    let (chain, txid) = funded_chain().await;
    let recipient = recipient();

    let unsigned = TransactionBuilder::new(&chain, NETWORK)
        .unwrap()
        .claim(&txid, &recipient.address(), &htlc(), SpendAmount::Max)
        .await
        .unwrap();
    assert_eq!(unsigned.transaction_type().to_string(), "bitcoin_claim_unsigned");
    assert_eq!(unsigned.fee(), 576);

    let solver = ClaimSolver::new(&recipient, SECRET, htlc()).unwrap().into();
    let signed = Signature::new(NETWORK)
        .unwrap()
        .sign(&unsigned.transaction_raw().unwrap(), &solver)
        .unwrap();
    assert_eq!(
        signed.transaction_raw().unwrap(),
        unsigned.sign(&solver).unwrap().transaction_raw().unwrap()
    );

    let decoded = decode_transaction_raw(&signed.transaction_raw().unwrap()).unwrap();
    assert_eq!(decoded.transaction_type.to_string(), "bitcoin_claim_signed");
    assert_eq!(decoded.tx.inputs[0].txid, txid);
    assert_eq!(decoded.tx.inputs[0].sequence, 0xffff_ffff);
    assert!(decoded.tx.inputs[0]
        .script_sig
        .contains(&hex::encode(SECRET.as_bytes())));
    assert_eq!(decoded.tx.outputs.len(), 1);
    assert_eq!(decoded.tx.outputs[0].value, 10_000 - 576);
    assert_eq!(decoded.tx.outputs[0].address.as_deref(), Some(recipient.address().as_str()));
}

#[tokio::test]
async fn test_fund_and_refund() {
    let (chain, txid) = funded_chain().await;
    let sender = sender();

    let unsigned = TransactionBuilder::new(&chain, NETWORK)
        .unwrap()
        .refund(&txid, &sender.address(), &htlc(), SpendAmount::Exact(4_000))
        .await
        .unwrap();
    let signed = unsigned
        .sign(&RefundSolver::new(&sender, htlc()).unwrap().into())
        .unwrap();

    let decoded = decode_transaction_raw(&signed.transaction_raw().unwrap()).unwrap();
    assert_eq!(decoded.tx.inputs[0].sequence, 1000);
    assert_eq!(decoded.tx.outputs[0].value, 4_000);
    // the remainder is locked back into the same HTLC
    assert_eq!(
        decoded.tx.outputs[1].script,
        hex::encode(htlc().script_pubkey().as_bytes())
    );
    assert_eq!(decoded.fee + decoded.tx.outputs[0].value + decoded.tx.outputs[1].value, 10_000);
}

#[tokio::test]
async fn test_wrong_party_cannot_sign() {
    let (chain, txid) = funded_chain().await;

    let unsigned = TransactionBuilder::new(&chain, NETWORK)
        .unwrap()
        .claim(&txid, &recipient().address(), &htlc(), SpendAmount::Max)
        .await
        .unwrap();

    assert!(ClaimSolver::new(&recipient(), "wrong secret", htlc()).is_err());
    // the secret alone is not enough without the recipient key
    assert!(ClaimSolver::new(&sender(), SECRET, htlc()).is_err());

    let refund = RefundSolver::new(&sender(), htlc()).unwrap().into();
    let err = Signature::new(NETWORK)
        .unwrap()
        .sign(&unsigned.transaction_raw().unwrap(), &refund)
        .unwrap_err();
    assert_eq!(err.error_code(), "SOLVER_ERROR");
}

#[tokio::test]
async fn test_claim_unknown_transaction() {
    let chain = FakeBitcoin::default();
    let err = TransactionBuilder::new(&chain, NETWORK)
        .unwrap()
        .claim(&"00".repeat(32), &recipient().address(), &htlc(), SpendAmount::Max)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "API_ERROR");
}
