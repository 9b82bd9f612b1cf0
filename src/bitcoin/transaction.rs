//! Bitcoin Fund/Claim/Refund Transactions
//!
//! Builds unsigned HTLC transactions from Esplora chain data and signs them
//! with a [`Solver`].

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::{deserialize_hex, serialize_hex};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness};
use tracing::debug;

use crate::bitcoin::client::BitcoinApi;
use crate::bitcoin::htlc::Htlc;
use crate::bitcoin::solver::Solver;
use crate::bitcoin::utils::{fee_calculator, parse_address, DecodedTx};
use crate::common::{log_transaction_event, Chain, Network, Result, SwapError};
use crate::transaction_raw::{
    self, BitcoinTransactionRaw, PreviousOutput, TransactionKind, TransactionType,
};
use crate::types::SpendAmount;

/// Outputs below this many satoshi are not relayed, so they are left to the fee
pub const DUST_THRESHOLD: u64 = 546;

/// A built Bitcoin transaction, unsigned or signed
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    network: Network,
    transaction_type: TransactionType,
    tx: bitcoin::Transaction,
    previous_outputs: Vec<PreviousOutput>,
    fee: u64,
}

impl Transaction {
    /// Rebuild a transaction from a decoded transaction raw
    pub fn from_envelope(envelope: BitcoinTransactionRaw) -> Result<Self> {
        let tx: bitcoin::Transaction = deserialize_hex(&envelope.raw).map_err(SwapError::bitcoin)?;
        Ok(Self {
            network: envelope.network,
            transaction_type: envelope.transaction_type,
            tx,
            previous_outputs: envelope.outputs,
            fee: envelope.fee,
        })
    }

    /// Fee in satoshi
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Transaction id
    pub fn hash(&self) -> String {
        self.tx.compute_txid().to_string()
    }

    /// Transaction hex
    pub fn raw(&self) -> String {
        serialize_hex(&self.tx)
    }

    pub fn json(&self) -> DecodedTx {
        DecodedTx::new(&self.tx, self.network)
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Previous outputs spent by the inputs
    pub fn outputs(&self) -> &[PreviousOutput] {
        &self.previous_outputs
    }

    pub fn tx(&self) -> &bitcoin::Transaction {
        &self.tx
    }

    /// Base64 transaction raw
    pub fn transaction_raw(&self) -> Result<String> {
        transaction_raw::encode(&BitcoinTransactionRaw {
            fee: self.fee,
            transaction_type: self.transaction_type,
            raw: self.raw(),
            outputs: self.previous_outputs.clone(),
            network: self.network,
        })
    }

    /// Sign with a solver of the same kind
    pub fn sign(&self, solver: &Solver) -> Result<Transaction> {
        if self.transaction_type.is_signed() {
            return Err(SwapError::transaction(format!(
                "Transaction is already signed ({}).",
                self.transaction_type
            )));
        }
        if solver.kind() != self.transaction_type.kind {
            return Err(SwapError::solver(format!(
                "Invalid solver, {} transactions need a {} solver.",
                self.transaction_type.kind.as_str(),
                self.transaction_type.kind.as_str()
            )));
        }

        let mut tx = self.tx.clone();
        solver.solve(&mut tx, &self.previous_outputs)?;

        let signed = Transaction {
            network: self.network,
            transaction_type: self.transaction_type.into_signed(),
            tx,
            previous_outputs: self.previous_outputs.clone(),
            fee: self.fee,
        };
        log_transaction_event(
            Chain::Bitcoin.tag(),
            &signed.transaction_type.to_string(),
            signed.fee,
            Some(&signed.hash()),
            None,
        );
        Ok(signed)
    }
}

/// Builds unsigned HTLC transactions
pub struct TransactionBuilder<'a> {
    api: &'a dyn BitcoinApi,
    network: Network,
    /// Multiplier for the fee calculator
    fee_rate: u64,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(api: &'a dyn BitcoinApi, network: Network) -> Result<Self> {
        let network = Chain::Bitcoin.check_network(network)?;
        Ok(Self {
            api,
            network,
            fee_rate: 1,
        })
    }

    /// Set the fee calculator multiplier
    pub fn with_fee_rate(mut self, fee_rate: u64) -> Self {
        self.fee_rate = fee_rate.max(1);
        self
    }

    fn fee(&self, inputs: usize, outputs: usize) -> u64 {
        fee_calculator(inputs, outputs).saturating_mul(self.fee_rate)
    }

    /// `amount + fee`, or a balance error when it leaves the u64 range
    fn with_fee(&self, amount: u64, fee: u64) -> Result<u64> {
        amount.checked_add(fee).ok_or_else(|| {
            SwapError::balance(format!(
                "Amount {} SATOSHI plus the {} SATOSHI fee overflows.",
                amount, fee
            ))
        })
    }

    /// Lock `amount` satoshi from `sender_address` into the HTLC
    pub async fn fund(&self, sender_address: &str, htlc: &Htlc, amount: u64) -> Result<Transaction> {
        if amount == 0 {
            return Err(SwapError::transaction("Fund amount must be greater than zero."));
        }
        let sender = parse_address(sender_address, self.network)?;
        let sender_script = sender.script_pubkey();
        let utxos = self.api.get_address_utxos(sender_address).await?;

        let mut selected = Vec::new();
        let mut total = 0u64;
        for utxo in utxos {
            total = total.saturating_add(utxo.value);
            selected.push(utxo);
            if total >= self.with_fee(amount, self.fee(selected.len(), 2))? {
                break;
            }
        }

        let mut fee = self.fee(selected.len(), 2);
        let needed = self.with_fee(amount, fee)?;
        if total < needed {
            return Err(SwapError::balance(format!(
                "Insufficient spend UTXO's, you don't have enough amount. You can spend maximum {} SATOSHI amount.",
                total.saturating_sub(fee)
            )));
        }

        let mut inputs = Vec::with_capacity(selected.len());
        let mut previous_outputs = Vec::with_capacity(selected.len());
        for utxo in &selected {
            inputs.push(tx_in(&utxo.txid, utxo.vout, Sequence::MAX)?);
            previous_outputs.push(PreviousOutput {
                amount: utxo.value,
                n: utxo.vout,
                script: hex::encode(sender_script.as_bytes()),
                tx_id: utxo.txid.clone(),
            });
        }

        let mut outputs = vec![TxOut {
            value: Amount::from_sat(amount),
            script_pubkey: htlc.script_pubkey(),
        }];
        let mut change = total - needed;
        if change < DUST_THRESHOLD {
            fee += change;
            change = 0;
        }
        if change > 0 {
            outputs.push(TxOut {
                value: Amount::from_sat(change),
                script_pubkey: sender_script,
            });
        }

        debug!(
            inputs = inputs.len(),
            amount,
            change,
            fee,
            "Built Bitcoin fund transaction"
        );
        Ok(self.finish(TransactionKind::Fund, inputs, outputs, previous_outputs, fee))
    }

    /// Spend the HTLC output of `transaction_id` to the recipient `address`
    pub async fn claim(
        &self,
        transaction_id: &str,
        address: &str,
        htlc: &Htlc,
        amount: SpendAmount,
    ) -> Result<Transaction> {
        self.spend_htlc(TransactionKind::Claim, transaction_id, address, htlc, amount, Sequence::MAX)
            .await
    }

    /// Return the HTLC output of `transaction_id` to the sender `address`
    pub async fn refund(
        &self,
        transaction_id: &str,
        address: &str,
        htlc: &Htlc,
        amount: SpendAmount,
    ) -> Result<Transaction> {
        let sequence = Sequence(htlc.sequence());
        self.spend_htlc(TransactionKind::Refund, transaction_id, address, htlc, amount, sequence)
            .await
    }

    async fn spend_htlc(
        &self,
        kind: TransactionKind,
        transaction_id: &str,
        address: &str,
        htlc: &Htlc,
        amount: SpendAmount,
        sequence: Sequence,
    ) -> Result<Transaction> {
        let destination = parse_address(address, self.network)?;
        let funded = self.api.get_transaction(transaction_id).await?;

        let (n, output) = funded
            .vout
            .iter()
            .enumerate()
            .find(|(_, output)| {
                ScriptBuf::from_hex(&output.scriptpubkey)
                    .map(|script| script.is_p2sh())
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                SwapError::transaction(format!(
                    "Transaction {} has no P2SH output to spend.",
                    transaction_id
                ))
            })?;
        let htlc_script = htlc.script_pubkey();
        if output.scriptpubkey != hex::encode(htlc_script.as_bytes()) {
            return Err(SwapError::transaction(format!(
                "Transaction {} output {} is not locked by HTLC {}.",
                transaction_id,
                n,
                htlc.hash()
            )));
        }

        let value = output.value;
        let mut outputs = Vec::with_capacity(2);
        match amount {
            SpendAmount::Max => {
                let fee = self.fee(1, 1);
                if value <= fee {
                    return Err(SwapError::balance(format!(
                        "HTLC value {} SATOSHI does not cover the {} SATOSHI fee.",
                        value, fee
                    )));
                }
                outputs.push(TxOut {
                    value: Amount::from_sat(value - fee),
                    script_pubkey: destination.script_pubkey(),
                });
            }
            SpendAmount::Exact(amount) => {
                if amount == 0 || self.with_fee(amount, self.fee(1, 1))? > value {
                    return Err(SwapError::balance(format!(
                        "Insufficient HTLC value, you can spend maximum {} SATOSHI amount.",
                        value.saturating_sub(self.fee(1, 1))
                    )));
                }
                outputs.push(TxOut {
                    value: Amount::from_sat(amount),
                    script_pubkey: destination.script_pubkey(),
                });
                // Re-locking a dust remainder would make the transaction non-standard
                let remainder = value.saturating_sub(self.with_fee(amount, self.fee(1, 2))?);
                if remainder >= DUST_THRESHOLD {
                    outputs.push(TxOut {
                        value: Amount::from_sat(remainder),
                        script_pubkey: htlc_script.clone(),
                    });
                }
            }
        }
        let fee = value - outputs.iter().map(|o| o.value.to_sat()).sum::<u64>();

        let inputs = vec![tx_in(transaction_id, n as u32, sequence)?];
        let previous_outputs = vec![PreviousOutput {
            amount: value,
            n: n as u32,
            script: output.scriptpubkey.clone(),
            tx_id: transaction_id.to_string(),
        }];

        debug!(
            kind = kind.as_str(),
            value,
            fee,
            "Built Bitcoin HTLC spend transaction"
        );
        Ok(self.finish(kind, inputs, outputs, previous_outputs, fee))
    }

    fn finish(
        &self,
        kind: TransactionKind,
        inputs: Vec<TxIn>,
        outputs: Vec<TxOut>,
        previous_outputs: Vec<PreviousOutput>,
        fee: u64,
    ) -> Transaction {
        let transaction = Transaction {
            network: self.network,
            transaction_type: TransactionType::unsigned(Chain::Bitcoin, kind),
            tx: bitcoin::Transaction {
                version: Version::TWO,
                lock_time: LockTime::ZERO,
                input: inputs,
                output: outputs,
            },
            previous_outputs,
            fee,
        };
        log_transaction_event(
            Chain::Bitcoin.tag(),
            &transaction.transaction_type.to_string(),
            fee,
            Some(&transaction.hash()),
            None,
        );
        transaction
    }
}

fn tx_in(txid: &str, vout: u32, sequence: Sequence) -> Result<TxIn> {
    let txid = Txid::from_str(txid)
        .map_err(|_| SwapError::transaction(format!("Invalid transaction id '{}'.", txid)))?;
    Ok(TxIn {
        previous_output: OutPoint { txid, vout },
        script_sig: ScriptBuf::new(),
        sequence,
        witness: Witness::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::client::{MockBitcoinApi, OutputInfo, TransactionInfo, UtxoInfo};
    use crate::bitcoin::solver::{ClaimSolver, FundSolver, RefundSolver};
    use crate::bitcoin::wallet::Wallet;

    const SECRET_HASH: &str = "821124b554d13f247b1e5d10b84e44fb1296f18f38bbaa1bea34a12c843e0158";
    const FUND_TXID: &str = "a211d21110756b266925fee2fbf2dc81529beef5e410311b38578dc3a076fb31";
    const SENDER: &str = "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q";
    const RECIPIENT: &str = "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB";

    fn htlc() -> Htlc {
        Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 1000, Network::Testnet).unwrap()
    }

    fn utxo(index: u8, value: u64) -> UtxoInfo {
        UtxoInfo {
            txid: format!("{:02x}", index).repeat(32),
            vout: index as u32,
            value,
            block_height: Some(1_000_000),
        }
    }

    fn funded_api() -> MockBitcoinApi {
        let mut api = MockBitcoinApi::new();
        api.expect_get_transaction().returning(|txid| {
            Ok(TransactionInfo {
                txid: txid.to_string(),
                vout: vec![
                    OutputInfo {
                        scriptpubkey: "76a91464a8390b0b1685fcbf2d4b457118dc8da92d553488ac".to_string(),
                        scriptpubkey_type: Some("p2pkh".to_string()),
                        scriptpubkey_address: Some(SENDER.to_string()),
                        value: 5_000,
                    },
                    OutputInfo {
                        scriptpubkey: "a9142bb013c3e4beb08421dedcf815cb65a5c388178b87".to_string(),
                        scriptpubkey_type: Some("p2sh".to_string()),
                        scriptpubkey_address: Some("2MwEDybGC34949zgzWX4M9FHmE3crDSUydP".to_string()),
                        value: 10_000,
                    },
                ],
            })
        });
        api
    }

    #[tokio::test]
    async fn test_fund_selects_utxos_in_order() {
        let mut api = MockBitcoinApi::new();
        api.expect_get_address_utxos()
            .returning(|_| Ok(vec![utxo(1, 6_000), utxo(2, 6_000), utxo(3, 50_000)]));

        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let transaction = builder.fund(SENDER, &htlc(), 10_000).await.unwrap();

        // two inputs cover 10000 + fee_calculator(2, 2)
        assert_eq!(transaction.fee(), 1122);
        assert_eq!(transaction.tx().input.len(), 2);
        assert_eq!(transaction.tx().output[0].value.to_sat(), 10_000);
        assert_eq!(transaction.tx().output[1].value.to_sat(), 12_000 - 10_000 - 1122);
        assert_eq!(transaction.outputs().len(), 2);
        assert_eq!(transaction.transaction_type().to_string(), "bitcoin_fund_unsigned");
    }

    #[tokio::test]
    async fn test_fund_insufficient_balance() {
        let mut api = MockBitcoinApi::new();
        api.expect_get_address_utxos()
            .returning(|_| Ok(vec![utxo(1, 1_000)]));

        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let err = builder.fund(SENDER, &htlc(), 10_000).await.unwrap_err();
        assert_eq!(err.error_code(), "BALANCE_ERROR");
    }

    #[tokio::test]
    async fn test_fund_amount_overflow() {
        let mut api = MockBitcoinApi::new();
        api.expect_get_address_utxos()
            .returning(|_| Ok(vec![utxo(1, u64::MAX), utxo(2, 6_000)]));

        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let err = builder.fund(SENDER, &htlc(), u64::MAX).await.unwrap_err();
        assert_eq!(err.error_code(), "BALANCE_ERROR");
    }

    #[tokio::test]
    async fn test_fund_dust_change_goes_to_fee() {
        let mut api = MockBitcoinApi::new();
        api.expect_get_address_utxos()
            .returning(|_| Ok(vec![utxo(1, 11_000)]));

        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let transaction = builder.fund(SENDER, &htlc(), 10_000).await.unwrap();

        // 11000 - 10000 - 678 leaves 322 satoshi of change
        assert_eq!(transaction.tx().output.len(), 1);
        assert_eq!(transaction.fee(), 1_000);
    }

    #[tokio::test]
    async fn test_fund_sign_round_trip() {
        let mut api = MockBitcoinApi::new();
        api.expect_get_address_utxos()
            .returning(|_| Ok(vec![utxo(1, 20_000)]));

        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let unsigned = builder.fund(SENDER, &htlc(), 10_000).await.unwrap();

        let sender = Wallet::from_passphrase("meheret tesfaye batu bayou", Network::Testnet).unwrap();
        let signed = unsigned.sign(&FundSolver::new(&sender).unwrap().into()).unwrap();
        assert_eq!(signed.transaction_type().to_string(), "bitcoin_fund_signed");
        assert!(!signed.tx().input[0].script_sig.is_empty());
        assert_ne!(signed.hash(), unsigned.hash());

        let restored = Transaction::from_envelope(
            transaction_raw::decode(&signed.transaction_raw().unwrap(), Chain::Bitcoin).unwrap(),
        )
        .unwrap();
        assert_eq!(restored, signed);

        let err = signed.sign(&FundSolver::new(&sender).unwrap().into()).unwrap_err();
        assert_eq!(err.error_code(), "TRANSACTION_ERROR");
    }

    #[tokio::test]
    async fn test_claim_max_amount() {
        let api = funded_api();
        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let unsigned = builder
            .claim(FUND_TXID, RECIPIENT, &htlc(), SpendAmount::Max)
            .await
            .unwrap();

        assert_eq!(unsigned.fee(), 576);
        assert_eq!(unsigned.tx().output.len(), 1);
        assert_eq!(unsigned.tx().output[0].value.to_sat(), 10_000 - 576);
        assert_eq!(unsigned.tx().input[0].previous_output.vout, 1);

        let recipient = Wallet::from_passphrase("meheret", Network::Testnet).unwrap();
        let solver = ClaimSolver::new(&recipient, "Hello Meheret!", htlc()).unwrap().into();
        let signed = unsigned.sign(&solver).unwrap();
        // <sig> <pubkey> <secret> OP_TRUE <redeem script>
        let script_sig = hex::encode(signed.tx().input[0].script_sig.as_bytes());
        let tail = format!("0e{}514c5d{}", hex::encode("Hello Meheret!"), htlc().bytecode());
        assert!(script_sig.ends_with(&tail));
    }

    #[tokio::test]
    async fn test_claim_exact_amount_relocks_remainder() {
        let api = funded_api();
        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let unsigned = builder
            .claim(FUND_TXID, RECIPIENT, &htlc(), SpendAmount::Exact(4_000))
            .await
            .unwrap();

        assert_eq!(unsigned.tx().output.len(), 2);
        assert_eq!(unsigned.tx().output[1].script_pubkey, htlc().script_pubkey());
        assert_eq!(unsigned.tx().output[1].value.to_sat(), 10_000 - 4_000 - 678);
        assert_eq!(unsigned.fee(), 678);
    }

    #[tokio::test]
    async fn test_refund_uses_htlc_sequence() {
        let api = funded_api();
        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let unsigned = builder
            .refund(FUND_TXID, SENDER, &htlc(), SpendAmount::Max)
            .await
            .unwrap();
        assert_eq!(unsigned.tx().input[0].sequence, Sequence(1000));

        let sender = Wallet::from_passphrase("meheret tesfaye batu bayou", Network::Testnet).unwrap();
        let recipient = Wallet::from_passphrase("meheret", Network::Testnet).unwrap();

        let wrong = ClaimSolver::new(&recipient, "Hello Meheret!", htlc()).unwrap().into();
        assert_eq!(unsigned.sign(&wrong).unwrap_err().error_code(), "SOLVER_ERROR");

        let signed = unsigned
            .sign(&RefundSolver::new(&sender, htlc()).unwrap().into())
            .unwrap();
        assert_eq!(signed.transaction_type().to_string(), "bitcoin_refund_signed");
        // <sig> <pubkey> OP_FALSE <redeem script>
        let script_sig = hex::encode(signed.tx().input[0].script_sig.as_bytes());
        assert!(script_sig.ends_with(&format!("004c5d{}", htlc().bytecode())));
    }

    #[tokio::test]
    async fn test_claim_exact_amount_overflow() {
        let api = funded_api();
        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let err = builder
            .claim(FUND_TXID, RECIPIENT, &htlc(), SpendAmount::Exact(u64::MAX))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "BALANCE_ERROR");
    }

    #[tokio::test]
    async fn test_claim_exact_amount_dust_remainder_goes_to_fee() {
        let api = funded_api();
        let builder = TransactionBuilder::new(&api, Network::Testnet).unwrap();
        let unsigned = builder
            .claim(FUND_TXID, RECIPIENT, &htlc(), SpendAmount::Exact(9_000))
            .await
            .unwrap();

        // 10000 - 9000 - 678 leaves a 322 satoshi remainder
        assert_eq!(unsigned.tx().output.len(), 1);
        assert_eq!(unsigned.tx().output[0].value.to_sat(), 9_000);
        assert_eq!(unsigned.fee(), 1_000);
    }
}
