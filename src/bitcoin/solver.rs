//! Bitcoin Solvers
//!
//! A solver carries what is needed to unlock the inputs of one kind of
//! transaction and fills in their scriptSigs.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::opcodes::all::{OP_PUSHBYTES_0, OP_PUSHNUM_1};
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{PrivateKey, PubkeyHash, PublicKey, ScriptBuf, Sequence, Transaction};

use crate::bitcoin::htlc::Htlc;
use crate::bitcoin::wallet::Wallet;
use crate::common::{Result, SwapError};
use crate::transaction_raw::{PreviousOutput, TransactionKind};

/// Spending conditions for a transaction
#[derive(Debug, Clone)]
pub enum Solver {
    Fund(FundSolver),
    Claim(ClaimSolver),
    Refund(RefundSolver),
}

/// Signs P2PKH wallet inputs
#[derive(Debug, Clone)]
pub struct FundSolver {
    private_key: PrivateKey,
    public_key: PublicKey,
}

/// Spends the HTLC with the secret
#[derive(Debug, Clone)]
pub struct ClaimSolver {
    private_key: PrivateKey,
    public_key: PublicKey,
    secret: Vec<u8>,
    htlc: Htlc,
}

/// Spends the HTLC after its sequence
#[derive(Debug, Clone)]
pub struct RefundSolver {
    private_key: PrivateKey,
    public_key: PublicKey,
    htlc: Htlc,
}

fn signing_key(wallet: &Wallet) -> Result<(PrivateKey, PublicKey)> {
    wallet
        .signing_key()
        .ok_or_else(|| SwapError::solver("Wallet has no private key to sign with."))
}

/// The signing key must be the HTLC party that unlocks this branch
fn check_party(public_key: &PublicKey, expected: PubkeyHash, role: &str) -> Result<()> {
    if public_key.pubkey_hash() != expected {
        return Err(SwapError::solver(format!(
            "Wallet key hash {} is not the HTLC {} hash {}.",
            public_key.pubkey_hash(),
            role,
            expected
        )));
    }
    Ok(())
}

impl FundSolver {
    pub fn new(wallet: &Wallet) -> Result<Self> {
        let (private_key, public_key) = signing_key(wallet)?;
        Ok(Self {
            private_key,
            public_key,
        })
    }
}

impl ClaimSolver {
    /// `secret` is the preimage of the HTLC secret hash under double SHA-256
    pub fn new(wallet: &Wallet, secret: &str, htlc: Htlc) -> Result<Self> {
        let (private_key, public_key) = signing_key(wallet)?;
        check_party(&public_key, htlc.recipient_hash(), "recipient")?;
        let digest = sha256d::Hash::hash(secret.as_bytes());
        if digest.as_byte_array() != htlc.secret_hash() {
            return Err(SwapError::solver(
                "Secret does not match the HTLC secret hash.",
            ));
        }
        Ok(Self {
            private_key,
            public_key,
            secret: secret.as_bytes().to_vec(),
            htlc,
        })
    }
}

impl RefundSolver {
    pub fn new(wallet: &Wallet, htlc: Htlc) -> Result<Self> {
        let (private_key, public_key) = signing_key(wallet)?;
        check_party(&public_key, htlc.sender_hash(), "sender")?;
        Ok(Self {
            private_key,
            public_key,
            htlc,
        })
    }
}

impl From<FundSolver> for Solver {
    fn from(solver: FundSolver) -> Self {
        Solver::Fund(solver)
    }
}

impl From<ClaimSolver> for Solver {
    fn from(solver: ClaimSolver) -> Self {
        Solver::Claim(solver)
    }
}

impl From<RefundSolver> for Solver {
    fn from(solver: RefundSolver) -> Self {
        Solver::Refund(solver)
    }
}

impl Solver {
    /// Kind of transaction this solver unlocks
    pub fn kind(&self) -> TransactionKind {
        match self {
            Solver::Fund(_) => TransactionKind::Fund,
            Solver::Claim(_) => TransactionKind::Claim,
            Solver::Refund(_) => TransactionKind::Refund,
        }
    }

    fn keys(&self) -> (&PrivateKey, &PublicKey) {
        match self {
            Solver::Fund(s) => (&s.private_key, &s.public_key),
            Solver::Claim(s) => (&s.private_key, &s.public_key),
            Solver::Refund(s) => (&s.private_key, &s.public_key),
        }
    }

    fn htlc(&self) -> Option<&Htlc> {
        match self {
            Solver::Fund(_) => None,
            Solver::Claim(s) => Some(&s.htlc),
            Solver::Refund(s) => Some(&s.htlc),
        }
    }

    /// Sign every input of `tx` and fill in its scriptSig
    pub(crate) fn solve(&self, tx: &mut Transaction, previous_outputs: &[PreviousOutput]) -> Result<()> {
        if previous_outputs.len() != tx.input.len() {
            return Err(SwapError::solver("Previous outputs do not match transaction inputs."));
        }

        let script_codes = previous_outputs
            .iter()
            .map(|output| self.script_code(output))
            .collect::<Result<Vec<_>>>()?;

        if let Solver::Refund(solver) = self {
            let expected = Sequence(solver.htlc.sequence());
            if tx.input.iter().any(|input| input.sequence != expected) {
                return Err(SwapError::solver(format!(
                    "Refund input sequence must be {}.",
                    solver.htlc.sequence()
                )));
            }
        }

        let secp = Secp256k1::signing_only();
        let (private_key, public_key) = self.keys();
        let sighash_type = EcdsaSighashType::All;

        let mut signatures = Vec::with_capacity(script_codes.len());
        {
            let cache = SighashCache::new(&*tx);
            for (index, script_code) in script_codes.iter().enumerate() {
                let sighash = cache
                    .legacy_signature_hash(index, script_code, sighash_type.to_u32())
                    .map_err(SwapError::bitcoin)?;
                let message = Message::from_digest(sighash.to_byte_array());
                let signature = bitcoin::ecdsa::Signature {
                    signature: secp.sign_ecdsa(&message, &private_key.inner),
                    sighash_type,
                };
                signatures.push(signature);
            }
        }

        for (input, signature) in tx.input.iter_mut().zip(signatures) {
            input.script_sig = self.script_sig(&signature, public_key)?;
        }
        Ok(())
    }

    fn script_code(&self, output: &PreviousOutput) -> Result<ScriptBuf> {
        let script_pubkey = ScriptBuf::from_hex(&output.script).map_err(SwapError::bitcoin)?;
        match self.htlc() {
            None => {
                if !script_pubkey.is_p2pkh() {
                    return Err(SwapError::solver(format!(
                        "Fund solver can only sign P2PKH inputs, got {}:{}.",
                        output.tx_id, output.n
                    )));
                }
                Ok(script_pubkey)
            }
            Some(htlc) => {
                if script_pubkey != htlc.script_pubkey() {
                    return Err(SwapError::solver(format!(
                        "Input {}:{} is not locked by this HTLC.",
                        output.tx_id, output.n
                    )));
                }
                Ok(htlc.redeem_script().clone())
            }
        }
    }

    fn script_sig(&self, signature: &bitcoin::ecdsa::Signature, public_key: &PublicKey) -> Result<ScriptBuf> {
        let signature = PushBytesBuf::try_from(signature.to_vec()).map_err(SwapError::bitcoin)?;
        let builder = Builder::new().push_slice(signature).push_key(public_key);
        let builder = match self {
            Solver::Fund(_) => builder,
            Solver::Claim(solver) => {
                let secret = PushBytesBuf::try_from(solver.secret.clone()).map_err(SwapError::bitcoin)?;
                let redeem = redeem_push(&solver.htlc)?;
                builder
                    .push_slice(secret)
                    .push_opcode(OP_PUSHNUM_1)
                    .push_slice(redeem)
            }
            Solver::Refund(solver) => {
                let redeem = redeem_push(&solver.htlc)?;
                builder.push_opcode(OP_PUSHBYTES_0).push_slice(redeem)
            }
        };
        Ok(builder.into_script())
    }
}

fn redeem_push(htlc: &Htlc) -> Result<PushBytesBuf> {
    PushBytesBuf::try_from(htlc.redeem_script().to_bytes()).map_err(SwapError::bitcoin)
}
