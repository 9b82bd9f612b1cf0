//! Bytom/Vapor Solvers
//!
//! Blockcenter returns, for every input, the messages that input has to
//! sign. A solver turns those into the witness arguments the Blockcenter
//! expects: plain signatures for wallet inputs, and the contract clause
//! arguments for the HTLC input.

use bitcoin::hashes::{sha256, Hash};

use crate::bytom::chainkd::XPrv;
use crate::bytom::htlc::Htlc;
use crate::bytom::wallet::signing_key;
use crate::common::{Result, SwapError};
use crate::transaction_raw::{TransactionKind, UnsignedData};

/// Spending conditions for a transaction
#[derive(Debug, Clone)]
pub enum Solver {
    Fund(FundSolver),
    Claim(ClaimSolver),
    Refund(RefundSolver),
}

/// Signs wallet inputs
#[derive(Debug, Clone)]
pub struct FundSolver {
    xprivate_key: XPrv,
    path: Option<String>,
}

/// Spends the HTLC with the secret
#[derive(Debug, Clone)]
pub struct ClaimSolver {
    xprivate_key: XPrv,
    path: Option<String>,
    secret: Vec<u8>,
}

/// Spends the HTLC after its sequence
#[derive(Debug, Clone)]
pub struct RefundSolver {
    xprivate_key: XPrv,
    path: Option<String>,
}

/// Check that the key at `path` is the one the HTLC names
fn check_key(xprivate_key: &XPrv, path: Option<&str>, expected: &str, role: &str) -> Result<()> {
    let public_key = hex::encode(signing_key(xprivate_key, path)?.xpub()?.public_key());
    if public_key != expected {
        return Err(SwapError::solver(format!(
            "Key at {} is not the HTLC {} key.",
            path.unwrap_or("the default path"),
            role
        )));
    }
    Ok(())
}

impl FundSolver {
    /// `path` is used for unsigned datas that carry none
    pub fn new(xprivate_key: &str, path: Option<&str>) -> Result<Self> {
        Ok(Self {
            xprivate_key: XPrv::from_hex(xprivate_key)?,
            path: path.map(str::to_string),
        })
    }
}

impl ClaimSolver {
    /// `secret` is the preimage of the HTLC secret hash, `path` selects the recipient key
    pub fn new(xprivate_key: &str, secret: &str, htlc: &Htlc, path: Option<&str>) -> Result<Self> {
        let xprivate_key = XPrv::from_hex(xprivate_key)?;
        let digest = sha256::Hash::hash(secret.as_bytes());
        if hex::encode(digest.as_byte_array()) != htlc.secret_hash() {
            return Err(SwapError::solver(
                "Secret does not match the HTLC secret hash.",
            ));
        }
        check_key(&xprivate_key, path, &htlc.recipient_public_key(), "recipient")?;
        Ok(Self {
            xprivate_key,
            path: path.map(str::to_string),
            secret: secret.as_bytes().to_vec(),
        })
    }
}

impl RefundSolver {
    /// `path` selects the sender key
    pub fn new(xprivate_key: &str, htlc: &Htlc, path: Option<&str>) -> Result<Self> {
        let xprivate_key = XPrv::from_hex(xprivate_key)?;
        check_key(&xprivate_key, path, &htlc.sender_public_key(), "sender")?;
        Ok(Self {
            xprivate_key,
            path: path.map(str::to_string),
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

/// Sign every message of `data` with the key at `path`
fn sign_data(xprivate_key: &XPrv, path: Option<&str>, data: &UnsignedData) -> Result<Vec<String>> {
    let key = signing_key(xprivate_key, path)?;
    if let Some(expected) = &data.public_key {
        let public_key = hex::encode(key.xpub()?.public_key());
        if &public_key != expected {
            return Err(SwapError::solver(format!(
                "Wrong xprivate key, expected public key {}.",
                expected
            )));
        }
    }
    data.datas
        .iter()
        .map(|message| {
            let message = hex::decode(message)?;
            Ok(hex::encode(key.sign(&message)?))
        })
        .collect()
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

    fn key(&self) -> (&XPrv, Option<&str>) {
        match self {
            Solver::Fund(s) => (&s.xprivate_key, s.path.as_deref()),
            Solver::Claim(s) => (&s.xprivate_key, s.path.as_deref()),
            Solver::Refund(s) => (&s.xprivate_key, s.path.as_deref()),
        }
    }

    /// Witness arguments for every unsigned data, in order.
    ///
    /// The HTLC input is the first unsigned data without a derivation
    /// path; every other input is a wallet input.
    pub(crate) fn solve(&self, unsigned_datas: &[UnsignedData]) -> Result<Vec<Vec<String>>> {
        let (xprivate_key, default_path) = self.key();
        let contract_input = match self {
            Solver::Fund(_) => None,
            _ => Some(
                unsigned_datas
                    .iter()
                    .position(|data| data.path.is_none())
                    .ok_or_else(|| SwapError::solver("Transaction has no HTLC input to unlock."))?,
            ),
        };

        unsigned_datas
            .iter()
            .enumerate()
            .map(|(index, data)| {
                if Some(index) != contract_input {
                    let path = data.path.as_deref().or(default_path);
                    return sign_data(xprivate_key, path, data);
                }
                let signature = sign_data(xprivate_key, default_path, data)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| SwapError::solver("HTLC input has nothing to sign."))?;
                Ok(match self {
                    Solver::Claim(s) => vec![hex::encode(&s.secret), signature, String::new()],
                    _ => vec![signature, "01".to_string()],
                })
            })
            .collect()
    }
}
