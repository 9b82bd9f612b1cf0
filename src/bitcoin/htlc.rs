//! Bitcoin Hash Time Lock Contract
//!
//! Legacy P2SH redeem script:
//!
//! ```text
//! OP_IF
//!   OP_HASH256 <secret_hash> OP_EQUALVERIFY
//!   OP_DUP OP_HASH160 <recipient_hash160> OP_EQUALVERIFY OP_CHECKSIG
//! OP_ELSE
//!   <sequence> OP_CSV OP_DROP
//!   OP_DUP OP_HASH160 <sender_hash160> OP_EQUALVERIFY OP_CHECKSIG
//! OP_ENDIF
//! ```

use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CSV, OP_DROP, OP_DUP, OP_ELSE, OP_ENDIF, OP_EQUALVERIFY, OP_HASH160, OP_HASH256,
    OP_IF, OP_PUSHNUM_1, OP_PUSHNUM_16,
};
use bitcoin::script::{Builder, Instruction};
use bitcoin::{Address, PubkeyHash, ScriptBuf};

use crate::bitcoin::utils::parse_address;
use crate::common::{Chain, Network, Result, SwapError};

/// Bitcoin HTLC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Htlc {
    script: ScriptBuf,
    secret_hash: [u8; 32],
    recipient: PubkeyHash,
    sender: PubkeyHash,
    sequence: u32,
    network: Network,
}

impl Htlc {
    /// Build an HTLC from a secret hash and the two parties' P2PKH addresses
    ///
    /// `secret_hash` is checked on chain with OP_HASH256, so claiming needs
    /// a secret whose double SHA-256 equals it.
    pub fn build(
        secret_hash: &str,
        recipient_address: &str,
        sender_address: &str,
        sequence: u32,
        network: Network,
    ) -> Result<Self> {
        let network = Chain::Bitcoin.check_network(network)?;
        let secret_hash = parse_secret_hash(secret_hash)?;
        let recipient = pubkey_hash(recipient_address, "recipient", network)?;
        let sender = pubkey_hash(sender_address, "sender", network)?;
        Ok(Self::from_parts(secret_hash, recipient, sender, sequence, network))
    }

    /// Parse an HTLC back from its redeem script
    pub fn from_bytecode(bytecode: &str, network: Network) -> Result<Self> {
        let network = Chain::Bitcoin.check_network(network)?;
        let invalid = || SwapError::htlc("Invalid Bitcoin HTLC bytecode.");
        let script = ScriptBuf::from_hex(bytecode).map_err(|_| invalid())?;
        let instructions = script
            .instructions()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        if instructions.len() != 19 {
            return Err(invalid());
        }

        let push = |index: usize| match instructions[index] {
            Instruction::PushBytes(bytes) => Some(bytes.as_bytes()),
            Instruction::Op(_) => None,
        };
        let secret_hash: [u8; 32] = push(2)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(invalid)?;
        let recipient = push(6)
            .and_then(|bytes| PubkeyHash::from_slice(bytes).ok())
            .ok_or_else(invalid)?;
        let sender = push(15)
            .and_then(|bytes| PubkeyHash::from_slice(bytes).ok())
            .ok_or_else(invalid)?;
        let sequence = match instructions[10] {
            Instruction::PushBytes(bytes) => read_sequence(bytes.as_bytes()),
            Instruction::Op(op)
                if op.to_u8() >= OP_PUSHNUM_1.to_u8() && op.to_u8() <= OP_PUSHNUM_16.to_u8() =>
            {
                Some((op.to_u8() - OP_PUSHNUM_1.to_u8() + 1) as u32)
            }
            Instruction::Op(_) => None,
        }
        .ok_or_else(invalid)?;

        let htlc = Self::from_parts(secret_hash, recipient, sender, sequence, network);
        if htlc.script != script {
            return Err(invalid());
        }
        Ok(htlc)
    }

    fn from_parts(
        secret_hash: [u8; 32],
        recipient: PubkeyHash,
        sender: PubkeyHash,
        sequence: u32,
        network: Network,
    ) -> Self {
        let script = Builder::new()
            .push_opcode(OP_IF)
            .push_opcode(OP_HASH256)
            .push_slice(secret_hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(recipient.to_byte_array())
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ELSE)
            .push_int(sequence as i64)
            .push_opcode(OP_CSV)
            .push_opcode(OP_DROP)
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(sender.to_byte_array())
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ENDIF)
            .into_script();

        Self {
            script,
            secret_hash,
            recipient,
            sender,
            sequence,
            network,
        }
    }

    /// Redeem script hex
    pub fn bytecode(&self) -> String {
        hex::encode(self.script.as_bytes())
    }

    /// Redeem script assembly
    pub fn opcode(&self) -> String {
        self.script.to_asm_string()
    }

    /// Redeem script hash160 hex
    pub fn hash(&self) -> String {
        self.script.script_hash().to_string()
    }

    /// P2SH address
    pub fn address(&self) -> Result<Address> {
        Address::p2sh(&self.script, self.network.bitcoin_network()).map_err(SwapError::bitcoin)
    }

    /// P2SH script pubkey
    pub fn script_pubkey(&self) -> ScriptBuf {
        ScriptBuf::new_p2sh(&self.script.script_hash())
    }

    pub fn redeem_script(&self) -> &ScriptBuf {
        &self.script
    }

    pub fn secret_hash(&self) -> &[u8; 32] {
        &self.secret_hash
    }

    pub fn recipient_hash(&self) -> PubkeyHash {
        self.recipient
    }

    pub fn sender_hash(&self) -> PubkeyHash {
        self.sender
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

fn parse_secret_hash(secret_hash: &str) -> Result<[u8; 32]> {
    hex::decode(secret_hash)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| SwapError::htlc(format!("Invalid secret hash '{}', must be 32 bytes hex.", secret_hash)))
}

fn pubkey_hash(address: &str, role: &str, network: Network) -> Result<PubkeyHash> {
    parse_address(address, network)
        .ok()
        .and_then(|parsed| parsed.pubkey_hash())
        .ok_or_else(|| SwapError::address(format!("invalid {} {} {} address", network, role, address)))
}

/// Minimal little-endian script number, positive values only
fn read_sequence(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 5 || bytes[bytes.len() - 1] & 0x80 != 0 {
        return None;
    }
    let value = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64);
    u32::try_from(value).ok()
}
