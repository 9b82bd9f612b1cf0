//! Bytom/Vapor HTLC
//!
//! The contract takes four arguments pushed in front of a fixed body:
//! the relative block lock, the sender's and the recipient's ed25519 public
//! keys, and the SHA-256 secret hash. The recipient unlocks it with the
//! secret preimage and a signature; after the lock the sender unlocks it
//! with a signature alone.

use sha3::{Digest, Sha3_256};

use crate::bytom::utils::encode_address;
use crate::common::{Chain, Network, Result, SwapError};

/// Compiled contract body
pub const HTLC_BODY: [u8; 35] = [
    0x74, 0x1f, 0x54, 0x7a, 0x64, 0x16, 0x00, 0x00, 0x00, 0x55, 0x7a, 0xa8, 0x88, 0x53, 0x7a,
    0x7c, 0xae, 0x7c, 0xac, 0x63, 0x1f, 0x00, 0x00, 0x00, 0x53, 0x7a, 0xcd, 0x9f, 0x69, 0x72,
    0xae, 0x7c, 0xac, 0x00, 0xc0,
];

const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;
const OP_PUSHDATA1: u8 = 0x4c;

/// Push an integer: OP_1..OP_16 or minimal little-endian bytes
fn push_int(script: &mut Vec<u8>, value: u64) {
    match value {
        0 => script.push(0x00),
        1..=16 => script.push(OP_1 + (value as u8) - 1),
        _ => {
            let bytes = value.to_le_bytes();
            let len = 8 - bytes.iter().rev().take_while(|b| **b == 0).count();
            push_data(script, &bytes[..len]);
        }
    }
}

fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    if data.len() < OP_PUSHDATA1 as usize {
        script.push(data.len() as u8);
    } else {
        script.push(OP_PUSHDATA1);
        script.push(data.len() as u8);
    }
    script.extend_from_slice(data);
}

fn parse_hex32(value: &str, name: &str) -> Result<[u8; 32]> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| SwapError::htlc(format!("Invalid {} '{}', must be 32 bytes hex.", name, value)))
}

/// Reads pushes back out of compiled bytecode
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn int(&mut self) -> Option<u64> {
        let (&op, rest) = self.bytes.split_first()?;
        if (OP_1..=OP_16).contains(&op) {
            self.bytes = rest;
            return Some((op - OP_1 + 1) as u64);
        }
        let data = self.data()?;
        if data.len() > 8 {
            return None;
        }
        let mut le = [0u8; 8];
        le[..data.len()].copy_from_slice(data);
        Some(u64::from_le_bytes(le))
    }

    fn data(&mut self) -> Option<&'a [u8]> {
        let (&len, rest) = self.bytes.split_first()?;
        let (len, rest) = if len == OP_PUSHDATA1 {
            let (&len, rest) = rest.split_first()?;
            (len as usize, rest)
        } else if len < OP_PUSHDATA1 {
            (len as usize, rest)
        } else {
            return None;
        };
        if rest.len() < len {
            return None;
        }
        let (data, rest) = rest.split_at(len);
        self.bytes = rest;
        Some(data)
    }

    fn key(&mut self) -> Option<[u8; 32]> {
        self.data()?.try_into().ok()
    }
}

/// Hash Time Lock Contract for Bytom and Vapor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Htlc {
    chain: Chain,
    network: Network,
    secret_hash: [u8; 32],
    recipient_public_key: [u8; 32],
    sender_public_key: [u8; 32],
    sequence: u64,
    bytecode: Vec<u8>,
}

impl Htlc {
    /// Compile an HTLC
    pub fn build(
        secret_hash: &str,
        recipient_public_key: &str,
        sender_public_key: &str,
        sequence: u64,
        chain: Chain,
        network: Network,
    ) -> Result<Self> {
        let network = chain.check_network(network)?;
        Ok(Self::assemble(
            parse_hex32(secret_hash, "secret hash")?,
            parse_hex32(recipient_public_key, "recipient public key")?,
            parse_hex32(sender_public_key, "sender public key")?,
            sequence,
            chain,
            network,
        ))
    }

    fn assemble(
        secret_hash: [u8; 32],
        recipient_public_key: [u8; 32],
        sender_public_key: [u8; 32],
        sequence: u64,
        chain: Chain,
        network: Network,
    ) -> Self {
        let mut bytecode = Vec::with_capacity(140);
        push_int(&mut bytecode, sequence);
        push_data(&mut bytecode, &sender_public_key);
        push_data(&mut bytecode, &recipient_public_key);
        push_data(&mut bytecode, &secret_hash);
        bytecode.extend_from_slice(&HTLC_BODY);

        Self {
            chain,
            network,
            secret_hash,
            recipient_public_key,
            sender_public_key,
            sequence,
            bytecode,
        }
    }

    /// Recover an HTLC from its bytecode
    pub fn from_bytecode(bytecode: &str, chain: Chain, network: Network) -> Result<Self> {
        let network = chain.check_network(network)?;
        let invalid = || SwapError::htlc(format!("Invalid {} HTLC bytecode.", chain));
        let bytes = hex::decode(bytecode).map_err(|_| invalid())?;

        let mut reader = Reader { bytes: &bytes };
        let sequence = reader.int().ok_or_else(invalid)?;
        let sender = reader.key().ok_or_else(invalid)?;
        let recipient = reader.key().ok_or_else(invalid)?;
        let secret_hash = reader.key().ok_or_else(invalid)?;
        if reader.bytes != HTLC_BODY {
            return Err(invalid());
        }

        let htlc = Self::assemble(secret_hash, recipient, sender, sequence, chain, network);
        if htlc.bytecode != bytes {
            return Err(invalid());
        }
        Ok(htlc)
    }

    /// Bytecode hex
    pub fn bytecode(&self) -> String {
        hex::encode(&self.bytecode)
    }

    /// SHA3-256 of the bytecode, the P2WSH witness program
    pub fn hash(&self) -> String {
        hex::encode(self.program_hash())
    }

    fn program_hash(&self) -> [u8; 32] {
        Sha3_256::digest(&self.bytecode).into()
    }

    /// Control program that locks funds to this HTLC
    pub fn program(&self) -> String {
        format!("0020{}", self.hash())
    }

    /// P2WSH address
    pub fn address(&self) -> Result<String> {
        encode_address(&self.program_hash(), self.chain, self.network)
    }

    pub fn secret_hash(&self) -> String {
        hex::encode(self.secret_hash)
    }

    pub fn recipient_public_key(&self) -> String {
        hex::encode(self.recipient_public_key)
    }

    pub fn sender_public_key(&self) -> String {
        hex::encode(self.sender_public_key)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_HASH: &str = "3a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb";
    const RECIPIENT: &str = "3e0a377ae4afa031d4551599d9bb7d5b27f4736d77f78cac4d476f0ffba5ae3e";
    const SENDER: &str = "91ff7f525ff40874c4f47f0cab42e46e3bf53adad59adef9558ad1b6448f22e2";
    const BYTECODE: &str = "02e8032091ff7f525ff40874c4f47f0cab42e46e3bf53adad59adef9558ad1b6448f22e2203e0a377ae4afa031d4551599d9bb7d5b27f4736d77f78cac4d476f0ffba5ae3e203a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb741f547a6416000000557aa888537a7cae7cac631f000000537acd9f6972ae7cac00c0";

    #[test]
    fn test_build() {
        let htlc = Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 1000, Chain::Bytom, Network::Mainnet).unwrap();
        assert_eq!(htlc.bytecode(), BYTECODE);
        assert_eq!(
            htlc.hash(),
            "4f8f0e88d0a44b3d884b07b6dd4536518ffcbb596a91ca0e6b2f37e96463bbfc"
        );
        assert_eq!(
            htlc.address().unwrap(),
            "bm1qf78sazxs539nmzztq7md63fk2x8lew6ed2gu5rnt9um7jerrh07q3yf5q8"
        );
        assert_eq!(htlc.program(), format!("0020{}", htlc.hash()));

        let testnet = Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 1000, Chain::Bytom, Network::Testnet).unwrap();
        assert_eq!(
            testnet.address().unwrap(),
            "tm1qf78sazxs539nmzztq7md63fk2x8lew6ed2gu5rnt9um7jerrh07q8spzwr"
        );
        let vapor = Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 1000, Chain::Vapor, Network::Mainnet).unwrap();
        assert_eq!(vapor.bytecode(), BYTECODE);
        assert_eq!(
            vapor.address().unwrap(),
            "vp1qf78sazxs539nmzztq7md63fk2x8lew6ed2gu5rnt9um7jerrh07qcyvk37"
        );
    }

    #[test]
    fn test_body() {
        assert_eq!(
            hex::encode(HTLC_BODY),
            "741f547a6416000000557aa888537a7cae7cac631f000000537acd9f6972ae7cac00c0"
        );
    }

    #[test]
    fn test_sequence_encoding() {
        let small = Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 16, Chain::Bytom, Network::Mainnet).unwrap();
        assert!(small.bytecode().starts_with("6020"));
        let byte = Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 128, Chain::Bytom, Network::Mainnet).unwrap();
        assert!(byte.bytecode().starts_with("018020"));
    }

    #[test]
    fn test_from_bytecode() {
        let htlc = Htlc::from_bytecode(BYTECODE, Chain::Bytom, Network::Mainnet).unwrap();
        assert_eq!(htlc.sequence(), 1000);
        assert_eq!(htlc.secret_hash(), SECRET_HASH);
        assert_eq!(htlc.recipient_public_key(), RECIPIENT);
        assert_eq!(htlc.sender_public_key(), SENDER);

        let tampered = BYTECODE.replace("00c0", "00c1");
        assert!(Htlc::from_bytecode(&tampered, Chain::Bytom, Network::Mainnet).is_err());
        assert!(Htlc::from_bytecode("zz", Chain::Bytom, Network::Mainnet).is_err());
    }

    #[test]
    fn test_invalid_arguments() {
        let err = Htlc::build("3a26", RECIPIENT, SENDER, 1000, Chain::Bytom, Network::Mainnet).unwrap_err();
        assert_eq!(err.error_code(), "HTLC_ERROR");
        let err = Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 1000, Chain::Vapor, Network::Solonet)
            .map(|htlc| htlc.address());
        assert!(err.is_ok());
        assert!(Htlc::build(SECRET_HASH, RECIPIENT, SENDER, 1000, Chain::Bitcoin, Network::Mainnet)
            .and_then(|htlc| htlc.address())
            .is_err());
    }
}
