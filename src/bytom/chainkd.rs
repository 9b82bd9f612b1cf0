//! ChainKD Hierarchical Keys
//!
//! Bytom's ed25519 key derivation. An extended private key is a 32-byte
//! little-endian scalar followed by a 32-byte chain code; the extended
//! public key replaces the scalar with the compressed Edwards point.
//!
//! Curve arithmetic comes from curve25519-dalek and signing from the
//! ed25519-dalek hazmat API. This module only selects, prunes and adds
//! scalars.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::{EdwardsPoint, Scalar};
use ed25519_dalek::hazmat::{raw_sign, ExpandedSecretKey};
use ed25519_dalek::{Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;

use crate::common::SwapError;

type HmacSha512 = Hmac<Sha512>;

/// Default Bytom account path
pub const DEFAULT_PATH: &str = "m/44/153/1/0/1";

/// ChainKD errors
#[derive(Debug, Error)]
pub enum ChainKdError {
    #[error("invalid {0} key, must be 64 bytes hex")]
    InvalidKey(&'static str),

    #[error("invalid derivation path '{0}'")]
    InvalidPath(String),

    #[error("invalid derivation index '{0}', must be 4 bytes hex")]
    InvalidIndex(String),

    #[error("public key is not a valid curve point")]
    InvalidPoint,

    #[error("hardened derivation needs a private key")]
    HardenedFromPublic,

    #[error("HMAC key error")]
    Hmac,
}

impl From<ChainKdError> for SwapError {
    fn from(err: ChainKdError) -> Self {
        SwapError::wallet(err.to_string())
    }
}

/// One derivation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub value: u32,
    pub hardened: bool,
}

impl Index {
    /// Little-endian selector bytes
    pub fn selector(&self) -> [u8; 4] {
        self.value.to_le_bytes()
    }

    /// Selector as hex, the form Blockcenter uses in derivation paths
    pub fn to_hex(&self) -> String {
        hex::encode(self.selector())
    }
}

/// Parse "m/44/153/1/0/1"; components suffixed with `'` or `h` are hardened
pub fn parse_path(path: &str) -> Result<Vec<Index>, ChainKdError> {
    let invalid = || ChainKdError::InvalidPath(path.to_string());
    let mut parts = path.trim().split('/');
    if parts.next() != Some("m") {
        return Err(invalid());
    }
    parts
        .map(|part| {
            let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
                Some(digits) => (digits, true),
                None => (part, false),
            };
            let value = digits.parse::<u32>().map_err(|_| invalid())?;
            Ok(Index { value, hardened })
        })
        .collect()
}

/// Parse hex selectors ("2c000000", ...) into non-hardened indexes
pub fn parse_indexes<S: AsRef<str>>(indexes: &[S]) -> Result<Vec<Index>, ChainKdError> {
    indexes
        .iter()
        .map(|index| {
            let index = index.as_ref();
            let bytes: [u8; 4] = hex::decode(index)
                .ok()
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| ChainKdError::InvalidIndex(index.to_string()))?;
            Ok(Index {
                value: u32::from_le_bytes(bytes),
                hardened: false,
            })
        })
        .collect()
}

/// Render indexes as a path string
pub fn indexes_to_path(indexes: &[Index]) -> String {
    let mut path = String::from("m");
    for index in indexes {
        path.push('/');
        path.push_str(&index.value.to_string());
        if index.hardened {
            path.push('\'');
        }
    }
    path
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 64], ChainKdError> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|_| ChainKdError::Hmac)?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn prune_root_scalar(s: &mut [u8]) {
    s[0] &= 248;
    s[31] &= 31;
    s[31] |= 64;
}

fn prune_intermediate_scalar(s: &mut [u8]) {
    s[0] &= 248;
    s[29] &= 1;
    s[30] = 0;
    s[31] = 0;
}

/// 256-bit little-endian addition, carry out of the top byte is dropped
fn add_scalars(a: &[u8], b: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry = 0u16;
    for i in 0..32 {
        let sum = a[i] as u16 + b[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    out
}

fn scalar_base_point(scalar: &[u8]) -> Result<EdwardsPoint, ChainKdError> {
    let bytes: [u8; 32] = scalar.try_into().map_err(|_| ChainKdError::InvalidKey("scalar"))?;
    Ok(EdwardsPoint::mul_base(&Scalar::from_bytes_mod_order(bytes)))
}

fn parse_key(key: &str, kind: &'static str) -> Result<[u8; 64], ChainKdError> {
    hex::decode(key)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(ChainKdError::InvalidKey(kind))
}

/// Extended private key
#[derive(Clone, PartialEq, Eq)]
pub struct XPrv([u8; 64]);

/// Extended public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XPub([u8; 64]);

impl std::fmt::Debug for XPrv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("XPrv(..)")
    }
}

impl XPrv {
    /// Root key from a seed
    pub fn root(seed: &[u8]) -> Result<Self, ChainKdError> {
        let mut key = hmac_sha512(b"Root", &[seed])?;
        prune_root_scalar(&mut key[..32]);
        Ok(Self(key))
    }

    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(key: &str) -> Result<Self, ChainKdError> {
        parse_key(key, "xprivate").map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn xpub(&self) -> Result<XPub, ChainKdError> {
        let point = scalar_base_point(&self.0[..32])?;
        let mut key = [0u8; 64];
        key[..32].copy_from_slice(point.compress().as_bytes());
        key[32..].copy_from_slice(&self.0[32..]);
        Ok(XPub(key))
    }

    /// Child key for one index
    pub fn child(&self, index: Index) -> Result<XPrv, ChainKdError> {
        let selector = index.selector();
        if index.hardened {
            let mut key = hmac_sha512(&self.0[32..], &[b"H", &self.0[..32], &selector])?;
            prune_root_scalar(&mut key[..32]);
            return Ok(XPrv(key));
        }

        let xpub = self.xpub()?;
        let digest = hmac_sha512(&xpub.0[32..], &[b"N", &xpub.0[..32], &selector])?;
        let mut factor = [0u8; 32];
        factor.copy_from_slice(&digest[..32]);
        prune_intermediate_scalar(&mut factor);

        let mut key = [0u8; 64];
        key[..32].copy_from_slice(&add_scalars(&self.0[..32], &factor));
        key[32..].copy_from_slice(&digest[32..]);
        Ok(XPrv(key))
    }

    pub fn derive(&self, indexes: &[Index]) -> Result<XPrv, ChainKdError> {
        indexes.iter().try_fold(self.clone(), |key, index| key.child(*index))
    }

    /// 64-byte expanded signing key: scalar followed by the nonce prefix
    pub fn expand(&self) -> Result<[u8; 64], ChainKdError> {
        let digest = hmac_sha512(b"Expand", &[&self.0])?;
        let mut expanded = [0u8; 64];
        expanded[..32].copy_from_slice(&self.0[..32]);
        expanded[32..].copy_from_slice(&digest[32..]);
        Ok(expanded)
    }

    /// Ed25519 signature of `message` with the expanded key
    pub fn sign(&self, message: &[u8]) -> Result<[u8; 64], ChainKdError> {
        let esk = ExpandedSecretKey::from_bytes(&self.expand()?);
        let verifying_key = VerifyingKey::from(&esk);
        Ok(raw_sign::<Sha512>(&esk, message, &verifying_key).to_bytes())
    }
}

impl XPub {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(key: &str) -> Result<Self, ChainKdError> {
        parse_key(key, "xpublic").map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// 32-byte ed25519 public key
    pub fn public_key(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        key.copy_from_slice(&self.0[..32]);
        key
    }

    /// Non-hardened child public key
    pub fn child(&self, index: Index) -> Result<XPub, ChainKdError> {
        if index.hardened {
            return Err(ChainKdError::HardenedFromPublic);
        }
        let digest = hmac_sha512(&self.0[32..], &[b"N", &self.0[..32], &index.selector()])?;
        let mut factor = [0u8; 32];
        factor.copy_from_slice(&digest[..32]);
        prune_intermediate_scalar(&mut factor);

        let parent = CompressedEdwardsY(self.public_key())
            .decompress()
            .ok_or(ChainKdError::InvalidPoint)?;
        let point = parent + scalar_base_point(&factor)?;

        let mut key = [0u8; 64];
        key[..32].copy_from_slice(point.compress().as_bytes());
        key[32..].copy_from_slice(&digest[32..]);
        Ok(XPub(key))
    }

    pub fn derive(&self, indexes: &[Index]) -> Result<XPub, ChainKdError> {
        indexes.iter().try_fold(*self, |key, index| key.child(*index))
    }

    /// Verify an ed25519 signature
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        VerifyingKey::from_bytes(&self.public_key())
            .map(|key| {
                key.verify(message, &ed25519_dalek::Signature::from_bytes(signature))
                    .is_ok()
            })
            .unwrap_or(false)
    }
}
