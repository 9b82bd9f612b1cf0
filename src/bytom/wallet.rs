//! Bytom/Vapor Wallet
//!
//! ChainKD keys from a BIP39 mnemonic, a seed, a root xprivate key or an
//! already derived private key. A wallet built from an xpublic key is
//! watch-only and derives non-hardened children only.
//!
//! Without a derivation the wallet key is the root key itself; call
//! `from_path` (usually with [`DEFAULT_PATH`]) to select the account key.

use bip39::Mnemonic;
use bitcoin::hashes::{ripemd160, Hash};

use crate::bytom::chainkd::{self, Index, XPrv, XPub, DEFAULT_PATH};
use crate::bytom::client::BlockcenterApi;
use crate::bytom::utils::encode_address;
use crate::common::{Chain, Network, Result, SwapError};

/// Bytom or Vapor wallet
#[derive(Debug, Clone)]
pub struct Wallet {
    chain: Chain,
    network: Network,
    mnemonic: Option<String>,
    seed: Option<[u8; 64]>,
    xprivate_key: Option<XPrv>,
    xpublic_key: Option<XPub>,
    indexes: Vec<Index>,
    child_xprivate_key: Option<XPrv>,
    child_xpublic_key: XPub,
}

impl Wallet {
    /// Wallet from a BIP39 mnemonic
    pub fn from_mnemonic(
        mnemonic: &str,
        passphrase: Option<&str>,
        chain: Chain,
        network: Network,
    ) -> Result<Self> {
        let parsed = Mnemonic::parse_normalized(mnemonic)
            .map_err(|e| SwapError::wallet(format!("Invalid mnemonic words: {}", e)))?;
        let seed = parsed.to_seed(passphrase.unwrap_or(""));
        let mut wallet = Self::from_seed(&seed, chain, network)?;
        wallet.mnemonic = Some(parsed.to_string());
        Ok(wallet)
    }

    /// Wallet from a BIP39 seed
    pub fn from_seed(seed: &[u8], chain: Chain, network: Network) -> Result<Self> {
        let root = XPrv::root(seed)?;
        let mut wallet = Self::from_root(root, chain, network)?;
        wallet.seed = seed.try_into().ok();
        Ok(wallet)
    }

    /// Wallet from a 64-byte hex root xprivate key
    pub fn from_xprivate_key(xprivate_key: &str, chain: Chain, network: Network) -> Result<Self> {
        Self::from_root(XPrv::from_hex(xprivate_key)?, chain, network)
    }

    /// Watch-only wallet from a 64-byte hex root xpublic key
    pub fn from_xpublic_key(xpublic_key: &str, chain: Chain, network: Network) -> Result<Self> {
        let network = Self::check(chain, network)?;
        let xpub = XPub::from_hex(xpublic_key)?;
        Ok(Self {
            chain,
            network,
            mnemonic: None,
            seed: None,
            xprivate_key: None,
            xpublic_key: Some(xpub),
            indexes: Vec::new(),
            child_xprivate_key: None,
            child_xpublic_key: xpub,
        })
    }

    /// Wallet from an already derived 64-byte hex xprivate key; it cannot derive further
    pub fn from_private_key(private_key: &str, chain: Chain, network: Network) -> Result<Self> {
        let network = Self::check(chain, network)?;
        let key = XPrv::from_hex(private_key)?;
        Ok(Self {
            chain,
            network,
            mnemonic: None,
            seed: None,
            xprivate_key: None,
            xpublic_key: None,
            indexes: Vec::new(),
            child_xpublic_key: key.xpub()?,
            child_xprivate_key: Some(key),
        })
    }

    fn from_root(root: XPrv, chain: Chain, network: Network) -> Result<Self> {
        let network = Self::check(chain, network)?;
        let xpub = root.xpub()?;
        Ok(Self {
            chain,
            network,
            mnemonic: None,
            seed: None,
            xprivate_key: Some(root.clone()),
            xpublic_key: Some(xpub),
            indexes: Vec::new(),
            child_xprivate_key: Some(root),
            child_xpublic_key: xpub,
        })
    }

    fn check(chain: Chain, network: Network) -> Result<Network> {
        match chain {
            Chain::Bytom | Chain::Vapor => chain.check_network(network),
            Chain::Bitcoin => Err(SwapError::wallet("Bitcoin wallets use the bitcoin module.")),
        }
    }

    /// Derive along a path such as "m/44/153/1/0/1"
    pub fn from_path(self, path: &str) -> Result<Self> {
        let indexes = chainkd::parse_path(path)?;
        self.derive(indexes)
    }

    /// Derive along hex selectors such as ["2c000000", "99000000", ...]
    pub fn from_indexes<S: AsRef<str>>(self, indexes: &[S]) -> Result<Self> {
        let indexes = chainkd::parse_indexes(indexes)?;
        self.derive(indexes)
    }

    /// Append one derivation step
    pub fn from_index(self, index: u32, hardened: bool) -> Result<Self> {
        let mut indexes = self.indexes.clone();
        indexes.push(Index {
            value: index,
            hardened,
        });
        self.derive(indexes)
    }

    fn derive(mut self, indexes: Vec<Index>) -> Result<Self> {
        match (&self.xprivate_key, &self.xpublic_key) {
            (Some(root), _) => {
                let child = root.derive(&indexes)?;
                self.child_xpublic_key = child.xpub()?;
                self.child_xprivate_key = Some(child);
            }
            (None, Some(root)) => {
                self.child_xpublic_key = root.derive(&indexes)?;
            }
            (None, None) => {
                return Err(SwapError::wallet(
                    "Derivation needs a root xprivate or xpublic key.",
                ))
            }
        }
        self.indexes = indexes;
        Ok(self)
    }

    /// Drop the derivation, the wallet key becomes the root key again
    pub fn clean_derivation(mut self) -> Self {
        if let Some(root) = &self.xpublic_key {
            self.child_xpublic_key = *root;
            self.child_xprivate_key = self.xprivate_key.clone();
            self.indexes.clear();
        }
        self
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }

    /// Seed hex
    pub fn seed(&self) -> Option<String> {
        self.seed.map(hex::encode)
    }

    pub fn xprivate_key(&self) -> Option<String> {
        self.xprivate_key.as_ref().map(XPrv::to_hex)
    }

    pub fn xpublic_key(&self) -> Option<String> {
        self.xpublic_key.as_ref().map(XPub::to_hex)
    }

    /// Expanded root key
    pub fn expand_xprivate_key(&self) -> Option<String> {
        self.xprivate_key
            .as_ref()
            .and_then(|key| key.expand().ok())
            .map(hex::encode)
    }

    pub fn child_xprivate_key(&self) -> Option<String> {
        self.child_xprivate_key.as_ref().map(XPrv::to_hex)
    }

    pub fn child_xpublic_key(&self) -> String {
        self.child_xpublic_key.to_hex()
    }

    /// Expanded signing key of the wallet key
    pub fn private_key(&self) -> Option<String> {
        self.child_xprivate_key
            .as_ref()
            .and_then(|key| key.expand().ok())
            .map(hex::encode)
    }

    /// ed25519 public key hex
    pub fn public_key(&self) -> String {
        hex::encode(self.child_xpublic_key.public_key())
    }

    /// RIPEMD-160 of the public key
    pub fn hash(&self) -> String {
        hex::encode(self.key_hash())
    }

    fn key_hash(&self) -> [u8; 20] {
        ripemd160::Hash::hash(&self.child_xpublic_key.public_key()).to_byte_array()
    }

    /// P2WPKH control program
    pub fn program(&self) -> String {
        format!("0014{}", self.hash())
    }

    /// P2WPKH address on `network`, or on the wallet network
    pub fn address(&self, network: Option<Network>) -> Result<String> {
        encode_address(
            &self.key_hash(),
            self.chain,
            network.unwrap_or(self.network),
        )
    }

    pub fn path(&self) -> Option<String> {
        if self.indexes.is_empty() {
            None
        } else {
            Some(chainkd::indexes_to_path(&self.indexes))
        }
    }

    /// Hex selectors of the derivation
    pub fn indexes(&self) -> Vec<String> {
        self.indexes.iter().map(Index::to_hex).collect()
    }

    /// Balance of `asset` in NEU
    pub async fn balance(&self, api: &dyn BlockcenterApi, asset: &str) -> Result<u64> {
        let address = self.address(None)?;
        Ok(api.get_balance(&address, asset).await?)
    }
}

/// Account key of a root xprivate key at `path`, or at the default path
pub(crate) fn signing_key(xprivate_key: &XPrv, path: Option<&str>) -> Result<XPrv> {
    let indexes = chainkd::parse_path(path.unwrap_or(DEFAULT_PATH))?;
    Ok(xprivate_key.derive(&indexes)?)
}
