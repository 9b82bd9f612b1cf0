//! Bitcoin Wallet
//!
//! Keys and P2PKH address from a BIP39 mnemonic, a seed, a root extended
//! private key, a passphrase, a WIF or a raw private key. A wallet built
//! from an address alone is watch-only.

use std::str::FromStr;

use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, PrivateKey, PublicKey, ScriptBuf};

use crate::bitcoin::client::BitcoinApi;
use crate::bitcoin::utils::parse_address;
use crate::common::{Chain, Network, Result, SwapError};

/// BIP44 path of the first receiving address
pub fn default_path(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "m/44'/0'/0'/0/0",
        _ => "m/44'/1'/0'/0/0",
    }
}

/// Bitcoin wallet
#[derive(Debug, Clone)]
pub struct Wallet {
    network: Network,
    mnemonic: Option<String>,
    seed: Option<[u8; 64]>,
    root_xprivate_key: Option<Xpriv>,
    path: Option<DerivationPath>,
    private_key: Option<PrivateKey>,
    public_key: Option<PublicKey>,
    address: Address,
}

impl Wallet {
    /// Wallet from a BIP39 mnemonic, derived at `path` or the default BIP44 path
    pub fn from_mnemonic(
        mnemonic: &str,
        passphrase: Option<&str>,
        path: Option<&str>,
        network: Network,
    ) -> Result<Self> {
        let parsed = Mnemonic::parse_normalized(mnemonic)
            .map_err(|e| SwapError::wallet(format!("Invalid mnemonic words: {}", e)))?;
        let seed = parsed.to_seed(passphrase.unwrap_or(""));
        let mut wallet = Self::from_seed(&seed, path, network)?;
        wallet.mnemonic = Some(parsed.to_string());
        Ok(wallet)
    }

    /// Wallet from a 64-byte BIP39 seed
    pub fn from_seed(seed: &[u8], path: Option<&str>, network: Network) -> Result<Self> {
        let network = Chain::Bitcoin.check_network(network)?;
        let root = Xpriv::new_master(network.bitcoin_network(), seed).map_err(SwapError::bitcoin)?;
        let mut wallet = Self::from_root_xprivate_key(&root.to_string(), path)?;
        wallet.seed = seed.try_into().ok();
        Ok(wallet)
    }

    /// Wallet from a root extended private key (xprv/tprv)
    pub fn from_root_xprivate_key(root_xprivate_key: &str, path: Option<&str>) -> Result<Self> {
        let root = Xpriv::from_str(root_xprivate_key)
            .map_err(|e| SwapError::wallet(format!("Invalid root xprivate key: {}", e)))?;
        let network = match root.network {
            bitcoin::NetworkKind::Main => Network::Mainnet,
            bitcoin::NetworkKind::Test => Network::Testnet,
        };
        let path = DerivationPath::from_str(path.unwrap_or(default_path(network)))
            .map_err(|e| SwapError::wallet(format!("Invalid derivation path: {}", e)))?;

        let secp = Secp256k1::new();
        let child = root.derive_priv(&secp, &path).map_err(SwapError::bitcoin)?;
        let mut wallet = Self::from_private(child.to_priv(), network);
        wallet.root_xprivate_key = Some(root);
        wallet.path = Some(path);
        Ok(wallet)
    }

    /// Wallet whose secret key is sha256(passphrase)
    pub fn from_passphrase(passphrase: &str, network: Network) -> Result<Self> {
        let network = Chain::Bitcoin.check_network(network)?;
        let digest = sha256::Hash::hash(passphrase.as_bytes());
        let secret_key =
            SecretKey::from_slice(digest.as_byte_array()).map_err(SwapError::bitcoin)?;
        Ok(Self::from_private(
            PrivateKey::new(secret_key, network.bitcoin_network()),
            network,
        ))
    }

    /// Wallet from a WIF private key
    pub fn from_wif(wif: &str) -> Result<Self> {
        let private_key = PrivateKey::from_wif(wif)
            .map_err(|e| SwapError::wallet(format!("Invalid WIF: {}", e)))?;
        let network = match private_key.network {
            bitcoin::NetworkKind::Main => Network::Mainnet,
            bitcoin::NetworkKind::Test => Network::Testnet,
        };
        Ok(Self::from_private(private_key, network))
    }

    /// Wallet from a 32-byte hex private key (compressed public key)
    pub fn from_private_key(private_key: &str, network: Network) -> Result<Self> {
        let network = Chain::Bitcoin.check_network(network)?;
        let bytes = hex::decode(private_key)?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| SwapError::wallet(format!("Invalid private key: {}", e)))?;
        Ok(Self::from_private(
            PrivateKey::new(secret_key, network.bitcoin_network()),
            network,
        ))
    }

    /// Watch-only wallet
    pub fn from_address(address: &str, network: Network) -> Result<Self> {
        let address = parse_address(address, network)?;
        Ok(Self {
            network,
            mnemonic: None,
            seed: None,
            root_xprivate_key: None,
            path: None,
            private_key: None,
            public_key: None,
            address,
        })
    }

    fn from_private(private_key: PrivateKey, network: Network) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_private_key(&secp, &private_key);
        let address = Address::p2pkh(public_key.pubkey_hash(), network.bitcoin_network());
        Self {
            network,
            mnemonic: None,
            seed: None,
            root_xprivate_key: None,
            path: None,
            private_key: Some(private_key),
            public_key: Some(public_key),
            address,
        }
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

    pub fn root_xprivate_key(&self) -> Option<String> {
        self.root_xprivate_key.as_ref().map(|root| root.to_string())
    }

    pub fn root_xpublic_key(&self) -> Option<String> {
        let secp = Secp256k1::new();
        self.root_xprivate_key
            .as_ref()
            .map(|root| Xpub::from_priv(&secp, root).to_string())
    }

    /// Derivation path of the wallet key
    pub fn path(&self) -> Option<String> {
        self.path.as_ref().map(|path| {
            let path = path.to_string();
            if path.starts_with('m') {
                path
            } else {
                format!("m/{}", path)
            }
        })
    }

    /// Private key hex
    pub fn private_key(&self) -> Option<String> {
        self.private_key
            .map(|key| hex::encode(key.inner.secret_bytes()))
    }

    pub fn wif(&self) -> Option<String> {
        self.private_key.map(|key| key.to_wif())
    }

    /// Compressed public key hex
    pub fn public_key(&self) -> Option<String> {
        self.public_key.map(|key| key.to_string())
    }

    pub fn uncompressed_public_key(&self) -> Option<String> {
        self.public_key
            .map(|key| hex::encode(key.inner.serialize_uncompressed()))
    }

    /// Public key hash160 hex
    pub fn hash(&self) -> Option<String> {
        self.address.pubkey_hash().map(|hash| hash.to_string())
    }

    pub fn address(&self) -> String {
        self.address.to_string()
    }

    /// P2PKH script pubkey hex
    pub fn p2pkh(&self) -> String {
        hex::encode(self.address.script_pubkey().as_bytes())
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    pub(crate) fn signing_key(&self) -> Option<(PrivateKey, PublicKey)> {
        self.private_key.zip(self.public_key)
    }

    /// Confirmed plus unconfirmed balance in satoshi
    pub async fn balance(&self, api: &dyn BitcoinApi) -> Result<u64> {
        Ok(api.get_balance(&self.address.to_string()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::client::MockBitcoinApi;

    #[test]
    fn test_from_passphrase() {
        let wallet = Wallet::from_passphrase("meheret", Network::Testnet).unwrap();
        assert_eq!(
            wallet.public_key().unwrap(),
            "039213ebcaefdd3e109720c17867ce1bd6d076b0e65e3b6390e6e38548a65e76af"
        );
        assert_eq!(wallet.hash().unwrap(), "98f879fb7f8b4951dee9bc8a0327b792fbe332b8");
        assert_eq!(wallet.address(), "muTnffLDR5LtFeLR2i3WsKVfdyvzfyPnVB");
        assert_eq!(
            wallet.wif().unwrap(),
            "cRCBVa8VCrkuqjHyjnEgoBykinNyk9pdRJxPARHJzgSwDLUyMXKh"
        );
        assert_eq!(
            wallet.p2pkh(),
            "76a91498f879fb7f8b4951dee9bc8a0327b792fbe332b888ac"
        );
        assert_eq!(wallet.uncompressed_public_key().unwrap().len(), 130);

        let mainnet = Wallet::from_passphrase("meheret", Network::Mainnet).unwrap();
        assert_eq!(mainnet.address(), "1EwqNcFEc3udUXroK9593QHLmzLHq5iBUs");
    }

    #[test]
    fn test_key_formats_agree() {
        let wallet = Wallet::from_passphrase("meheret tesfaye batu bayou", Network::Testnet).unwrap();
        assert_eq!(wallet.address(), "mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q");

        let from_wif = Wallet::from_wif(&wallet.wif().unwrap()).unwrap();
        assert_eq!(from_wif.address(), wallet.address());
        assert_eq!(from_wif.network(), Network::Testnet);

        let from_hex =
            Wallet::from_private_key(&wallet.private_key().unwrap(), Network::Testnet).unwrap();
        assert_eq!(from_hex.public_key(), wallet.public_key());
    }

    #[test]
    fn test_from_mnemonic() {
        let words = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let wallet = Wallet::from_mnemonic(words, None, None, Network::Mainnet).unwrap();
        // BIP44 test vector for the first receiving address
        assert_eq!(wallet.address(), "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
        assert_eq!(wallet.path().unwrap(), "m/44'/0'/0'/0/0");
        assert!(wallet.root_xprivate_key().unwrap().starts_with("xprv"));

        let root = wallet.root_xprivate_key().unwrap();
        let again = Wallet::from_root_xprivate_key(&root, None).unwrap();
        assert_eq!(again.address(), wallet.address());

        assert!(Wallet::from_mnemonic("not a mnemonic", None, None, Network::Mainnet).is_err());
    }

    #[test]
    fn test_watch_only() {
        let wallet = Wallet::from_address("mphBPZf15cRFcL5tUq6mCbE84XobZ1vg7Q", Network::Testnet).unwrap();
        assert!(wallet.private_key().is_none());
        assert_eq!(wallet.hash().unwrap(), "64a8390b0b1685fcbf2d4b457118dc8da92d5534");
        assert!(Wallet::from_passphrase("meheret", Network::Solonet).is_err());
    }

    #[tokio::test]
    async fn test_balance() {
        let mut api = MockBitcoinApi::new();
        api.expect_get_balance()
            .withf(|address| address.starts_with("muTnffLDR5"))
            .returning(|_| Ok(97_000));

        let wallet = Wallet::from_passphrase("meheret", Network::Testnet).unwrap();
        assert_eq!(wallet.balance(&api).await.unwrap(), 97_000);
    }
}
