//! Common Error Types for the Swap Crate
//!
//! Provides unified error handling across wallets, builders, signers,
//! API clients and the CLI.

use thiserror::Error;

/// Root error type for the swap crate
#[derive(Debug, Error)]
pub enum SwapError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    /// Unknown or unsupported network
    #[error("{message}, {hint}")]
    Network { message: String, hint: String },

    /// Invalid address for a chain or network
    #[error("{0}")]
    Address(String),

    /// Not enough spendable funds
    #[error("{0}")]
    Balance(String),

    /// Unknown unit conversion symbol
    #[error("{message}, {hint}")]
    Symbol { message: String, hint: String },

    /// Unknown amount unit
    #[error("{0}")]
    Unit(String),

    /// Malformed or mismatched transaction raw
    #[error("{0}")]
    TransactionRaw(String),

    /// Remote service rejected a request
    #[error("{message} (code {code})")]
    Api { message: String, code: i64 },

    /// Solver does not fit the transaction being signed
    #[error("{0}")]
    Solver(String),

    /// Key derivation or key format errors
    #[error("{0}")]
    Wallet(String),

    /// HTLC construction or parsing errors
    #[error("{0}")]
    Htlc(String),

    /// Invalid transaction parameters
    #[error("{0}")]
    Transaction(String),

    /// HTTP transport errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hex decoding errors
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Base64 decoding errors
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Errors bubbled up from the bitcoin crate
    #[error("bitcoin error: {0}")]
    Bitcoin(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SwapError {
    /// Create a network error
    pub fn network(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create an address error
    pub fn address(msg: impl Into<String>) -> Self {
        Self::Address(msg.into())
    }

    /// Create a balance error
    pub fn balance(msg: impl Into<String>) -> Self {
        Self::Balance(msg.into())
    }

    /// Create a symbol error
    pub fn symbol(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Symbol {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create a unit error
    pub fn unit(msg: impl Into<String>) -> Self {
        Self::Unit(msg.into())
    }

    /// Create a transaction raw error
    pub fn transaction_raw(msg: impl Into<String>) -> Self {
        Self::TransactionRaw(msg.into())
    }

    /// Create an API error
    pub fn api(message: impl Into<String>, code: i64) -> Self {
        Self::Api {
            message: message.into(),
            code,
        }
    }

    /// Create a solver error
    pub fn solver(msg: impl Into<String>) -> Self {
        Self::Solver(msg.into())
    }

    /// Create a wallet error
    pub fn wallet(msg: impl Into<String>) -> Self {
        Self::Wallet(msg.into())
    }

    /// Create an HTLC error
    pub fn htlc(msg: impl Into<String>) -> Self {
        Self::Htlc(msg.into())
    }

    /// Create a transaction error
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Create a bitcoin error
    pub fn bitcoin(msg: impl ToString) -> Self {
        Self::Bitcoin(msg.to_string())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, SwapError::Http(_) | SwapError::Io(_))
    }

    /// Get error code for structured logs
    pub fn error_code(&self) -> &'static str {
        match self {
            SwapError::Config(_) => "CONFIG_ERROR",
            SwapError::Logging(_) => "LOGGING_ERROR",
            SwapError::Network { .. } => "NETWORK_ERROR",
            SwapError::Address(_) => "ADDRESS_ERROR",
            SwapError::Balance(_) => "BALANCE_ERROR",
            SwapError::Symbol { .. } => "SYMBOL_ERROR",
            SwapError::Unit(_) => "UNIT_ERROR",
            SwapError::TransactionRaw(_) => "TRANSACTION_RAW_ERROR",
            SwapError::Api { .. } => "API_ERROR",
            SwapError::Solver(_) => "SOLVER_ERROR",
            SwapError::Wallet(_) => "WALLET_ERROR",
            SwapError::Htlc(_) => "HTLC_ERROR",
            SwapError::Transaction(_) => "TRANSACTION_ERROR",
            SwapError::Http(_) => "HTTP_ERROR",
            SwapError::Json(_) => "JSON_ERROR",
            SwapError::Hex(_) => "HEX_ERROR",
            SwapError::Base64(_) => "BASE64_ERROR",
            SwapError::Bitcoin(_) => "BITCOIN_ERROR",
            SwapError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias using SwapError
pub type Result<T> = std::result::Result<T, SwapError>;
