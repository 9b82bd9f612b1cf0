//! Common Infrastructure Module
//!
//! This module contains:
//! - Chains, networks and endpoint configuration from environment variables
//! - Structured logging setup
//! - The crate-wide error type

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Chain, ConfigError, Network, SwapConfig, BTM_ASSET};
pub use error::{Result, SwapError};
pub use logging::{
    init_logging, log_api_call, log_transaction_event, EventCategory, LogEvent,
    LogLevel, LoggingError,
};
