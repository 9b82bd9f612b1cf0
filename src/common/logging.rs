//! Structured Logging
//!
//! Logs go to stderr so command output on stdout stays machine readable.
//! Pretty output is the default, JSON lines are available for log shipping.
//!
//! # Usage
//!
//! ```rust,ignore
//! use swap::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Debug, false)?;
//! tracing::info!(target: "swap::bytom", tx_id = %id, "Built claim transaction");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Building, signing and submitting transactions
    Transaction,
    /// Remote API calls
    Network,
    /// Command line invocations
    Cli,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    pub level: String,
    pub category: EventCategory,
    pub message: String,
    /// Chain the event belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Duration in milliseconds (API calls)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for error events
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.as_filter().to_uppercase(),
            category,
            message: message.into(),
            chain: None,
            data: None,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    /// Serialize this event to a JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

// ============================================================================
// Event Helpers
// ============================================================================

/// Log a transaction lifecycle event (built, signed, submitted)
pub fn log_transaction_event(
    chain: &str,
    transaction_type: &str,
    fee: u64,
    tx_hash: Option<&str>,
    error: Option<&str>,
) {
    let level = if error.is_none() {
        LogLevel::Info
    } else {
        LogLevel::Error
    };
    let mut event = LogEvent::new(level, EventCategory::Transaction, transaction_type)
        .with_chain(chain)
        .with_data(serde_json::json!({
            "type": transaction_type,
            "fee": fee,
            "hash": tx_hash,
        }));

    if let Some(err) = error {
        event = event.with_error("TRANSACTION_ERROR", err);
    }

    match level {
        LogLevel::Error => tracing::error!(target: "swap::transaction", "{}", event.to_json()),
        _ => tracing::info!(target: "swap::transaction", "{}", event.to_json()),
    }
}

/// Log a remote API call
pub fn log_api_call(method: &str, url: &str, status: u16, duration_ms: u64) {
    let level = if status >= 500 {
        LogLevel::Error
    } else if status >= 400 {
        LogLevel::Warn
    } else {
        LogLevel::Debug
    };

    let event = LogEvent::new(
        level,
        EventCategory::Network,
        format!("{} {} -> {}", method, url, status),
    )
    .with_duration(duration_ms)
    .with_data(serde_json::json!({
        "method": method,
        "url": url,
        "status": status
    }));

    match level {
        LogLevel::Error => tracing::error!(target: "swap::api", "{}", event.to_json()),
        LogLevel::Warn => tracing::warn!(target: "swap::api", "{}", event.to_json()),
        _ => tracing::debug!(target: "swap::api", "{}", event.to_json()),
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("swap={}", level.as_filter())));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serialization() {
        let event = LogEvent::new(LogLevel::Info, EventCategory::Transaction, "vapor_fund_unsigned")
            .with_chain("vapor")
            .with_data(serde_json::json!({"fee": 10000000}))
            .with_duration(42);

        let json = event.to_json();
        assert!(json.contains("vapor_fund_unsigned"));
        assert!(json.contains("\"chain\":\"vapor\""));
        assert!(json.contains("\"category\":\"transaction\""));
        assert!(json.contains("42"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from("unknown"), LogLevel::Warn);
    }
}
