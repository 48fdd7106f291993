//! Unified error handling for Notefan
//!
//! This crate provides a single error type used across all Notefan components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;

/// Result type alias using NotefanError
pub type Result<T> = std::result::Result<T, NotefanError>;

/// Unified error type for all Notefan operations
#[derive(thiserror::Error, Debug)]
pub enum NotefanError {
    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Failed to read EC register {register:#04x}: {reason}")]
    EcRead {
        register: u8,
        reason: String,
    },

    #[error("Failed to write EC register {register:#04x}: {reason}")]
    EcWrite {
        register: u8,
        reason: String,
    },

    #[error("EC lock not acquired within {timeout_ms} ms")]
    EcLockTimeout {
        timeout_ms: u64,
    },

    #[error("Embedded controller not initialized")]
    EcNotInitialized,

    #[error("Failed to read temperature: {0}")]
    TemperatureRead(String),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Invalid percentage: {value} (must be 0.0-100.0)")]
    InvalidPercentage {
        value: f32,
    },

    #[error("Fan index {index} out of range (configured fans: {count})")]
    FanIndexOutOfRange {
        index: usize,
        count: usize,
    },

    // ============================================================================
    // Control Loop Errors
    // ============================================================================
    #[error("Operation {operation} not valid in state {state}")]
    InvalidState {
        operation: String,
        state: String,
    },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl NotefanError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-config error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an EC read error
    pub fn ec_read(register: u8, reason: impl Into<String>) -> Self {
        Self::EcRead {
            register,
            reason: reason.into(),
        }
    }

    /// Create an EC write error
    pub fn ec_write(register: u8, reason: impl Into<String>) -> Self {
        Self::EcWrite {
            register,
            reason: reason.into(),
        }
    }
}

// Allow converting from String to NotefanError
impl From<String> for NotefanError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

// Allow converting from &str to NotefanError
impl From<&str> for NotefanError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}
