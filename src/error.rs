//! Error types for Montycoin

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChainError {
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),
    #[error("Insufficient balance for {sender}: available {available}, required {required}")]
    InsufficientBalance {
        sender: String,
        available: i64,
        required: u64,
    },
    #[error("Invalid chain at block {index}: {reason}")]
    InvalidChain { index: u64, reason: String },
    #[error("Peer {peer} unreachable: {reason}")]
    UnreachablePeer { peer: String, reason: String },
    #[error("Malformed response from peer {peer}: {reason}")]
    MalformedPeerResponse { peer: String, reason: String },
    #[error("Invalid peer address: {0}")]
    InvalidPeerAddress(String),
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChainError {
    /// Errors raised while talking to a peer. Reconciliation skips these.
    pub fn is_peer_failure(&self) -> bool {
        matches!(
            self,
            ChainError::UnreachablePeer { .. } | ChainError::MalformedPeerResponse { .. }
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
