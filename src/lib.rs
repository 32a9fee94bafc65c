//! Montycoin - a minimal proof-of-work ledger kept in agreement across nodes
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, balances and chain validation
//! - [`transaction`] - Transaction types and submission checks
//!
//! ## Consensus & Mining
//! - [`miner`] - Cancellable proof-of-work search
//! - [`sync`] - Longest-valid-chain reconciliation with peers
//!
//! ## Cryptography
//! - [`crypto`] - Canonical block encoding and hashing
//!
//! ## Networking & Integration
//! - [`network`] - Peer registry
//! - [`node`] - The node service shared by request handlers
//! - [`api`] - HTTP endpoints
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;
pub mod sync;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Networking & Integration
// ============================================================================
pub mod api;
pub mod network;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
