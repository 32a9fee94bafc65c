//! Transaction module split into types and validation

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::ensure_sufficient_balance;
