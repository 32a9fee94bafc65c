/// Transaction types for Montycoin
use serde::{Deserialize, Serialize};

/// Sender literal marking a mining-reward issuance.
pub const REWARD_SENDER: &str = "reward";

/// A value transfer recorded in a block.
///
/// `sender` is `None` for coinbase credits such as the genesis allocation.
/// Field names are part of the canonical block encoding and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Option<String>,
    pub receiver: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: Option<String>, receiver: impl Into<String>, amount: u64) -> Self {
        Transaction {
            sender,
            receiver: receiver.into(),
            amount,
        }
    }

    /// Issuance with no sender.
    pub fn coinbase(receiver: impl Into<String>, amount: u64) -> Self {
        Self::new(None, receiver, amount)
    }

    pub fn transfer(sender: impl Into<String>, receiver: impl Into<String>, amount: u64) -> Self {
        Self::new(Some(sender.into()), receiver, amount)
    }

    /// Mining reward paid by the reserved `"reward"` sender.
    pub fn reward(receiver: impl Into<String>, amount: u64) -> Self {
        Self::transfer(REWARD_SENDER, receiver, amount)
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender.is_none()
    }

    pub fn is_reward(&self) -> bool {
        self.sender.as_deref() == Some(REWARD_SENDER)
    }
}

/// Transaction as submitted by a client, before any field is known to be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
}

impl NewTransaction {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: u64) -> Self {
        NewTransaction {
            sender: Some(sender.into()),
            receiver: Some(receiver.into()),
            amount: Some(amount),
        }
    }
}
