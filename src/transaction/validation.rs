/// Validation of client-submitted transactions and the balance policy
use crate::blockchain::Ledger;
use crate::error::{ChainError, Result};
use crate::transaction::types::{NewTransaction, Transaction};

impl NewTransaction {
    /// Checks that every field is present and non-empty.
    pub fn validate(self) -> Result<Transaction> {
        let sender = required_identity(self.sender, "sender")?;
        let receiver = required_identity(self.receiver, "receiver")?;
        let amount = self
            .amount
            .ok_or_else(|| ChainError::MalformedTransaction("missing field `amount`".to_string()))?;

        Ok(Transaction::transfer(sender, receiver, amount))
    }
}

fn required_identity(value: Option<String>, field: &str) -> Result<String> {
    let value = value
        .ok_or_else(|| ChainError::MalformedTransaction(format!("missing field `{}`", field)))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ChainError::MalformedTransaction(format!(
            "field `{}` must not be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

/// Rejects a transfer whose sender cannot cover the amount from confirmed history.
///
/// Pending transactions are not counted, matching what peers can verify.
pub fn ensure_sufficient_balance(ledger: &Ledger, tx: &Transaction) -> Result<()> {
    let Some(sender) = tx.sender.as_deref() else {
        return Err(ChainError::MalformedTransaction(
            "client transactions must name a sender".to_string(),
        ));
    };

    let available = ledger.balance_of(sender);
    if available < 0 || (available as u64) < tx.amount {
        return Err(ChainError::InsufficientBalance {
            sender: sender.to_string(),
            available,
            required: tx.amount,
        });
    }
    Ok(())
}
