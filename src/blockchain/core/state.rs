use super::chain::{Block, Ledger};

/// Balance reported for every identity once a `"reward"` sender has been
/// seen, when `reward_sentinel_compat` is on.
pub const REWARD_SENTINEL_BALANCE: i64 = 100_000;

/// Derive a balance by replaying every transaction in `blocks`.
///
/// With `reward_sentinel_compat` set, the scan stops at the first
/// transaction sent by `"reward"` and returns [`REWARD_SENTINEL_BALANCE`]
/// whoever is asking. Older nodes on the network answer balance queries
/// this way; it is kept only so their answers can be reproduced.
pub fn balance_of(blocks: &[Block], identity: &str, reward_sentinel_compat: bool) -> i64 {
    let mut balance: i64 = 0;

    for tx in blocks.iter().flat_map(|b| &b.transactions) {
        if reward_sentinel_compat && tx.is_reward() {
            return REWARD_SENTINEL_BALANCE;
        }

        let amount = i64::try_from(tx.amount).unwrap_or(i64::MAX);
        if tx.sender.as_deref() == Some(identity) {
            balance = balance.saturating_sub(amount);
        }
        if tx.receiver == identity {
            balance = balance.saturating_add(amount);
        }
    }

    balance
}

impl Ledger {
    /// Confirmed balance of `identity`; pending transactions do not count.
    pub fn balance_of(&self, identity: &str) -> i64 {
        balance_of(self.chain(), identity, self.config().reward_sentinel_compat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::transaction::Transaction;

    fn block_with(transactions: Vec<Transaction>) -> Block {
        Block::new(2, 7, "abc", transactions)
    }

    #[test]
    fn test_genesis_balances() {
        let ledger = Ledger::default();
        assert_eq!(ledger.balance_of("miner_address"), 50);
        assert_eq!(ledger.balance_of("someone_else"), 0);
    }

    #[test]
    fn test_transfers_move_value() {
        let blocks = vec![
            block_with(vec![Transaction::coinbase("alice", 30)]),
            block_with(vec![
                Transaction::transfer("alice", "bob", 10),
                Transaction::transfer("bob", "carol", 4),
            ]),
        ];
        assert_eq!(balance_of(&blocks, "alice", false), 20);
        assert_eq!(balance_of(&blocks, "bob", false), 6);
        assert_eq!(balance_of(&blocks, "carol", false), 4);
    }

    #[test]
    fn test_balance_can_go_negative() {
        let blocks = vec![block_with(vec![Transaction::transfer("node", "monty", 1)])];
        assert_eq!(balance_of(&blocks, "node", false), -1);
    }

    #[test]
    fn test_self_transfer_nets_zero() {
        let blocks = vec![block_with(vec![
            Transaction::coinbase("alice", 5),
            Transaction::transfer("alice", "alice", 3),
        ])];
        assert_eq!(balance_of(&blocks, "alice", false), 5);
    }

    #[test]
    fn test_reward_sender_is_ordinary_by_default() {
        let blocks = vec![block_with(vec![Transaction::reward("node", 10)])];
        assert_eq!(balance_of(&blocks, "node", false), 10);
        assert_eq!(balance_of(&blocks, "reward", false), -10);
    }

    #[test]
    fn test_reward_sentinel_compat_short_circuits() {
        let blocks = vec![
            block_with(vec![Transaction::coinbase("alice", 5)]),
            block_with(vec![Transaction::reward("node", 10)]),
        ];
        assert_eq!(balance_of(&blocks, "alice", true), REWARD_SENTINEL_BALANCE);
        assert_eq!(balance_of(&blocks, "nobody", true), REWARD_SENTINEL_BALANCE);

        let ledger = Ledger::new(LedgerConfig {
            reward_sentinel_compat: true,
            ..LedgerConfig::default()
        });
        // No reward transaction yet, so the normal rules apply.
        assert_eq!(ledger.balance_of("miner_address"), 50);
    }
}
