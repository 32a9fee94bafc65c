use crate::config::LedgerConfig;
use crate::crypto::block_digest;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use tracing::info;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_PROOF: u64 = 1;

/// Timestamp layout shared with the rest of the network.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A sealed block. The five fields are exactly what gets hashed and exchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub proof: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        proof: u64,
        previous_hash: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Self {
        Block {
            index,
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            proof,
            previous_hash: previous_hash.into(),
            transactions,
        }
    }

    pub fn hash(&self) -> Result<String> {
        block_digest(self)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

/// The local copy of the chain plus the transactions waiting for the next block.
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger holding only the genesis block.
    pub fn new(config: LedgerConfig) -> Self {
        let mut ledger = Ledger {
            blocks: Vec::new(),
            pending: Vec::new(),
            config,
        };

        ledger.pending.push(Transaction::coinbase(
            ledger.config.genesis_receiver.clone(),
            ledger.config.genesis_amount,
        ));
        ledger.seal_block(GENESIS_PROOF, GENESIS_PREVIOUS_HASH);
        ledger
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Queue a transaction for the next block and return that block's index.
    ///
    /// No balance check happens here; see
    /// [`ensure_sufficient_balance`](crate::transaction::ensure_sufficient_balance).
    pub fn submit_transaction(&mut self, tx: Transaction) -> u64 {
        self.pending.push(tx);
        self.next_index()
    }

    /// Seal every pending transaction into a new block on top of the chain.
    pub fn seal_block(&mut self, proof: u64, previous_hash: impl Into<String>) -> Block {
        let transactions = std::mem::take(&mut self.pending);
        let block = Block::new(self.next_index(), proof, previous_hash, transactions);

        info!(
            index = block.index,
            proof = block.proof,
            transactions = block.transactions.len(),
            "sealed block"
        );

        self.blocks.push(block.clone());
        block
    }

    pub fn tip(&self) -> Result<&Block> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64 + 1
    }

    /// Swap in a chain adopted from a peer. Pending transactions are kept.
    pub fn replace_chain(&mut self, blocks: Vec<Block>) -> Result<()> {
        if blocks.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        info!(
            old_length = self.blocks.len(),
            new_length = blocks.len(),
            "replacing local chain"
        );
        self.blocks = blocks;
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
