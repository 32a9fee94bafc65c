//! The node service: one ledger, one peer registry, one miner.
//!
//! `Node` is the only thing request handlers talk to. It owns the ledger
//! behind a reader-writer lock so that submissions, seals and chain
//! replacement are serialised while balance and chain reads run side by
//! side.

use crate::blockchain::{is_chain_valid, Block, Ledger};
use crate::config::Config;
use crate::error::{ChainError, Result};
use crate::miner::{ProofOfWork, SearchOutcome};
use crate::network::{PeerAddress, PeerRegistry};
use crate::sync::{fetch_peer_chains, reconcile, ChainSource, HttpChainSource, Reconciliation};
use crate::transaction::{ensure_sufficient_balance, NewTransaction, Transaction};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Blocking proof search run on top of a previous proof.
type ProofSearch = Arc<dyn Fn(u64, &CancellationToken) -> SearchOutcome + Send + Sync>;

/// Result of [`Node::mine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    Mined(Block),
    Cancelled,
}

pub struct Node {
    config: Config,
    node_id: String,
    ledger: Arc<RwLock<Ledger>>,
    peers: PeerRegistry,
    pow: ProofOfWork,
    chain_source: Arc<dyn ChainSource>,
    shutdown: CancellationToken,
    mining_cancel: parking_lot::Mutex<CancellationToken>,
    blocks_mined: AtomicU64,
}

impl Node {
    /// Build a node that reaches its peers over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let source = HttpChainSource::new(config.network.peer_timeout())?;
        Self::with_chain_source(config, Arc::new(source))
    }

    pub fn with_chain_source(config: Config, chain_source: Arc<dyn ChainSource>) -> Result<Self> {
        config.validate()?;

        let node_id = if config.mining.node_id.trim().is_empty() {
            uuid::Uuid::new_v4().simple().to_string()
        } else {
            config.mining.node_id.trim().to_string()
        };

        let peers = PeerRegistry::new();
        for peer in &config.network.bootstrap_peers {
            if let Err(e) = peers.register(peer) {
                warn!(peer = %peer, error = %e, "ignoring bootstrap peer");
            }
        }

        let shutdown = CancellationToken::new();
        let mining_cancel = parking_lot::Mutex::new(shutdown.child_token());

        info!(
            node_id = %node_id,
            difficulty = config.mining.difficulty,
            bootstrap_peers = peers.len(),
            "node initialised"
        );

        Ok(Node {
            ledger: Arc::new(RwLock::new(Ledger::new(config.ledger.clone()))),
            pow: ProofOfWork::new(config.mining.difficulty),
            config,
            node_id,
            peers,
            chain_source,
            shutdown,
            mining_cancel,
            blocks_mined: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Identity credited with this node's mining rewards.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    /// Validate a client transaction, check the sender's balance and queue it.
    ///
    /// Returns the index of the block the transaction will land in.
    /// The balance check counts confirmed blocks only, not other pending transfers.
    pub async fn submit_transaction(&self, request: NewTransaction) -> Result<u64> {
        let tx = request.validate()?;

        let mut ledger = self.ledger.write().await;
        ensure_sufficient_balance(&ledger, &tx)?;
        let index = ledger.submit_transaction(tx);

        debug!(index, pending = ledger.pending().len(), "transaction queued");
        Ok(index)
    }

    /// Find a proof on top of the current tip and seal the pending pool.
    ///
    /// The search runs on the blocking pool without holding the ledger lock.
    /// If the tip moves meanwhile, the search starts over on the new tip.
    pub async fn mine(&self) -> Result<MineOutcome> {
        let pow = self.pow;
        let budget = self.config.mining.search_budget();
        self.mine_with(Arc::new(move |previous_proof: u64, token: &CancellationToken| {
            match budget {
                Some(budget) => pow.search_with_deadline(previous_proof, token, budget),
                None => pow.search(previous_proof, token),
            }
        }))
        .await
    }

    async fn mine_with(&self, search: ProofSearch) -> Result<MineOutcome> {
        loop {
            let (tip_hash, tip_proof) = {
                let ledger = self.ledger.read().await;
                let tip = ledger.tip()?;
                (tip.hash()?, tip.proof)
            };

            let token = self.mining_cancel.lock().clone();
            let search = search.clone();
            let outcome = tokio::task::spawn_blocking(move || search(tip_proof, &token))
                .await
                .map_err(|e| ChainError::Internal(format!("proof search task failed: {}", e)))?;

            let proof = match outcome {
                SearchOutcome::Found { proof, .. } => proof,
                SearchOutcome::Cancelled { attempts } => {
                    info!(attempts, "mining cancelled");
                    return Ok(MineOutcome::Cancelled);
                }
            };

            let mut ledger = self.ledger.write().await;
            if ledger.tip()?.hash()? != tip_hash {
                debug!("tip moved during proof search, searching again");
                continue;
            }

            let mining = &self.config.mining;
            ledger.submit_transaction(Transaction::transfer(
                self.node_id.clone(),
                mining.fee_receiver.clone(),
                mining.fee_amount,
            ));
            ledger.submit_transaction(Transaction::reward(
                self.node_id.clone(),
                mining.reward_amount,
            ));
            let block = ledger.seal_block(proof, tip_hash);

            self.blocks_mined.fetch_add(1, Ordering::Relaxed);
            return Ok(MineOutcome::Mined(block));
        }
    }

    /// Stop every proof search currently running. Later calls to `mine` are unaffected.
    pub fn cancel_mining(&self) {
        let mut token = self.mining_cancel.lock();
        token.cancel();
        *token = self.shutdown.child_token();
    }

    /// Cancel in-flight searches for good.
    pub fn shutdown(&self) {
        info!("node shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Copy of the full chain.
    pub async fn chain(&self) -> Vec<Block> {
        self.ledger.read().await.chain().to_vec()
    }

    pub async fn height(&self) -> u64 {
        self.ledger.read().await.len() as u64
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending().to_vec()
    }

    pub async fn validate_chain(&self) -> bool {
        let ledger = self.ledger.read().await;
        is_chain_valid(ledger.chain(), &self.pow)
    }

    pub async fn balance_of(&self, identity: &str) -> i64 {
        self.ledger.read().await.balance_of(identity)
    }

    pub fn register_peer(&self, address: &str) -> Result<PeerAddress> {
        let (peer, inserted) = self.peers.register(address)?;
        if inserted {
            info!(peer = %peer, total = self.peers.len(), "registered peer");
        }
        Ok(peer)
    }

    /// Register a batch of peers. A single bad address rejects the whole batch.
    pub fn register_peers<S: AsRef<str>>(&self, addresses: &[S]) -> Result<usize> {
        let added = self.peers.register_all(addresses)?;
        if added > 0 {
            info!(added, total = self.peers.len(), "registered peers");
        }
        Ok(added)
    }

    pub fn peers(&self) -> Vec<PeerAddress> {
        self.peers.snapshot()
    }

    /// Ask every known peer for its chain and adopt the longest valid one.
    ///
    /// Unreachable or misbehaving peers are skipped. The decision is made
    /// under the write lock against whatever the local chain is by then.
    pub async fn reconcile_with_peers(&self) -> Result<Reconciliation> {
        let peers = self.peers.snapshot();
        let fetched = fetch_peer_chains(
            self.chain_source.as_ref(),
            &peers,
            self.config.network.peer_timeout(),
        )
        .await;

        let mut ledger = self.ledger.write().await;
        let result = reconcile(ledger.chain(), fetched, &self.pow);
        if result.adopted {
            ledger.replace_chain(result.chain.clone())?;
        }
        Ok(result)
    }
}
