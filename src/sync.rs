//! Chain reconciliation for Montycoin
//!
//! Nodes agree by the longest-chain rule: a peer's chain replaces the local
//! one only when it is strictly longer and passes full validation.
//! This module provides:
//! - the `{length, chain}` exchange format served by every node
//! - a [`ChainSource`] abstraction with an HTTP implementation
//! - concurrent, individually time-boxed peer queries
//! - the pure [`reconcile`] decision

use crate::blockchain::{validate_chain, Block};
use crate::error::{ChainError, Result};
use crate::miner::ProofOfWork;
use crate::network::PeerAddress;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A peer's full chain as served on `GET /get_chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerChain {
    pub length: u64,
    pub chain: Vec<Block>,
}

impl PeerChain {
    pub fn new(chain: Vec<Block>) -> Self {
        PeerChain {
            length: chain.len() as u64,
            chain,
        }
    }

    /// Reject responses whose reported length disagrees with the blocks sent.
    pub fn check_consistent(&self, peer: &PeerAddress) -> Result<()> {
        if self.length != self.chain.len() as u64 {
            return Err(ChainError::MalformedPeerResponse {
                peer: peer.addr(),
                reason: format!(
                    "reported length {} but sent {} blocks",
                    self.length,
                    self.chain.len()
                ),
            });
        }
        Ok(())
    }
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub adopted: bool,
    pub chain: Vec<Block>,
}

/// Pick the longest valid chain among `local` and the peers' chains.
///
/// Peers must be strictly longer than the best seen so far; ties keep the
/// earlier candidate (the local chain first of all).
pub fn reconcile<I>(local: &[Block], peer_chains: I, pow: &ProofOfWork) -> Reconciliation
where
    I: IntoIterator<Item = PeerChain>,
{
    let mut best_length = local.len();
    let mut best: Option<Vec<Block>> = None;

    for candidate in peer_chains {
        let length = candidate.chain.len();
        if length <= best_length {
            debug!(length, best_length, "peer chain not longer, skipping");
            continue;
        }

        match validate_chain(&candidate.chain, pow) {
            Ok(()) => {
                best_length = length;
                best = Some(candidate.chain);
            }
            Err(e) => warn!(length, error = %e, "rejecting invalid peer chain"),
        }
    }

    match best {
        Some(chain) => {
            info!(
                local_length = local.len(),
                adopted_length = chain.len(),
                "adopting longer peer chain"
            );
            Reconciliation {
                adopted: true,
                chain,
            }
        }
        None => Reconciliation {
            adopted: false,
            chain: local.to_vec(),
        },
    }
}

/// Anything that can hand back a peer's chain.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<PeerChain>;
}

/// Fetches `GET http://<peer>/get_chain`.
#[derive(Debug, Clone)]
pub struct HttpChainSource {
    client: reqwest::Client,
}

impl HttpChainSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ChainError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(HttpChainSource { client })
    }
}

#[async_trait]
impl ChainSource for HttpChainSource {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<PeerChain> {
        let url = format!("{}/get_chain", peer.base_url());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::UnreachablePeer {
                peer: peer.addr(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChainError::MalformedPeerResponse {
                peer: peer.addr(),
                reason: format!("status {}", response.status()),
            });
        }

        let body = response
            .json::<PeerChain>()
            .await
            .map_err(|e| ChainError::MalformedPeerResponse {
                peer: peer.addr(),
                reason: e.to_string(),
            })?;

        body.check_consistent(peer)?;
        Ok(body)
    }
}

/// Query every peer concurrently, each under its own timeout.
///
/// Peers that fail are left out of the result. Unreachable or misbehaving
/// peers are routine and logged as warnings, anything else as an error.
pub async fn fetch_peer_chains<S>(source: &S, peers: &[PeerAddress], timeout: Duration) -> Vec<PeerChain>
where
    S: ChainSource + ?Sized,
{
    let requests = peers.iter().map(|peer| async move {
        let result = match tokio::time::timeout(timeout, source.fetch_chain(peer)).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::UnreachablePeer {
                peer: peer.addr(),
                reason: format!("no response within {} ms", timeout.as_millis()),
            }),
        };
        (peer, result)
    });

    join_all(requests)
        .await
        .into_iter()
        .filter_map(|(peer, result)| match result {
            Ok(chain) => {
                debug!(peer = %peer, length = chain.length, "fetched peer chain");
                Some(chain)
            }
            Err(e) if e.is_peer_failure() => {
                warn!(peer = %peer, error = %e, "skipping peer");
                None
            }
            Err(e) => {
                error!(peer = %peer, error = %e, "unexpected failure querying peer, skipping");
                None
            }
        })
        .collect()
}
