//! Reconciliation between live nodes over HTTP

use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use montycoin::api::build_api_router;
use montycoin::blockchain::is_chain_valid;
use montycoin::config::Config;
use montycoin::error::{ChainError, Result};
use montycoin::network::PeerAddress;
use montycoin::node::{MineOutcome, Node};
use montycoin::sync::{ChainSource, PeerChain};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

fn config(node_id: &str) -> Config {
    let mut config = Config::default();
    config.mining.difficulty = 2;
    config.mining.node_id = node_id.to_string();
    config.network.peer_timeout_ms = 1_000;
    config
}

async fn mine_blocks(node: &Node, count: usize) {
    for _ in 0..count {
        match node.mine().await.expect("mining failed") {
            MineOutcome::Mined(_) => {}
            MineOutcome::Cancelled => panic!("mining was cancelled"),
        }
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

async fn spawn_peer(node_id: &str, blocks: usize) -> (Arc<Node>, SocketAddr) {
    let node = Arc::new(Node::new(config(node_id)).expect("Failed to create peer"));
    mine_blocks(&node, blocks).await;
    let addr = serve(build_api_router(node.clone())).await;
    (node, addr)
}

#[tokio::test]
async fn test_adopts_longest_chain_from_live_peers() {
    tokio::time::timeout(Duration::from_secs(30), async {
        let (_short_peer, short_addr) = spawn_peer("short", 1).await;
        let (long_peer, long_addr) = spawn_peer("long", 3).await;

        let local = Node::new(config("local")).unwrap();
        mine_blocks(&local, 1).await;

        local.register_peer(&format!("http://{}/", short_addr)).unwrap();
        local.register_peer(&format!("http://{}/get_chain", long_addr)).unwrap();
        // Nothing listens on port 1.
        local.register_peer("127.0.0.1:1").unwrap();

        let result = local.reconcile_with_peers().await.unwrap();
        assert!(result.adopted);
        assert_eq!(local.chain().await, long_peer.chain().await);
        assert_eq!(local.height().await, 4);
        assert!(local.validate_chain().await);

        // A second pass finds nothing longer.
        let again = local.reconcile_with_peers().await.unwrap();
        assert!(!again.adopted);
    })
    .await
    .expect("test_adopts_longest_chain_from_live_peers timed out");
}

#[tokio::test]
async fn test_skips_malformed_and_invalid_peers() {
    tokio::time::timeout(Duration::from_secs(30), async {
        let garbage = serve(Router::new().route("/get_chain", get(|| async { "not a chain" }))).await;

        let mut strict_config = config("strict");
        strict_config.mining.difficulty = 6;
        let local = Node::new(strict_config).unwrap();

        // Peer chains mined at difficulty 2 do not hold up at difficulty 6.
        let (_easy_peer, easy_addr) = spawn_peer("easy", 3).await;

        local.register_peer(&garbage.to_string()).unwrap();
        local.register_peer(&easy_addr.to_string()).unwrap();

        let before = local.chain().await;
        let result = local.reconcile_with_peers().await.unwrap();
        assert!(!result.adopted);
        assert_eq!(local.chain().await, before);
    })
    .await
    .expect("test_skips_malformed_and_invalid_peers timed out");
}

#[tokio::test]
async fn test_tampered_copy_fails_validation() {
    let node = Node::new(config("tamper")).unwrap();
    mine_blocks(&node, 2).await;

    let mut copy = node.chain().await;
    let pow = node.proof_of_work();
    assert!(is_chain_valid(&copy, pow));

    let previous_proof = copy[1].proof;
    copy[2].proof = (copy[2].proof + 1..)
        .find(|p| !pow.is_valid(*p, previous_proof))
        .unwrap();
    assert!(!is_chain_valid(&copy, pow));

    // The node's own chain is untouched.
    assert!(node.validate_chain().await);
}

/// Serves fixed chains keyed by peer address.
struct FixedChains(Vec<(PeerAddress, PeerChain)>);

#[async_trait]
impl ChainSource for FixedChains {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<PeerChain> {
        self.0
            .iter()
            .find(|(addr, _)| addr == peer)
            .map(|(_, chain)| chain.clone())
            .ok_or_else(|| ChainError::UnreachablePeer {
                peer: peer.addr(),
                reason: "not listening".to_string(),
            })
    }
}

#[tokio::test]
async fn test_reconcile_through_stub_source() {
    tokio::time::timeout(Duration::from_secs(30), async {
        let short = Node::new(config("short")).unwrap();
        mine_blocks(&short, 1).await;
        let long = Node::new(config("long")).unwrap();
        mine_blocks(&long, 3).await;

        let short_addr = PeerAddress::new("10.0.0.1", 5000);
        let long_addr = PeerAddress::new("10.0.0.2", 5000);
        let source = FixedChains(vec![
            (short_addr.clone(), PeerChain::new(short.chain().await)),
            (long_addr.clone(), PeerChain::new(long.chain().await)),
        ]);

        let local = Node::with_chain_source(config("local"), Arc::new(source)).unwrap();
        local.register_peer("http://10.0.0.1:5000/").unwrap();
        local.register_peer("10.0.0.2:5000/get_chain").unwrap();
        local.register_peer("10.0.0.2:5000").unwrap();
        local.register_peer("10.0.0.3:5000").unwrap();
        assert_eq!(local.peers().len(), 3);

        let result = local.reconcile_with_peers().await.unwrap();
        assert!(result.adopted);
        assert_eq!(local.chain().await, long.chain().await);

        // Pending work survives the swap and lands on the adopted chain.
        local
            .submit_transaction(montycoin::transaction::NewTransaction::new("long", "B", 5))
            .await
            .unwrap();
        mine_blocks(&local, 1).await;
        assert_eq!(local.height().await, 5);
        assert_eq!(local.balance_of("B").await, 5);
        assert!(local.validate_chain().await);
    })
    .await
    .expect("test_reconcile_through_stub_source timed out");
}
