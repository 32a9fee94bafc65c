//! HTTP interface for a Montycoin node
//!
//! Route names and response shapes follow the existing network so that
//! nodes of either implementation can query each other's `/get_chain`.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::{MineOutcome, Node};
use crate::sync::PeerChain;
use crate::transaction::{NewTransaction, Transaction};

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    MiningCancelled,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => {
                let status = match &e {
                    ChainError::MalformedTransaction(_)
                    | ChainError::InsufficientBalance { .. }
                    | ChainError::InvalidPeerAddress(_) => StatusCode::BAD_REQUEST,
                    ChainError::UnreachablePeer { .. }
                    | ChainError::MalformedPeerResponse { .. }
                    | ChainError::InvalidChain { .. } => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                }
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::MiningCancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Mining was cancelled before a proof was found".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub timestamp: String,
    pub proof: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        MineResponse {
            message: "Congratulations, you just mined a block!".to_string(),
            index: block.index,
            timestamp: block.timestamp,
            proof: block.proof,
            previous_hash: block.previous_hash,
            transactions: block.transactions,
        }
    }
}

#[derive(Serialize)]
pub struct ValidityResponse {
    pub message: String,
    pub valid: bool,
}

#[derive(Serialize)]
pub struct TransactionAccepted {
    pub message: String,
    pub index: u64,
}

#[derive(Deserialize)]
pub struct ConnectNodesRequest {
    #[serde(default)]
    pub nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct ConnectNodesResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ReplaceChainResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chain: Option<Vec<Block>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_chain: Option<Vec<Block>>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub identity: String,
    pub balance: i64,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the router with all endpoints.
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        // Chain endpoints
        .route("/get_chain", get(get_chain))
        .route("/confirm_chain", get(confirm_chain))
        .route("/replace_chain", get(replace_chain))
        // Mining
        .route("/mine_block", get(mine_block))
        // Transactions and balances
        .route("/add_transaction", post(add_transaction))
        .route("/balance/:identity", get(get_balance))
        // Peers
        .route("/connect_node", post(connect_node))
        .route("/peers", get(get_peers))
        // System
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn run_api_server<F>(
    node: Arc<Node>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_api_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "node_id": node.node_id(),
        "height": node.height().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_chain(State(node): State<Arc<Node>>) -> Json<PeerChain> {
    Json(PeerChain::new(node.chain().await))
}

async fn mine_block(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    match node.mine().await? {
        MineOutcome::Mined(block) => Ok(Json(block.into())),
        MineOutcome::Cancelled => Err(ApiError::MiningCancelled),
    }
}

async fn confirm_chain(State(node): State<Arc<Node>>) -> Json<ValidityResponse> {
    let valid = node.validate_chain().await;
    let message = if valid {
        "All good. The Blockchain is valid."
    } else {
        "Houston, we have a problem. The Blockchain is not valid."
    };
    Json(ValidityResponse {
        message: message.to_string(),
        valid,
    })
}

async fn add_transaction(
    State(node): State<Arc<Node>>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionAccepted>), ApiError> {
    let Json(request) = payload?;
    let index = node.submit_transaction(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionAccepted {
            message: format!("This transaction will be added to Block {}", index),
            index,
        }),
    ))
}

async fn connect_node(
    State(node): State<Arc<Node>>,
    payload: Result<Json<ConnectNodesRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConnectNodesResponse>), ApiError> {
    let Json(request) = payload?;
    let nodes = request
        .nodes
        .ok_or_else(|| ApiError::InvalidInput("No node".to_string()))?;

    node.register_peers(&nodes)?;

    Ok((
        StatusCode::CREATED,
        Json(ConnectNodesResponse {
            message: "All the nodes are now connected. The Montycoin Blockchain now contains the following nodes:".to_string(),
            total_nodes: node.peers().iter().map(|p| p.addr()).collect(),
        }),
    ))
}

async fn replace_chain(State(node): State<Arc<Node>>) -> Result<Json<ReplaceChainResponse>, ApiError> {
    let result = node.reconcile_with_peers().await?;

    let response = if result.adopted {
        ReplaceChainResponse {
            message: "The nodes had different chains so the chain was replaced by the longest one."
                .to_string(),
            new_chain: Some(result.chain),
            actual_chain: None,
        }
    } else {
        ReplaceChainResponse {
            message: "All good. The chain is the largest one.".to_string(),
            new_chain: None,
            actual_chain: Some(result.chain),
        }
    };
    Ok(Json(response))
}

async fn get_balance(
    State(node): State<Arc<Node>>,
    Path(identity): Path<String>,
) -> Json<BalanceResponse> {
    let balance = node.balance_of(&identity).await;
    Json(BalanceResponse { identity, balance })
}

async fn get_peers(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let peers: Vec<String> = node.peers().iter().map(|p| p.addr()).collect();
    Json(serde_json::json!({
        "count": peers.len(),
        "peers": peers
    }))
}
