//! HTTP API server for the vpnpay node.
//!
//! Reads are served from the shared ledger; opens, vouchers and refunds
//! are sent to the node event loop as `NodeCommand`s.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use vpnpay_core::{AccountId, SessionId, SignedVoucher};
use vpnpay_settlement::{
    Command, CommandOutcome, IEscrow, OpenSessionRequest, RefundResult, SessionLedgerEntry,
    SettlementError, SettlementResult,
};

use crate::commands::NodeCommand;
use crate::state::NodeState;

// --- Request / response types ---

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: u64,
    pub sessions: usize,
    pub active_sessions: usize,
    pub escrow: String,
    pub refund_timeout_secs: u64,
    pub min_collateral: u64,
}

#[derive(Deserialize)]
pub struct SubmitVoucherRequest {
    /// Session to settle against; defaults to the voucher's own session.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub voucher: SignedVoucher,
}

#[derive(Deserialize)]
pub struct SubmitWireVoucherRequest {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Base64 protobuf `SignedVoucher`.
    pub wire: String,
}

#[derive(Deserialize)]
pub struct RefundRequest {
    pub session_id: SessionId,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub account: AccountId,
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

/// HTTP status for a rejected ledger operation.
pub fn status_for(err: &SettlementError) -> StatusCode {
    match err {
        SettlementError::StaleVoucher { .. }
        | SettlementError::SessionClosed(_)
        | SettlementError::SessionExists(_) => StatusCode::CONFLICT,
        SettlementError::SignatureInvalid(_) => StatusCode::UNAUTHORIZED,
        SettlementError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl From<SettlementError> for ErrorResponse {
    fn from(err: SettlementError) -> Self {
        Self {
            code: err.code().into(),
            error: err.to_string(),
        }
    }
}

fn settlement_error(err: SettlementError) -> ApiError {
    (status_for(&err), Json(err.into()))
}

// --- Handlers ---

async fn handle_status(State(state): State<Arc<NodeState>>) -> Json<StatusResponse> {
    let policy = state.manager.policy();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.session_count(),
        active_sessions: state.active_session_count(),
        escrow: state.manager.escrow().escrow_id().to_string(),
        refund_timeout_secs: policy.refund_timeout_secs,
        min_collateral: policy.min_collateral,
    })
}

async fn handle_open_session(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<Json<SessionLedgerEntry>, ApiError> {
    match send_command_and_await(&state, Command::OpenSession(req)).await? {
        CommandOutcome::Opened(entry) => Ok(Json(entry)),
        other => Err(unexpected(other)),
    }
}

async fn handle_get_session(
    State(state): State<Arc<NodeState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionLedgerEntry>, ApiError> {
    let session_id = SessionId::from_hex(&session_id)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "invalid_session_id", e.to_string()))?;
    state
        .manager
        .session(&session_id)
        .map(Json)
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "session_not_found",
                format!("no session {}", session_id),
            )
        })
}

async fn handle_submit_voucher(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<SubmitVoucherRequest>,
) -> Result<Json<SettlementResult>, ApiError> {
    settle(&state, req.session_id, req.voucher).await
}

async fn handle_submit_wire_voucher(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<SubmitWireVoucherRequest>,
) -> Result<Json<SettlementResult>, ApiError> {
    let voucher = SignedVoucher::from_wire_base64(&req.wire)
        .map_err(|e| settlement_error(e.into()))?;
    settle(&state, req.session_id, voucher).await
}

async fn settle(
    state: &Arc<NodeState>,
    session_id: Option<SessionId>,
    voucher: SignedVoucher,
) -> Result<Json<SettlementResult>, ApiError> {
    let session_id = session_id.unwrap_or_else(|| voucher.voucher.session_id.clone());
    let command = Command::Voucher {
        session_id,
        voucher,
    };
    match send_command_and_await(state, command).await? {
        CommandOutcome::Settled(result) => Ok(Json(result)),
        other => Err(unexpected(other)),
    }
}

async fn handle_refund(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundResult>, ApiError> {
    let command = Command::Refund {
        session_id: req.session_id,
    };
    match send_command_and_await(&state, command).await? {
        CommandOutcome::Refunded(result) => Ok(Json(result)),
        other => Err(unexpected(other)),
    }
}

async fn handle_get_account(
    State(state): State<Arc<NodeState>>,
    Path(account): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = AccountId::new(account)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "invalid_account", e.to_string()))?;
    let balance = state.manager.escrow().balance(&account);
    Ok(Json(AccountResponse { account, balance }))
}

fn unexpected(outcome: CommandOutcome) -> ApiError {
    tracing::error!(?outcome, "event loop returned mismatched outcome");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "unexpected command outcome",
    )
}

/// Send a ledger command to the event loop and await the reply.
async fn send_command_and_await(
    state: &Arc<NodeState>,
    command: Command,
) -> Result<CommandOutcome, ApiError> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();

    let cmd = NodeCommand::Execute {
        command,
        reply: reply_tx,
    };

    state.command_tx.send(cmd).await.map_err(|_| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "node event loop not running",
        )
    })?;

    match reply_rx.await {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => Err(settlement_error(e)),
        Err(_) => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "event loop dropped the reply channel",
        )),
    }
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/sessions", post(handle_open_session))
        .route("/api/v1/sessions/{session_id}", get(handle_get_session))
        .route("/api/v1/vouchers", post(handle_submit_voucher))
        .route("/api/v1/vouchers/wire", post(handle_submit_wire_voucher))
        .route("/api/v1/refunds", post(handle_refund))
        .route("/api/v1/accounts/{account}", get(handle_get_account))
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<NodeState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
