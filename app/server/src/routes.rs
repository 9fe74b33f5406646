//! HTTP surface. Thin: every handler delegates to the resolution engine
//! or the node client.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::addresses::{self, SourceStatus};
use crate::node::TransactionSource;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn TransactionSource>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub block_hash: Option<String>,
}

pub fn router(source: Arc<dyn TransactionSource>) -> Router {
    Router::new()
        .route("/", get(|| async { "AddressBridge is running" }))
        .route("/health", get(|| async { (StatusCode::OK, "OK") }))
        .route("/health/node", get(node_health))
        .route("/addresses/:addresses/transactions", get(address_transactions))
        .with_state(AppState { source })
}

async fn node_health(State(state): State<AppState>) -> Response {
    match state.source.ping().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(err) => {
            error!("Node health check failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, "Node unavailable").into_response()
        }
    }
}

async fn address_transactions(
    State(state): State<AppState>,
    Path(addresses): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> Response {
    let watched = parse_address_list(&addresses);

    if watched.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "no addresses given" })),
        )
            .into_response();
    }

    info!("Resolving transactions for {} address(es)", watched.len());

    let (result, status) =
        addresses::resolve(state.source.as_ref(), &watched, query.block_hash.as_deref()).await;

    // Degradation is invisible on the wire; the caller always gets a
    // well-formed, possibly empty, result set.
    if status == SourceStatus::Degraded {
        warn!("Transaction source degraded; returning empty result set");
    }

    (StatusCode::OK, Json(result)).into_response()
}

fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
