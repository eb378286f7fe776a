//! Lookup handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, error};

use super::types::{ErrorResponse, GatewayState, GeoQuery};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `GET /geo?ip=...`: the stored record for one IP address
pub async fn geo_handler(
    State(state): State<GatewayState>,
    Query(query): Query<GeoQuery>,
) -> Response {
    let ip = match query.ip.as_deref().map(str::trim) {
        Some(ip) if !ip.is_empty() => ip,
        _ => return error_response(StatusCode::BAD_REQUEST, "missing query parameter 'ip'"),
    };

    match state.search.by_ip(ip).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => {
            debug!("No record for {ip}");
            error_response(StatusCode::NOT_FOUND, format!("no record for {ip}"))
        }
        Err(e) => {
            error!("Lookup of {ip} failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        }
    }
}

/// `GET /health`
pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}
