//! Gateway data structures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::RecordSearch;

/// Shared state for the gateway
#[derive(Clone)]
pub struct GatewayState {
    /// Backend answering key lookups
    pub search: Arc<dyn RecordSearch>,
}

/// Query string of `GET /geo`
#[derive(Debug, Deserialize)]
pub struct GeoQuery {
    /// Key to look up; missing or blank is a bad request
    pub ip: Option<String>,
}

/// JSON body of every non-200 response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
}
