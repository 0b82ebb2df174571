//! Status Routes
//!
//! Read-only views of the liveness monitor.
//!
//! - GET /api/v1/status - Current liveness summary
//! - GET /api/v1/history - History window, oldest first

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{HistoryQuery, HistoryResponse, StatusResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.monitor.snapshot();
    Json(StatusResponse::from_snapshot(&snapshot))
}

/// GET /api/v1/history?limit=N
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let snapshot = state.monitor.snapshot();

    let readings = match query.limit {
        Some(0) => {
            return Err(ApiError::Validation(
                "limit must be greater than zero".to_string(),
            ))
        }
        Some(limit) => {
            let skip = snapshot.history.len().saturating_sub(limit);
            snapshot.history.into_iter().skip(skip).collect()
        }
        None => snapshot.history,
    };

    Ok(Json(HistoryResponse {
        state: snapshot.state,
        count: readings.len(),
        readings,
    }))
}
