//! Address sync endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::UserResponse;
use crate::sync::{AddressSyncService, SyncStats, SyncStatus};
use crate::AppState;

use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct SyncRunResponse {
    pub success: bool,
    pub message: String,
    pub stats: SyncStats,
}

#[derive(Debug, Serialize)]
pub struct SyncUserResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

fn service(state: &AppState) -> AddressSyncService {
    AddressSyncService::new(state.db.clone(), state.config.sync.batch_limit)
}

/// POST /api/sync-addresses
pub async fn sync_addresses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncRunResponse>, ApiError> {
    let stats = service(&state).sync_all().await?;

    Ok(Json(SyncRunResponse {
        success: true,
        message: format!(
            "Synced {} of {} qualification addresses",
            stats.synced_count, stats.total_qualifications
        ),
        stats,
    }))
}

/// GET /api/sync-addresses/status
pub async fn sync_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncStatus>, ApiError> {
    Ok(Json(service(&state).status().await?))
}

/// POST /api/sync-addresses/user/:user_id
pub async fn sync_user_address(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<SyncUserResponse>, ApiError> {
    let user = service(&state).sync_user(&user_id).await?;

    Ok(Json(SyncUserResponse {
        success: true,
        message: "Address synced successfully".to_string(),
        user: UserResponse::from(user),
    }))
}
