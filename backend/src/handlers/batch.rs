//! HTTP handlers for batch endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{Batch, Movement};
use uuid::Uuid;

use super::inventory::{BatchResponse, MessageResponse};
use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::stock::BatchOperationInput;
use crate::services::StockLedgerService;
use crate::AppState;

/// Get a batch
pub async fn get_batch(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let service = StockLedgerService::new(state.db);
    let batch = service.get_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Apply an entry, exit or damage operation
pub async fn apply_batch_operation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<BatchOperationInput>,
) -> AppResult<Json<BatchResponse>> {
    let service = StockLedgerService::new(state.db);
    let batch = service
        .apply_batch_operation(batch_id, current_user.0.acting_user(), input)
        .await?;
    Ok(Json(BatchResponse {
        message: "Batch operation applied successfully".to_string(),
        batch,
    }))
}

/// List a batch's movements, oldest first
pub async fn list_batch_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<Movement>>> {
    let service = StockLedgerService::new(state.db);
    let movements = service.list_batch_movements(batch_id).await?;
    Ok(Json(movements))
}

/// Delete a batch that is no longer in use
pub async fn delete_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    require_admin(&current_user.0)?;
    let service = StockLedgerService::new(state.db);
    service.delete_batch(batch_id).await?;
    Ok(Json(MessageResponse::new("Batch deleted successfully")))
}
