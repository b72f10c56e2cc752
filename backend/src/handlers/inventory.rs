//! HTTP handlers for inventory item endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::{Batch, InventoryDetail, InventoryItem, StockDiscrepancy};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::stock::{CreateBatchInput, CreateInventoryInput, UpdateInventoryInput};
use crate::services::StockLedgerService;
use crate::AppState;

/// Response for a created inventory item
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryResponse {
    pub message: String,
    pub inventory: InventoryItem,
    pub is_existing: bool,
}

/// Response carrying an inventory item
#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub message: String,
    pub inventory: InventoryItem,
}

/// Response carrying a batch
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub message: String,
    pub batch: Batch,
}

/// Response with only a message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Create an inventory item
pub async fn create_inventory_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateInventoryInput>,
) -> AppResult<(StatusCode, Json<CreateInventoryResponse>)> {
    let service = StockLedgerService::new(state.db);
    let inventory = service.create_inventory_item(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateInventoryResponse {
            message: "Inventory item created successfully".to_string(),
            inventory,
            is_existing: false,
        }),
    ))
}

/// List inventory items
pub async fn list_inventory_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = StockLedgerService::new(state.db);
    let items = service.list_inventory_items().await?;
    Ok(Json(items))
}

/// Get an inventory item with its batches
pub async fn get_inventory_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<InventoryDetail>> {
    let service = StockLedgerService::new(state.db);
    let detail = service.get_inventory_item(inventory_id).await?;
    Ok(Json(detail))
}

/// Update an inventory item's catalog fields
pub async fn update_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<UpdateInventoryInput>,
) -> AppResult<Json<InventoryResponse>> {
    require_admin(&current_user.0)?;
    let service = StockLedgerService::new(state.db);
    let inventory = service.update_inventory_item(inventory_id, input).await?;
    Ok(Json(InventoryResponse {
        message: "Inventory item updated successfully".to_string(),
        inventory,
    }))
}

/// Delete an inventory item and its (inactive) batches
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    require_admin(&current_user.0)?;
    let service = StockLedgerService::new(state.db);
    service.delete_inventory_item(inventory_id).await?;
    Ok(Json(MessageResponse::new(
        "Inventory item and its batches deleted successfully",
    )))
}

/// Open a new batch for an inventory item
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<(StatusCode, Json<BatchResponse>)> {
    let service = StockLedgerService::new(state.db);
    let batch = service
        .create_batch(inventory_id, current_user.0.acting_user(), input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BatchResponse {
            message: "Batch created successfully".to_string(),
            batch,
        }),
    ))
}

/// Report items whose recorded stock drifted from their batches
pub async fn reconcile_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockDiscrepancy>>> {
    require_admin(&current_user.0)?;
    let service = StockLedgerService::new(state.db);
    let discrepancies = service.reconcile_stock().await?;
    Ok(Json(discrepancies))
}
