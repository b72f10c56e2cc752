//! HTTP handlers for petty cash endpoints

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::ledger::CashAudit;
use shared::{CashSummary, PettyCashMovement};

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::petty_cash::{CashOperationInput, CashSummaryQuery};
use crate::services::PettyCashService;
use crate::AppState;

/// Current petty cash balance
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub current_balance: Decimal,
}

/// Response for a registered movement
#[derive(Debug, Serialize)]
pub struct MovementResponse {
    pub message: String,
    pub movement: PettyCashMovement,
}

/// Get the current balance
pub async fn get_current_balance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<BalanceResponse>> {
    let service = PettyCashService::new(state.db);
    let current_balance = service.get_current_balance().await?;
    Ok(Json(BalanceResponse { current_balance }))
}

/// List movements, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<PettyCashMovement>>> {
    let service = PettyCashService::new(state.db);
    let movements = service.list_movements().await?;
    Ok(Json(movements))
}

/// Register an income or expense
pub async fn apply_cash_operation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CashOperationInput>,
) -> AppResult<(StatusCode, Json<MovementResponse>)> {
    let service = PettyCashService::new(state.db);
    let movement = service
        .apply_cash_operation(current_user.0.acting_user(), input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MovementResponse {
            message: "Movement registered successfully".to_string(),
            movement,
        }),
    ))
}

/// Totals for an optional date window
pub async fn get_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<CashSummaryQuery>,
) -> AppResult<Json<CashSummary>> {
    let service = PettyCashService::new(state.db);
    let summary = service.summarize(query).await?;
    Ok(Json(summary))
}

/// Verify the balance chain of the whole ledger
pub async fn audit_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<CashAudit>> {
    require_admin(&current_user.0)?;
    let service = PettyCashService::new(state.db);
    let audit = service.audit_ledger().await?;
    Ok(Json(audit))
}

/// Download the ledger as CSV
pub async fn export_csv(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&current_user.0)?;
    let service = PettyCashService::new(state.db);
    let csv = service.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"petty-cash.csv\"",
            ),
        ],
        csv,
    ))
}
