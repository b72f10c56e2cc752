//! WebAssembly module for the Pantry Ledger dashboard
//!
//! Lets the dashboard check a form before it is sent:
//! - Batch operation previews (resulting quantity and status)
//! - Petty cash previews (resulting balance)
//! - Field validation for items and cash movements

use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use shared::ledger::{cash, stock, BatchOperation};
use shared::{Actor, Batch, CashMovementType, LedgerError, LedgerResult, PettyCashMovement};
use wasm_bindgen::prelude::*;

fn parse_decimal(field: &str, value: &str) -> LedgerResult<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|_| LedgerError::validation(field, format!("'{}' is not a number", value)))
}

fn to_js(err: LedgerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Batch state after applying an operation, as JSON
pub fn batch_operation_preview(
    batch_json: &str,
    operation: &str,
    quantity: &str,
) -> LedgerResult<String> {
    let mut batch: Batch = serde_json::from_str(batch_json)
        .map_err(|e| LedgerError::validation("batch", format!("Invalid batch JSON: {}", e)))?;
    let movement_type = stock::parse_operation(operation)?;
    let quantity = parse_decimal("quantity", quantity)?;

    let change = stock::apply_operation(
        &mut batch,
        BatchOperation {
            movement_type,
            quantity,
            reason: None,
            actor: Actor::Online,
        },
        Utc::now(),
    )?;

    Ok(json!({
        "quantity": batch.quantity,
        "status": batch.status,
        "stockDelta": change.stock_delta,
        "reason": change.movement.reason,
    })
    .to_string())
}

/// Balances after registering a cash movement, as JSON
pub fn cash_operation_preview(
    current_balance: &str,
    movement_type: &str,
    amount: &str,
) -> LedgerResult<String> {
    let balance = parse_decimal("currentBalance", current_balance)?;
    let movement_type = CashMovementType::parse(movement_type).ok_or_else(|| {
        LedgerError::validation("type", "Invalid movement type, use: ingreso, egreso")
    })?;
    let amount = parse_decimal("amount", amount)?;
    let posting = cash::post(balance, movement_type, amount)?;

    Ok(json!({
        "previousBalance": posting.previous_balance,
        "currentBalance": posting.current_balance,
    })
    .to_string())
}

/// Preview a batch operation
#[wasm_bindgen]
pub fn preview_batch_operation(
    batch_json: &str,
    operation: &str,
    quantity: &str,
) -> Result<String, JsValue> {
    batch_operation_preview(batch_json, operation, quantity).map_err(to_js)
}

/// Preview a petty cash movement
#[wasm_bindgen]
pub fn preview_cash_operation(
    current_balance: &str,
    movement_type: &str,
    amount: &str,
) -> Result<String, JsValue> {
    cash_operation_preview(current_balance, movement_type, amount).map_err(to_js)
}

/// Summarize a list of petty cash movements
#[wasm_bindgen]
pub fn summarize_cash_movements(movements_json: &str) -> Result<String, JsValue> {
    let movements: Vec<PettyCashMovement> = serde_json::from_str(movements_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid movements JSON: {}", e)))?;
    let summary = cash::summarize(&movements, Decimal::ZERO).map_err(to_js)?;
    serde_json::to_string(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn is_valid_item_name(name: &str) -> bool {
    shared::validate_item_name(name).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_cash_reason(reason: &str) -> bool {
    shared::validate_cash_reason(reason).is_ok()
}

/// Check batch dates given as `YYYY-MM-DD`; an empty expiration means none
#[wasm_bindgen]
pub fn are_valid_batch_dates(purchase_date: &str, expiration_date: &str) -> bool {
    let Ok(purchase) = NaiveDate::from_str(purchase_date) else {
        return false;
    };
    let expiration = match expiration_date.trim() {
        "" => None,
        s => match NaiveDate::from_str(s) {
            Ok(date) => Some(date),
            Err(_) => return false,
        },
    };
    shared::validate_batch_dates(purchase, expiration).is_ok()
}
