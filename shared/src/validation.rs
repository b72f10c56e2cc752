//! Validation utilities shared by the backend and the dashboard helpers

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Longest accepted inventory item name
pub const MAX_ITEM_NAME_LEN: usize = 100;

/// Longest accepted petty cash reason
pub const MAX_CASH_REASON_LEN: usize = 200;

// ============================================================================
// Stock Validations
// ============================================================================

/// Validate an inventory item name
pub fn validate_item_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > MAX_ITEM_NAME_LEN {
        return Err("Name must be at most 100 characters");
    }
    Ok(())
}

/// Validate the surcharge applied when an item is added to an order
pub fn validate_extra_price(extra_price: Decimal) -> Result<(), &'static str> {
    if extra_price < Decimal::ZERO {
        return Err("Extra price cannot be negative");
    }
    Ok(())
}

/// Validate a movement or batch quantity
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be a positive number");
    }
    Ok(())
}

/// Validate that a batch does not expire before it was purchased
pub fn validate_batch_dates(
    purchase_date: NaiveDate,
    expiration_date: Option<NaiveDate>,
) -> Result<(), &'static str> {
    match expiration_date {
        Some(expiration) if expiration < purchase_date => {
            Err("Expiration date cannot be before the purchase date")
        }
        _ => Ok(()),
    }
}

/// Pick the caller's reason, falling back when it is missing or blank
pub fn reason_or_default(reason: Option<&str>, default: &str) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(default)
        .to_string()
}

// ============================================================================
// Petty Cash Validations
// ============================================================================

/// Validate a petty cash amount
pub fn validate_cash_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

/// Validate a petty cash reason (required, at most 200 characters)
pub fn validate_cash_reason(reason: &str) -> Result<(), &'static str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err("Reason is required");
    }
    if trimmed.chars().count() > MAX_CASH_REASON_LEN {
        return Err("Reason must be at most 200 characters");
    }
    Ok(())
}
