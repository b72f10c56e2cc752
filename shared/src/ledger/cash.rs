//! Petty cash rules.
//!
//! The ledger is append-only: the balance at any point is the
//! `current_balance` of the record with the highest `seq`, and each record's
//! `previous_balance` repeats the `current_balance` of the one before it.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{CashMovementType, CashSummary, PettyCashMovement};
use crate::validation;

const AMOUNT_TOO_LARGE: &str = "Amount is too large";

/// Balances computed for a new movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashPosting {
    pub previous_balance: Decimal,
    pub current_balance: Decimal,
}

/// A validated cash operation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashRequest {
    pub movement_type: CashMovementType,
    pub amount: Decimal,
    pub reason: String,
}

/// Validate the raw fields of a cash operation
pub fn validate_request(
    operation: Option<&str>,
    amount: Option<Decimal>,
    reason: Option<&str>,
) -> LedgerResult<CashRequest> {
    let (Some(operation), Some(amount), Some(reason)) = (operation, amount, reason) else {
        return Err(LedgerError::validation(
            "amount/reason/type",
            "Amount, reason and type are required",
        ));
    };

    let movement_type = CashMovementType::parse(operation).ok_or_else(|| {
        LedgerError::validation("type", "Invalid movement type, use: ingreso, egreso")
    })?;
    validation::validate_cash_amount(amount).map_err(|msg| LedgerError::validation("amount", msg))?;
    validation::validate_cash_reason(reason).map_err(|msg| LedgerError::validation("reason", msg))?;

    Ok(CashRequest {
        movement_type,
        amount,
        reason: reason.trim().to_string(),
    })
}

/// Compute the balances of the next movement given the latest balance
pub fn post(
    previous_balance: Decimal,
    movement_type: CashMovementType,
    amount: Decimal,
) -> LedgerResult<CashPosting> {
    validation::validate_cash_amount(amount).map_err(|msg| LedgerError::validation("amount", msg))?;

    let current_balance = match movement_type {
        CashMovementType::Income => previous_balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::validation("amount", AMOUNT_TOO_LARGE))?,
        CashMovementType::Expense => {
            if previous_balance < amount {
                return Err(LedgerError::InsufficientFunds {
                    available: previous_balance,
                    requested: amount,
                });
            }
            previous_balance - amount
        }
    };

    Ok(CashPosting {
        previous_balance,
        current_balance,
    })
}

/// Balance after the latest movement, or zero for an empty ledger
pub fn current_balance(movements: &[PettyCashMovement]) -> Decimal {
    movements
        .iter()
        .max_by_key(|m| m.seq)
        .map(|m| m.current_balance)
        .unwrap_or(Decimal::ZERO)
}

/// First record (by `seq`) whose balances do not chain onto its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBreak {
    pub seq: i64,
    pub expected_previous: Decimal,
    pub found_previous: Decimal,
}

/// Check that every record chains onto the one before it
pub fn verify_chain(movements: &[PettyCashMovement]) -> Result<(), ChainBreak> {
    let mut ordered: Vec<&PettyCashMovement> = movements.iter().collect();
    ordered.sort_by_key(|m| m.seq);

    let mut expected_previous = Decimal::ZERO;
    for movement in ordered {
        let chained = match movement.movement_type {
            CashMovementType::Income => movement.previous_balance.checked_add(movement.amount),
            CashMovementType::Expense => movement.previous_balance.checked_sub(movement.amount),
        };
        let consistent = chained == Some(movement.current_balance);
        if movement.previous_balance != expected_previous || !consistent {
            return Err(ChainBreak {
                seq: movement.seq,
                expected_previous,
                found_previous: movement.previous_balance,
            });
        }
        expected_previous = movement.current_balance;
    }
    Ok(())
}

/// Totals for the movements of a window.
///
/// `opening_balance` is the ledger balance just before the window and is
/// reported unchanged when the window holds no movements.
pub fn summarize(
    movements: &[PettyCashMovement],
    opening_balance: Decimal,
) -> LedgerResult<CashSummary> {
    let mut ordered: Vec<&PettyCashMovement> = movements.iter().collect();
    ordered.sort_by_key(|m| m.seq);

    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    for m in &ordered {
        let total = match m.movement_type {
            CashMovementType::Income => &mut total_income,
            CashMovementType::Expense => &mut total_expense,
        };
        *total = total
            .checked_add(m.amount)
            .ok_or_else(|| LedgerError::validation("amount", AMOUNT_TOO_LARGE))?;
    }

    let opening = ordered
        .first()
        .map(|m| m.previous_balance)
        .unwrap_or(opening_balance);
    let closing = ordered
        .last()
        .map(|m| m.current_balance)
        .unwrap_or(opening_balance);

    Ok(CashSummary {
        total_income,
        total_expense,
        net: total_income - total_expense,
        movement_count: ordered.len(),
        opening_balance: opening,
        closing_balance: closing,
    })
}

/// Result of checking the whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashAudit {
    pub movement_count: usize,
    /// Balance of the record with the highest `seq`
    pub current_balance: Decimal,
    pub consistent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_break: Option<ChainBreak>,
}

/// Walk the full ledger and report the first broken link, if any
pub fn audit(movements: &[PettyCashMovement]) -> CashAudit {
    let chain_break = verify_chain(movements).err();
    CashAudit {
        movement_count: movements.len(),
        current_balance: current_balance(movements),
        consistent: chain_break.is_none(),
        chain_break,
    }
}
