//! Stock ledger rules: batch creation, entry/exit/damage movements, and the
//! bookkeeping that keeps an item's `current_stock` equal to the sum of its
//! in-use batches.
//!
//! Every function here is pure. Callers persist the returned batch state,
//! movement and stock delta together, inside one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Actor, Batch, BatchStatus, InventoryItem, Movement, MovementType, NewBatch, StockDiscrepancy,
};
use crate::validation;

/// Reason recorded on the seed movement of a new batch
pub const INITIAL_BATCH_REASON: &str = "Initial batch";

const QUANTITY_TOO_LARGE: &str = "Quantity is too large";

/// A requested change to a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperation {
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub actor: Actor,
}

/// Outcome of a stock-changing operation
#[derive(Debug, Clone, PartialEq)]
pub struct StockChange {
    /// Movement to append to the batch log
    pub movement: Movement,
    /// Signed amount to add to the owning item's `current_stock`
    pub stock_delta: Decimal,
}

/// Parse an operation name as sent by the dashboard or mobile app
pub fn parse_operation(operation: &str) -> LedgerResult<MovementType> {
    MovementType::parse(operation).ok_or_else(|| {
        LedgerError::validation(
            "operation",
            "Invalid operation type, use: entrada, salida, daño",
        )
    })
}

/// Open a new in-use batch for `inventory_id`, seeded with one entry movement
pub fn open_batch(
    inventory_id: Uuid,
    input: &NewBatch,
    actor: Actor,
    now: DateTime<Utc>,
) -> LedgerResult<(Batch, StockChange)> {
    validation::validate_positive_quantity(input.quantity)
        .map_err(|msg| LedgerError::validation("quantity", msg))?;

    let purchase_date = input.purchase_date.unwrap_or_else(|| now.date_naive());
    validation::validate_batch_dates(purchase_date, input.expiration_date)
        .map_err(|msg| LedgerError::validation("expiration_date", msg))?;

    let batch = Batch {
        id: Uuid::new_v4(),
        inventory_id: Some(inventory_id),
        quantity: input.quantity,
        expiration_date: input.expiration_date,
        purchase_date,
        notes: input.notes.clone(),
        status: BatchStatus::InUse,
        completed_date: None,
        created_at: now,
        updated_at: now,
    };

    let movement = Movement {
        movement_type: MovementType::Entry,
        quantity: input.quantity,
        reason: validation::reason_or_default(input.reason.as_deref(), INITIAL_BATCH_REASON),
        actor,
        date: now,
    };

    Ok((
        batch,
        StockChange {
            movement,
            stock_delta: input.quantity,
        },
    ))
}

/// Apply an entry, exit or damage operation to `batch`.
///
/// On failure the batch is left untouched.
pub fn apply_operation(
    batch: &mut Batch,
    operation: BatchOperation,
    now: DateTime<Utc>,
) -> LedgerResult<StockChange> {
    validation::validate_positive_quantity(operation.quantity)
        .map_err(|msg| LedgerError::validation("quantity", msg))?;

    if matches!(batch.status, BatchStatus::Expired | BatchStatus::Damaged) {
        return Err(LedgerError::conflict(format!(
            "Batch is {} and no longer accepts movements",
            batch.status.as_str()
        )));
    }

    let quantity = operation.quantity;
    let stock_delta = if operation.movement_type.is_outgoing() {
        if batch.quantity < quantity {
            return Err(LedgerError::InsufficientStock {
                available: batch.quantity,
                requested: quantity,
            });
        }

        batch.quantity -= quantity;
        if batch.quantity.is_zero() {
            batch.status = BatchStatus::Depleted;
            batch.completed_date = Some(now);
        }
        -quantity
    } else {
        batch.quantity = batch
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| LedgerError::validation("quantity", QUANTITY_TOO_LARGE))?;
        if batch.status == BatchStatus::Depleted {
            batch.status = BatchStatus::InUse;
            batch.completed_date = None;
        }
        quantity
    };
    batch.updated_at = now;

    let movement = Movement {
        movement_type: operation.movement_type,
        quantity,
        reason: validation::reason_or_default(
            operation.reason.as_deref(),
            operation.movement_type.default_reason(),
        ),
        actor: operation.actor,
        date: now,
    };

    Ok(StockChange {
        movement,
        stock_delta,
    })
}

/// Add `delta` to an item's recorded stock, refusing to go below zero
pub fn adjust_stock(current_stock: Decimal, delta: Decimal) -> LedgerResult<Decimal> {
    let next = current_stock
        .checked_add(delta)
        .ok_or_else(|| LedgerError::validation("quantity", QUANTITY_TOO_LARGE))?;
    if next < Decimal::ZERO {
        return Err(LedgerError::conflict(format!(
            "Stock cannot become negative (recorded {}, change {})",
            current_stock, delta
        )));
    }
    Ok(next)
}

/// A batch can be deleted unless it is in use and still holds stock
pub fn ensure_batch_deletable(batch: &Batch) -> LedgerResult<()> {
    if batch.is_active() {
        return Err(LedgerError::conflict(format!(
            "Batch still has {} in use; deplete it before deleting",
            batch.quantity
        )));
    }
    Ok(())
}

/// An item can be deleted once none of its batches is active
pub fn ensure_inventory_deletable(batches: &[Batch]) -> LedgerResult<()> {
    let active = batches.iter().filter(|b| b.is_active()).count();
    if active > 0 {
        return Err(LedgerError::conflict(format!(
            "Inventory item has {} active batch(es); deplete or delete them first",
            active
        )));
    }
    Ok(())
}

/// Stock change caused by removing `batch` from its item
pub fn removal_delta(batch: &Batch) -> Decimal {
    -batch.stock_contribution()
}

/// The stock an item should record given its batches
pub fn expected_stock(batches: &[Batch]) -> LedgerResult<Decimal> {
    batches.iter().try_fold(Decimal::ZERO, |total, batch| {
        total
            .checked_add(batch.stock_contribution())
            .ok_or_else(|| LedgerError::validation("quantity", QUANTITY_TOO_LARGE))
    })
}

/// Compare an item's recorded stock against its batches
pub fn reconcile(item: &InventoryItem, batches: &[Batch]) -> LedgerResult<Option<StockDiscrepancy>> {
    let expected = expected_stock(batches)?;
    if expected == item.current_stock {
        return Ok(None);
    }

    Ok(Some(StockDiscrepancy {
        inventory_id: item.id,
        name: item.name.clone(),
        recorded: item.current_stock,
        expected,
        difference: item.current_stock - expected,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitType;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn new_batch(quantity: &str) -> NewBatch {
        NewBatch {
            quantity: dec(quantity),
            expiration_date: None,
            purchase_date: None,
            notes: None,
            reason: None,
        }
    }

    fn op(movement_type: MovementType, quantity: &str) -> BatchOperation {
        BatchOperation {
            movement_type,
            quantity: dec(quantity),
            reason: None,
            actor: Actor::Admin,
        }
    }

    fn opened(quantity: &str) -> Batch {
        open_batch(Uuid::new_v4(), &new_batch(quantity), Actor::Admin, Utc::now())
            .unwrap()
            .0
    }

    #[test]
    fn open_batch_seeds_entry_movement() {
        let inventory_id = Uuid::new_v4();
        let (batch, change) =
            open_batch(inventory_id, &new_batch("10"), Actor::Admin, Utc::now()).unwrap();

        assert_eq!(batch.inventory_id, Some(inventory_id));
        assert_eq!(batch.status, BatchStatus::InUse);
        assert_eq!(batch.quantity, dec("10"));
        assert_eq!(change.stock_delta, dec("10"));
        assert_eq!(change.movement.movement_type, MovementType::Entry);
        assert_eq!(change.movement.reason, INITIAL_BATCH_REASON);
    }

    #[test]
    fn open_batch_rejects_non_positive_quantity() {
        let result = open_batch(Uuid::new_v4(), &new_batch("0"), Actor::Admin, Utc::now());
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn exit_to_zero_depletes() {
        let mut batch = opened("10");
        let now = Utc::now();

        let change = apply_operation(&mut batch, op(MovementType::Exit, "4"), now).unwrap();
        assert_eq!(change.stock_delta, dec("-4"));
        assert_eq!(batch.quantity, dec("6"));
        assert_eq!(batch.status, BatchStatus::InUse);

        apply_operation(&mut batch, op(MovementType::Exit, "6"), now).unwrap();
        assert_eq!(batch.quantity, Decimal::ZERO);
        assert_eq!(batch.status, BatchStatus::Depleted);
        assert_eq!(batch.completed_date, Some(now));
    }

    #[test]
    fn entry_revives_depleted_batch() {
        let mut batch = opened("2");
        apply_operation(&mut batch, op(MovementType::Damage, "2"), Utc::now()).unwrap();
        assert_eq!(batch.status, BatchStatus::Depleted);

        let change = apply_operation(&mut batch, op(MovementType::Entry, "3"), Utc::now()).unwrap();
        assert_eq!(change.stock_delta, dec("3"));
        assert_eq!(batch.status, BatchStatus::InUse);
        assert_eq!(batch.completed_date, None);
        assert_eq!(change.movement.reason, "Additional intake");
    }

    #[test]
    fn overdraw_fails_without_touching_batch() {
        let mut batch = opened("10");
        let before = batch.clone();

        let err = apply_operation(&mut batch, op(MovementType::Exit, "10.01"), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: dec("10"),
                requested: dec("10.01"),
            }
        );
        assert_eq!(batch, before);
    }

    #[test]
    fn expired_batch_rejects_movements() {
        let mut batch = opened("5");
        batch.status = BatchStatus::Expired;
        let result = apply_operation(&mut batch, op(MovementType::Entry, "1"), Utc::now());
        assert!(matches!(result, Err(LedgerError::Conflict(_))));
    }

    #[test]
    fn parse_operation_accepts_spanish_names() {
        assert_eq!(parse_operation("salida").unwrap(), MovementType::Exit);
        assert_eq!(parse_operation("DAÑO").unwrap(), MovementType::Damage);
        assert!(parse_operation("transfer").is_err());
    }

    #[test]
    fn adjust_stock_never_goes_negative() {
        assert_eq!(adjust_stock(dec("5"), dec("-5")).unwrap(), Decimal::ZERO);
        assert!(adjust_stock(dec("5"), dec("-5.5")).is_err());
    }

    #[test]
    fn active_batch_blocks_deletion() {
        let mut batch = opened("5");
        assert!(ensure_batch_deletable(&batch).is_err());
        assert!(ensure_inventory_deletable(std::slice::from_ref(&batch)).is_err());

        apply_operation(&mut batch, op(MovementType::Exit, "5"), Utc::now()).unwrap();
        assert!(ensure_batch_deletable(&batch).is_ok());
        assert!(ensure_inventory_deletable(&[batch]).is_ok());
    }

    #[test]
    fn reconcile_reports_drift_only() {
        let batches = vec![opened("3"), opened("4.5")];
        let now = Utc::now();
        let mut item = InventoryItem {
            id: Uuid::new_v4(),
            name: "Flour".to_string(),
            category_id: Uuid::new_v4(),
            supplier: None,
            description: None,
            extra_price: Decimal::ZERO,
            unit_type: UnitType::Kilograms,
            batch_ids: batches.iter().map(|b| b.id).collect(),
            current_stock: dec("7.5"),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(reconcile(&item, &batches), Ok(None));

        item.current_stock = dec("8");
        let drift = reconcile(&item, &batches).unwrap().unwrap();
        assert_eq!(drift.expected, dec("7.5"));
        assert_eq!(drift.difference, dec("0.5"));
    }

    #[test]
    fn entry_beyond_decimal_range_is_rejected() {
        let mut batch = opened("1");
        batch.quantity = Decimal::MAX;
        let before = batch.clone();

        let err = apply_operation(&mut batch, op(MovementType::Entry, "1"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "quantity"));
        assert_eq!(batch, before);
    }

    #[test]
    fn stock_beyond_decimal_range_is_rejected() {
        let err = adjust_stock(Decimal::MAX, Decimal::ONE).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));

        let mut huge = opened("1");
        huge.quantity = Decimal::MAX;
        assert!(expected_stock(&[huge.clone(), huge]).is_err());
    }
}
