//! Stock ledger tests
//!
//! Drives the batch rules the way the stock service does and checks:
//! - recorded stock always equals the sum of in-use batches
//! - batch quantities never go negative
//! - a batch is depleted exactly when it is empty
//! - failed operations leave no trace

mod common;

use common::{dec, new_batch, Pantry};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::ledger::stock;
use shared::{BatchStatus, LedgerError, MovementType, UnitType};
use uuid::Uuid;

// ============================================================================
// Scenarios
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_exit_down_to_depletion() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Vanilla", UnitType::Kilograms).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("10"))).unwrap();
        assert_eq!(pantry.item(item).current_stock, dec("10"));

        pantry.apply(batch, "salida", dec("4")).unwrap();
        assert_eq!(pantry.batch(batch).quantity, dec("6"));
        assert_eq!(pantry.batch(batch).status, BatchStatus::InUse);
        assert_eq!(pantry.item(item).current_stock, dec("6"));

        pantry.apply(batch, "exit", dec("6")).unwrap();
        assert_eq!(pantry.batch(batch).quantity, Decimal::ZERO);
        assert_eq!(pantry.batch(batch).status, BatchStatus::Depleted);
        assert!(pantry.batch(batch).completed_date.is_some());
        assert_eq!(pantry.item(item).current_stock, Decimal::ZERO);
    }

    #[test]
    fn test_over_withdrawal_reports_amounts_and_changes_nothing() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Flour", UnitType::Kilograms).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("10"))).unwrap();
        let before = pantry.batch(batch).clone();

        let err = pantry.apply(batch, "salida", dec("100")).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: dec("10"),
                requested: dec("100"),
            }
        );
        assert_eq!(pantry.batch(batch), &before);
        assert_eq!(pantry.item(item).current_stock, dec("10"));
        assert_eq!(pantry.movements[&batch].len(), 1);
    }

    #[test]
    fn test_item_with_active_batch_cannot_be_deleted_until_depleted() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Butter", UnitType::Units).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("5"))).unwrap();

        let err = pantry.delete_item(item).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert!(pantry.items.contains_key(&item));

        pantry.apply(batch, "salida", dec("5")).unwrap();
        pantry.delete_item(item).unwrap();
        assert!(pantry.items.is_empty());
        assert!(pantry.batches.is_empty());
    }

    #[test]
    fn test_new_batch_records_one_entry_movement() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Sugar", UnitType::Kilos).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("7.5"))).unwrap();

        let log = &pantry.movements[&batch];
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].movement_type, MovementType::Entry);
        assert_eq!(log[0].quantity, dec("7.5"));
        assert_eq!(log[0].reason, stock::INITIAL_BATCH_REASON);
        assert_eq!(pantry.item(item).batch_ids, vec![batch]);
    }

    #[test]
    fn test_duplicate_item_name_is_rejected() {
        let mut pantry = Pantry::default();
        pantry.create_item("Salt", UnitType::Grams).unwrap();
        let err = pantry.create_item("Salt", UnitType::Grams).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateName("Salt".to_string()));
    }

    #[test]
    fn test_exit_of_exact_quantity_depletes_and_one_cent_more_fails() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Milk", UnitType::Liters).unwrap();
        let a = pantry.create_batch(item, new_batch(dec("3.25"))).unwrap();
        let b = pantry.create_batch(item, new_batch(dec("3.25"))).unwrap();

        let err = pantry.apply(a, "salida", dec("3.26")).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));

        pantry.apply(b, "salida", dec("3.25")).unwrap();
        assert_eq!(pantry.batch(b).status, BatchStatus::Depleted);
        assert_eq!(pantry.item(item).current_stock, dec("3.25"));
    }

    #[test]
    fn test_entry_revives_depleted_batch() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Rice", UnitType::Pounds).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("2"))).unwrap();
        pantry.apply(batch, "daño", dec("2")).unwrap();
        assert_eq!(pantry.batch(batch).status, BatchStatus::Depleted);

        pantry.apply(batch, "entrada", dec("1")).unwrap();
        assert_eq!(pantry.batch(batch).status, BatchStatus::InUse);
        assert!(pantry.batch(batch).completed_date.is_none());
        assert_eq!(pantry.item(item).current_stock, dec("1"));
    }

    #[test]
    fn test_deleting_depleted_batch_keeps_stock() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Yeast", UnitType::Grams).unwrap();
        let keep = pantry.create_batch(item, new_batch(dec("4"))).unwrap();
        let gone = pantry.create_batch(item, new_batch(dec("1"))).unwrap();

        assert!(matches!(
            pantry.delete_batch(gone).unwrap_err(),
            LedgerError::Conflict(_)
        ));

        pantry.apply(gone, "salida", dec("1")).unwrap();
        pantry.delete_batch(gone).unwrap();
        assert_eq!(pantry.item(item).batch_ids, vec![keep]);
        assert_eq!(pantry.item(item).current_stock, dec("4"));
    }

    #[test]
    fn test_batch_for_missing_item_is_not_found() {
        let mut pantry = Pantry::default();
        let err = pantry
            .create_batch(Uuid::new_v4(), new_batch(dec("3")))
            .unwrap_err();
        assert_eq!(err, LedgerError::not_found("Inventory item"));
        assert!(pantry.batches.is_empty());
    }

    #[test]
    fn test_operations_on_missing_batch_are_not_found() {
        let mut pantry = Pantry::default();
        let missing = Uuid::new_v4();

        assert_eq!(
            pantry.apply(missing, "salida", dec("1")).unwrap_err(),
            LedgerError::not_found("Batch")
        );
        assert_eq!(
            pantry.delete_batch(missing).unwrap_err(),
            LedgerError::not_found("Batch")
        );
        assert_eq!(
            pantry.get_batch(missing).unwrap_err(),
            LedgerError::not_found("Batch")
        );
        assert_eq!(
            pantry.list_movements(missing).unwrap_err(),
            LedgerError::not_found("Batch")
        );
        assert_eq!(
            pantry.delete_item(missing).unwrap_err(),
            LedgerError::not_found("Inventory item")
        );
    }

    #[test]
    fn test_batch_without_item_cannot_be_operated() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Cinnamon", UnitType::Grams).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("8"))).unwrap();
        pantry.orphan(batch);

        let err = pantry.apply(batch, "entrada", dec("1")).unwrap_err();
        assert_eq!(err, LedgerError::not_found("Inventory item for this batch"));
        assert_eq!(pantry.batch(batch).quantity, dec("8"));
        assert_eq!(pantry.list_movements(batch).unwrap().len(), 1);
        assert_eq!(pantry.item(item).current_stock, dec("8"));
    }

    #[test]
    fn test_movements_of_existing_batch_replay_in_order() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Cream", UnitType::Liters).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("5"))).unwrap();
        pantry.apply(batch, "salida", dec("2")).unwrap();

        let types: Vec<MovementType> = pantry
            .list_movements(batch)
            .unwrap()
            .iter()
            .map(|m| m.movement_type)
            .collect();
        assert_eq!(types, vec![MovementType::Entry, MovementType::Exit]);
        assert_eq!(pantry.list_movements(batch), pantry.list_movements(batch));
    }

    #[test]
    fn test_unknown_operation_is_a_validation_error() {
        let mut pantry = Pantry::default();
        let item = pantry.create_item("Eggs", UnitType::Units).unwrap();
        let batch = pantry.create_batch(item, new_batch(dec("12"))).unwrap();

        let err = pantry.apply(batch, "transfer", dec("1")).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert_eq!(pantry.movements[&batch].len(), 1);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Quantities with up to two decimals, 0.01 to 50.00
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=5000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn operation_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("entrada"),
            Just("salida"),
            Just("daño"),
            Just("entry"),
            Just("exit"),
            Just("damage"),
        ]
    }

    #[derive(Debug, Clone)]
    enum Step {
        NewBatch(Decimal),
        Operate(usize, &'static str, Decimal),
        Delete(usize),
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            1 => quantity_strategy().prop_map(Step::NewBatch),
            6 => (any::<usize>(), operation_strategy(), quantity_strategy())
                .prop_map(|(i, op, q)| Step::Operate(i, op, q)),
            1 => any::<usize>().prop_map(Step::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Recorded stock tracks the sum of in-use batches through any replay
        #[test]
        fn prop_current_stock_matches_in_use_batches(
            first in quantity_strategy(),
            steps in prop::collection::vec(step_strategy(), 1..40)
        ) {
            let mut pantry = Pantry::default();
            let item = pantry.create_item("Cocoa", UnitType::Kilograms).unwrap();
            pantry.create_batch(item, new_batch(first)).unwrap();

            for step in steps {
                let ids = pantry.item(item).batch_ids.clone();
                // Rejections are expected; the invariants must hold either way.
                let _ = match step {
                    Step::NewBatch(q) => pantry.create_batch(item, new_batch(q)).map(|_| ()),
                    Step::Operate(i, op, q) if !ids.is_empty() => {
                        pantry.apply(ids[i % ids.len()], op, q)
                    }
                    Step::Delete(i) if !ids.is_empty() => pantry.delete_batch(ids[i % ids.len()]),
                    _ => Ok(()),
                };

                let batches = pantry.batches_of(item);
                prop_assert_eq!(
                    pantry.item(item).current_stock,
                    stock::expected_stock(&batches).unwrap()
                );
                prop_assert_eq!(stock::reconcile(pantry.item(item), &batches), Ok(None));

                for batch in &batches {
                    prop_assert!(batch.quantity >= Decimal::ZERO);
                    prop_assert_eq!(
                        batch.status == BatchStatus::Depleted,
                        batch.quantity.is_zero()
                    );
                }
            }
        }

        /// Every movement in a batch log replays to the batch's quantity
        #[test]
        fn prop_movement_log_replays_to_quantity(
            start in quantity_strategy(),
            ops in prop::collection::vec((operation_strategy(), quantity_strategy()), 0..30)
        ) {
            let mut pantry = Pantry::default();
            let item = pantry.create_item("Honey", UnitType::Liters).unwrap();
            let batch = pantry.create_batch(item, new_batch(start)).unwrap();

            for (op, q) in ops {
                let _ = pantry.apply(batch, op, q);
            }

            let replayed: Decimal = pantry.movements[&batch]
                .iter()
                .map(|m| if m.movement_type.is_outgoing() { -m.quantity } else { m.quantity })
                .sum();
            prop_assert_eq!(replayed, pantry.batch(batch).quantity);
        }

        /// Withdrawing more than a batch holds always fails without side effects
        #[test]
        fn prop_over_withdrawal_is_rejected(
            start in quantity_strategy(),
            extra in quantity_strategy()
        ) {
            let mut pantry = Pantry::default();
            let item = pantry.create_item("Oil", UnitType::Liters).unwrap();
            let batch = pantry.create_batch(item, new_batch(start)).unwrap();

            let err = pantry.apply(batch, "salida", start + extra).unwrap_err();
            prop_assert_eq!(
                err,
                LedgerError::InsufficientStock { available: start, requested: start + extra }
            );
            prop_assert_eq!(pantry.batch(batch).quantity, start);
            prop_assert_eq!(pantry.item(item).current_stock, start);
        }
    }
}
