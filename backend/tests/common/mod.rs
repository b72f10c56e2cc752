//! In-memory pantry used by the integration tests.
//!
//! Mirrors the order of steps the services run inside a transaction: the
//! batch is changed on a copy and only committed, together with the item's
//! stock and the movement log, once every rule has passed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use shared::ledger::{cash, stock, BatchOperation};
use shared::{
    Actor, Batch, CashMovementType, InventoryItem, LedgerError, LedgerResult, Movement, NewBatch,
    PettyCashMovement, UnitType,
};
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

pub fn new_batch(quantity: Decimal) -> NewBatch {
    NewBatch {
        quantity,
        expiration_date: NaiveDate::from_ymd_opt(2024, 12, 31),
        purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        notes: None,
        reason: None,
    }
}

#[derive(Default)]
pub struct Pantry {
    pub items: HashMap<Uuid, InventoryItem>,
    pub batches: HashMap<Uuid, Batch>,
    pub movements: HashMap<Uuid, Vec<Movement>>,
    clock: i64,
}

impl Pantry {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        at(self.clock)
    }

    pub fn create_item(&mut self, name: &str, unit_type: UnitType) -> LedgerResult<Uuid> {
        if self.items.values().any(|i| i.name == name) {
            return Err(LedgerError::DuplicateName(name.to_string()));
        }
        let now = self.tick();
        let item = InventoryItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category_id: Uuid::new_v4(),
            supplier: None,
            description: None,
            extra_price: Decimal::ZERO,
            unit_type,
            batch_ids: Vec::new(),
            current_stock: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        let id = item.id;
        self.items.insert(id, item);
        Ok(id)
    }

    pub fn create_batch(&mut self, item_id: Uuid, input: NewBatch) -> LedgerResult<Uuid> {
        let now = self.tick();
        let (batch, change) = stock::open_batch(item_id, &input, Actor::Admin, now)?;
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| LedgerError::not_found("Inventory item"))?;
        item.current_stock = stock::adjust_stock(item.current_stock, change.stock_delta)?;
        item.batch_ids.push(batch.id);

        let id = batch.id;
        self.movements.insert(id, vec![change.movement]);
        self.batches.insert(id, batch);
        Ok(id)
    }

    pub fn apply(
        &mut self,
        batch_id: Uuid,
        operation: &str,
        quantity: Decimal,
    ) -> LedgerResult<()> {
        let movement_type = stock::parse_operation(operation)?;
        let now = self.tick();
        let mut batch = self
            .batches
            .get(&batch_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("Batch"))?;
        let item_id = batch
            .inventory_id
            .ok_or_else(|| LedgerError::not_found("Inventory item for this batch"))?;
        let current_stock = self
            .items
            .get(&item_id)
            .map(|item| item.current_stock)
            .ok_or_else(|| LedgerError::not_found("Inventory item"))?;

        let change = stock::apply_operation(
            &mut batch,
            BatchOperation {
                movement_type,
                quantity,
                reason: None,
                actor: Actor::Admin,
            },
            now,
        )?;

        let new_stock = stock::adjust_stock(current_stock, change.stock_delta)?;
        if let Some(item) = self.items.get_mut(&item_id) {
            item.current_stock = new_stock;
        }
        self.movements
            .entry(batch_id)
            .or_default()
            .push(change.movement);
        self.batches.insert(batch_id, batch);
        Ok(())
    }

    pub fn delete_batch(&mut self, batch_id: Uuid) -> LedgerResult<()> {
        let batch = self
            .batches
            .get(&batch_id)
            .ok_or_else(|| LedgerError::not_found("Batch"))?;
        stock::ensure_batch_deletable(batch)?;
        let delta = stock::removal_delta(batch);

        if let Some(item_id) = batch.inventory_id {
            if let Some(item) = self.items.get_mut(&item_id) {
                item.current_stock = stock::adjust_stock(item.current_stock, delta)?;
                item.batch_ids.retain(|id| *id != batch_id);
            }
        }
        self.batches.remove(&batch_id);
        self.movements.remove(&batch_id);
        Ok(())
    }

    pub fn delete_item(&mut self, item_id: Uuid) -> LedgerResult<()> {
        if !self.items.contains_key(&item_id) {
            return Err(LedgerError::not_found("Inventory item"));
        }
        let batches = self.batches_of(item_id);
        stock::ensure_inventory_deletable(&batches)?;
        for batch in batches {
            self.batches.remove(&batch.id);
            self.movements.remove(&batch.id);
        }
        self.items.remove(&item_id);
        Ok(())
    }

    /// Detach a batch from its item, as left behind by older data
    pub fn orphan(&mut self, batch_id: Uuid) {
        if let Some(batch) = self.batches.get_mut(&batch_id) {
            if let Some(item_id) = batch.inventory_id.take() {
                if let Some(item) = self.items.get_mut(&item_id) {
                    item.batch_ids.retain(|id| *id != batch_id);
                }
            }
        }
    }

    pub fn get_batch(&self, batch_id: Uuid) -> LedgerResult<&Batch> {
        self.batches
            .get(&batch_id)
            .ok_or_else(|| LedgerError::not_found("Batch"))
    }

    pub fn list_movements(&self, batch_id: Uuid) -> LedgerResult<&[Movement]> {
        self.get_batch(batch_id)?;
        Ok(self
            .movements
            .get(&batch_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    pub fn item(&self, item_id: Uuid) -> &InventoryItem {
        &self.items[&item_id]
    }

    pub fn batch(&self, batch_id: Uuid) -> &Batch {
        &self.batches[&batch_id]
    }

    pub fn batches_of(&self, item_id: Uuid) -> Vec<Batch> {
        self.items[&item_id]
            .batch_ids
            .iter()
            .filter_map(|id| self.batches.get(id).cloned())
            .collect()
    }
}

#[derive(Default)]
pub struct CashBook {
    pub movements: Vec<PettyCashMovement>,
    clock: i64,
}

impl CashBook {
    pub fn balance(&self) -> Decimal {
        cash::current_balance(&self.movements)
    }

    pub fn register(
        &mut self,
        movement_type: &str,
        amount: Decimal,
        reason: &str,
    ) -> LedgerResult<PettyCashMovement> {
        let request = cash::validate_request(Some(movement_type), Some(amount), Some(reason))?;
        let posting = cash::post(self.balance(), request.movement_type, request.amount)?;

        self.clock += 1;
        let movement = PettyCashMovement {
            id: Uuid::new_v4(),
            seq: self.movements.len() as i64 + 1,
            date: at(self.clock),
            actor: Actor::Admin,
            amount: request.amount,
            reason: request.reason,
            movement_type: request.movement_type,
            previous_balance: posting.previous_balance,
            current_balance: posting.current_balance,
        };
        self.movements.push(movement.clone());
        Ok(movement)
    }

    pub fn income_total(&self) -> Decimal {
        self.movements
            .iter()
            .filter(|m| m.movement_type == CashMovementType::Income)
            .map(|m| m.amount)
            .sum()
    }
}
