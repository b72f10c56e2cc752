//! Stock ledger service: inventory items, batches and their movements
//!
//! Every mutation runs in one transaction that locks the inventory row before
//! the batch row, so concurrent operations on the same item are serialized and
//! `current_stock` always moves together with the batch it summarizes.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::ledger::{stock, BatchOperation};
use shared::{
    ActingUser, Batch, BatchStatus, InventoryDetail, InventoryItem, LedgerError, Movement,
    NewBatch, StockDiscrepancy, UnitType,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Stock ledger service coordinating inventory items and batches
#[derive(Clone)]
pub struct StockLedgerService {
    db: PgPool,
}

/// Input for creating an inventory item
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryInput {
    pub name: String,
    pub category_id: Uuid,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    pub extra_price: Option<Decimal>,
    pub unit_type: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Input for updating an inventory item's catalog fields
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryInput {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    pub extra_price: Option<Decimal>,
    pub unit_type: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Input for opening a batch
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchInput {
    pub quantity: Option<Decimal>,
    pub expiration_date: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
    /// Employee the intake is recorded for, when different from the caller
    pub employee_id: Option<Uuid>,
}

/// Input for an entry, exit or damage operation
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperationInput {
    /// `entry`/`exit`/`damage` (or `entrada`/`salida`/`daño`)
    #[serde(alias = "type")]
    pub operation: String,
    pub quantity: Option<Decimal>,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    id: Uuid,
    name: String,
    category_id: Uuid,
    supplier: Option<String>,
    description: Option<String>,
    extra_price: Decimal,
    unit_type: String,
    current_stock: Decimal,
    batch_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InventoryRow> for InventoryItem {
    type Error = AppError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        let unit_type = UnitType::parse(&row.unit_type)
            .ok_or_else(|| AppError::Internal(format!("Unknown unit type '{}'", row.unit_type)))?;

        Ok(InventoryItem {
            id: row.id,
            name: row.name,
            category_id: row.category_id,
            supplier: row.supplier,
            description: row.description,
            extra_price: row.extra_price,
            unit_type,
            batch_ids: row.batch_ids,
            current_stock: row.current_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    inventory_id: Option<Uuid>,
    quantity: Decimal,
    expiration_date: Option<NaiveDate>,
    purchase_date: NaiveDate,
    notes: Option<String>,
    status: String,
    completed_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for Batch {
    type Error = AppError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        let status = BatchStatus::parse(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown batch status '{}'", row.status)))?;

        Ok(Batch {
            id: row.id,
            inventory_id: row.inventory_id,
            quantity: row.quantity,
            expiration_date: row.expiration_date,
            purchase_date: row.purchase_date,
            notes: row.notes,
            status,
            completed_date: row.completed_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    movement_type: String,
    quantity: Decimal,
    reason: String,
    actor_kind: String,
    employee_id: Option<Uuid>,
    date: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = shared::MovementType::parse(&row.movement_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown movement type '{}'", row.movement_type))
        })?;
        let actor = shared::Actor::from_parts(&row.actor_kind, row.employee_id)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Movement {
            movement_type,
            quantity: row.quantity,
            reason: row.reason,
            actor,
            date: row.date,
        })
    }
}

const INVENTORY_COLUMNS: &str = r#"
    i.id, i.name, i.category_id, i.supplier, i.description, i.extra_price, i.unit_type,
    i.current_stock, i.created_at, i.updated_at,
    ARRAY(SELECT b.id FROM batches b WHERE b.inventory_id = i.id ORDER BY b.created_at, b.id) AS batch_ids
"#;

const BATCH_COLUMNS: &str = r#"
    id, inventory_id, quantity, expiration_date, purchase_date, notes, status,
    completed_date, created_at, updated_at
"#;

impl StockLedgerService {
    /// Create a new StockLedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------------
    // Inventory items
    // ------------------------------------------------------------------------

    /// Create an inventory item with no batches and zero stock
    pub async fn create_inventory_item(
        &self,
        input: CreateInventoryInput,
    ) -> AppResult<InventoryItem> {
        input.validate()?;
        let name = item_name(&input.name)?;

        let extra_price = input.extra_price.unwrap_or(Decimal::ZERO);
        shared::validate_extra_price(extra_price)
            .map_err(|msg| LedgerError::validation("extra_price", msg))?;
        let unit_type = parse_unit_type(&input.unit_type)?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_items WHERE name = $1)",
        )
        .bind(&name)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(LedgerError::DuplicateName(name).into());
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, name, category_id, supplier, description, extra_price, unit_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(input.category_id)
        .bind(&input.supplier)
        .bind(&input.description)
        .bind(extra_price)
        .bind(unit_type.as_str())
        .execute(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, &name))?;

        tracing::info!(inventory_id = %id, name = %name, "Inventory item created");

        self.fetch_inventory_item(id).await
    }

    /// List all inventory items ordered by name
    pub async fn list_inventory_items(&self) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {} FROM inventory_items i ORDER BY i.name",
            INVENTORY_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(InventoryItem::try_from).collect()
    }

    /// Get an inventory item together with its batches
    pub async fn get_inventory_item(&self, inventory_id: Uuid) -> AppResult<InventoryDetail> {
        let item = self.fetch_inventory_item(inventory_id).await?;

        let batches = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE inventory_id = $1 ORDER BY created_at, id",
            BATCH_COLUMNS
        ))
        .bind(inventory_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(Batch::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        Ok(InventoryDetail { item, batches })
    }

    /// Update catalog fields of an inventory item. Stock is never touched.
    pub async fn update_inventory_item(
        &self,
        inventory_id: Uuid,
        input: UpdateInventoryInput,
    ) -> AppResult<InventoryItem> {
        input.validate()?;
        let existing = self.fetch_inventory_item(inventory_id).await?;

        let name = match input.name.as_deref() {
            Some(name) => item_name(name)?,
            None => existing.name.clone(),
        };
        let extra_price = input.extra_price.unwrap_or(existing.extra_price);
        shared::validate_extra_price(extra_price)
            .map_err(|msg| LedgerError::validation("extra_price", msg))?;
        let unit_type = match input.unit_type.as_deref() {
            Some(unit_type) => parse_unit_type(unit_type)?,
            None => existing.unit_type,
        };

        if name != existing.name {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM inventory_items WHERE name = $1 AND id <> $2)",
            )
            .bind(&name)
            .bind(inventory_id)
            .fetch_one(&self.db)
            .await?;

            if taken {
                return Err(LedgerError::DuplicateName(name).into());
            }
        }

        sqlx::query(
            r#"
            UPDATE inventory_items
            SET name = $1, category_id = $2, supplier = $3, description = $4,
                extra_price = $5, unit_type = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(&name)
        .bind(input.category_id.unwrap_or(existing.category_id))
        .bind(input.supplier.or(existing.supplier))
        .bind(input.description.or(existing.description))
        .bind(extra_price)
        .bind(unit_type.as_str())
        .bind(inventory_id)
        .execute(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, &name))?;

        self.fetch_inventory_item(inventory_id).await
    }

    /// Delete an inventory item and all of its batches.
    ///
    /// Refused while any batch is still in use with stock.
    pub async fn delete_inventory_item(&self, inventory_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_inventory_stock(&mut tx, inventory_id).await?;

        let batches = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE inventory_id = $1 ORDER BY created_at, id FOR UPDATE",
            BATCH_COLUMNS
        ))
        .bind(inventory_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Batch::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        stock::ensure_inventory_deletable(&batches)?;

        sqlx::query("DELETE FROM batches WHERE inventory_id = $1")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            inventory_id = %inventory_id,
            batches = batches.len(),
            "Inventory item deleted"
        );
        Ok(())
    }

    /// Compare every item's recorded stock against its in-use batches
    pub async fn reconcile_stock(&self) -> AppResult<Vec<StockDiscrepancy>> {
        let items = self.list_inventory_items().await?;

        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE inventory_id IS NOT NULL",
            BATCH_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let mut by_item: HashMap<Uuid, Vec<Batch>> = HashMap::new();
        for row in rows {
            let batch = Batch::try_from(row)?;
            if let Some(inventory_id) = batch.inventory_id {
                by_item.entry(inventory_id).or_default().push(batch);
            }
        }

        let discrepancies = items
            .iter()
            .filter_map(|item| {
                let batches = by_item.get(&item.id).map(Vec::as_slice).unwrap_or(&[]);
                stock::reconcile(item, batches).transpose()
            })
            .collect::<Result<Vec<StockDiscrepancy>, _>>()?;

        if !discrepancies.is_empty() {
            tracing::warn!(count = discrepancies.len(), "Stock drift detected");
        }
        Ok(discrepancies)
    }

    // ------------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------------

    /// Open a batch for an inventory item and add its quantity to the stock
    pub async fn create_batch(
        &self,
        inventory_id: Uuid,
        acting: ActingUser,
        input: CreateBatchInput,
    ) -> AppResult<Batch> {
        input.validate()?;
        let quantity = input
            .quantity
            .ok_or_else(|| LedgerError::validation("quantity", "Quantity is required"))?;
        let actor = acting.resolve_actor(input.employee_id)?;

        let draft = NewBatch {
            quantity,
            expiration_date: input.expiration_date,
            purchase_date: input.purchase_date,
            notes: input.notes,
            reason: input.reason,
        };
        let (batch, change) = stock::open_batch(inventory_id, &draft, actor, Utc::now())?;

        let mut tx = self.db.begin().await?;

        let current_stock = lock_inventory_stock(&mut tx, inventory_id).await?;
        let new_stock = stock::adjust_stock(current_stock, change.stock_delta)?;

        sqlx::query(
            r#"
            INSERT INTO batches (id, inventory_id, quantity, expiration_date, purchase_date, notes,
                                 status, completed_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(batch.id)
        .bind(batch.inventory_id)
        .bind(batch.quantity)
        .bind(batch.expiration_date)
        .bind(batch.purchase_date)
        .bind(&batch.notes)
        .bind(batch.status.as_str())
        .bind(batch.completed_date)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_movement(&mut tx, batch.id, &change.movement).await?;
        store_inventory_stock(&mut tx, inventory_id, new_stock).await?;

        tx.commit().await?;

        tracing::info!(
            inventory_id = %inventory_id,
            batch_id = %batch.id,
            quantity = %batch.quantity,
            actor = %change.movement.actor,
            "Batch created"
        );
        Ok(batch)
    }

    /// Get a batch
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<Batch> {
        sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::not_found("Batch"))?
        .try_into()
    }

    /// Apply an entry, exit or damage operation to a batch and its item's stock
    pub async fn apply_batch_operation(
        &self,
        batch_id: Uuid,
        acting: ActingUser,
        input: BatchOperationInput,
    ) -> AppResult<Batch> {
        input.validate()?;
        let movement_type = stock::parse_operation(&input.operation)?;
        let quantity = input
            .quantity
            .ok_or_else(|| LedgerError::validation("quantity", "Quantity is required"))?;
        shared::validate_positive_quantity(quantity)
            .map_err(|msg| LedgerError::validation("quantity", msg))?;
        let actor = acting.resolve_actor(input.employee_id)?;

        let inventory_id = self
            .owning_inventory(batch_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Inventory item for this batch"))?;

        let mut tx = self.db.begin().await?;

        let current_stock = lock_inventory_stock(&mut tx, inventory_id).await?;
        let mut batch = lock_batch(&mut tx, batch_id, Some(inventory_id)).await?;

        let operation = BatchOperation {
            movement_type,
            quantity,
            reason: input.reason,
            actor,
        };
        let change = stock::apply_operation(&mut batch, operation, Utc::now())?;
        let new_stock = stock::adjust_stock(current_stock, change.stock_delta)?;

        sqlx::query(
            r#"
            UPDATE batches
            SET quantity = $1, status = $2, completed_date = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(batch.quantity)
        .bind(batch.status.as_str())
        .bind(batch.completed_date)
        .bind(batch.updated_at)
        .bind(batch.id)
        .execute(&mut *tx)
        .await?;

        insert_movement(&mut tx, batch.id, &change.movement).await?;
        store_inventory_stock(&mut tx, inventory_id, new_stock).await?;

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch.id,
            operation = movement_type.as_str(),
            quantity = %quantity,
            remaining = %batch.quantity,
            status = batch.status.as_str(),
            "Batch operation applied"
        );
        Ok(batch)
    }

    /// Delete a batch that no longer holds in-use stock
    pub async fn delete_batch(&self, batch_id: Uuid) -> AppResult<()> {
        let owner = self.owning_inventory(batch_id).await?;

        let mut tx = self.db.begin().await?;

        let current_stock = match owner {
            Some(inventory_id) => Some(lock_inventory_stock(&mut tx, inventory_id).await?),
            None => None,
        };
        let batch = lock_batch(&mut tx, batch_id, owner).await?;

        stock::ensure_batch_deletable(&batch)?;

        if let (Some(inventory_id), Some(current_stock)) = (owner, current_stock) {
            let new_stock = stock::adjust_stock(current_stock, stock::removal_delta(&batch))?;
            store_inventory_stock(&mut tx, inventory_id, new_stock).await?;
        }

        sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(batch_id = %batch_id, "Batch deleted");
        Ok(())
    }

    /// Movements of a batch, oldest first
    pub async fn list_batch_movements(&self, batch_id: Uuid) -> AppResult<Vec<Movement>> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM batches WHERE id = $1)")
                .bind(batch_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(LedgerError::not_found("Batch").into());
        }

        sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT movement_type, quantity, reason, actor_kind, employee_id, date
            FROM batch_movements
            WHERE batch_id = $1
            ORDER BY seq
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(Movement::try_from)
        .collect()
    }

    async fn fetch_inventory_item(&self, inventory_id: Uuid) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {} FROM inventory_items i WHERE i.id = $1",
            INVENTORY_COLUMNS
        ))
        .bind(inventory_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::not_found("Inventory item"))?
        .try_into()
    }

    /// The item referencing a batch; errors when the batch itself is absent
    async fn owning_inventory(&self, batch_id: Uuid) -> AppResult<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT inventory_id FROM batches WHERE id = $1",
        )
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::not_found("Batch"))?;

        Ok(owner)
    }
}

/// Trim and check an item name; length limits apply to the stored value
fn item_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    shared::validate_item_name(name).map_err(|msg| LedgerError::validation("name", msg))?;
    Ok(name.to_string())
}

fn parse_unit_type(unit_type: &str) -> AppResult<UnitType> {
    UnitType::parse(unit_type).ok_or_else(|| {
        LedgerError::validation(
            "unit_type",
            "Invalid unit type, use: kilograms, kilos, units, liters, pounds, grams",
        )
        .into()
    })
}

fn map_unique_violation(err: sqlx::Error, name: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            LedgerError::DuplicateName(name.to_string()).into()
        }
        _ => err.into(),
    }
}

/// Lock an inventory row and return its recorded stock
async fn lock_inventory_stock(conn: &mut PgConnection, inventory_id: Uuid) -> AppResult<Decimal> {
    sqlx::query_scalar::<_, Decimal>(
        "SELECT current_stock FROM inventory_items WHERE id = $1 FOR UPDATE",
    )
    .bind(inventory_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Inventory item").into())
}

/// Lock a batch row, checking it still belongs to `owner`
async fn lock_batch(
    conn: &mut PgConnection,
    batch_id: Uuid,
    owner: Option<Uuid>,
) -> AppResult<Batch> {
    let batch: Batch = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {} FROM batches WHERE id = $1 FOR UPDATE",
        BATCH_COLUMNS
    ))
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Batch"))?
    .try_into()?;

    // Owner changed between the unlocked lookup and the lock.
    if batch.inventory_id != owner {
        return Err(LedgerError::not_found("Batch").into());
    }
    Ok(batch)
}

async fn store_inventory_stock(
    conn: &mut PgConnection,
    inventory_id: Uuid,
    current_stock: Decimal,
) -> AppResult<()> {
    sqlx::query("UPDATE inventory_items SET current_stock = $1, updated_at = NOW() WHERE id = $2")
        .bind(current_stock)
        .bind(inventory_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_movement(
    conn: &mut PgConnection,
    batch_id: Uuid,
    movement: &Movement,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO batch_movements (batch_id, movement_type, quantity, reason, actor_kind, employee_id, date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(batch_id)
    .bind(movement.movement_type.as_str())
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(movement.actor.kind())
    .bind(movement.actor.employee_id())
    .bind(movement.date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
