//! Batch (lot) and movement models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Actor;

/// One lot of physical stock for an inventory item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    /// Owning inventory item; `None` once the item no longer references it
    pub inventory_id: Option<Uuid>,
    /// Remaining amount in the lot
    pub quantity: Decimal,
    pub expiration_date: Option<NaiveDate>,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub status: BatchStatus,
    /// Set when the batch was depleted
    pub completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Whether this batch still holds stock that blocks deletion
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::InUse && self.quantity > Decimal::ZERO
    }

    /// Amount this batch contributes to its item's `current_stock`
    pub fn stock_contribution(&self) -> Decimal {
        if self.status == BatchStatus::InUse {
            self.quantity
        } else {
            Decimal::ZERO
        }
    }
}

/// Lifecycle state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    #[serde(alias = "en uso")]
    InUse,
    #[serde(alias = "agotado")]
    Depleted,
    #[serde(alias = "vencido")]
    Expired,
    #[serde(alias = "dañado")]
    Damaged,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::InUse => "in_use",
            BatchStatus::Depleted => "depleted",
            BatchStatus::Expired => "expired",
            BatchStatus::Damaged => "damaged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_use" => Some(BatchStatus::InUse),
            "depleted" => Some(BatchStatus::Depleted),
            "expired" => Some(BatchStatus::Expired),
            "damaged" => Some(BatchStatus::Damaged),
            _ => None,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::InUse => write!(f, "In use"),
            BatchStatus::Depleted => write!(f, "Depleted"),
            BatchStatus::Expired => write!(f, "Expired"),
            BatchStatus::Damaged => write!(f, "Damaged"),
        }
    }
}

/// Kind of change recorded against a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[serde(alias = "entrada")]
    Entry,
    #[serde(alias = "salida")]
    Exit,
    #[serde(alias = "daño")]
    Damage,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
            MovementType::Damage => "damage",
        }
    }

    /// Accepts the English names and the Spanish ones used by the staff apps
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "entry" | "entrada" => Some(MovementType::Entry),
            "exit" | "salida" => Some(MovementType::Exit),
            "damage" | "daño" | "dano" => Some(MovementType::Damage),
            _ => None,
        }
    }

    /// Reason recorded when the caller gives none
    pub fn default_reason(&self) -> &'static str {
        match self {
            MovementType::Entry => "Additional intake",
            MovementType::Exit => "Consumption",
            MovementType::Damage => "Damaged product",
        }
    }

    /// Whether this movement takes stock out of the batch
    pub fn is_outgoing(&self) -> bool {
        matches!(self, MovementType::Exit | MovementType::Damage)
    }
}

/// A single recorded change to a batch's quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reason: String,
    pub actor: Actor,
    pub date: DateTime<Utc>,
}

/// Input for opening a new batch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    pub quantity: Decimal,
    pub expiration_date: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub reason: Option<String>,
}
