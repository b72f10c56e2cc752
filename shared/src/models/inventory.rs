//! Inventory item models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Batch;

/// A purchasable, trackable item type (e.g. "Vanilla")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub supplier: Option<String>,
    pub description: Option<String>,
    pub extra_price: Decimal,
    pub unit_type: UnitType,
    /// Batches belonging to this item, oldest first
    pub batch_ids: Vec<Uuid>,
    /// Sum of the quantities of this item's in-use batches
    pub current_stock: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unit an item is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    #[serde(alias = "kilogramos")]
    Kilograms,
    Kilos,
    #[serde(alias = "unidades")]
    Units,
    #[serde(alias = "litros")]
    Liters,
    #[serde(alias = "libras")]
    Pounds,
    #[serde(alias = "gramos")]
    Grams,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Kilograms => "kilograms",
            UnitType::Kilos => "kilos",
            UnitType::Units => "units",
            UnitType::Liters => "liters",
            UnitType::Pounds => "pounds",
            UnitType::Grams => "grams",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kilograms" | "kilogramos" => Some(UnitType::Kilograms),
            "kilos" => Some(UnitType::Kilos),
            "units" | "unidades" => Some(UnitType::Units),
            "liters" | "litros" => Some(UnitType::Liters),
            "pounds" | "libras" => Some(UnitType::Pounds),
            "grams" | "gramos" => Some(UnitType::Grams),
            _ => None,
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inventory item together with its batches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDetail {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub batches: Vec<Batch>,
}

/// Drift between an item's recorded stock and its batches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockDiscrepancy {
    pub inventory_id: Uuid,
    pub name: String,
    /// `current_stock` as stored on the item
    pub recorded: Decimal,
    /// Sum of the in-use batch quantities
    pub expected: Decimal,
    /// `recorded - expected`
    pub difference: Decimal,
}
