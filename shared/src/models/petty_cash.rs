//! Petty cash ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Actor;

/// Direction of a petty cash movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashMovementType {
    #[serde(alias = "ingreso")]
    Income,
    #[serde(alias = "egreso", alias = "gasto")]
    Expense,
}

impl CashMovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashMovementType::Income => "income",
            CashMovementType::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "ingreso" => Some(CashMovementType::Income),
            "expense" | "egreso" | "gasto" => Some(CashMovementType::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for CashMovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only entry of the petty cash ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PettyCashMovement {
    pub id: Uuid,
    /// Insertion order; defines which record is the latest
    pub seq: i64,
    pub date: DateTime<Utc>,
    pub actor: Actor,
    /// Magnitude of the transaction, always positive
    pub amount: Decimal,
    pub reason: String,
    #[serde(rename = "type")]
    pub movement_type: CashMovementType,
    pub previous_balance: Decimal,
    pub current_balance: Decimal,
}

/// Totals over a window of the petty cash ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CashSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub movement_count: usize,
    /// Balance before the first movement in the window
    pub opening_balance: Decimal,
    /// Balance after the last movement in the window
    pub closing_balance: Decimal,
}
