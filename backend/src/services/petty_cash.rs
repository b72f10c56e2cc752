//! Petty cash ledger service
//!
//! Writers are serialized with a transaction-scoped advisory lock so each new
//! movement reads the balance left by the one committed before it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::{cash, CashAudit};
use shared::{ActingUser, Actor, CashMovementType, CashSummary, PettyCashMovement};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Advisory lock key guarding the petty cash ledger
const PETTY_CASH_LOCK_KEY: i64 = 0x7065_7474_7963_6173;

/// Petty cash service
#[derive(Clone)]
pub struct PettyCashService {
    db: PgPool,
}

/// Input for registering an income or expense
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashOperationInput {
    /// `income`/`expense` (or `ingreso`/`egreso`)
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
    pub employee_id: Option<Uuid>,
    /// Accepted for compatibility with older clients and ignored: the server
    /// always stamps its own time.
    #[serde(default)]
    pub date: Option<serde_json::Value>,
}

/// Query window for summaries
#[derive(Debug, Default, Deserialize)]
pub struct CashSummaryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    seq: i64,
    date: DateTime<Utc>,
    actor_kind: String,
    employee_id: Option<Uuid>,
    amount: Decimal,
    reason: String,
    movement_type: String,
    previous_balance: Decimal,
    current_balance: Decimal,
}

impl TryFrom<MovementRow> for PettyCashMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = CashMovementType::parse(&row.movement_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown cash movement type '{}'", row.movement_type))
        })?;
        let actor = Actor::from_parts(&row.actor_kind, row.employee_id)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(PettyCashMovement {
            id: row.id,
            seq: row.seq,
            date: row.date,
            actor,
            amount: row.amount,
            reason: row.reason,
            movement_type,
            previous_balance: row.previous_balance,
            current_balance: row.current_balance,
        })
    }
}

/// Flat CSV row for bookkeeping exports
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    seq: i64,
    date: String,
    movement_type: &'a str,
    amount: Decimal,
    reason: &'a str,
    actor: String,
    previous_balance: Decimal,
    current_balance: Decimal,
}

const MOVEMENT_COLUMNS: &str = r#"
    id, seq, date, actor_kind, employee_id, amount, reason, movement_type,
    previous_balance, current_balance
"#;

impl PettyCashService {
    /// Create a new PettyCashService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Balance after the latest movement, or zero for an empty ledger
    pub async fn get_current_balance(&self) -> AppResult<Decimal> {
        let mut conn = self.db.acquire().await?;
        latest_balance(&mut conn).await
    }

    /// Register an income or expense and chain it onto the ledger
    pub async fn apply_cash_operation(
        &self,
        acting: ActingUser,
        input: CashOperationInput,
    ) -> AppResult<PettyCashMovement> {
        let request = cash::validate_request(
            input.movement_type.as_deref(),
            input.amount,
            input.reason.as_deref(),
        )?;
        let actor = acting.resolve_actor(input.employee_id)?;

        let mut tx = self.db.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(PETTY_CASH_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let previous_balance = latest_balance(&mut tx).await?;
        let posting = cash::post(previous_balance, request.movement_type, request.amount)?;

        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO petty_cash_movements (id, date, actor_kind, employee_id, amount, reason,
                                              movement_type, previous_balance, current_balance)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .bind(actor.kind())
        .bind(actor.employee_id())
        .bind(request.amount)
        .bind(&request.reason)
        .bind(request.movement_type.as_str())
        .bind(posting.previous_balance)
        .bind(posting.current_balance)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let movement = PettyCashMovement::try_from(row)?;
        tracing::info!(
            seq = movement.seq,
            movement_type = movement.movement_type.as_str(),
            amount = %movement.amount,
            balance = %movement.current_balance,
            actor = %movement.actor,
            "Petty cash movement registered"
        );
        Ok(movement)
    }

    /// All movements, newest first
    pub async fn list_movements(&self) -> AppResult<Vec<PettyCashMovement>> {
        sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM petty_cash_movements ORDER BY seq DESC",
            MOVEMENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(PettyCashMovement::try_from)
        .collect()
    }

    /// Income, expense and balances for an optional `[from, to)` window
    pub async fn summarize(&self, query: CashSummaryQuery) -> AppResult<CashSummary> {
        let movements = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {}
            FROM petty_cash_movements
            WHERE ($1::timestamptz IS NULL OR date >= $1)
              AND ($2::timestamptz IS NULL OR date < $2)
            ORDER BY seq
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(PettyCashMovement::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        let opening_balance = match query.from {
            Some(from) => sqlx::query_scalar::<_, Decimal>(
                "SELECT current_balance FROM petty_cash_movements WHERE date < $1 ORDER BY seq DESC LIMIT 1",
            )
            .bind(from)
            .fetch_optional(&self.db)
            .await?
            .unwrap_or(Decimal::ZERO),
            None => Decimal::ZERO,
        };

        Ok(cash::summarize(&movements, opening_balance)?)
    }

    /// Check that every record chains onto the one before it
    pub async fn audit_ledger(&self) -> AppResult<CashAudit> {
        let movements = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM petty_cash_movements ORDER BY seq",
            MOVEMENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(PettyCashMovement::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        let audit = cash::audit(&movements);
        if let Some(chain_break) = audit.chain_break {
            tracing::warn!(
                seq = chain_break.seq,
                expected_previous = %chain_break.expected_previous,
                found_previous = %chain_break.found_previous,
                "Petty cash chain broken"
            );
        }
        Ok(audit)
    }

    /// Export the ledger as CSV, oldest first
    pub async fn export_csv(&self) -> AppResult<String> {
        let mut movements = self.list_movements().await?;
        movements.reverse();
        movements_to_csv(&movements)
    }
}

/// Render movements as CSV
pub fn movements_to_csv(movements: &[PettyCashMovement]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for m in movements {
        wtr.serialize(CsvRow {
            seq: m.seq,
            date: m.date.to_rfc3339(),
            movement_type: m.movement_type.as_str(),
            amount: m.amount,
            reason: &m.reason,
            actor: m.actor.to_string(),
            previous_balance: m.previous_balance,
            current_balance: m.current_balance,
        })
        .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(data)
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

async fn latest_balance(conn: &mut PgConnection) -> AppResult<Decimal> {
    let balance = sqlx::query_scalar::<_, Decimal>(
        "SELECT current_balance FROM petty_cash_movements ORDER BY seq DESC LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?
    .unwrap_or(Decimal::ZERO);

    Ok(balance)
}
