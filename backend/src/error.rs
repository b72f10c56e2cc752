//! Error handling for the Pantry Ledger backend
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::LedgerError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Business rule errors raised by the ledgers
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_existing: Option<bool>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>, message_es: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            message_es: message_es.into(),
            field: None,
            available: None,
            requested: None,
            is_existing: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    fn with_amounts(mut self, available: Decimal, requested: Decimal) -> Self {
        self.available = Some(available);
        self.requested = Some(requested);
        self
    }
}

impl AppError {
    /// HTTP status and body for this error
    pub fn to_parts(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", msg.clone(), "No autorizado"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                    "No tiene permiso para realizar esta acción",
                ),
            ),
            AppError::Ledger(err) => ledger_parts(err),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(
                    "DATABASE_ERROR",
                    "A database error occurred",
                    "Ocurrió un error en la base de datos",
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", msg.clone(), "Error interno del servidor"),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred",
                    "Error interno del servidor",
                ),
            ),
        }
    }
}

fn ledger_parts(err: &LedgerError) -> (StatusCode, ErrorResponse) {
    match err {
        LedgerError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(
                "VALIDATION_ERROR",
                message.clone(),
                format!("Datos inválidos: {}", message),
            )
            .with_field(field),
        ),
        LedgerError::NotFound(resource) => (
            StatusCode::NOT_FOUND,
            ErrorResponse::new(
                "NOT_FOUND",
                format!("{} not found", resource),
                format!("No se encontró: {}", resource),
            ),
        ),
        LedgerError::DuplicateName(name) => {
            let mut body = ErrorResponse::new(
                "DUPLICATE_NAME",
                format!("An inventory item named '{}' already exists", name),
                format!("Ya existe un insumo con el nombre '{}'", name),
            )
            .with_field("name");
            body.is_existing = Some(true);
            (StatusCode::CONFLICT, body)
        }
        LedgerError::Conflict(msg) => (
            StatusCode::CONFLICT,
            ErrorResponse::new(
                "CONFLICT",
                msg.clone(),
                format!("Operación no permitida: {}", msg),
            ),
        ),
        LedgerError::InsufficientStock {
            available,
            requested,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new(
                "INSUFFICIENT_STOCK",
                format!(
                    "Insufficient stock: available {}, requested {}",
                    available, requested
                ),
                format!(
                    "Stock insuficiente: disponible {}, solicitado {}",
                    available, requested
                ),
            )
            .with_amounts(*available, *requested),
        ),
        LedgerError::InsufficientFunds {
            available,
            requested,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new(
                "INSUFFICIENT_FUNDS",
                format!(
                    "Insufficient funds: balance {}, requested {}",
                    available, requested
                ),
                format!(
                    "Saldo insuficiente: saldo {}, solicitado {}",
                    available, requested
                ),
            )
            .with_amounts(*available, *requested),
        ),
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));

        AppError::Ledger(LedgerError::Validation { field, message })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_parts();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = %body.code, "Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
