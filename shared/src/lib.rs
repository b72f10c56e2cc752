//! Shared types and ledger rules for the Pantry Ledger platform
//!
//! This crate contains the domain models and the pure stock/petty-cash rules
//! used by the backend services and by the dashboard (via WASM).

pub mod error;
pub mod ledger;
pub mod models;
pub mod validation;

pub use error::*;
pub use models::*;
pub use validation::*;
