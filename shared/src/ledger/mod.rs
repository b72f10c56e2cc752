//! Ledger rules for stock batches and petty cash

pub mod cash;
pub mod stock;

pub use cash::{CashAudit, CashPosting, CashRequest, ChainBreak};
pub use stock::{BatchOperation, StockChange};
