//! Business logic services for the Pantry Ledger backend

pub mod petty_cash;
pub mod stock;

pub use petty_cash::PettyCashService;
pub use stock::StockLedgerService;
