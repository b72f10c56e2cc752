//! HTTP request handlers

pub mod batch;
pub mod health;
pub mod inventory;
pub mod petty_cash;

pub use batch::*;
pub use health::*;
pub use inventory::*;
pub use petty_cash::*;
