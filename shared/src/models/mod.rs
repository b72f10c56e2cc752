//! Domain models for the pantry ledgers

mod actor;
mod batch;
mod inventory;
mod petty_cash;

pub use actor::*;
pub use batch::*;
pub use inventory::*;
pub use petty_cash::*;
