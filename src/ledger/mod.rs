//! Ledger module containing account management, journal posting, and balances

pub mod account;
pub mod balance;
pub mod core;
pub mod gate;
pub mod transaction;

pub use account::*;
pub use balance::*;
pub use self::core::*;
pub use gate::*;
pub use transaction::*;
