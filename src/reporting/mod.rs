//! Financial statements and running balances

pub mod reporter;
pub mod statements;

pub use reporter::*;
pub use statements::*;
