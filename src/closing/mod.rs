//! Period closing

pub mod closer;
pub mod period;

pub use closer::*;
pub use period::*;
