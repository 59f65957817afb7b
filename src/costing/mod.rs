//! Work-order cost accounting

pub mod engine;
pub mod work_order;

pub use engine::*;
pub use work_order::*;
