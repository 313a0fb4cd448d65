pub mod classify;
pub mod core;
pub mod records;
