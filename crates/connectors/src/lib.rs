pub mod error;
pub mod file;
pub mod imagery;
pub mod notify;
pub mod sql;
