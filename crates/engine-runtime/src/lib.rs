pub mod driver;
pub mod error;
pub mod factory;
pub mod scheduler;
