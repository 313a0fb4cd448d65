mod store;
mod utils;

pub use store::{PostgresConfig, PostgresWatermarkStore};
