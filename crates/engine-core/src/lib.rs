pub mod connectors;
pub mod error;
pub mod poll;
pub mod progress;
pub mod state;
