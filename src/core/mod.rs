// Shared infrastructure for the coordinator and the observer toolkit

pub mod errors;
pub mod config;

// Re-export commonly used types
pub use errors::{TabgateError, Result};
pub use config::{CoordinatorConfig, CoordinatorConfigBuilder, ObserverConfig};
