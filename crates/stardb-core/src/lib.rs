//! Core utilities and types shared across all StarDB crates

pub mod config;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use types::*;
pub use utils::*;

// Re-export external dependencies
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;
