//! Encore Common Library
//!
//! Shared code for the Encore catalog service including:
//! - Database models and repository patterns
//! - Rating domain logic (upsert engine, classification)
//! - Error types and handling
//! - Configuration management
//! - Session token utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod ratings;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use ratings::{classification, CatalogStore, RatingService};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
