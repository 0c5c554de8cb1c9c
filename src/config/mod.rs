//! Configuration module for image harvesting
//!
//! This module provides the `HarvestConfig` struct and its type-safe builder
//! for configuring a crawl with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{HarvestConfigBuilder, WithOutputDir, WithStartUrl};
pub use types::HarvestConfig;
