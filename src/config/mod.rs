// src/config/mod.rs

//! Plan file configuration.
//!
//! - [`model`] holds the serde structures mirroring the TOML layout.
//! - [`loader`] reads a file from disk.
//! - [`validate`] turns a [`RawPlanFile`] into a checked [`PlanFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigSection, PlanFile, RawPlanFile, StageConfig, StepConfig};
