// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Read and deserialize a plan file without semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let plan: RawPlanFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), stages = plan.stages.len(), "plan file parsed");

    Ok(plan)
}

/// Read a plan file and validate it.
///
/// Checks, beyond what serde already enforces:
/// - at least one stage, and at least one step per stage;
/// - unique, non-empty stage and step names;
/// - non-empty `argv`;
/// - retry interval strictly between zero and the timeout.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw = load_from_path(&path)?;
    PlanFile::try_from(raw)
}
