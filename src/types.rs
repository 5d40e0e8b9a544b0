// src/types.rs

use std::str::FromStr;

use serde::Deserialize;

/// How the steps of one plan stage are executed.
///
/// - `Concurrent`: all steps start together; the first failure cancels the
///   token handed to the others (default).
/// - `Serial`: steps run in declaration order and the stage stops at the
///   first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMode {
    #[default]
    Concurrent,
    Serial,
}

impl FromStr for StageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concurrent" => Ok(StageMode::Concurrent),
            "serial" => Ok(StageMode::Serial),
            other => Err(format!(
                "invalid stage mode: {other} (expected \"concurrent\" or \"serial\")"
            )),
        }
    }
}
