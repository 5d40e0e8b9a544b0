// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::run::eventually::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT};
use crate::run::process::DEFAULT_HEARTBEAT;
use crate::types::StageMode;

/// Plan file exactly as deserialized, before validation.
///
/// ```toml
/// [config]
/// interval = "1s"
/// timeout = "10s"
///
/// [[stage]]
/// name = "prepare"
///
/// [[stage.step]]
/// name = "namespace"
/// argv = ["kubectl", "create", "namespace", "dev"]
/// eventually = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Stages in execution order, from `[[stage]]`.
    #[serde(default, rename = "stage")]
    pub stages: Vec<StageConfig>,
}

/// A validated plan. Only obtainable through `TryFrom<RawPlanFile>`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ConfigSection,
    pub stages: Vec<StageConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(config: ConfigSection, stages: Vec<StageConfig>) -> Self {
        Self { config, stages }
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepConfig> {
        self.stages.iter().flat_map(|stage| stage.steps.iter())
    }
}

/// `[config]` section: plan-wide defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Retry interval for steps with `eventually = true`.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Retry timeout for steps with `eventually = true`.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Period of the "still running" process heartbeat.
    #[serde(default = "default_heartbeat", with = "humantime_serde")]
    pub heartbeat: Duration,
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_heartbeat() -> Duration {
    DEFAULT_HEARTBEAT
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
            heartbeat: default_heartbeat(),
        }
    }
}

/// `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub name: String,

    #[serde(default)]
    pub mode: StageMode,

    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

/// `[[stage.step]]` entry: one command, optionally retried.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub name: String,

    pub argv: Vec<String>,

    /// Environment overrides on top of the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Retry the command until it succeeds or the timeout elapses.
    #[serde(default)]
    pub eventually: bool,

    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl StepConfig {
    pub fn effective_interval(&self, config: &ConfigSection) -> Duration {
        self.interval.unwrap_or(config.interval)
    }

    pub fn effective_timeout(&self, config: &ConfigSection) -> Duration {
        self.timeout.unwrap_or(config.timeout)
    }
}
