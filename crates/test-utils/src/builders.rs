// crates/test-utils/src/builders.rs

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use hackrun::config::{ConfigSection, PlanFile, RawPlanFile, StageConfig, StepConfig};
use hackrun::errors::Result;
use hackrun::types::StageMode;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanBuilder {
    plan: RawPlanFile,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                config: ConfigSection::default(),
                stages: Vec::new(),
            },
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.plan.config.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.plan.config.timeout = timeout;
        self
    }

    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.plan.stages.push(stage);
        self
    }

    pub fn raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn try_build(self) -> Result<PlanFile> {
        PlanFile::try_from(self.plan)
    }

    pub fn build(self) -> PlanFile {
        self.try_build()
            .expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StageConfig`.
pub struct StageBuilder {
    stage: StageConfig,
}

impl StageBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            stage: StageConfig {
                name: name.to_string(),
                mode: StageMode::Concurrent,
                steps: Vec::new(),
            },
        }
    }

    pub fn serial(mut self) -> Self {
        self.stage.mode = StageMode::Serial;
        self
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.stage.steps.push(step);
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}

/// Builder for `StepConfig`.
pub struct StepBuilder {
    step: StepConfig,
}

impl StepBuilder {
    pub fn new(name: &str, argv: &[&str]) -> Self {
        Self {
            step: StepConfig {
                name: name.to_string(),
                argv: argv.iter().map(|s| s.to_string()).collect(),
                env: BTreeMap::new(),
                eventually: false,
                interval: None,
                timeout: None,
            },
        }
    }

    /// Shell one-liner via `sh -c`.
    pub fn sh(name: &str, script: &str) -> Self {
        Self::new(name, &["sh", "-c", script])
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.step.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn eventually(mut self) -> Self {
        self.step.eventually = true;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.step.interval = Some(interval);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.step.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}
