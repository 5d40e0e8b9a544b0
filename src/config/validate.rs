// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use crate::config::model::{ConfigSection, PlanFile, RawPlanFile, StepConfig};
use crate::errors::{HackrunError, Result};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = HackrunError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.stages))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_stages(plan)?;
    validate_global_config(&plan.config)?;
    validate_names(plan)?;
    validate_steps(plan)?;
    Ok(())
}

fn ensure_has_stages(plan: &RawPlanFile) -> Result<()> {
    if plan.stages.is_empty() {
        return Err(HackrunError::Config(
            "plan must contain at least one [[stage]] section".to_string(),
        ));
    }

    for stage in &plan.stages {
        if stage.steps.is_empty() {
            return Err(HackrunError::Config(format!(
                "stage '{}' must contain at least one [[stage.step]]",
                stage.name
            )));
        }
    }
    Ok(())
}

fn validate_global_config(config: &ConfigSection) -> Result<()> {
    check_retry_window("[config]", config.interval, config.timeout)?;

    if config.heartbeat.is_zero() {
        return Err(HackrunError::Config(
            "[config].heartbeat must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(plan: &RawPlanFile) -> Result<()> {
    let mut stages = HashSet::new();
    let mut steps = HashSet::new();

    for stage in &plan.stages {
        if stage.name.trim().is_empty() {
            return Err(HackrunError::Config("stage name must not be empty".to_string()));
        }
        if !stages.insert(stage.name.as_str()) {
            return Err(HackrunError::Config(format!(
                "duplicate stage name '{}'",
                stage.name
            )));
        }

        for step in &stage.steps {
            if step.name.trim().is_empty() {
                return Err(HackrunError::Config(format!(
                    "stage '{}' has a step with an empty name",
                    stage.name
                )));
            }
            if !steps.insert(step.name.as_str()) {
                return Err(HackrunError::Config(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_steps(plan: &RawPlanFile) -> Result<()> {
    for step in plan.stages.iter().flat_map(|stage| stage.steps.iter()) {
        validate_step(step, &plan.config)?;
    }
    Ok(())
}

fn validate_step(step: &StepConfig, config: &ConfigSection) -> Result<()> {
    if step.argv.is_empty() || step.argv[0].trim().is_empty() {
        return Err(HackrunError::Config(format!(
            "step '{}' must have a non-empty argv",
            step.name
        )));
    }

    if step.eventually {
        check_retry_window(
            &format!("step '{}'", step.name),
            step.effective_interval(config),
            step.effective_timeout(config),
        )?;
    } else if step.interval.is_some() || step.timeout.is_some() {
        return Err(HackrunError::Config(format!(
            "step '{}' sets interval/timeout but not `eventually = true`",
            step.name
        )));
    }
    Ok(())
}

fn check_retry_window(owner: &str, interval: Duration, timeout: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(HackrunError::Config(format!(
            "{owner}: interval must be greater than zero"
        )));
    }
    if interval >= timeout {
        return Err(HackrunError::Config(format!(
            "{owner}: interval ({}) must be shorter than timeout ({})",
            humantime::format_duration(interval),
            humantime::format_duration(timeout)
        )));
    }
    Ok(())
}
