// src/plan/runner.rs

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::config::{ConfigSection, PlanFile, StageConfig, StepConfig};
use crate::errors::Result;
use crate::run::{Cmd, Task, concurrently_with_context, eventually, serially_with_context};
use crate::types::StageMode;

/// Executes every stage of a plan in order.
#[derive(Debug, Clone)]
pub struct PlanRunner {
    plan: PlanFile,
}

impl PlanRunner {
    pub fn new(plan: PlanFile) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &PlanFile {
        &self.plan
    }

    /// Run the plan, stopping at the first failing stage.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<()> {
        info!(stages = self.plan.stages.len(), "running plan");

        let stages: Vec<Task> = self
            .plan
            .stages
            .iter()
            .map(|stage| stage_task(stage.clone(), self.plan.config.clone()))
            .collect();

        let result = serially_with_context(ctx, stages).await;
        match &result {
            Ok(()) => info!("plan finished"),
            Err(err) => warn!(error = %err, "plan failed"),
        }
        result
    }
}

fn stage_task(stage: StageConfig, config: ConfigSection) -> Task {
    Task::with_context(move |ctx| {
        let span = info_span!("stage", stage = %stage.name);

        async move {
            info!(mode = ?stage.mode, steps = stage.steps.len(), "starting stage");

            let steps: Vec<Task> = stage
                .steps
                .iter()
                .map(|step| step_task(step, &config))
                .collect();

            let result = match stage.mode {
                StageMode::Concurrent => concurrently_with_context(&ctx, steps).await,
                StageMode::Serial => serially_with_context(&ctx, steps).await,
            };

            if result.is_ok() {
                info!("stage finished");
            }
            result
        }
        .instrument(span)
    })
}

/// Build the task for one step: a bare command, or a retried one.
pub(crate) fn step_task(step: &StepConfig, config: &ConfigSection) -> Task {
    let span = info_span!("step", step = %step.name);
    let cmd = Arc::new(
        Cmd::new(step.argv.iter().cloned())
            .envs(step.env.clone())
            .with_heartbeat(config.heartbeat),
    );

    if !step.eventually {
        return Task::with_context(move |ctx| async move { cmd.run(&ctx).await }.instrument(span));
    }

    let retry = eventually(move |ctx: CancellationToken| {
        let cmd = Arc::clone(&cmd);
        async move { cmd.run(&ctx).await }
    })
    .with_interval(step.effective_interval(config))
    .with_timeout(step.effective_timeout(config));

    Task::with_context(move |ctx| async move { retry.run(&ctx).await }.instrument(span))
}
