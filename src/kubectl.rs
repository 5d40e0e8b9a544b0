// src/kubectl.rs

//! Fluent argument builder for `kubectl`.
//!
//! Only the argument vector is built here; resources themselves are whatever
//! the caller points `-f` at. Execution goes through [`Cmd`].
//!
//! ```
//! use hackrun::kubectl::Kubectl;
//!
//! let argv = Kubectl::new()
//!     .get("secret/registry-credentials")
//!     .namespace("dev")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(argv, ["kubectl", "get", "secret/registry-credentials", "-n", "dev"]);
//! ```

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span};

use crate::errors::{HackrunError, Result};
use crate::run::Cmd;

const DEFAULT_PROGRAM: &str = "kubectl";

#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
    verb: Vec<String>,
    name: Option<String>,
    namespace: Option<String>,
    files: Vec<String>,
    output_format: Option<String>,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new()
    }
}

impl Kubectl {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            verb: Vec::new(),
            name: None,
            namespace: None,
            files: Vec::new(),
            output_format: None,
        }
    }

    /// Use a different binary (a wrapper script, a pinned path, ...).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn get(mut self, resource: impl Into<String>) -> Self {
        self.verb = vec!["get".to_string(), resource.into()];
        self
    }

    pub fn delete(mut self, resource: impl Into<String>) -> Self {
        self.verb = vec!["delete".to_string(), resource.into()];
        self
    }

    pub fn apply(mut self) -> Self {
        self.verb = vec!["apply".to_string()];
        self
    }

    /// `kubectl create <resource...>`, e.g. `create(["secret", "generic"])`.
    pub fn create<I, S>(mut self, resource: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verb = std::iter::once("create".to_string())
            .chain(resource.into_iter().map(Into::into))
            .collect();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a `-f <path>` manifest argument.
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Extra flags appended right after the verb.
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verb.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    /// Assemble the full argument vector.
    pub fn build(&self) -> Result<Vec<String>> {
        if self.verb.is_empty() {
            return Err(HackrunError::InvalidCommand(
                "kubectl: command not set".to_string(),
            ));
        }

        let mut argv = Vec::with_capacity(self.verb.len() + 8);
        argv.push(self.program.clone());
        argv.extend(self.verb.iter().cloned());

        if let Some(ns) = &self.namespace {
            argv.push("-n".to_string());
            argv.push(ns.clone());
        }

        if let Some(name) = &self.name {
            argv.push(name.clone());
        }

        for path in &self.files {
            argv.push("-f".to_string());
            argv.push(path.clone());
        }

        if let Some(format) = &self.output_format {
            argv.push("-o".to_string());
            argv.push(format.clone());
        }

        Ok(argv)
    }

    pub fn to_cmd(&self) -> Result<Cmd> {
        Ok(Cmd::new(self.build()?))
    }

    pub async fn run(&self, ctx: &CancellationToken) -> Result<()> {
        let cmd = self.to_cmd()?;
        cmd.run(ctx).instrument(debug_span!("kubectl")).await
    }

    /// Run with `-o json` and return raw stdout.
    pub async fn run_with_json_output(&self, ctx: &CancellationToken) -> Result<String> {
        let cmd = self.clone().output("json").to_cmd()?;
        let output = cmd
            .run_with_output(ctx)
            .instrument(debug_span!("kubectl"))
            .await?;

        debug!(bytes = output.stdout.len(), "kubectl returned json");
        Ok(output.stdout)
    }

    /// Run with `-o json` and decode stdout into `T`.
    pub async fn run_into<T: DeserializeOwned>(&self, ctx: &CancellationToken) -> Result<T> {
        let stdout = self.run_with_json_output(ctx).await?;
        Ok(serde_json::from_str(&stdout)?)
    }
}
