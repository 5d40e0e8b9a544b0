// src/plan/mod.rs

//! Plan execution.
//!
//! A validated [`PlanFile`](crate::config::PlanFile) is turned into nested
//! [`Task`](crate::run::Task)s: stages run serially, and each stage runs its
//! steps concurrently or serially depending on its mode. Steps marked
//! `eventually = true` are wrapped in [`Eventually`](crate::run::Eventually).

pub mod runner;

pub use runner::PlanRunner;
