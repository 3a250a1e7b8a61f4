// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Pipeline engine
//!
//! Derives step dependencies from artifact names, narrows a request down to
//! the steps it needs, and schedules them concurrently under a failure
//! policy.

mod closure;
mod dag;
mod definition;
mod policy;
mod render;
mod scheduler;
mod state;
mod validation;

pub use closure::{Closure, ClosureComputer, ScheduleRequest};
pub use dag::StepGraph;
pub use definition::*;
pub use policy::{FailurePolicy, PredecessorView, Readiness};
pub use render::GraphRenderer;
pub use scheduler::{
    BlockReason, ProgressFn, Scheduler, SchedulerOptions, SchedulingReport, StepError, Summary,
    UnexecutedStep,
};
pub use state::{StepRecord, StepStateTracker, StepStatus};
pub use validation::{RegistryValidator, ValidationResult};
