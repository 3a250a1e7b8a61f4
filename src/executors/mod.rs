// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Step executors
//!
//! The scheduler never interprets a step's command; it hands the descriptor
//! to an executor and records the boolean outcome.

mod dry_run;
mod shell;

pub use dry_run::DryRunExecutor;
pub use shell::ShellExecutor;

use crate::errors::ArtiflowResult;
use crate::pipeline::StepDescriptor;

/// Runs one step.
///
/// Called from worker threads, possibly for several steps at once, so
/// implementations must be `Send + Sync`. `Ok(true)` means success,
/// `Ok(false)` a failed run. An `Err` (or a panic) is recorded as a failure
/// of that step only.
pub trait StepExecutor: Send + Sync {
    /// Execute a step and report whether it succeeded
    fn execute(&self, step: &StepDescriptor) -> ArtiflowResult<bool>;

    /// Short name for logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> StepExecutor for F
where
    F: Fn(&StepDescriptor) -> bool + Send + Sync,
{
    fn execute(&self, step: &StepDescriptor) -> ArtiflowResult<bool> {
        Ok(self(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_closures_are_executors() {
        let executor: Arc<dyn StepExecutor> = Arc::new(|step: &StepDescriptor| step.name != "bad");

        let good = StepDescriptor::new(Some("flow"), "good", "true", "test");
        let bad = StepDescriptor::new(Some("flow"), "bad", "false", "test");

        assert!(executor.execute(&good).unwrap());
        assert!(!executor.execute(&bad).unwrap());
        assert_eq!(executor.name(), "custom");
    }
}
