// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Dry-run executor

use std::sync::Mutex;

use super::StepExecutor;
use crate::errors::ArtiflowResult;
use crate::pipeline::StepDescriptor;

/// Reports success for every step without running anything, remembering
/// the order steps were handed to it
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    seen: Mutex<Vec<String>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step ids in the order they were "executed"
    pub fn executed(&self) -> Vec<String> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl StepExecutor for DryRunExecutor {
    fn execute(&self, step: &StepDescriptor) -> ArtiflowResult<bool> {
        tracing::info!(step = %step.id, "would run: {}", step.command);
        match self.seen.lock() {
            Ok(mut seen) => seen.push(step.id.clone()),
            Err(poisoned) => poisoned.into_inner().push(step.id.clone()),
        }
        Ok(true)
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
