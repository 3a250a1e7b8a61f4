// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Shell executor
//!
//! Runs a step's command through `<shell> -c`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::StepExecutor;
use crate::errors::{ArtiflowError, ArtiflowResult};
use crate::pipeline::StepDescriptor;

/// Environment variable carrying the running step's id
pub const STEP_ENV: &str = "ARTIFLOW_STEP";

/// Environment variable carrying the running step's namespace
pub const NAMESPACE_ENV: &str = "ARTIFLOW_NAMESPACE";

/// Shell executor
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl ShellExecutor {
    /// Create a shell executor using `sh`
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    /// Use a different shell binary
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Run commands from this directory
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Extra environment for every command
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Resolve the shell on `PATH`
    pub fn check_available(&self) -> ArtiflowResult<PathBuf> {
        which::which(&self.shell).map_err(|_| ArtiflowError::ToolNotFound {
            tool: self.shell.clone(),
        })
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl StepExecutor for ShellExecutor {
    fn execute(&self, step: &StepDescriptor) -> ArtiflowResult<bool> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&step.command);
        cmd.envs(&self.env);
        cmd.env(STEP_ENV, &step.id);
        cmd.env(NAMESPACE_ENV, step.namespace.as_deref().unwrap_or(""));
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| ArtiflowError::StepExecution {
            step: step.id.clone(),
            message: format!("failed to spawn '{}': {}", self.shell, e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.trim().is_empty() {
            tracing::debug!(step = %step.id, "stdout:\n{}", stdout.trim_end());
        }

        if output.status.success() {
            Ok(true)
        } else {
            tracing::warn!(
                step = %step.id,
                exit_code = output.status.code().unwrap_or(-1),
                "command failed: {}",
                stderr.trim_end()
            );
            Ok(false)
        }
    }

    fn name(&self) -> &str {
        "shell"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn step(command: &str) -> StepDescriptor {
        StepDescriptor::new(Some("flow"), "probe", command, "test")
    }

    #[test]
    fn test_exit_status_maps_to_outcome() {
        let executor = ShellExecutor::new();
        assert!(executor.execute(&step("exit 0")).unwrap());
        assert!(!executor.execute(&step("exit 3")).unwrap());
    }

    #[test]
    fn test_step_environment_and_working_dir() {
        let dir = TempDir::new().unwrap();
        let executor = ShellExecutor::new()
            .with_working_dir(dir.path())
            .with_env(HashMap::from([("EXTRA".to_string(), "x".to_string())]));

        let ok = executor
            .execute(&step(
                "[ \"$ARTIFLOW_STEP\" = flow.probe ] && [ \"$ARTIFLOW_NAMESPACE\" = flow ] \
                 && [ \"$EXTRA\" = x ] && touch marker",
            ))
            .unwrap();

        assert!(ok);
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn test_missing_shell() {
        let executor = ShellExecutor::new().with_shell("artiflow-no-such-shell");
        assert!(matches!(
            executor.check_available(),
            Err(ArtiflowError::ToolNotFound { .. })
        ));
        assert!(matches!(
            executor.execute(&step("true")),
            Err(ArtiflowError::StepExecution { .. })
        ));
    }
}
