// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Error types
//!
//! Structural errors (unknown steps, cycles, missing paths) abort before any
//! step is dispatched. Per-source and per-step errors are contained: a bad
//! descriptor source is skipped, a failing executor marks one step FAILED.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for artiflow operations
pub type ArtiflowResult<T> = Result<T, ArtiflowError>;

/// Main error type for artiflow
#[derive(Error, Debug, Diagnostic)]
pub enum ArtiflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Descriptor Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Descriptor source not found: {path}")]
    #[diagnostic(
        code(artiflow::source_not_found),
        help("Check the `sources` patterns in your .artiflow.yaml")
    )]
    SourceNotFound { path: PathBuf },

    #[error("Descriptor source '{source_name}' could not be parsed: {message}")]
    #[diagnostic(code(artiflow::source_parse))]
    SourceParse {
        source_name: String,
        message: String,
    },

    #[error("No descriptor sources matched")]
    #[diagnostic(
        code(artiflow::no_sources),
        help("Pass --source or list descriptor files under `sources` in .artiflow.yaml")
    )]
    NoSources,

    // ─────────────────────────────────────────────────────────────────────────
    // Graph Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' is not defined in any descriptor source")]
    #[diagnostic(code(artiflow::unknown_step))]
    UnknownStep {
        step: String,
        #[help]
        help: Option<String>,
    },

    #[error("Circular dependency detected between steps: {}", steps.join(", "))]
    #[diagnostic(
        code(artiflow::circular_dependency),
        help("One of these steps consumes an artifact that is produced further down the same chain")
    )]
    CircularDependency { steps: Vec<String> },

    #[error("No dependency path from '{from}' to '{to}'")]
    #[diagnostic(
        code(artiflow::no_dependency_path),
        help("'{to}' does not consume anything produced (directly or transitively) by '{from}'")
    )]
    NoDependencyPath { from: String, to: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' raised an error: {message}")]
    #[diagnostic(code(artiflow::step_execution))]
    StepExecution { step: String, message: String },

    #[error("Tool '{tool}' not found")]
    #[diagnostic(
        code(artiflow::tool_not_found),
        help("Install {tool} or set `shell` in .artiflow.yaml")
    )]
    ToolNotFound { tool: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(artiflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(artiflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(artiflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(artiflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(artiflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(artiflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for ArtiflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for ArtiflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for ArtiflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for ArtiflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for ArtiflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl ArtiflowError {
    /// Create an unknown step error, suggesting ids that look alike
    pub fn unknown_step<'a>(step: &str, known: impl IntoIterator<Item = &'a str>) -> Self {
        let needle = step.rsplit('.').next().unwrap_or(step);
        let mut similar: Vec<&str> = known
            .into_iter()
            .filter(|id| {
                let tail = id.rsplit('.').next().unwrap_or(id);
                tail == needle || id.contains(step) || step.contains(*id)
            })
            .take(5)
            .collect();
        similar.sort_unstable();

        let help = if similar.is_empty() {
            Some("Run 'artiflow list' to see every known step".to_string())
        } else {
            Some(format!("Did you mean: {}?", similar.join(", ")))
        };

        Self::UnknownStep {
            step: step.to_string(),
            help,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_step_suggests_same_step_name_in_other_flow() {
        let err = ArtiflowError::unknown_step("pv.drc", ["pv_calibre.drc", "pnr.place"]);
        match err {
            ArtiflowError::UnknownStep { help, .. } => {
                assert_eq!(help.as_deref(), Some("Did you mean: pv_calibre.drc?"));
            }
            _ => panic!("Expected UnknownStep"),
        }
    }

    #[test]
    fn test_unknown_step_without_suggestion() {
        let err = ArtiflowError::unknown_step("zzz", ["a.b"]);
        let ArtiflowError::UnknownStep { help, .. } = err else {
            panic!("Expected UnknownStep");
        };
        assert!(help.unwrap().contains("artiflow list"));
    }

    #[test]
    fn test_cycle_message_lists_steps() {
        let err = ArtiflowError::CircularDependency {
            steps: vec!["f.a".into(), "f.b".into()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected between steps: f.a, f.b"
        );
    }
}
