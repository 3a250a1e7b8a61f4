// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Registry validation
//!
//! Lints a merged registry before anything is scheduled.

use indexmap::IndexMap;

use crate::errors::ArtiflowError;
use crate::pipeline::StepGraph;
use crate::registry::StepRegistry;

/// Registry validator
pub struct RegistryValidator;

impl RegistryValidator {
    /// Validate a registry
    pub fn validate(registry: &StepRegistry) -> ValidationResult {
        let mut result = ValidationResult::new();

        if registry.is_empty() {
            result.add_warning("Registry has no steps defined");
            return result;
        }

        match StepGraph::build(registry) {
            Ok(_) => {}
            Err(ArtiflowError::CircularDependency { steps }) => {
                result.add_error(&format!(
                    "Circular dependency between steps: {}",
                    steps.join(", ")
                ));
            }
            Err(e) => result.add_error(&format!("Graph build error: {}", e)),
        }

        let mut producers: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for step in registry.iter() {
            if step.command.trim().is_empty() {
                result.add_error(&format!(
                    "Step '{}' ({}): command is empty",
                    step.id, step.provenance
                ));
            }
            if step.inputs.is_empty() && step.outputs.is_empty() {
                result.add_warning(&format!(
                    "Step '{}' declares no inputs or outputs and can only be run on its own",
                    step.id
                ));
            }
            for artifact in &step.outputs {
                producers.entry(artifact).or_default().push(&step.id);
            }
        }

        for (artifact, steps) in &producers {
            if steps.len() > 1 {
                result.add_warning(&format!(
                    "Artifact '{}' is produced by {} steps: {}",
                    artifact,
                    steps.len(),
                    steps.join(", ")
                ));
            }
        }

        let mut unproduced: Vec<&str> = Vec::new();
        for step in registry.iter() {
            for artifact in &step.inputs {
                if !producers.contains_key(artifact.as_str())
                    && !unproduced.contains(&artifact.as_str())
                {
                    unproduced.push(artifact);
                }
            }
        }
        for artifact in unproduced {
            result.add_note(&format!(
                "Artifact '{}' is not produced by any step and must already exist",
                artifact
            ));
        }

        result
    }
}

/// Result of registry validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn add_note(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
