// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Registry loading
//!
//! Every known descriptor source is loaded, not only the flow the user asked
//! for, so that edges between independently authored flows can be found.

use serde_yaml::Value;

use super::source::DescriptorSource;
use super::tree::{flatten, parse_document, FlatStep};
use super::StepRegistry;
use crate::errors::{ArtiflowError, ArtiflowResult};
use crate::pipeline::StepDescriptor;

/// A descriptor source that was skipped
#[derive(Debug)]
pub struct SourceLoadError {
    /// Source label
    pub source_name: String,
    /// Why it was skipped
    pub error: ArtiflowError,
}

/// Outcome of a load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Labels of sources merged into the registry
    pub loaded: Vec<String>,
    /// Sources that were skipped
    pub skipped: Vec<SourceLoadError>,
    /// Ids whose definition was replaced by a later source
    pub overridden: Vec<String>,
}

impl LoadReport {
    /// Whether every source loaded
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Loads and merges descriptor sources
pub struct StepLoader;

impl StepLoader {
    /// Load all sources in priority order (lowest priority first).
    ///
    /// Unparsable sources are skipped with a warning and reported; they never
    /// abort the load.
    pub fn load(sources: &[DescriptorSource]) -> (StepRegistry, LoadReport) {
        let mut registry = StepRegistry::new();
        let mut report = LoadReport::default();

        for source in sources {
            let label = source.label();

            match Self::load_source(source) {
                Ok(steps) => {
                    tracing::debug!(
                        source = %label,
                        steps = steps.len(),
                        "loaded descriptor source"
                    );
                    for step in steps {
                        let id = step.id.clone();
                        if let Some(previous) = registry.insert(step) {
                            tracing::debug!(
                                step = %id,
                                previous = %previous.provenance,
                                source = %label,
                                "step definition replaced"
                            );
                            if !report.overridden.contains(&id) {
                                report.overridden.push(id);
                            }
                        }
                    }
                    report.loaded.push(label);
                }
                Err(error) => {
                    tracing::warn!(source = %label, "skipping descriptor source: {}", error);
                    report.skipped.push(SourceLoadError {
                        source_name: label,
                        error,
                    });
                }
            }
        }

        (registry, report)
    }

    /// Parse one source into descriptors, in document order
    pub fn load_source(source: &DescriptorSource) -> ArtiflowResult<Vec<StepDescriptor>> {
        let label = source.label();
        let text = source.read()?;

        let parse_error = |e: serde_yaml::Error| ArtiflowError::SourceParse {
            source_name: label.clone(),
            message: e.to_string(),
        };
        let mut value: Value = serde_yaml::from_str(&text).map_err(parse_error)?;
        // `<<: *anchor` keys are not resolved by the deserializer
        value.apply_merge().map_err(parse_error)?;

        let tree = parse_document(&value).map_err(|message| ArtiflowError::SourceParse {
            source_name: label.clone(),
            message,
        })?;

        let default_ns = source.default_namespace();
        Ok(flatten(&tree, default_ns.as_deref())
            .into_iter()
            .map(|flat| Self::to_descriptor(flat, &label))
            .collect())
    }

    fn to_descriptor(flat: FlatStep, provenance: &str) -> StepDescriptor {
        let FlatStep {
            namespace,
            name,
            spec,
        } = flat;

        let mut step = StepDescriptor::new(namespace.as_deref(), &name, spec.cmd, provenance);
        if let Some(inputs) = &spec.inputs {
            step = step.with_inputs(inputs.items());
        }
        if let Some(outputs) = &spec.outputs {
            step = step.with_outputs(outputs.items());
        }
        step
    }
}
