// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Step definitions
//!
//! A step is the smallest schedulable unit. It names the artifacts it
//! consumes and produces; those names are the only thing the graph builder
//! looks at when deriving execution order.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Globally unique step identifier (`namespace.step`)
pub type StepId = String;

/// Ordered, de-duplicated set of artifact identifiers
pub type ArtifactSet = IndexSet<String>;

/// A fully resolved step from the merged registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// Unique id, `namespace.name` (or bare `name` without a namespace)
    pub id: StepId,

    /// Flow the step was authored under
    #[serde(default)]
    pub namespace: Option<String>,

    /// Step key within its flow
    pub name: String,

    /// Opaque command reference, handed to the executor untouched
    pub command: String,

    /// Artifacts this step consumes
    #[serde(default)]
    pub inputs: ArtifactSet,

    /// Artifacts this step produces
    #[serde(default)]
    pub outputs: ArtifactSet,

    /// Descriptor source that defined this step
    pub provenance: String,
}

impl StepDescriptor {
    /// Create a descriptor; the id is derived from namespace and name
    pub fn new(
        namespace: Option<&str>,
        name: &str,
        command: impl Into<String>,
        provenance: impl Into<String>,
    ) -> Self {
        let id = match namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.to_string(),
        };

        Self {
            id,
            namespace: namespace.map(String::from),
            name: name.to_string(),
            command: command.into(),
            inputs: ArtifactSet::new(),
            outputs: ArtifactSet::new(),
            provenance: provenance.into(),
        }
    }

    /// Builder-style input declaration
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Builder-style output declaration
    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.extend(outputs.into_iter().map(Into::into));
        self
    }

    /// Does this step produce the given artifact?
    pub fn produces(&self, artifact: &str) -> bool {
        self.outputs.contains(artifact)
    }

    /// Does this step consume the given artifact?
    pub fn consumes(&self, artifact: &str) -> bool {
        self.inputs.contains(artifact)
    }

    /// Artifacts produced here and consumed by `consumer`, in the consumer's
    /// declaration order
    pub fn shared_with<'a>(&self, consumer: &'a StepDescriptor) -> Vec<&'a str> {
        consumer
            .inputs
            .iter()
            .filter(|a| self.produces(a))
            .map(String::as_str)
            .collect()
    }
}
