// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Step registry
//!
//! Merges step descriptors from every descriptor source into one registry.
//! Sources arrive already ordered by priority (shared/common first); a step
//! id seen again in a later source replaces the earlier definition wholesale.

mod loader;
mod source;
mod tree;

pub use loader::{LoadReport, SourceLoadError, StepLoader};
pub use source::DescriptorSource;
pub use tree::{flatten, parse_document, ArtifactList, DescriptorNode, FlatStep, StepSpec};

use indexmap::IndexMap;

use crate::pipeline::StepDescriptor;

/// Merged set of step descriptors, in definition order
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: IndexMap<String, StepDescriptor>,
}

impl StepRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, replacing any earlier one with the same id.
    ///
    /// A replaced step keeps the definition slot of its first appearance.
    pub fn insert(&mut self, step: StepDescriptor) -> Option<StepDescriptor> {
        self.steps.insert(step.id.clone(), step)
    }

    /// Look up a step by id
    pub fn get(&self, id: &str) -> Option<&StepDescriptor> {
        self.steps.get(id)
    }

    /// Whether a step id is known
    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    /// Iterate steps in definition order
    pub fn iter(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.steps.values()
    }

    /// Step ids in definition order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps grouped by namespace, namespaces in first-seen order
    pub fn by_namespace(&self) -> IndexMap<&str, Vec<&StepDescriptor>> {
        let mut groups: IndexMap<&str, Vec<&StepDescriptor>> = IndexMap::new();
        for step in self.steps.values() {
            let ns = step.namespace.as_deref().unwrap_or("");
            groups.entry(ns).or_default().push(step);
        }
        groups
    }
}

impl FromIterator<StepDescriptor> for StepRegistry {
    fn from_iter<T: IntoIterator<Item = StepDescriptor>>(iter: T) -> Self {
        let mut registry = Self::new();
        for step in iter {
            registry.insert(step);
        }
        registry
    }
}
