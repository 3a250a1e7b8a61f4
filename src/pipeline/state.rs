// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Per-session step state
//!
//! The tracker is an arena of records, one per closure step, addressed by
//! slot (position in topological order). It is created fresh for every
//! scheduling session and never outlives it.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::pipeline::policy::PredecessorView;
use crate::pipeline::{Closure, StepGraph};

/// Runtime status of a step within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Init,
    Running,
    Finished,
    Failed,
    Skipped,
    Cancelled,
}

impl StepStatus {
    /// Whether the step has reached an end state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Failed | Self::Skipped | Self::Cancelled
        )
    }

    /// Whether downstream steps should treat this step as failed
    pub fn counts_as_failed(self) -> bool {
        matches!(self, Self::Failed | Self::Skipped | Self::Cancelled)
    }

    /// Allowed transitions:
    /// INIT → RUNNING | SKIPPED, RUNNING → FINISHED | FAILED | CANCELLED
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Running)
                | (Self::Init, Self::Skipped)
                | (Self::Running, Self::Finished)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// One closure step's session state
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub node: NodeIndex,
    pub status: StepStatus,
    /// Slots of direct predecessors inside the closure
    pub preds: Vec<usize>,
    /// Direct predecessors outside the closure (treated as satisfied)
    pub outside_preds: usize,
    /// Wall time spent in the executor
    pub duration: Option<Duration>,
    /// Executor error or panic message
    pub error: Option<String>,
}

/// Arena of step records for one scheduling session
#[derive(Debug, Clone)]
pub struct StepStateTracker {
    records: Vec<StepRecord>,
}

impl StepStateTracker {
    /// Create a tracker with every closure step at INIT
    pub fn new(graph: &StepGraph, closure: &Closure) -> Self {
        let mut nodes: Vec<NodeIndex> = closure.nodes().iter().copied().collect();
        nodes.sort_unstable_by_key(|&n| graph.rank_of(n));

        let slot_of: HashMap<NodeIndex, usize> =
            nodes.iter().enumerate().map(|(slot, &n)| (n, slot)).collect();

        let records = nodes
            .iter()
            .map(|&node| {
                let all = graph.prev_of(node);
                let preds: Vec<usize> =
                    all.iter().filter_map(|p| slot_of.get(p).copied()).collect();
                StepRecord {
                    node,
                    status: StepStatus::Init,
                    outside_preds: all.len() - preds.len(),
                    preds,
                    duration: None,
                    error: None,
                }
            })
            .collect();

        Self { records }
    }

    /// Number of tracked steps
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no steps are tracked
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at a slot
    pub fn record(&self, slot: usize) -> &StepRecord {
        &self.records[slot]
    }

    /// All records in topological order
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Status at a slot
    pub fn status(&self, slot: usize) -> StepStatus {
        self.records[slot].status
    }

    /// Apply a transition; invalid transitions are refused and logged
    pub fn transition(&mut self, slot: usize, next: StepStatus) -> bool {
        let record = &mut self.records[slot];
        if !record.status.can_transition_to(next) {
            tracing::error!(
                slot,
                from = %record.status,
                to = %next,
                "refusing invalid step transition"
            );
            return false;
        }
        record.status = next;
        true
    }

    /// Attach execution details to a record
    pub fn annotate(&mut self, slot: usize, duration: Duration, error: Option<String>) {
        let record = &mut self.records[slot];
        record.duration = Some(duration);
        record.error = error;
    }

    /// Predecessor summary used by the failure policy
    pub fn predecessor_view(&self, slot: usize) -> PredecessorView {
        let record = &self.records[slot];
        let mut view = PredecessorView {
            total: record.preds.len() + record.outside_preds,
            ..PredecessorView::default()
        };
        for &p in &record.preds {
            let status = self.records[p].status;
            if !status.is_terminal() {
                view.pending += 1;
            } else if status.counts_as_failed() {
                view.failed += 1;
            }
        }
        view
    }
}
