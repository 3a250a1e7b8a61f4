// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Failure policies
//!
//! A policy decides what a predecessor's failure means for the steps that
//! consume its artifacts.

use serde::{Deserialize, Serialize};

/// How predecessor failures propagate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// A step runs only if none of its direct predecessors failed
    #[default]
    Strict,
    /// Predecessor failures are ignored; everything runs
    Continue,
    /// A step is skipped only when every direct predecessor failed;
    /// skipped steps count as failed downstream
    SkipDownstream,
    /// Like strict, but the first failure halts all further dispatch
    Stop,
}

impl FailurePolicy {
    /// All policies, for help output
    pub const ALL: [FailurePolicy; 4] = [
        Self::Strict,
        Self::Continue,
        Self::SkipDownstream,
        Self::Stop,
    ];

    /// Decide what to do with an INIT step given its predecessors.
    ///
    /// `halted` is only ever set under [`FailurePolicy::Stop`].
    pub fn decide(self, preds: &PredecessorView, halted: bool) -> Readiness {
        if halted {
            return Readiness::Blocked;
        }
        if preds.pending > 0 {
            return Readiness::Wait;
        }

        match self {
            Self::Strict | Self::Stop => {
                if preds.failed == 0 {
                    Readiness::Dispatch
                } else {
                    Readiness::Blocked
                }
            }
            Self::Continue => Readiness::Dispatch,
            Self::SkipDownstream => {
                if preds.total > 0 && preds.failed == preds.total {
                    Readiness::Skip
                } else {
                    Readiness::Dispatch
                }
            }
        }
    }

    /// Whether the first failure stops the session
    pub fn halts_on_failure(self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Continue => write!(f, "continue"),
            Self::SkipDownstream => write!(f, "skip-downstream"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "continue" => Ok(Self::Continue),
            "skip-downstream" | "skip_downstream" => Ok(Self::SkipDownstream),
            "stop" => Ok(Self::Stop),
            _ => Err(format!(
                "Unknown failure policy: {} (expected strict, continue, skip-downstream or stop)",
                s
            )),
        }
    }
}

/// Summary of a step's direct predecessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredecessorView {
    /// All direct predecessors in the graph, inside the closure or not
    pub total: usize,
    /// In-closure predecessors that have not reached a terminal state
    pub pending: usize,
    /// Predecessors that failed, were skipped, or were cancelled
    pub failed: usize,
}

/// Outcome of evaluating an INIT step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Mark RUNNING and submit
    Dispatch,
    /// Mark SKIPPED without running
    Skip,
    /// Predecessors still running or not yet run
    Wait,
    /// Will not run in this session
    Blocked,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(total: usize, pending: usize, failed: usize) -> PredecessorView {
        PredecessorView {
            total,
            pending,
            failed,
        }
    }

    #[test]
    fn test_no_predecessors_always_dispatch() {
        for policy in FailurePolicy::ALL {
            assert_eq!(policy.decide(&view(0, 0, 0), false), Readiness::Dispatch);
        }
    }

    #[test]
    fn test_pending_predecessors_wait() {
        for policy in FailurePolicy::ALL {
            assert_eq!(policy.decide(&view(2, 1, 0), false), Readiness::Wait);
        }
    }

    #[test]
    fn test_strict() {
        assert_eq!(FailurePolicy::Strict.decide(&view(2, 0, 1), false), Readiness::Blocked);
        assert_eq!(FailurePolicy::Strict.decide(&view(2, 0, 0), false), Readiness::Dispatch);
    }

    #[test]
    fn test_continue_ignores_failures() {
        assert_eq!(FailurePolicy::Continue.decide(&view(2, 0, 2), false), Readiness::Dispatch);
    }

    #[test]
    fn test_skip_downstream() {
        let policy = FailurePolicy::SkipDownstream;
        assert_eq!(policy.decide(&view(2, 0, 2), false), Readiness::Skip);
        assert_eq!(policy.decide(&view(2, 0, 1), false), Readiness::Dispatch);
    }

    #[test]
    fn test_stop_halt_blocks_everything() {
        assert_eq!(FailurePolicy::Stop.decide(&view(0, 0, 0), true), Readiness::Blocked);
        assert_eq!(FailurePolicy::Stop.decide(&view(1, 0, 1), false), Readiness::Blocked);
    }

    #[test]
    fn test_parse_and_display() {
        for policy in FailurePolicy::ALL {
            assert_eq!(policy.to_string().parse::<FailurePolicy>().unwrap(), policy);
        }
        assert_eq!(
            "SKIP_DOWNSTREAM".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::SkipDownstream
        );
        assert!("yolo".parse::<FailurePolicy>().is_err());
    }
}
