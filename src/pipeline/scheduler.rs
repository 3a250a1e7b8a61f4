// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Concurrent scheduler
//!
//! One coordinator owns every state transition. Workers run the executor on
//! the blocking thread pool and send their outcome back over a channel; the
//! coordinator records it and immediately dispatches whatever became ready.
//!
//! Cancellation only ever means "not started": once a worker has invoked the
//! executor, the step runs to completion.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::errors::ArtiflowResult;
use crate::executors::StepExecutor;
use crate::pipeline::policy::Readiness;
use crate::pipeline::{
    Closure, ClosureComputer, FailurePolicy, ScheduleRequest, StepGraph, StepStateTracker,
    StepStatus,
};

/// Callback invoked by the coordinator on every status change
pub type ProgressFn = Arc<dyn Fn(&str, StepStatus) + Send + Sync>;

/// Scheduler options
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerOptions {
    /// Failure propagation policy
    pub policy: FailurePolicy,
    /// Upper bound on concurrently running steps; `None` is unbounded
    pub max_parallel: Option<usize>,
}

/// Why a step never left INIT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "steps", rename_all = "snake_case")]
pub enum BlockReason {
    /// Direct predecessors that failed, were skipped or were cancelled
    FailedPredecessors(Vec<String>),
    /// The stop policy halted the session
    Halted,
    /// Direct predecessors that never reached an end state
    BlockedPredecessors(Vec<String>),
    /// No predecessor explains it
    Unreachable,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailedPredecessors(ids) => write!(f, "failed predecessor: {}", ids.join(", ")),
            Self::Halted => write!(f, "halted after an earlier failure"),
            Self::BlockedPredecessors(ids) => {
                write!(f, "waiting on unfinished predecessor: {}", ids.join(", "))
            }
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// A step left at INIT when the session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnexecutedStep {
    pub step: String,
    pub reason: BlockReason,
}

/// An executor error or panic, recorded against its step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub step: String,
    pub message: String,
}

/// Final counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub finished: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub unexecuted: usize,
}

/// Outcome of one scheduling session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingReport {
    /// No step FAILED and no step was left unexecuted
    pub success: bool,
    /// Policy the session ran under
    pub policy: FailurePolicy,
    /// Final status per step, in topological order
    pub statuses: IndexMap<String, StepStatus>,
    /// Steps left at INIT, in topological order, with the reason
    pub unexecuted: Vec<UnexecutedStep>,
    /// Executor errors and panics
    pub errors: Vec<StepError>,
    /// Whether the stop policy halted dispatch
    pub halted: bool,
    /// Wall time of the session in seconds
    pub duration_secs: f64,
}

impl SchedulingReport {
    /// Status of one step
    pub fn status(&self, id: &str) -> Option<StepStatus> {
        self.statuses.get(id).copied()
    }

    /// Counts per final state
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            unexecuted: self.unexecuted.len(),
            ..Summary::default()
        };
        for status in self.statuses.values() {
            match status {
                StepStatus::Finished => summary.finished += 1,
                StepStatus::Failed => summary.failed += 1,
                StepStatus::Skipped => summary.skipped += 1,
                StepStatus::Cancelled => summary.cancelled += 1,
                StepStatus::Init | StepStatus::Running => {}
            }
        }
        summary
    }
}

enum Outcome {
    Succeeded,
    Failed,
    Errored(String),
    Cancelled,
}

struct Completion {
    slot: usize,
    outcome: Outcome,
    duration: Duration,
}

/// Per-session coordinator state
struct Session<'g> {
    graph: &'g StepGraph,
    tracker: StepStateTracker,
    tx: UnboundedSender<Completion>,
    halt: Arc<AtomicBool>,
    in_flight: usize,
    errors: Vec<StepError>,
}

impl<'g> Session<'g> {
    fn new(graph: &'g StepGraph, closure: &Closure, tx: UnboundedSender<Completion>) -> Self {
        Self {
            graph,
            tracker: StepStateTracker::new(graph, closure),
            tx,
            halt: Arc::new(AtomicBool::new(false)),
            in_flight: 0,
            errors: Vec::new(),
        }
    }
}

/// Runs a closure against an executor
pub struct Scheduler {
    executor: Arc<dyn StepExecutor>,
    options: SchedulerOptions,
    progress: Option<ProgressFn>,
}

impl Scheduler {
    /// Create a scheduler with the default (strict, unbounded) options
    pub fn new(executor: Arc<dyn StepExecutor>) -> Self {
        Self {
            executor,
            options: SchedulerOptions::default(),
            progress: None,
        }
    }

    /// Set the failure policy
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.options.policy = policy;
        self
    }

    /// Bound concurrency; zero means unbounded
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.options.max_parallel = (max > 0).then_some(max);
        self
    }

    /// Observe status changes
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolve a request and run its closure.
    ///
    /// Unknown ids and missing paths fail here, before anything is dispatched.
    pub async fn run_request(
        &self,
        graph: &StepGraph,
        request: &ScheduleRequest,
    ) -> ArtiflowResult<SchedulingReport> {
        let closure = ClosureComputer::new(graph).compute(request)?;
        tracing::info!(
            request = %request,
            steps = closure.len(),
            policy = %self.options.policy,
            "scheduling"
        );
        Ok(self.run(graph, &closure).await)
    }

    /// Run every step of a closure. Each call is a fresh session: all steps
    /// start at INIT.
    pub async fn run(&self, graph: &StepGraph, closure: &Closure) -> SchedulingReport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.drive(Session::new(graph, closure, tx), rx).await
    }

    async fn drive(
        &self,
        mut session: Session<'_>,
        mut rx: UnboundedReceiver<Completion>,
    ) -> SchedulingReport {
        let start = Instant::now();

        loop {
            if !session.halt.load(Ordering::SeqCst) {
                self.dispatch_ready(&mut session);
            }
            if session.in_flight == 0 {
                break;
            }

            // the session holds a sender, so this only yields None if every
            // worker vanished without reporting
            let Some(completion) = rx.recv().await else {
                tracing::error!("completion channel closed with steps in flight");
                break;
            };
            session.in_flight -= 1;
            self.record(&mut session, completion);
        }

        self.finish(session, start.elapsed())
    }

    /// Walk INIT steps in topological order, dispatching or skipping what the
    /// policy allows. Skips propagate within one pass because successors come
    /// later in the order.
    fn dispatch_ready(&self, session: &mut Session<'_>) {
        let policy = self.options.policy;
        let halted = session.halt.load(Ordering::SeqCst);

        for slot in 0..session.tracker.len() {
            if session.tracker.status(slot) != StepStatus::Init {
                continue;
            }

            let view = session.tracker.predecessor_view(slot);
            match policy.decide(&view, halted) {
                Readiness::Dispatch => {
                    if self
                        .options
                        .max_parallel
                        .is_some_and(|max| session.in_flight >= max)
                    {
                        continue;
                    }
                    if view.failed > 0 {
                        tracing::warn!(
                            step = %self.id(session, slot),
                            failed = view.failed,
                            "dispatching despite failed predecessors"
                        );
                    }
                    self.dispatch(session, slot);
                }
                Readiness::Skip => {
                    if session.tracker.transition(slot, StepStatus::Skipped) {
                        tracing::warn!(
                            step = %self.id(session, slot),
                            "skipped: every predecessor failed"
                        );
                        self.notify(session, slot, StepStatus::Skipped);
                    }
                }
                Readiness::Wait | Readiness::Blocked => {}
            }
        }
    }

    fn dispatch(&self, session: &mut Session<'_>, slot: usize) {
        if !session.tracker.transition(slot, StepStatus::Running) {
            return;
        }

        let node = session.tracker.record(slot).node;
        let descriptor = session.graph.descriptor(node).clone();
        tracing::debug!(step = %descriptor.id, "starting");
        self.notify(session, slot, StepStatus::Running);

        let executor = Arc::clone(&self.executor);
        let halt = Arc::clone(&session.halt);
        let tx = session.tx.clone();

        session.in_flight += 1;
        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let outcome = if halt.load(Ordering::SeqCst) {
                Outcome::Cancelled
            } else {
                match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&descriptor))) {
                    Ok(Ok(true)) => Outcome::Succeeded,
                    Ok(Ok(false)) => Outcome::Failed,
                    Ok(Err(e)) => Outcome::Errored(e.to_string()),
                    Err(payload) => Outcome::Errored(panic_message(payload)),
                }
            };

            // receiver gone means the coordinator already gave up
            let _ = tx.send(Completion {
                slot,
                outcome,
                duration: started.elapsed(),
            });
        });
    }

    fn record(&self, session: &mut Session<'_>, completion: Completion) {
        let Completion {
            slot,
            outcome,
            duration,
        } = completion;
        let id = self.id(session, slot).to_string();

        let (status, error) = match outcome {
            Outcome::Succeeded => {
                tracing::debug!(step = %id, elapsed = ?duration, "finished");
                (StepStatus::Finished, None)
            }
            Outcome::Failed => {
                tracing::warn!(step = %id, elapsed = ?duration, "failed");
                (StepStatus::Failed, None)
            }
            Outcome::Errored(message) => {
                tracing::error!(step = %id, "executor error: {}", message);
                session.errors.push(StepError {
                    step: id.clone(),
                    message: message.clone(),
                });
                (StepStatus::Failed, Some(message))
            }
            Outcome::Cancelled => {
                tracing::info!(step = %id, "cancelled before start");
                (StepStatus::Cancelled, None)
            }
        };

        session.tracker.transition(slot, status);
        session.tracker.annotate(slot, duration, error);
        self.notify(session, slot, status);

        if status == StepStatus::Failed
            && self.options.policy.halts_on_failure()
            && !session.halt.swap(true, Ordering::SeqCst)
        {
            tracing::warn!(step = %id, "halting: no further steps will be dispatched");
        }
    }

    fn finish(&self, session: Session<'_>, elapsed: Duration) -> SchedulingReport {
        let Session {
            graph,
            tracker,
            halt,
            errors,
            ..
        } = session;
        let halted = halt.load(Ordering::SeqCst);

        let statuses: IndexMap<String, StepStatus> = tracker
            .records()
            .iter()
            .map(|r| (graph.descriptor(r.node).id.clone(), r.status))
            .collect();

        let unexecuted: Vec<UnexecutedStep> = (0..tracker.len())
            .filter(|&slot| tracker.status(slot) == StepStatus::Init)
            .map(|slot| UnexecutedStep {
                step: graph.descriptor(tracker.record(slot).node).id.clone(),
                reason: block_reason(graph, &tracker, slot, halted),
            })
            .collect();

        for step in &unexecuted {
            tracing::warn!(step = %step.step, "not executed: {}", step.reason);
        }

        let success = unexecuted.is_empty()
            && !statuses.values().any(|s| *s == StepStatus::Failed);

        SchedulingReport {
            success,
            policy: self.options.policy,
            statuses,
            unexecuted,
            errors,
            halted,
            duration_secs: elapsed.as_secs_f64(),
        }
    }

    fn id<'s>(&self, session: &'s Session<'_>, slot: usize) -> &'s str {
        session.graph.descriptor(session.tracker.record(slot).node).id.as_str()
    }

    fn notify(&self, session: &Session<'_>, slot: usize, status: StepStatus) {
        if let Some(progress) = &self.progress {
            progress(self.id(session, slot), status);
        }
    }
}

fn block_reason(
    graph: &StepGraph,
    tracker: &StepStateTracker,
    slot: usize,
    halted: bool,
) -> BlockReason {
    let preds_with = |pred: fn(StepStatus) -> bool| -> Vec<String> {
        tracker
            .record(slot)
            .preds
            .iter()
            .filter(|&&p| pred(tracker.status(p)))
            .map(|&p| graph.descriptor(tracker.record(p).node).id.clone())
            .collect()
    };

    let failed = preds_with(StepStatus::counts_as_failed);
    if !failed.is_empty() {
        return BlockReason::FailedPredecessors(failed);
    }
    if halted {
        return BlockReason::Halted;
    }
    // RUNNING only survives here if the completion channel closed early
    let blocked = preds_with(|s| !s.is_terminal());
    if !blocked.is_empty() {
        return BlockReason::BlockedPredecessors(blocked);
    }
    BlockReason::Unreachable
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("executor panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("executor panicked: {}", s)
    } else {
        "executor panicked".to_string()
    }
}
