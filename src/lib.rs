// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! # artiflow - Artifact-Driven Flow Runner
//!
//! `artiflow` runs multi-tool flows (chip-design style: place, route, DRC,
//! ...) whose steps are authored independently. Nobody wires steps together:
//! a step depends on another exactly when it consumes an artifact the other
//! produces.
//!
//! ## Features
//!
//! - **Inferred ordering** - dependencies come from artifact names, across flows
//! - **Minimal closures** - run one step, everything downstream or upstream, or a range
//! - **Concurrent scheduling** - ready steps run in parallel on the blocking pool
//! - **Failure policies** - strict, continue, skip-downstream and stop
//!
//! ## Quick Start
//!
//! ```bash
//! # See what is known
//! artiflow list
//!
//! # Run one step and everything that depends on it
//! artiflow run --from pnr_innovus.place
//!
//! # Run everything needed between two steps, continuing past failures
//! artiflow run --from pnr_innovus.place --to pv_calibre.drc --policy continue
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use std::sync::Arc;
//! use artiflow::pipeline::{ScheduleRequest, Scheduler, StepDescriptor, StepGraph};
//! use artiflow::registry::{DescriptorSource, StepLoader};
//!
//! # async fn demo() -> artiflow::ArtiflowResult<()> {
//! let sources = [DescriptorSource::file("pv_calibre/dependency.yaml")];
//! let (registry, _report) = StepLoader::load(&sources);
//! let graph = StepGraph::build(&registry)?;
//! let scheduler = Scheduler::new(Arc::new(|step: &StepDescriptor| {
//!     println!("running {}", step.id);
//!     true
//! }));
//! let report = scheduler
//!     .run_request(&graph, &ScheduleRequest::DownstreamOf("pv_calibre.drc".into()))
//!     .await?;
//! assert!(report.success);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod executors;
pub mod pipeline;
pub mod registry;
pub mod utils;

// Re-export commonly used types
pub use errors::{ArtiflowError, ArtiflowResult};
pub use pipeline::{FailurePolicy, ScheduleRequest, Scheduler, SchedulingReport, StepGraph};
pub use registry::{StepLoader, StepRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
