// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for artiflow.

pub mod graph;
pub mod list;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::{resolve_patterns, FlowConfig};
use crate::pipeline::FailurePolicy;
use crate::registry::{LoadReport, StepLoader, StepRegistry};

/// Artifact-driven flow runner
///
/// Steps declare the artifacts they consume and produce; execution order is
/// inferred from those names.
#[derive(Parser, Debug)]
#[clap(
    name = "artiflow",
    version,
    about = "Run multi-tool flows whose step order is inferred from artifact names",
    long_about = None,
    after_help = "Examples:\n\
        artiflow list                                  List every known step\n\
        artiflow run --step pv_calibre.drc             Run one step\n\
        artiflow run --from pnr_innovus.place          Run a step and everything downstream\n\
        artiflow run --from pnr.place --to pv.drc      Run every step between two steps\n\
        artiflow graph --format dot                    Export the step graph\n\n\
        See 'artiflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: .artiflow.yaml / .artiflow.toml)
    #[clap(short, long, global = true, env = "ARTIFLOW_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Descriptor source, repeatable, lowest priority first; replaces the
    /// configured sources
    #[clap(short, long = "source", global = true, value_name = "FILE")]
    pub sources: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run steps
    Run {
        /// Run only this step
        #[clap(long, conflicts_with_all = ["from", "to"])]
        step: Option<String>,

        /// Start step; alone, runs it and everything downstream
        #[clap(long)]
        from: Option<String>,

        /// Target step; alone, runs it and everything upstream
        #[clap(long)]
        to: Option<String>,

        /// Failure policy (strict, continue, skip-downstream, stop)
        #[clap(short, long, env = "ARTIFLOW_POLICY")]
        policy: Option<FailurePolicy>,

        /// Maximum number of steps running at once (0 = unbounded)
        #[clap(short, long)]
        jobs: Option<usize>,

        /// Walk the schedule without running any command
        #[clap(long)]
        dry_run: bool,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the step graph
    Graph {
        /// Output format
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,

        /// Only show the neighbourhood of this step
        #[clap(long)]
        focus: Option<String>,

        /// Neighbourhood size for --focus, in edges
        #[clap(long, default_value = "2")]
        depth: usize,
    },

    /// Lint the merged step registry
    Validate,

    /// List known steps
    List {
        /// Only steps in this flow
        #[clap(short, long)]
        namespace: Option<String>,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for run and list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Everything a command needs from the project
pub struct Project {
    pub config: FlowConfig,
    /// Directory relative paths in the config resolve against
    pub base_dir: PathBuf,
    pub registry: StepRegistry,
    pub report: LoadReport,
}

impl Project {
    /// Load configuration and merge every descriptor source.
    ///
    /// `sources` from the command line replace the configured ones.
    pub fn load(config_path: Option<&Path>, sources: &[String]) -> miette::Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

        let (config, base_dir) = match config_path {
            Some(path) => {
                let config = FlowConfig::load(path)?;
                let base = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| cwd.clone(), Path::to_path_buf);
                (config, base)
            }
            None => (FlowConfig::discover(&cwd)?.0, cwd.clone()),
        };

        let resolved = if sources.is_empty() {
            config.resolve_sources(&base_dir)?
        } else {
            resolve_patterns(sources, &cwd)?
        };

        if resolved.is_empty() {
            return Err(crate::ArtiflowError::NoSources.into());
        }

        let (registry, report) = StepLoader::load(&resolved);
        tracing::debug!(
            sources = report.loaded.len(),
            steps = registry.len(),
            "registry loaded"
        );

        Ok(Self {
            config,
            base_dir,
            registry,
            report,
        })
    }

    /// Print skipped sources to stderr
    pub fn print_load_problems(&self) {
        for skipped in &self.report.skipped {
            eprintln!(
                "  {} skipped {}: {}",
                "⚠".yellow(),
                skipped.source_name,
                skipped.error
            );
        }
    }
}
