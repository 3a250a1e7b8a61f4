// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! artiflow - Artifact-Driven Flow Runner
//!
//! Run independently authored flows in the order their artifacts imply.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artiflow::cli::run::RunArgs;
use artiflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "artiflow=debug" } else { "artiflow=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let Cli {
        command,
        verbose,
        config,
        sources,
        ..
    } = cli;

    // Dispatch to command handlers
    match command {
        Commands::Run {
            step,
            from,
            to,
            policy,
            jobs,
            dry_run,
            format,
        } => {
            let args = RunArgs {
                step,
                from,
                to,
                policy,
                jobs,
                dry_run,
                format,
            };
            artiflow::cli::run::run(config, sources, args, verbose).await
        }
        Commands::Graph {
            format,
            focus,
            depth,
        } => artiflow::cli::graph::run(config, sources, format, focus, depth).await,
        Commands::Validate => artiflow::cli::validate::run(config, sources, verbose).await,
        Commands::List { namespace, format } => {
            artiflow::cli::list::run(config, sources, namespace, format, verbose).await
        }
    }
}
