// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Run command - schedule and execute steps

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{OutputFormat, Project};
use crate::executors::{DryRunExecutor, ShellExecutor, StepExecutor};
use crate::pipeline::{
    ClosureComputer, FailurePolicy, ScheduleRequest, Scheduler, SchedulingReport, StepGraph,
    StepStatus,
};
use crate::utils::create_spinner;

/// Options for the run command
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub step: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub policy: Option<FailurePolicy>,
    pub jobs: Option<usize>,
    pub dry_run: bool,
    pub format: OutputFormat,
}

/// Run the requested steps
pub async fn run(
    config: Option<PathBuf>,
    sources: Vec<String>,
    args: RunArgs,
    verbose: bool,
) -> Result<()> {
    let request = ScheduleRequest::from_bounds(args.step, args.from, args.to).ok_or_else(|| {
        miette::miette!(
            help = "Use --step <ID>, --from <ID>, --to <ID> or --from <ID> --to <ID>",
            "Nothing to run"
        )
    })?;

    let project = Project::load(config.as_deref(), &sources)?;
    let text = args.format == OutputFormat::Text;
    if text {
        project.print_load_problems();
    }

    let graph = StepGraph::build(&project.registry)?;
    let closure = ClosureComputer::new(&graph).compute(&request)?;

    let policy = args.policy.unwrap_or(project.config.policy);
    let jobs = args.jobs.or(project.config.max_parallel).unwrap_or(0);

    let executor: Arc<dyn StepExecutor> = if args.dry_run {
        Arc::new(DryRunExecutor::new())
    } else {
        let shell = ShellExecutor::new()
            .with_shell(&project.config.shell)
            .with_working_dir(project.config.working_dir(&project.base_dir))
            .with_env(project.config.env.clone());
        shell.check_available()?;
        Arc::new(shell)
    };

    if text {
        println!(
            "{} {} ({} steps, policy {})",
            "Running".bold(),
            request,
            closure.len(),
            policy
        );
        if verbose {
            for (i, id) in closure.ordered(&graph).iter().enumerate() {
                println!("  {}. {}", i + 1, id.dimmed());
            }
        }
        println!();
    }

    let mut scheduler = Scheduler::new(executor)
        .with_policy(policy)
        .with_max_parallel(jobs);

    let spinner = text.then(|| create_spinner("Scheduling..."));
    if let Some(pb) = spinner.clone() {
        let progress = move |id: &str, status: StepStatus| match status {
            StepStatus::Running => pb.set_message(format!("running {}", id)),
            StepStatus::Finished => pb.println(format!("  {} {}", "✓".green(), id.bold())),
            StepStatus::Failed => pb.println(format!("  {} {} failed", "✗".red(), id.bold())),
            StepStatus::Skipped => pb.println(format!("  {} {} skipped", "↷".yellow(), id)),
            StepStatus::Cancelled => pb.println(format!("  {} {} cancelled", "⊘".yellow(), id)),
            StepStatus::Init => {}
        };
        scheduler = scheduler.with_progress(Arc::new(progress));
    }

    let report = scheduler.run(&graph, &closure).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| miette::miette!("Failed to serialize report: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => print_report(&report),
    }

    if report.success {
        Ok(())
    } else {
        Err(miette::miette!("Run did not complete successfully"))
    }
}

fn print_report(report: &SchedulingReport) {
    let summary = report.summary();

    if !report.unexecuted.is_empty() {
        println!();
        println!("{}", "Not executed:".yellow().bold());
        for step in &report.unexecuted {
            println!("  {} {} ({})", "•".yellow(), step.step, step.reason);
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("{}", "Executor errors:".red().bold());
        for error in &report.errors {
            println!("  {} {}: {}", "✗".red(), error.step, error.message.dimmed());
        }
    }

    println!();
    let line = format!(
        "{} finished, {} failed, {} skipped, {} cancelled, {} not executed in {:.2}s",
        summary.finished,
        summary.failed,
        summary.skipped,
        summary.cancelled,
        summary.unexecuted,
        report.duration_secs
    );
    if report.success {
        println!("{}", line.green());
    } else {
        println!("{}", line.red());
        if report.halted {
            println!("{}", "Stopped dispatching after the first failure".dimmed());
        }
    }
}
