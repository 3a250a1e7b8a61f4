// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! List command - show known steps grouped by flow

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{OutputFormat, Project};
use crate::pipeline::StepDescriptor;

/// Run the list command
pub async fn run(
    config: Option<PathBuf>,
    sources: Vec<String>,
    namespace: Option<String>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let project = Project::load(config.as_deref(), &sources)?;

    let steps: Vec<&StepDescriptor> = project
        .registry
        .iter()
        .filter(|s| namespace.is_none() || s.namespace == namespace)
        .collect();

    if format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&steps)
            .map_err(|e| miette::miette!("Failed to serialize steps: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    project.print_load_problems();

    for (ns, group) in project.registry.by_namespace() {
        if namespace.as_deref().is_some_and(|wanted| wanted != ns) {
            continue;
        }
        let header = if ns.is_empty() { "(top level)" } else { ns };
        println!("{}", header.bold());
        for step in group {
            println!("  {}", step.id);
            if verbose {
                if !step.inputs.is_empty() {
                    let inputs: Vec<&str> = step.inputs.iter().map(String::as_str).collect();
                    println!("    {} {}", "in: ".dimmed(), inputs.join(", "));
                }
                if !step.outputs.is_empty() {
                    let outputs: Vec<&str> = step.outputs.iter().map(String::as_str).collect();
                    println!("    {} {}", "out:".dimmed(), outputs.join(", "));
                }
                println!("    {} {}", "cmd:".dimmed(), step.command.cyan());
            }
        }
    }

    Ok(())
}
