// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Validate command - lint the merged step registry

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::Project;
use crate::pipeline::RegistryValidator;

/// Run the validate command
pub async fn run(config: Option<PathBuf>, sources: Vec<String>, verbose: bool) -> Result<()> {
    println!("{}", "Validating step registry...".bold());
    println!();

    let project = Project::load(config.as_deref(), &sources)?;

    for label in &project.report.loaded {
        println!("  {} {}", "✓".green(), label);
    }
    for skipped in &project.report.skipped {
        println!("  {} {}: {}", "✗".red(), skipped.source_name, skipped.error);
    }

    let validation = RegistryValidator::validate(&project.registry);

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        if !validation.notes.is_empty() {
            println!();
            println!("{}:", "Notes".bold());
            for note in &validation.notes {
                println!("  {} {}", "→".blue(), note.dimmed());
            }
        }
        if !project.report.overridden.is_empty() {
            println!();
            println!("{}:", "Overridden steps".bold());
            for id in &project.report.overridden {
                println!("  {} {}", "→".blue(), id);
            }
        }
    }

    println!();
    println!(
        "  {} steps from {} sources",
        project.registry.len(),
        project.report.loaded.len()
    );
    println!();

    if !validation.is_valid() || !project.report.is_clean() {
        Err(miette::miette!("Registry validation failed"))
    } else if validation.has_warnings() {
        println!("{}", "Registry is valid but has warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Registry is valid!".green().bold());
        Ok(())
    }
}
