// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Graph command - visualize the step graph

use miette::Result;
use std::path::PathBuf;

use super::{GraphFormat, Project};
use crate::pipeline::{GraphRenderer, StepGraph};

/// Run the graph command
pub async fn run(
    config: Option<PathBuf>,
    sources: Vec<String>,
    format: GraphFormat,
    focus: Option<String>,
    depth: usize,
) -> Result<()> {
    let project = Project::load(config.as_deref(), &sources)?;
    project.print_load_problems();

    let graph = StepGraph::build(&project.registry)?;

    let mut renderer = GraphRenderer::new(&graph);
    if let Some(step) = focus {
        renderer = renderer.focus(&step, depth)?;
    }

    let output = match format {
        GraphFormat::Text => renderer.to_text(),
        GraphFormat::Dot => renderer.to_dot(),
        GraphFormat::Mermaid => renderer.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}
