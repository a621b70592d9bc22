//! GraphViz export of a flattened graph. Rendering goes through the `dot`
//! executable as a subprocess; failures to launch or execute it are logged
//! only and never fatal to the graph itself.

use crate::analyzer::flatten;
use algocore::{GraphError, NodeHandle, NodeId};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

fn display_label(node: &NodeHandle) -> String {
    if node.label().is_empty() {
        format!("{}\\n{}", node.type_name(), &node.id().to_string()[..8])
    } else {
        format!("{}\\n{}", node.type_name(), node.label())
    }
}

/// Render the graph reachable from `start` as DOT text.
pub fn to_dot(start: &NodeHandle) -> String {
    let flat = flatten(start);
    let mut graph: DiGraph<String, &str> = DiGraph::new();
    let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();

    // Insert in a stable order so the output is reproducible.
    let mut nodes: Vec<&NodeHandle> = flat.nodes().collect();
    nodes.sort_by_key(|n| n.id());
    for node in nodes {
        indices.insert(node.id(), graph.add_node(display_label(node)));
    }
    for (from, to) in flat.edge_pairs() {
        if let (Some(&a), Some(&b)) = (indices.get(&from), indices.get(&to)) {
            graph.add_edge(a, b, "");
        }
    }

    format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}

/// Write the DOT description of the graph reachable from `start`.
pub fn write_dot(start: &NodeHandle, path: &Path) -> Result<(), GraphError> {
    std::fs::write(path, to_dot(start))?;
    Ok(())
}

/// Write the DOT file and ask the external `dot` tool to render an SVG next
/// to it. Subprocess failures are logged, never returned.
pub fn render_svg(start: &NodeHandle, dot_path: &Path) -> Result<(), GraphError> {
    write_dot(start, dot_path)?;
    let svg_path = dot_path.with_extension("svg");
    match Command::new("dot")
        .arg("-Tsvg")
        .arg(dot_path)
        .arg("-o")
        .arg(&svg_path)
        .status()
    {
        Ok(status) if status.success() => {
            tracing::info!(path = %svg_path.display(), "rendered graph");
        }
        Ok(status) => {
            tracing::warn!(%status, "dot exited with failure");
        }
        Err(error) => {
            tracing::warn!(%error, "cannot start the dot process");
        }
    }
    Ok(())
}
