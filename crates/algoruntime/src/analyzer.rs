//! Offline passes over the distributed adjacency: a snapshot flattener and
//! the chain optimizer that fuses 1:1 pipelines into inline execution.

use algocore::{is_removable_connection, NodeHandle, NodeId};
use std::collections::{HashMap, HashSet};

/// Snapshot adjacency produced by one traversal of the distributed graph:
/// every reachable node keyed by identity, with its direct descendants.
#[derive(Default)]
pub struct FlatGraph {
    nodes: HashMap<NodeId, NodeHandle>,
    edges: HashMap<NodeId, HashSet<NodeId>>,
}

impl FlatGraph {
    pub fn node(&self, id: NodeId) -> Option<&NodeHandle> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeHandle> {
        self.nodes.values()
    }

    pub fn descendants_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.get(&id).into_iter().flatten().copied()
    }

    /// Every `(ancestor, descendant)` pair in the snapshot.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (*from, *to)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Flatten the graph reachable from `start` (through descendants and
/// ancestors alike) into a [`FlatGraph`].
///
/// The model does not support cycles: a node whose identity is already
/// present when it comes up for expansion is reported as a structural-loop
/// warning and its revisit omitted, so traversal terminates regardless.
pub fn flatten(start: &NodeHandle) -> FlatGraph {
    let mut acc = FlatGraph::default();
    flatten_into(start, &mut acc);
    acc
}

fn flatten_into(node: &NodeHandle, acc: &mut FlatGraph) {
    if acc.nodes.contains_key(&node.id()) {
        tracing::warn!(node = %node, "possible structural loop while flattening, revisit omitted");
        return;
    }
    let descendants = node.descendant_nodes();
    let ancestors = node.ancestor_nodes();
    acc.nodes.insert(node.id(), node.clone());
    acc.edges
        .insert(node.id(), descendants.iter().map(NodeHandle::id).collect());
    for relative in descendants.iter().chain(ancestors.iter()) {
        if !acc.nodes.contains_key(&relative.id()) {
            flatten_into(relative, acc);
        }
    }
}

/// Rewrite the scheduling policy of every transitively removable 1:1 chain
/// reachable from `start`: all chain members except the last are forced to
/// launch their children inline, turning the pipeline into a single
/// execution run with no per-stage thread handoff. The last member keeps
/// its own policy so the chain still hands control onward per that policy.
pub fn improve(start: &NodeHandle) {
    let flat = flatten(start);

    // Group removable edges under their upstream node.
    let mut groups: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (parent_id, child_id) in flat.edge_pairs() {
        let (Some(parent), Some(child)) = (flat.node(parent_id), flat.node(child_id)) else {
            continue;
        };
        if is_removable_connection(parent, child) {
            groups.entry(parent_id).or_default().push(child_id);
        }
    }

    // Fixed point: whenever a group's last member heads its own group, the
    // two chains are one. Merge until no such pair remains.
    loop {
        let mut merged = false;
        let heads: Vec<NodeId> = groups.keys().copied().collect();
        for head in heads {
            let Some(last) = groups.get(&head).and_then(|chain| chain.last().copied()) else {
                continue;
            };
            if last != head && groups.contains_key(&last) {
                let tail = groups.remove(&last).unwrap_or_default();
                groups.entry(head).or_default().extend(tail);
                merged = true;
                break; // keys changed, recompute
            }
        }
        if !merged {
            break;
        }
    }

    // Serialize every member of each chain except the terminal one. The
    // head node is a member too: it must launch the chain inline.
    for (head, chain) in groups {
        let mut members = Vec::with_capacity(chain.len() + 1);
        members.push(head);
        members.extend(chain);
        members.pop();
        for id in members {
            if let Some(node) = flat.node(id) {
                tracing::debug!(node = %node, "fused into serial chain");
                node.set_parallel(false);
            }
        }
    }
}
