//! Dependency ordering
//!
//! Kahn's algorithm with a FIFO queue seeded in collection order, so a fixed
//! graph always yields the same order. When the sort cannot place every
//! node (a cycle, or duplicate ids) the default policy gives up on the
//! topological result and returns the collection order unchanged.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::types::{Edge, Node};

/// What to do when the graph cannot be fully ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Return the nodes in their original collection order
    #[default]
    Fallback,
    /// Fail with `FlowError::CyclicGraph`
    Strict,
}

/// Order node indices with Kahn's algorithm
///
/// The result holds every node the sort could place before stalling; it is
/// shorter than `nodes` when the graph has a cycle. Duplicate ids place
/// nothing.
fn kahn_order(nodes: &[Node], edges: &[Edge]) -> Vec<usize> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.entry(node.id.as_str()).or_insert(i);
    }
    if index.len() != nodes.len() {
        return Vec::new();
    }

    let mut in_degree = vec![0usize; nodes.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for edge in edges {
        let source = index.get(edge.source.as_str()).copied();
        let target = index.get(edge.target.as_str()).copied();
        if let Some(t) = target {
            in_degree[t] += 1;
        }
        if let (Some(s), Some(t)) = (source, target) {
            adjacency[s].push(t);
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &next in &adjacency[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    order
}

/// Compute an execution order, falling back to collection order when the
/// graph cannot be fully ordered
pub fn topological_order<'a>(nodes: &'a [Node], edges: &[Edge]) -> Vec<&'a Node> {
    let order = kahn_order(nodes, edges);
    if order.len() == nodes.len() {
        return order.into_iter().map(|i| &nodes[i]).collect();
    }
    log::warn!(
        "Workflow graph could not be fully ordered ({} of {} nodes placed); using collection order",
        order.len(),
        nodes.len()
    );
    nodes.iter().collect()
}

/// Compute an execution order under an explicit policy
pub fn order_with_policy<'a>(
    nodes: &'a [Node],
    edges: &[Edge],
    policy: SortPolicy,
) -> Result<Vec<&'a Node>> {
    match policy {
        SortPolicy::Fallback => Ok(topological_order(nodes, edges)),
        SortPolicy::Strict => {
            let order = kahn_order(nodes, edges);
            if order.len() < nodes.len() {
                return Err(FlowError::CyclicGraph {
                    sorted: order.len(),
                    total: nodes.len(),
                });
            }
            Ok(order.into_iter().map(|i| &nodes[i]).collect())
        }
    }
}
