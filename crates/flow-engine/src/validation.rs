//! Connection and workflow validation
//!
//! Ports are compatible when their names are equal; there is no richer type
//! system. Cycles are not rejected here, the sorter tolerates them.

use std::collections::HashSet;

use thiserror::Error;

use crate::registry::NodeRegistry;
use crate::types::{Edge, Node, Workflow};

/// Reason a proposed edge was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Node '{0}' does not exist")]
    UnknownNode(String),

    #[error("Node '{node_id}' has no output port '{port}'")]
    UnknownSourcePort { node_id: String, port: String },

    #[error("Node '{node_id}' has no input port '{port}'")]
    UnknownTargetPort { node_id: String, port: String },

    #[error("Incompatible ports: '{source_port}' cannot feed '{target_port}'")]
    IncompatiblePorts {
        source_port: String,
        target_port: String,
    },
}

/// Check whether `edge` may be added to a workflow holding `nodes`
pub fn check_connection(nodes: &[Node], edge: &Edge) -> Result<(), ConnectionError> {
    let source = nodes
        .iter()
        .find(|n| n.id == edge.source)
        .ok_or_else(|| ConnectionError::UnknownNode(edge.source.clone()))?;
    let target = nodes
        .iter()
        .find(|n| n.id == edge.target)
        .ok_or_else(|| ConnectionError::UnknownNode(edge.target.clone()))?;

    if !source.has_output(&edge.source_handle) {
        return Err(ConnectionError::UnknownSourcePort {
            node_id: source.id.clone(),
            port: edge.source_handle.clone(),
        });
    }
    if !target.has_input(&edge.target_handle) {
        return Err(ConnectionError::UnknownTargetPort {
            node_id: target.id.clone(),
            port: edge.target_handle.clone(),
        });
    }
    if edge.source_handle != edge.target_handle {
        return Err(ConnectionError::IncompatiblePorts {
            source_port: edge.source_handle.clone(),
            target_port: edge.target_handle.clone(),
        });
    }

    Ok(())
}

/// Accept iff both ports are declared and their names are equal
pub fn can_connect(nodes: &[Node], edge: &Edge) -> bool {
    check_connection(nodes, edge).is_ok()
}

/// Structural problem found in a workflow
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A node has a block type the registry does not know
    UnknownBlockType { node_id: String, block_type: String },
    /// Two nodes share an id
    DuplicateNodeId { node_id: String },
    /// An edge references a node that does not exist
    UnknownNode { edge: String, node_id: String },
    /// An edge uses a port its node does not declare, or mismatched names
    InvalidConnection { edge: String, reason: ConnectionError },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBlockType {
                node_id,
                block_type,
            } => {
                write!(f, "Unknown block type '{}' for node '{}'", block_type, node_id)
            }
            Self::DuplicateNodeId { node_id } => {
                write!(f, "Node id '{}' is used more than once", node_id)
            }
            Self::UnknownNode { edge, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge, node_id)
            }
            Self::InvalidConnection { edge, reason } => {
                write!(f, "Edge '{}' is invalid: {}", edge, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

fn describe_edge(edge: &Edge) -> String {
    edge.id.clone().unwrap_or_else(|| {
        format!(
            "{}:{} -> {}:{}",
            edge.source, edge.source_handle, edge.target, edge.target_handle
        )
    })
}

/// Validate a whole workflow
///
/// Returns all validation errors found (not just the first).
/// Pass a registry to enable block type validation.
pub fn validate_workflow(
    workflow: &Workflow,
    registry: Option<&NodeRegistry>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_node_ids(workflow, &mut errors);
    validate_edges(workflow, &mut errors);

    if let Some(reg) = registry {
        validate_block_types(workflow, reg, &mut errors);
    }

    errors
}

fn validate_node_ids(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for node in &workflow.nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
}

fn validate_edges(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    for edge in &workflow.edges {
        match check_connection(&workflow.nodes, edge) {
            Ok(()) => {}
            Err(ConnectionError::UnknownNode(node_id)) => {
                errors.push(ValidationError::UnknownNode {
                    edge: describe_edge(edge),
                    node_id,
                });
            }
            Err(reason) => {
                errors.push(ValidationError::InvalidConnection {
                    edge: describe_edge(edge),
                    reason,
                });
            }
        }
    }
}

fn validate_block_types(
    workflow: &Workflow,
    registry: &NodeRegistry,
    errors: &mut Vec<ValidationError>,
) {
    for node in &workflow.nodes {
        if !registry.has_block_type(node.block_type()) {
            errors.push(ValidationError::UnknownBlockType {
                node_id: node.id.clone(),
                block_type: node.block_type().to_string(),
            });
        }
    }
}
