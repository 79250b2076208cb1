//! Core types for workflow graphs
//!
//! These types define the structure of a workflow: block instances (nodes),
//! the port-to-port connections between them (edges), and the data each node
//! carries for rendering and execution. The serde layout matches the
//! diagram layer's node/edge records so a saved workflow can be handed to it
//! unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Opaque identifier for an edge (assigned by the diagram layer)
pub type EdgeId = String;

/// Name of a port; equality of names is the only compatibility signal
pub type PortId = String;

/// User-set parameters of a node, keyed by option name
pub type Configuration = serde_json::Map<String, serde_json::Value>;

/// Values keyed by port name (resolved inputs or produced outputs)
pub type PortValues = HashMap<String, serde_json::Value>;

/// Render type every block node carries for the diagram layer
pub const NODE_RENDER_TYPE: &str = "customNode";

/// Key of the single marker stored in `executionResult` when a node fails
pub const ERROR_KEY: &str = "error";

/// The shape of the value a port carries
///
/// This never takes part in connection decisions. It only selects the empty
/// default an unconnected input resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDataType {
    /// Structured dataset (resolves to null when unconnected)
    Json,
    /// Ordered collection (resolves to an empty list)
    List,
    /// Text (resolves to an empty string)
    String,
}

impl PortDataType {
    /// The value an unresolved input of this type receives
    pub fn empty_value(&self) -> serde_json::Value {
        match self {
            PortDataType::Json => serde_json::Value::Null,
            PortDataType::List => serde_json::Value::Array(Vec::new()),
            PortDataType::String => serde_json::Value::String(String::new()),
        }
    }
}

/// Category of a block, used to group the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Blocks that bring data into the workflow
    Input,
    /// Blocks that transform upstream data
    Processing,
    /// Blocks that produce the final artifact
    Output,
}

/// Position of a node on the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

fn default_render_type() -> String {
    NODE_RENDER_TYPE.to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Per-node data: catalog attributes, user configuration and execution state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Display label (editable by the user)
    pub label: String,
    /// Catalog identifier of the block type (e.g. "stixLoader")
    pub block_type: String,
    /// Display color
    #[serde(default)]
    pub color: String,
    /// Declared input port names, in catalog order
    #[serde(default)]
    pub inputs: Vec<PortId>,
    /// Declared output port names, in catalog order
    #[serde(default)]
    pub outputs: Vec<PortId>,
    /// Icon key
    #[serde(default)]
    pub icon: String,
    /// User-set parameters, shape determined by the block type
    #[serde(default)]
    pub configuration: Configuration,
    /// Whether the node is currently executing
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_executing: bool,
    /// Outputs of the last run, or `{ "error": message }` on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<PortValues>,
}

impl NodeData {
    /// Error message recorded by the last run, if it failed
    pub fn error_message(&self) -> Option<&str> {
        self.execution_result
            .as_ref()
            .and_then(|r| r.get(ERROR_KEY))
            .and_then(|v| v.as_str())
    }

    /// Get a produced output value by port name
    pub fn output(&self, port: &str) -> Option<&serde_json::Value> {
        self.execution_result.as_ref().and_then(|r| r.get(port))
    }

    /// Clear recorded results and the executing flag
    pub fn clear_execution(&mut self) {
        self.is_executing = false;
        self.execution_result = None;
    }
}

/// A block instance in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Diagram render type (always `customNode` for blocks)
    #[serde(rename = "type", default = "default_render_type")]
    pub render_type: String,
    /// Position on the canvas
    pub position: Position,
    /// Block attributes, configuration and execution state
    pub data: NodeData,
}

impl Node {
    /// Catalog identifier of this node's block type
    pub fn block_type(&self) -> &str {
        &self.data.block_type
    }

    /// Check whether this node declares an input port
    pub fn has_input(&self, port: &str) -> bool {
        self.data.inputs.iter().any(|p| p == port)
    }

    /// Check whether this node declares an output port
    pub fn has_output(&self, port: &str) -> bool {
        self.data.outputs.iter().any(|p| p == port)
    }
}

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Diagram-layer edge id, opaque to the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    /// Source node ID
    pub source: NodeId,
    /// Source (output) port name
    pub source_handle: PortId,
    /// Target node ID
    pub target: NodeId,
    /// Target (input) port name
    pub target_handle: PortId,
}

impl Edge {
    /// Create an edge without a diagram id
    pub fn new(
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source: source.into(),
            source_handle: source_handle.into(),
            target: target.into(),
            target_handle: target_handle.into(),
        }
    }

    /// Assign the id the diagram layer would give this edge
    pub fn with_diagram_id(mut self) -> Self {
        self.id = Some(format!(
            "reactflow__edge-{}{}-{}{}",
            self.source, self.source_handle, self.target, self.target_handle
        ));
        self
    }
}

/// A complete workflow: the node and edge collections at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Nodes in insertion order
    pub nodes: Vec<Node>,
    /// Edges in insertion order
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Create an empty workflow
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Get the IDs of nodes that this node depends on (upstream nodes)
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_edges(node_id)
            .map(|e| e.source.clone())
            .collect()
    }

    /// Get the IDs of nodes that depend on this node (downstream nodes)
    pub fn get_dependents(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing_edges(node_id)
            .map(|e| e.target.clone())
            .collect()
    }

    /// Remove a node and every edge attached to it
    pub fn remove_node(&mut self, node_id: &str) -> Option<Node> {
        let pos = self.nodes.iter().position(|n| n.id == node_id)?;
        self.edges
            .retain(|e| e.source != node_id && e.target != node_id);
        Some(self.nodes.remove(pos))
    }

    /// Clear execution state on every node
    pub fn clear_execution(&mut self) {
        for node in &mut self.nodes {
            node.data.clear_execution();
        }
    }
}
