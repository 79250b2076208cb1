//! Workflow run engine
//!
//! Executes the nodes of a `WorkflowStore` one at a time in dependency
//! order. Each node is marked executing, its inputs are resolved from the
//! live results of upstream nodes, its behavior runs, and the outcome is
//! written back to the store. A failing node records `{ "error": message }`
//! and the run moves on to the next node.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{FlowError, Result};
use crate::events::{EventSink, WorkflowEvent};
use crate::registry::NodeRegistry;
use crate::sort::order_with_policy;
use crate::store::WorkflowStore;
use crate::types::{Node, NodeData, NodeId, PortValues, Workflow, ERROR_KEY};

/// Global state of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
}

/// How a node settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Error { message: String },
}

/// Per-node execution state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeRunState {
    /// Not executed since the last reset
    Idle,
    /// Currently running its behavior
    Executing,
    /// Finished for the current run
    Settled { outcome: Outcome },
}

impl NodeRunState {
    /// Derive the state from a node's stored execution data
    pub fn of(data: &NodeData) -> Self {
        if data.is_executing {
            return Self::Executing;
        }
        match (&data.execution_result, data.error_message()) {
            (None, _) => Self::Idle,
            (Some(_), Some(message)) => Self::Settled {
                outcome: Outcome::Error {
                    message: message.to_string(),
                },
            },
            (Some(_), None) => Self::Settled {
                outcome: Outcome::Success,
            },
        }
    }
}

/// Settled state of one node in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub node_id: NodeId,
    pub outcome: Outcome,
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub execution_id: String,
    /// Settled nodes in execution order
    pub nodes: Vec<NodeReport>,
    /// Nodes removed from the store before their turn came
    pub skipped: Vec<NodeId>,
}

impl RunSummary {
    /// Execution order of the settled nodes
    pub fn order(&self) -> Vec<&str> {
        self.nodes.iter().map(|r| r.node_id.as_str()).collect()
    }

    /// Outcome of one node in this run
    pub fn outcome(&self, node_id: &str) -> Option<&Outcome> {
        self.nodes
            .iter()
            .find(|r| r.node_id == node_id)
            .map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.nodes
            .iter()
            .filter(|r| r.outcome == Outcome::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.nodes.len() - self.succeeded()
    }
}

/// Drives runs over a shared workflow store
pub struct WorkflowRunner {
    store: WorkflowStore,
    registry: Arc<NodeRegistry>,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl WorkflowRunner {
    pub fn new(store: WorkflowStore, registry: Arc<NodeRegistry>, events: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            registry,
            events,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn state(&self) -> RunState {
        if self.store.is_running() {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.store.is_running()
    }

    /// Execution state of one node
    pub async fn node_state(&self, node_id: &str) -> Option<NodeRunState> {
        self.store.node(node_id).await.map(|n| NodeRunState::of(&n.data))
    }

    /// Clear results on every node; rejected while running
    pub async fn reset_execution(&self) -> Result<()> {
        self.store.reset_execution().await
    }

    /// Run every node once, in dependency order
    ///
    /// Fails with `RunInProgress` if another run holds the store, or with
    /// `CyclicGraph` under the strict sort policy. Node failures do not fail
    /// the run; they are reported in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        let _guard = self.store.begin_run()?;
        let execution_id = Uuid::new_v4().to_string();

        // Configuration and edges are fixed for the whole run
        let snapshot = self.store.snapshot().await;
        let order: Vec<Node> = order_with_policy(&snapshot.nodes, &snapshot.edges, self.config.sort_policy)?
            .into_iter()
            .cloned()
            .collect();

        log::info!(
            "Starting workflow run {} with {} nodes",
            execution_id,
            order.len()
        );
        self.emit(WorkflowEvent::RunStarted {
            execution_id: execution_id.clone(),
            node_count: order.len(),
        });

        let mut summary = RunSummary {
            execution_id: execution_id.clone(),
            nodes: Vec::with_capacity(order.len()),
            skipped: Vec::new(),
        };

        let mut index = 0;
        while index < order.len() {
            if index > 0 {
                if let Some(delay) = self.config.step_delay() {
                    tokio::time::sleep(delay).await;
                }
            }
            let node = &order[index];
            index += 1;

            if !self.store.mark_executing(&node.id).await {
                log::warn!("Node {} was removed before its turn; skipping", node.id);
                summary.skipped.push(node.id.clone());
                continue;
            }
            self.emit(WorkflowEvent::NodeStarted {
                node_id: node.id.clone(),
                execution_id: execution_id.clone(),
            });
            log::debug!("Executing node {} ({})", node.id, node.block_type());

            let inputs = self.resolve_inputs(node, &snapshot).await;
            let outcome = self.execute_node(node, inputs).await;

            let (result, outcome) = match outcome {
                Ok(outputs) => {
                    self.emit(WorkflowEvent::NodeCompleted {
                        node_id: node.id.clone(),
                        execution_id: execution_id.clone(),
                        outputs: outputs.clone(),
                    });
                    (outputs, Outcome::Success)
                }
                Err(e) => {
                    let message = match e {
                        FlowError::ExecutionFailed(message) => message,
                        other => other.to_string(),
                    };
                    log::warn!("Node {} failed: {}", node.id, message);
                    self.emit(WorkflowEvent::NodeFailed {
                        node_id: node.id.clone(),
                        execution_id: execution_id.clone(),
                        error: message.clone(),
                    });
                    let mut marker = PortValues::new();
                    marker.insert(ERROR_KEY.to_string(), serde_json::Value::String(message.clone()));
                    (marker, Outcome::Error { message })
                }
            };

            if !self.store.settle(&node.id, result).await {
                log::warn!("Node {} was removed while executing; result dropped", node.id);
                summary.skipped.push(node.id.clone());
                continue;
            }
            summary.nodes.push(NodeReport {
                node_id: node.id.clone(),
                outcome,
            });
        }

        log::info!(
            "Workflow run {} finished: {} succeeded, {} failed",
            execution_id,
            summary.succeeded(),
            summary.failed()
        );
        self.emit(WorkflowEvent::RunCompleted { execution_id });

        Ok(summary)
    }

    /// Resolve each declared input from the first edge feeding it
    ///
    /// Values come from the live store so results produced earlier in this
    /// run are visible. Unresolved inputs get the port's empty default.
    async fn resolve_inputs(&self, node: &Node, snapshot: &Workflow) -> PortValues {
        let metadata = self.registry.get_metadata(node.block_type());
        let live = self.store.read().await;
        let mut inputs = PortValues::new();

        for port in &node.data.inputs {
            let upstream = snapshot
                .incoming_edges(&node.id)
                .find(|e| &e.target_handle == port)
                .and_then(|edge| {
                    live.find_node(&edge.source)
                        .and_then(|source| source.data.output(&edge.source_handle))
                        .cloned()
                });

            let value = upstream.unwrap_or_else(|| {
                metadata
                    .and_then(|m| m.input(port))
                    .map(|p| p.data_type.empty_value())
                    .unwrap_or(serde_json::Value::Null)
            });
            inputs.insert(port.clone(), value);
        }

        inputs
    }

    /// Invoke the node's behavior and check its outputs
    async fn execute_node(&self, node: &Node, inputs: PortValues) -> Result<PortValues> {
        let executor = self
            .registry
            .get_executor(node.block_type())
            .ok_or_else(|| FlowError::UnknownBlockType(node.block_type().to_string()))?;

        let mut outputs = executor
            .execute(&node.id, &node.data.configuration, inputs)
            .await?;

        // Results hold exactly the declared output ports
        outputs.retain(|port, _| node.has_output(port));
        if let Some(missing) = node.data.outputs.iter().find(|p| !outputs.contains_key(*p)) {
            return Err(FlowError::failed(format!(
                "Block produced no value for output '{}'",
                missing
            )));
        }
        Ok(outputs)
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver workflow event: {}", e);
        }
    }
}
