//! Live workflow store
//!
//! The shared node/edge collection that the diagram layer edits and the
//! runner reads and writes. Cloning a `WorkflowStore` yields another handle
//! to the same workflow.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::error::{FlowError, Result};
use crate::factory::{create_block, reserve_ids};
use crate::registry::NodeRegistry;
use crate::types::{Edge, Node, NodeId, PortValues, Position, Workflow};
use crate::validation::check_connection;

/// Shared, mutable workflow with a run-in-progress flag
#[derive(Clone, Default)]
pub struct WorkflowStore {
    workflow: Arc<RwLock<Workflow>>,
    running: Arc<AtomicBool>,
}

/// Holds the run flag; releases it when dropped
pub(crate) struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl WorkflowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `workflow`
    pub fn from_workflow(workflow: Workflow) -> Self {
        reserve_ids(workflow.nodes.iter().map(|n| n.id.as_str()));
        Self {
            workflow: Arc::new(RwLock::new(workflow)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Claim the run flag, failing if another run holds it
    pub(crate) fn begin_run(&self) -> Result<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| FlowError::RunInProgress)?;
        Ok(RunGuard {
            running: self.running.clone(),
        })
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Workflow> {
        self.workflow.read().await
    }

    /// Copy of the current nodes and edges
    pub async fn snapshot(&self) -> Workflow {
        self.workflow.read().await.clone()
    }

    /// Copy of one node
    pub async fn node(&self, node_id: &str) -> Option<Node> {
        self.workflow.read().await.find_node(node_id).cloned()
    }

    /// Create a block from the catalog and append it
    pub async fn add_block(
        &self,
        registry: &NodeRegistry,
        block_type: &str,
        position: Position,
    ) -> Result<NodeId> {
        let node = create_block(registry, block_type, position)?;
        let id = node.id.clone();
        self.workflow.write().await.nodes.push(node);
        Ok(id)
    }

    /// Append an edge if the validator accepts it
    ///
    /// Returns `false` and leaves the workflow untouched on rejection.
    /// Edges without an id get the diagram layer's id.
    pub async fn connect(&self, edge: Edge) -> bool {
        let mut workflow = self.workflow.write().await;
        match check_connection(&workflow.nodes, &edge) {
            Ok(()) => {
                let edge = if edge.id.is_none() {
                    edge.with_diagram_id()
                } else {
                    edge
                };
                log::debug!(
                    "Connected {}:{} -> {}:{}",
                    edge.source,
                    edge.source_handle,
                    edge.target,
                    edge.target_handle
                );
                workflow.edges.push(edge);
                true
            }
            Err(reason) => {
                log::debug!("Rejected connection: {}", reason);
                false
            }
        }
    }

    /// Remove a node and its attached edges
    pub async fn remove_node(&self, node_id: &str) -> Result<Node> {
        self.workflow
            .write()
            .await
            .remove_node(node_id)
            .ok_or_else(|| FlowError::NodeNotFound(node_id.to_string()))
    }

    /// Remove an edge by its diagram id
    pub async fn remove_edge(&self, edge_id: &str) -> Option<Edge> {
        let mut workflow = self.workflow.write().await;
        let pos = workflow
            .edges
            .iter()
            .position(|e| e.id.as_deref() == Some(edge_id))?;
        Some(workflow.edges.remove(pos))
    }

    /// Change a node's display label
    pub async fn set_label(&self, node_id: &str, label: impl Into<String>) -> Result<()> {
        let mut workflow = self.workflow.write().await;
        let node = workflow
            .find_node_mut(node_id)
            .ok_or_else(|| FlowError::NodeNotFound(node_id.to_string()))?;
        node.data.label = label.into();
        Ok(())
    }

    /// Set one configuration option of a node
    ///
    /// Allowed during a run; it takes effect on the next run.
    pub async fn update_configuration(
        &self,
        node_id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut workflow = self.workflow.write().await;
        let node = workflow
            .find_node_mut(node_id)
            .ok_or_else(|| FlowError::NodeNotFound(node_id.to_string()))?;
        node.data.configuration.insert(key.into(), value);
        Ok(())
    }

    /// Swap in a whole workflow (load)
    pub async fn replace(&self, workflow: Workflow) {
        reserve_ids(workflow.nodes.iter().map(|n| n.id.as_str()));
        log::info!(
            "Replacing workflow: {} nodes, {} edges",
            workflow.nodes.len(),
            workflow.edges.len()
        );
        *self.workflow.write().await = workflow;
    }

    /// Load a workflow file and replace the current workflow with it
    pub async fn load_from_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let workflow = Workflow::load_from_path(path)?;
        self.replace(workflow).await;
        Ok(())
    }

    /// Save the current workflow to a file
    pub async fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        self.snapshot().await.save_to_path(path)
    }

    /// Clear execution results and flags on every node
    ///
    /// Rejected while a run is in flight.
    pub async fn reset_execution(&self) -> Result<()> {
        // Checked under the write lock so a run cannot start in between
        let mut workflow = self.workflow.write().await;
        if self.is_running() {
            return Err(FlowError::RunInProgress);
        }
        workflow.clear_execution();
        log::debug!("Execution state reset");
        Ok(())
    }

    /// Mark a node as executing; returns `false` if it no longer exists
    pub(crate) async fn mark_executing(&self, node_id: &str) -> bool {
        match self.workflow.write().await.find_node_mut(node_id) {
            Some(node) => {
                node.data.is_executing = true;
                true
            }
            None => false,
        }
    }

    /// Record a node's result and clear its executing flag
    pub(crate) async fn settle(&self, node_id: &str, result: PortValues) -> bool {
        match self.workflow.write().await.find_node_mut(node_id) {
            Some(node) => {
                node.data.execution_result = Some(result);
                node.data.is_executing = false;
                true
            }
            None => false,
        }
    }
}
