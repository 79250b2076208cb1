//! Flow Engine - block graph execution for attack-simulation workflows
//!
//! This crate provides the engine behind a visual block editor. Users place
//! typed blocks, wire equally named ports together and run the graph. It
//! supports:
//!
//! - A block catalog collected at link time (`DescriptorFn` + `inventory`)
//! - Port-name connection validation
//! - Deterministic dependency ordering with a cycle fallback
//! - Sequential async execution with per-node state and events
//! - Lossless JSON save/load of the workflow
//!
//! # Architecture
//!
//! - `WorkflowStore`: the live node/edge collection shared with the diagram layer
//! - `NodeRegistry`: block metadata plus a `NodeExecutor` behavior per type
//! - `WorkflowRunner`: runs the store's nodes in order, one at a time
//! - `EventSink`: generic event streaming for run progress
//!
//! # Example
//!
//! ```ignore
//! use flow_engine::{Edge, NodeRegistry, NullEventSink, Position, WorkflowRunner, WorkflowStore};
//!
//! let store = WorkflowStore::new();
//! let loader = store.add_block(&registry, "stixLoader", Position::default()).await?;
//! let actor = store.add_block(&registry, "threatActor", Position::new(250.0, 0.0)).await?;
//! store.connect(Edge::new(&loader, "stixData", &actor, "stixData")).await;
//!
//! let runner = WorkflowRunner::new(store, Arc::new(registry), Arc::new(NullEventSink));
//! let summary = runner.run().await?;
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod factory;
mod persistence;
pub mod registry;
pub mod runner;
pub mod sort;
pub mod store;
pub mod types;
pub mod validation;

// Re-export key types
pub use config::EngineConfig;
pub use descriptor::{BlockDescriptor, BlockMetadata, DescriptorFn, PortMetadata};
pub use error::{FlowError, Result};
pub use events::{EventError, EventSink, NullEventSink, VecEventSink, WorkflowEvent};
pub use factory::{create_block, next_block_id, reserve_ids};
pub use registry::{CallbackNodeExecutor, NodeExecutor, NodeRegistry, SyncCallbackNodeExecutor};
pub use runner::{NodeReport, NodeRunState, Outcome, RunState, RunSummary, WorkflowRunner};
pub use sort::{order_with_policy, topological_order, SortPolicy};
pub use store::WorkflowStore;
pub use types::{
    Configuration, Edge, EdgeId, Node, NodeCategory, NodeData, NodeId, PortDataType, PortId,
    PortValues, Position, Workflow, ERROR_KEY, NODE_RENDER_TYPE,
};
pub use validation::{can_connect, check_connection, validate_workflow, ConnectionError, ValidationError};

// Re-exported so block crates can submit descriptors without a direct dependency
pub use inventory;
