//! Block type registry
//!
//! This module provides the catalog that maps block type strings to their
//! metadata and behaviors. The factory reads it to create blocks, the
//! runner reads it to find the behavior of each node.
//!
//! # Usage
//!
//! ```ignore
//! use flow_engine::{NodeRegistry, NodeExecutor};
//!
//! // Metadata for every block linked into the binary
//! let mut registry = NodeRegistry::with_builtins();
//! registry.attach_executor("stixLoader", Arc::new(MyLoader))?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::{BlockMetadata, DescriptorFn};
use crate::error::{FlowError, Result};
use crate::types::{Configuration, NodeCategory, PortValues};

/// Behavior of one block type
///
/// Receives the node's configuration and its resolved inputs, returns the
/// produced value for each output port. An `Err` is recorded on the node and
/// the run moves on.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute this block type with the given configuration and inputs
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues>;
}

type BoxedCallback = Box<
    dyn Fn(String, Configuration, PortValues) -> Pin<Box<dyn Future<Output = Result<PortValues>> + Send>>
        + Send
        + Sync,
>;

/// Async callback-based NodeExecutor
///
/// Wraps an async closure as a NodeExecutor.
pub struct CallbackNodeExecutor {
    callback: BoxedCallback,
}

#[async_trait]
impl NodeExecutor for CallbackNodeExecutor {
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues> {
        (self.callback)(node_id.to_string(), configuration.clone(), inputs).await
    }
}

/// Synchronous callback-based NodeExecutor
///
/// Wraps a synchronous closure for pure behaviors.
pub struct SyncCallbackNodeExecutor {
    callback: Box<dyn Fn(&Configuration, PortValues) -> Result<PortValues> + Send + Sync>,
}

impl SyncCallbackNodeExecutor {
    pub fn new(
        callback: impl Fn(&Configuration, PortValues) -> Result<PortValues> + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl NodeExecutor for SyncCallbackNodeExecutor {
    async fn execute(
        &self,
        _node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues> {
        (self.callback)(configuration, inputs)
    }
}

/// A registration entry combining metadata with an optional behavior
struct RegistryEntry {
    metadata: BlockMetadata,
    executor: Option<Arc<dyn NodeExecutor>>,
}

/// Registry of block types with their metadata and behaviors
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry holding the metadata of every block descriptor
    /// submitted through `inventory`
    ///
    /// Entries have no behavior attached; hosts attach executors afterwards.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in inventory::iter::<DescriptorFn> {
            registry.register_metadata((descriptor.0)());
        }
        log::debug!("Collected {} built-in block descriptors", registry.entries.len());
        registry
    }

    /// Register a block type with metadata and a behavior
    pub fn register(&mut self, metadata: BlockMetadata, executor: Arc<dyn NodeExecutor>) {
        self.entries.insert(
            metadata.block_type.clone(),
            RegistryEntry {
                metadata,
                executor: Some(executor),
            },
        );
    }

    /// Register a block type backed by an async callback
    pub fn register_callback<F, Fut>(&mut self, metadata: BlockMetadata, callback: F)
    where
        F: Fn(String, Configuration, PortValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PortValues>> + Send + 'static,
    {
        let executor = Arc::new(CallbackNodeExecutor {
            callback: Box::new(move |node_id, configuration, inputs| {
                Box::pin(callback(node_id, configuration, inputs))
            }),
        });
        self.register(metadata, executor);
    }

    /// Register a block type with metadata only (no behavior)
    ///
    /// Used for palette listing and block creation.
    pub fn register_metadata(&mut self, metadata: BlockMetadata) {
        self.entries.insert(
            metadata.block_type.clone(),
            RegistryEntry {
                metadata,
                executor: None,
            },
        );
    }

    /// Attach a behavior to an already registered block type
    pub fn attach_executor(
        &mut self,
        block_type: &str,
        executor: Arc<dyn NodeExecutor>,
    ) -> Result<()> {
        let entry = self
            .entries
            .get_mut(block_type)
            .ok_or_else(|| FlowError::UnknownBlockType(block_type.to_string()))?;
        entry.executor = Some(executor);
        Ok(())
    }

    /// Get metadata for a block type
    pub fn get_metadata(&self, block_type: &str) -> Option<&BlockMetadata> {
        self.entries.get(block_type).map(|e| &e.metadata)
    }

    /// Get all registered metadata in palette order
    pub fn all_metadata(&self) -> Vec<&BlockMetadata> {
        let mut all: Vec<&BlockMetadata> = self.entries.values().map(|e| &e.metadata).collect();
        all.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.block_type.cmp(&b.block_type)));
        all
    }

    /// Get metadata grouped by category, each group in palette order
    pub fn metadata_by_category(&self) -> HashMap<NodeCategory, Vec<&BlockMetadata>> {
        let mut grouped: HashMap<NodeCategory, Vec<&BlockMetadata>> = HashMap::new();
        for metadata in self.all_metadata() {
            grouped.entry(metadata.category).or_default().push(metadata);
        }
        grouped
    }

    /// Get the behavior for a block type
    pub fn get_executor(&self, block_type: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.entries
            .get(block_type)
            .and_then(|e| e.executor.clone())
    }

    /// Check if a block type is registered
    pub fn has_block_type(&self, block_type: &str) -> bool {
        self.entries.contains_key(block_type)
    }

    /// List all registered block type strings in palette order
    pub fn block_types(&self) -> Vec<&str> {
        self.all_metadata()
            .into_iter()
            .map(|m| m.block_type.as_str())
            .collect()
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same block_type.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PortMetadata;
    use crate::types::PortDataType;

    fn test_metadata(block_type: &str, order: u32) -> BlockMetadata {
        BlockMetadata {
            block_type: block_type.to_string(),
            category: NodeCategory::Processing,
            label: format!("Test {}", block_type),
            description: "Test block".to_string(),
            color: "#000000".to_string(),
            icon: "cube".to_string(),
            inputs: vec![PortMetadata::new("input", "Input", PortDataType::String)],
            outputs: vec![PortMetadata::new("output", "Output", PortDataType::String)],
            order,
        }
    }

    #[test]
    fn test_register_and_lookup_metadata() {
        let mut registry = NodeRegistry::new();
        registry.register_metadata(test_metadata("test-block", 0));

        assert!(registry.has_block_type("test-block"));
        assert!(!registry.has_block_type("unknown"));

        let meta = registry.get_metadata("test-block").unwrap();
        assert_eq!(meta.label, "Test test-block");
    }

    #[test]
    fn test_all_metadata_in_palette_order() {
        let mut registry = NodeRegistry::new();
        registry.register_metadata(test_metadata("block-c", 2));
        registry.register_metadata(test_metadata("block-a", 0));
        registry.register_metadata(test_metadata("block-b", 1));

        assert_eq!(registry.block_types(), vec!["block-a", "block-b", "block-c"]);
    }

    #[test]
    fn test_merge_override() {
        let mut registry1 = NodeRegistry::new();
        let mut meta1 = test_metadata("block-a", 0);
        meta1.label = "Original".to_string();
        registry1.register_metadata(meta1);

        let mut registry2 = NodeRegistry::new();
        let mut meta2 = test_metadata("block-a", 0);
        meta2.label = "Override".to_string();
        registry2.register_metadata(meta2);
        registry2.register_metadata(test_metadata("block-b", 1));

        registry1.merge(registry2);
        assert_eq!(registry1.all_metadata().len(), 2);
        assert_eq!(registry1.get_metadata("block-a").unwrap().label, "Override");
    }

    #[tokio::test]
    async fn test_sync_callback_executor() {
        let executor = SyncCallbackNodeExecutor::new(|configuration, _inputs| {
            let mut outputs = PortValues::new();
            outputs.insert(
                "result".to_string(),
                configuration.get("value").cloned().unwrap_or_default(),
            );
            Ok(outputs)
        });

        let mut configuration = Configuration::new();
        configuration.insert("value".to_string(), serde_json::json!("configured"));
        let result = executor
            .execute("block-1", &configuration, PortValues::new())
            .await
            .unwrap();

        assert_eq!(result.get("result").unwrap(), "configured");
    }

    #[tokio::test]
    async fn test_register_with_callback() {
        let mut registry = NodeRegistry::new();
        registry.register_callback(test_metadata("echo", 0), |_node_id, _config, inputs| async move {
            Ok(inputs)
        });

        let executor = registry.get_executor("echo").unwrap();
        let mut inputs = PortValues::new();
        inputs.insert("value".to_string(), serde_json::json!("hello"));

        let result = executor
            .execute("echo-1", &Configuration::new(), inputs)
            .await
            .unwrap();
        assert_eq!(result.get("value").unwrap(), "hello");
    }

    #[test]
    fn test_attach_executor() {
        let mut registry = NodeRegistry::new();
        registry.register_metadata(test_metadata("metadata-only", 0));
        assert!(registry.get_executor("metadata-only").is_none());

        let executor = Arc::new(SyncCallbackNodeExecutor::new(|_, inputs| Ok(inputs)));
        registry.attach_executor("metadata-only", executor.clone()).unwrap();
        assert!(registry.get_executor("metadata-only").is_some());

        let err = registry.attach_executor("missing", executor).unwrap_err();
        assert!(matches!(err, FlowError::UnknownBlockType(t) if t == "missing"));
    }

    #[test]
    fn test_metadata_by_category() {
        let mut registry = NodeRegistry::new();

        let mut meta_input = test_metadata("loader", 0);
        meta_input.category = NodeCategory::Input;
        registry.register_metadata(meta_input);
        registry.register_metadata(test_metadata("filter", 1));
        registry.register_metadata(test_metadata("selector", 2));

        let grouped = registry.metadata_by_category();
        assert_eq!(grouped.get(&NodeCategory::Input).unwrap().len(), 1);
        let processing = grouped.get(&NodeCategory::Processing).unwrap();
        assert_eq!(processing[0].block_type, "filter");
        assert_eq!(processing[1].block_type, "selector");
    }
}
