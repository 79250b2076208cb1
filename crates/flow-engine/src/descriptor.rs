//! Block descriptor trait and metadata types
//!
//! This module provides the `BlockDescriptor` trait that lets a block
//! implementation describe its catalog entry (ports, label, color, icon).
//! The block defines both its behavior AND its metadata, so the catalog has
//! a single source of truth.
//!
//! Descriptors are collected at link time:
//!
//! ```ignore
//! impl BlockDescriptor for MyBlock {
//!     fn descriptor() -> BlockMetadata { ... }
//! }
//!
//! inventory::submit!(flow_engine::DescriptorFn(MyBlock::descriptor));
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{NodeCategory, PortDataType, PortId};

/// Trait for blocks that can describe their catalog entry
pub trait BlockDescriptor {
    /// Get the static metadata for this block type
    fn descriptor() -> BlockMetadata
    where
        Self: Sized;
}

/// Function pointer wrapper collected by `inventory`
pub struct DescriptorFn(pub fn() -> BlockMetadata);

inventory::collect!(DescriptorFn);

/// Complete catalog entry for a block type
///
/// This describes everything needed to render a block in the palette,
/// create instances of it and validate connections to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    /// Unique type identifier (e.g., "stixLoader")
    pub block_type: String,
    /// Category for palette grouping
    pub category: NodeCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the block does
    pub description: String,
    /// Display color
    pub color: String,
    /// Icon key
    pub icon: String,
    /// Input ports, in declaration order
    pub inputs: Vec<PortMetadata>,
    /// Output ports, in declaration order
    pub outputs: Vec<PortMetadata>,
    /// Position in the palette
    pub order: u32,
}

impl BlockMetadata {
    /// Input port names in declaration order
    pub fn input_ids(&self) -> Vec<PortId> {
        self.inputs.iter().map(|p| p.id.clone()).collect()
    }

    /// Output port names in declaration order
    pub fn output_ids(&self) -> Vec<PortId> {
        self.outputs.iter().map(|p| p.id.clone()).collect()
    }

    /// Look up an input port by name
    pub fn input(&self, port: &str) -> Option<&PortMetadata> {
        self.inputs.iter().find(|p| p.id == port)
    }
}

/// Metadata for a port (input or output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMetadata {
    /// Port name (also the compatibility key)
    pub id: PortId,
    /// Human-readable label
    pub label: String,
    /// Shape of the carried value
    pub data_type: PortDataType,
}

impl PortMetadata {
    pub fn new(id: impl Into<String>, label: impl Into<String>, data_type: PortDataType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
        }
    }
}
