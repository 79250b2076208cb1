//! Block factory
//!
//! Creates block instances from the catalog. Ids come from a process-wide
//! counter and are never reused while the process lives.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{FlowError, Result};
use crate::registry::NodeRegistry;
use crate::types::{Configuration, Node, NodeData, NodeId, Position, NODE_RENDER_TYPE};

const ID_PREFIX: &str = "block-";

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(0);

/// Allocate the next block id
pub fn next_block_id() -> NodeId {
    format!("{}{}", ID_PREFIX, NEXT_BLOCK_ID.fetch_add(1, Ordering::SeqCst))
}

/// Advance the counter past every `block-N` id in `ids`
///
/// Called when a workflow is loaded so blocks created afterwards cannot
/// collide with loaded ones.
pub fn reserve_ids<'a>(ids: impl IntoIterator<Item = &'a str>) {
    for id in ids {
        if let Some(n) = id
            .strip_prefix(ID_PREFIX)
            .and_then(|suffix| suffix.parse::<u64>().ok())
        {
            NEXT_BLOCK_ID.fetch_max(n.saturating_add(1), Ordering::SeqCst);
        }
    }
}

/// Create a new block of `block_type` at `position`
///
/// The block's ports, label, color and icon are copied from the catalog and
/// its configuration starts empty.
pub fn create_block(registry: &NodeRegistry, block_type: &str, position: Position) -> Result<Node> {
    let metadata = registry
        .get_metadata(block_type)
        .ok_or_else(|| FlowError::UnknownBlockType(block_type.to_string()))?;

    let node = Node {
        id: next_block_id(),
        render_type: NODE_RENDER_TYPE.to_string(),
        position,
        data: NodeData {
            label: metadata.label.clone(),
            block_type: metadata.block_type.clone(),
            color: metadata.color.clone(),
            inputs: metadata.input_ids(),
            outputs: metadata.output_ids(),
            icon: metadata.icon.clone(),
            configuration: Configuration::new(),
            is_executing: false,
            execution_result: None,
        },
    };

    log::debug!("Created block {} of type '{}'", node.id, block_type);
    Ok(node)
}
