//! STIX Data Loader
//!
//! Fetches an ATT&CK bundle through the configured `StixSource` and hands it
//! downstream as JSON.

use std::sync::Arc;

use async_trait::async_trait;
use flow_engine::{
    BlockDescriptor, BlockMetadata, Configuration, FlowError, NodeCategory, NodeExecutor,
    PortDataType, PortMetadata, PortValues, Result,
};

use crate::block_type::BlockType;
use crate::config::{BlockSettings, StixLoaderConfig};
use crate::stix::StixSource;
use crate::values;

/// Loader block backed by a STIX data source
///
/// # Configuration
/// - `source` - `enterprise` (default), `mobile` or `ics`
///
/// # Outputs
/// - `stixData` - the fetched bundle
pub struct StixLoaderBlock {
    source: Arc<dyn StixSource>,
}

impl StixLoaderBlock {
    /// Port ID for the bundle output
    pub const PORT_STIX_DATA: &'static str = "stixData";

    pub fn new(source: Arc<dyn StixSource>) -> Self {
        Self { source }
    }
}

impl BlockDescriptor for StixLoaderBlock {
    fn descriptor() -> BlockMetadata {
        BlockMetadata {
            block_type: BlockType::StixLoader.to_string(),
            category: NodeCategory::Input,
            label: "STIX Data Loader".to_string(),
            description: "Loads MITRE ATT&CK STIX data".to_string(),
            color: "#619ED6".to_string(),
            icon: "database".to_string(),
            inputs: vec![],
            outputs: vec![PortMetadata::new(
                Self::PORT_STIX_DATA,
                "STIX Data",
                PortDataType::Json,
            )],
            order: BlockType::StixLoader.order(),
        }
    }
}

inventory::submit!(flow_engine::DescriptorFn(StixLoaderBlock::descriptor));

#[async_trait]
impl NodeExecutor for StixLoaderBlock {
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        _inputs: PortValues,
    ) -> Result<PortValues> {
        let config = StixLoaderConfig::from_configuration(configuration)?;
        log::debug!("StixLoaderBlock {}: loading {} dataset", node_id, config.source);

        let bundle = self
            .source
            .fetch(config.source)
            .await
            .map_err(|e| FlowError::failed(e.to_string()))?;

        values::output(Self::PORT_STIX_DATA, bundle.as_ref())
    }
}
