//! Technique Filter
//!
//! Narrows a technique list to one target platform.

use async_trait::async_trait;
use flow_engine::{
    BlockDescriptor, BlockMetadata, Configuration, NodeCategory, NodeExecutor, PortDataType,
    PortMetadata, PortValues, Result,
};

use crate::block_type::BlockType;
use crate::config::{BlockSettings, TechniqueFilterConfig};
use crate::stix::{self, Technique};
use crate::values;

/// Filters techniques by declared platform
///
/// # Configuration
/// - `filterByPlatform` - off by default, which passes the list through
/// - `platform` - `windows` (default), `linux` or `macos`
#[derive(Debug, Clone, Default)]
pub struct TechniqueFilterBlock;

impl TechniqueFilterBlock {
    pub const PORT_TECHNIQUES: &'static str = "techniques";
    pub const PORT_FILTERED_TECHNIQUES: &'static str = "filteredTechniques";

    pub fn apply(techniques: Vec<Technique>, config: &TechniqueFilterConfig) -> Vec<Technique> {
        if config.filter_by_platform {
            stix::filter_by_platform(&techniques, config.platform.as_str())
        } else {
            techniques
        }
    }
}

impl BlockDescriptor for TechniqueFilterBlock {
    fn descriptor() -> BlockMetadata {
        BlockMetadata {
            block_type: BlockType::TechniqueFilter.to_string(),
            category: NodeCategory::Processing,
            label: "Technique Filter".to_string(),
            description: "Keeps the techniques that apply to a platform".to_string(),
            color: "#B5EAD7".to_string(),
            icon: "filter".to_string(),
            inputs: vec![PortMetadata::new(
                Self::PORT_TECHNIQUES,
                "Techniques",
                PortDataType::List,
            )],
            outputs: vec![PortMetadata::new(
                Self::PORT_FILTERED_TECHNIQUES,
                "Filtered Techniques",
                PortDataType::List,
            )],
            order: BlockType::TechniqueFilter.order(),
        }
    }
}

inventory::submit!(flow_engine::DescriptorFn(TechniqueFilterBlock::descriptor));

#[async_trait]
impl NodeExecutor for TechniqueFilterBlock {
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues> {
        let config = TechniqueFilterConfig::from_configuration(configuration)?;
        let techniques = values::techniques(&inputs, Self::PORT_TECHNIQUES)?;
        let received = techniques.len();

        let filtered = Self::apply(techniques, &config);
        if config.filter_by_platform {
            log::debug!(
                "TechniqueFilterBlock {}: {} of {} techniques run on {}",
                node_id,
                filtered.len(),
                received,
                config.platform
            );
        }

        values::output(Self::PORT_FILTERED_TECHNIQUES, &filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_engine::FlowError;
    use serde_json::json;

    fn technique(id: &str, platforms: &[&str]) -> Technique {
        let mut t = Technique::new(id, id);
        t.platforms = platforms.iter().map(|p| p.to_string()).collect();
        t
    }

    fn inputs(techniques: &[Technique]) -> PortValues {
        let mut inputs = PortValues::new();
        inputs.insert(
            TechniqueFilterBlock::PORT_TECHNIQUES.to_string(),
            serde_json::to_value(techniques).unwrap(),
        );
        inputs
    }

    fn ids(outputs: &PortValues) -> Vec<String> {
        outputs[TechniqueFilterBlock::PORT_FILTERED_TECHNIQUES]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn sample() -> Vec<Technique> {
        vec![
            technique("T1", &["Windows"]),
            technique("T2", &["Linux", "macOS"]),
            technique("T3", &["linux"]),
            technique("T4", &[]),
        ]
    }

    #[test]
    fn test_descriptor() {
        let meta = TechniqueFilterBlock::descriptor();
        assert_eq!(meta.block_type, "techniqueFilter");
        assert_eq!(meta.input_ids(), vec!["techniques"]);
        assert_eq!(meta.output_ids(), vec!["filteredTechniques"]);
    }

    #[tokio::test]
    async fn test_pass_through_when_disabled() {
        let mut config = Configuration::new();
        config.insert("platform".to_string(), json!("linux"));

        let outputs = TechniqueFilterBlock
            .execute("block-2", &config, inputs(&sample()))
            .await
            .unwrap();
        assert_eq!(ids(&outputs), vec!["T1", "T2", "T3", "T4"]);
    }

    #[tokio::test]
    async fn test_filters_preserving_order() {
        let mut config = Configuration::new();
        config.insert("filterByPlatform".to_string(), json!(true));
        config.insert("platform".to_string(), json!("linux"));

        let outputs = TechniqueFilterBlock
            .execute("block-2", &config, inputs(&sample()))
            .await
            .unwrap();
        assert_eq!(ids(&outputs), vec!["T2", "T3"]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let mut config = Configuration::new();
        config.insert("filterByPlatform".to_string(), json!(true));

        let outputs = TechniqueFilterBlock
            .execute("block-2", &config, PortValues::new())
            .await
            .unwrap();
        assert!(ids(&outputs).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_platform_fails() {
        let mut config = Configuration::new();
        config.insert("platform".to_string(), json!("solaris"));

        let err = TechniqueFilterBlock
            .execute("block-2", &config, PortValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::ExecutionFailed(msg) if msg.contains("techniqueFilter")));
    }
}
