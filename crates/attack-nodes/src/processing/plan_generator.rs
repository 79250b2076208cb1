//! AI Plan Generator
//!
//! Turns the selected techniques into a written emulation plan through the
//! configured `TextGenerator`.

use std::sync::Arc;

use async_trait::async_trait;
use flow_engine::{
    BlockDescriptor, BlockMetadata, Configuration, NodeCategory, NodeExecutor, PortDataType,
    PortMetadata, PortValues, Result,
};

use crate::block_type::BlockType;
use crate::config::{BlockSettings, PlanGeneratorConfig};
use crate::generation::{PlanOptions, TextGenerator};
use crate::values;

/// Plan generation block
///
/// # Configuration
/// - `model` - `ollama/llama3` (default), `ollama/llama2` or `openai/gpt-4`
/// - `temperature` - sampling temperature in [0, 1], default 0.7
/// - `impact` - primary goal of the plan, default `data exfiltration`
///
/// # Inputs
/// - `filteredTechniques` - techniques to plan with
///
/// # Outputs
/// - `plan` - the plan text
pub struct PlanGeneratorBlock {
    generator: Arc<dyn TextGenerator>,
}

impl PlanGeneratorBlock {
    pub const PORT_FILTERED_TECHNIQUES: &'static str = "filteredTechniques";
    pub const PORT_PLAN: &'static str = "plan";

    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

impl BlockDescriptor for PlanGeneratorBlock {
    fn descriptor() -> BlockMetadata {
        BlockMetadata {
            block_type: BlockType::PlanGenerator.to_string(),
            category: NodeCategory::Processing,
            label: "AI Plan Generator".to_string(),
            description: "Writes an adversary emulation plan for the selected techniques"
                .to_string(),
            color: "#FFD166".to_string(),
            icon: "robot".to_string(),
            inputs: vec![PortMetadata::new(
                Self::PORT_FILTERED_TECHNIQUES,
                "Filtered Techniques",
                PortDataType::List,
            )],
            outputs: vec![PortMetadata::new(Self::PORT_PLAN, "Plan", PortDataType::String)],
            order: BlockType::PlanGenerator.order(),
        }
    }
}

inventory::submit!(flow_engine::DescriptorFn(PlanGeneratorBlock::descriptor));

#[async_trait]
impl NodeExecutor for PlanGeneratorBlock {
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues> {
        let config = PlanGeneratorConfig::from_configuration(configuration)?;
        let techniques = values::techniques(&inputs, Self::PORT_FILTERED_TECHNIQUES)?;

        let options = PlanOptions {
            model: config.model,
            temperature: config.temperature,
            impact: config.impact,
        };
        log::debug!(
            "PlanGeneratorBlock {}: planning {} with {} techniques",
            node_id,
            options.impact,
            techniques.len()
        );

        let plan = self.generator.generate_plan(&techniques, &options).await?;
        values::output(Self::PORT_PLAN, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::TemplateGenerator;
    use crate::stix::Technique;
    use flow_engine::FlowError;
    use serde_json::json;

    fn block() -> PlanGeneratorBlock {
        PlanGeneratorBlock::new(Arc::new(TemplateGenerator::default()))
    }

    #[test]
    fn test_descriptor() {
        let meta = PlanGeneratorBlock::descriptor();
        assert_eq!(meta.block_type, "aiGenerator");
        assert_eq!(meta.input_ids(), vec!["filteredTechniques"]);
        assert_eq!(meta.output_ids(), vec!["plan"]);
    }

    #[tokio::test]
    async fn test_generates_plan() {
        let mut config = Configuration::new();
        config.insert("impact".to_string(), json!("ransomware"));
        let mut inputs = PortValues::new();
        inputs.insert(
            PlanGeneratorBlock::PORT_FILTERED_TECHNIQUES.to_string(),
            serde_json::to_value(vec![Technique::valid_accounts()]).unwrap(),
        );

        let outputs = block().execute("block-3", &config, inputs).await.unwrap();
        let plan = outputs[PlanGeneratorBlock::PORT_PLAN].as_str().unwrap();
        assert!(plan.starts_with("# Attack Plan: RANSOMWARE"));
        assert!(plan.contains("- T1078: Valid Accounts"));
    }

    #[tokio::test]
    async fn test_temperature_out_of_range_fails() {
        let mut config = Configuration::new();
        config.insert("temperature".to_string(), json!(1.5));

        let err = block()
            .execute("block-3", &config, PortValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::ExecutionFailed(msg) if msg.contains("1.5")));
    }

    #[tokio::test]
    async fn test_unknown_model_fails() {
        let mut config = Configuration::new();
        config.insert("model".to_string(), json!("local/gpt-2"));

        assert!(block()
            .execute("block-3", &config, PortValues::new())
            .await
            .is_err());
    }
}
