//! Command Builder
//!
//! Derives platform-specific commands from a plan.

use std::sync::Arc;

use async_trait::async_trait;
use flow_engine::{
    BlockDescriptor, BlockMetadata, Configuration, NodeCategory, NodeExecutor, PortDataType,
    PortMetadata, PortValues, Result,
};

use crate::block_type::BlockType;
use crate::config::{BlockSettings, CommandBuilderConfig};
use crate::generation::{CommandOptions, TextGenerator};
use crate::values;

/// Command generation block
///
/// # Configuration
/// - `platform` - `windows` (default), `linux` or `macos`
/// - `model`, `temperature` - optional generator overrides
pub struct CommandBuilderBlock {
    generator: Arc<dyn TextGenerator>,
}

impl CommandBuilderBlock {
    pub const PORT_PLAN: &'static str = "plan";
    pub const PORT_COMMANDS: &'static str = "commands";

    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

impl BlockDescriptor for CommandBuilderBlock {
    fn descriptor() -> BlockMetadata {
        BlockMetadata {
            block_type: BlockType::CommandBuilder.to_string(),
            category: NodeCategory::Processing,
            label: "Command Builder".to_string(),
            description: "Builds executable commands from an attack plan".to_string(),
            color: "#C7CEEA".to_string(),
            icon: "terminal".to_string(),
            inputs: vec![PortMetadata::new(Self::PORT_PLAN, "Plan", PortDataType::String)],
            outputs: vec![PortMetadata::new(
                Self::PORT_COMMANDS,
                "Commands",
                PortDataType::List,
            )],
            order: BlockType::CommandBuilder.order(),
        }
    }
}

inventory::submit!(flow_engine::DescriptorFn(CommandBuilderBlock::descriptor));

#[async_trait]
impl NodeExecutor for CommandBuilderBlock {
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues> {
        let config = CommandBuilderConfig::from_configuration(configuration)?;
        let plan = values::text(&inputs, Self::PORT_PLAN)?;

        let options = CommandOptions {
            platform: config.platform,
            model: config.model,
            temperature: config.temperature,
        };
        let commands = self.generator.generate_commands(&plan, &options).await?;
        log::debug!(
            "CommandBuilderBlock {}: {} {} commands",
            node_id,
            commands.len(),
            options.platform
        );

        values::output(Self::PORT_COMMANDS, &commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::TemplateGenerator;
    use flow_engine::FlowError;
    use serde_json::json;

    fn block() -> CommandBuilderBlock {
        CommandBuilderBlock::new(Arc::new(TemplateGenerator::default()))
    }

    async fn commands(config: Configuration, plan: serde_json::Value) -> Result<Vec<String>> {
        let mut inputs = PortValues::new();
        inputs.insert(CommandBuilderBlock::PORT_PLAN.to_string(), plan);
        let outputs = block().execute("block-4", &config, inputs).await?;
        Ok(serde_json::from_value(outputs[CommandBuilderBlock::PORT_COMMANDS].clone())?)
    }

    #[test]
    fn test_descriptor() {
        let meta = CommandBuilderBlock::descriptor();
        assert_eq!(meta.block_type, "commandBuilder");
        assert_eq!(meta.category, NodeCategory::Processing);
        assert_eq!(meta.input_ids(), vec!["plan"]);
        assert_eq!(meta.output_ids(), vec!["commands"]);
    }

    #[tokio::test]
    async fn test_default_platform_is_windows() {
        let commands = commands(Configuration::new(), json!("# Attack Plan"))
            .await
            .unwrap();
        assert_eq!(commands.len(), 3);
        assert!(commands.iter().any(|c| c.contains("powershell.exe")));
    }

    #[tokio::test]
    async fn test_macos_uses_unix_commands() {
        let mut config = Configuration::new();
        config.insert("platform".to_string(), json!("macos"));

        // An unconnected plan arrives as the empty string
        let commands = commands(config, json!("")).await.unwrap();
        assert!(commands[0].contains("crontab"));
    }

    #[tokio::test]
    async fn test_optional_temperature_is_checked() {
        let mut config = Configuration::new();
        config.insert("temperature".to_string(), json!(-0.1));

        let err = commands(config, json!("")).await.unwrap_err();
        assert!(matches!(err, FlowError::ExecutionFailed(_)));
    }
}
