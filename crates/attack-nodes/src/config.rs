//! Typed block configuration
//!
//! A node stores its configuration as an open JSON map so the diagram layer
//! can persist it untouched. Each block reads that map into its own typed
//! settings struct before running; a wrong type or an unrecognised option
//! value fails the node with a `ConfigError`.

use std::fmt;
use std::str::FromStr;

use flow_engine::{Configuration, FlowError, Node};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block_type::BlockType;

/// Default values for block settings
pub mod defaults {
    /// Sampling temperature used when none is configured
    pub const TEMPERATURE: f64 = 0.7;
    /// Inclusive temperature range accepted by the generators
    pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=1.0;
}

/// Invalid block configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {block_type}: {message}")]
    Invalid {
        block_type: BlockType,
        message: String,
    },

    #[error("Temperature {0} is outside the range [0, 1]")]
    TemperatureOutOfRange(f64),

    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),
}

impl From<ConfigError> for FlowError {
    fn from(e: ConfigError) -> Self {
        FlowError::ExecutionFailed(e.to_string())
    }
}

/// ATT&CK dataset a loader reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StixSourceKind {
    #[default]
    Enterprise,
    Mobile,
    Ics,
}

impl StixSourceKind {
    pub const ALL: [StixSourceKind; 3] = [
        StixSourceKind::Enterprise,
        StixSourceKind::Mobile,
        StixSourceKind::Ics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StixSourceKind::Enterprise => "enterprise",
            StixSourceKind::Mobile => "mobile",
            StixSourceKind::Ics => "ics",
        }
    }
}

impl fmt::Display for StixSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StixSourceKind {
    type Err = crate::stix::StixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StixSourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::stix::StixError::UnknownSource(s.to_string()))
    }
}

/// Target operating system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Windows,
    Linux,
    Macos,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text model a generator would use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "ollama/llama3")]
    OllamaLlama3,
    #[serde(rename = "ollama/llama2")]
    OllamaLlama2,
    #[serde(rename = "openai/gpt-4")]
    OpenAiGpt4,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::OllamaLlama3 => "ollama/llama3",
            ModelId::OllamaLlama2 => "ollama/llama2",
            ModelId::OpenAiGpt4 => "openai/gpt-4",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary goal of a generated plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Impact {
    #[default]
    #[serde(rename = "data exfiltration")]
    DataExfiltration,
    #[serde(rename = "ransomware")]
    Ransomware,
    #[serde(rename = "data destruction")]
    DataDestruction,
    #[serde(rename = "service disruption")]
    ServiceDisruption,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::DataExfiltration => "data exfiltration",
            Impact::Ransomware => "ransomware",
            Impact::DataDestruction => "data destruction",
            Impact::ServiceDisruption => "service disruption",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of the report block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Text,
    Json,
}

fn check_temperature(temperature: f64) -> Result<(), ConfigError> {
    if defaults::TEMPERATURE_RANGE.contains(&temperature) {
        Ok(())
    } else {
        Err(ConfigError::TemperatureOutOfRange(temperature))
    }
}

/// Typed settings of one block type
pub trait BlockSettings: Serialize + DeserializeOwned + Default {
    /// Block type these settings belong to
    const BLOCK_TYPE: BlockType;

    /// Check value ranges serde cannot express
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Read the settings from a node's open configuration map
    ///
    /// Missing keys take their defaults. Keys the block does not know are
    /// ignored.
    fn from_configuration(configuration: &Configuration) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_value(serde_json::Value::Object(configuration.clone()))
            .map_err(|e| ConfigError::Invalid {
                block_type: Self::BLOCK_TYPE,
                message: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write the settings back into an open configuration map
    fn to_configuration(&self) -> Configuration {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Configuration::new(),
        }
    }
}

/// Settings of the STIX loader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StixLoaderConfig {
    pub source: StixSourceKind,
}

impl BlockSettings for StixLoaderConfig {
    const BLOCK_TYPE: BlockType = BlockType::StixLoader;
}

/// Settings of the threat actor selector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThreatActorConfig {
    /// STIX id, name or alias of an intrusion set; empty selects every technique
    pub actor: String,
}

impl BlockSettings for ThreatActorConfig {
    const BLOCK_TYPE: BlockType = BlockType::ThreatActor;
}

/// Settings of the technique filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TechniqueFilterConfig {
    pub filter_by_platform: bool,
    pub platform: Platform,
}

impl BlockSettings for TechniqueFilterConfig {
    const BLOCK_TYPE: BlockType = BlockType::TechniqueFilter;
}

/// Settings of the plan generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanGeneratorConfig {
    pub model: ModelId,
    pub temperature: f64,
    pub impact: Impact,
}

impl Default for PlanGeneratorConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            temperature: defaults::TEMPERATURE,
            impact: Impact::default(),
        }
    }
}

impl BlockSettings for PlanGeneratorConfig {
    const BLOCK_TYPE: BlockType = BlockType::PlanGenerator;

    fn validate(&self) -> Result<(), ConfigError> {
        check_temperature(self.temperature)
    }
}

/// Settings of the command builder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandBuilderConfig {
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl BlockSettings for CommandBuilderConfig {
    const BLOCK_TYPE: BlockType = BlockType::CommandBuilder;

    fn validate(&self) -> Result<(), ConfigError> {
        match self.temperature {
            Some(t) => check_temperature(t),
            None => Ok(()),
        }
    }
}

/// Settings of the report generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportGeneratorConfig {
    pub format: ReportFormat,
    pub include_remediation: bool,
}

impl BlockSettings for ReportGeneratorConfig {
    const BLOCK_TYPE: BlockType = BlockType::ReportGenerator;
}

/// Settings of any built-in block, selected by block type
#[derive(Debug, Clone, PartialEq)]
pub enum BlockConfig {
    StixLoader(StixLoaderConfig),
    ThreatActor(ThreatActorConfig),
    TechniqueFilter(TechniqueFilterConfig),
    PlanGenerator(PlanGeneratorConfig),
    CommandBuilder(CommandBuilderConfig),
    ReportGenerator(ReportGeneratorConfig),
}

impl BlockConfig {
    /// Parse `configuration` as the settings of `block_type`
    pub fn parse(block_type: BlockType, configuration: &Configuration) -> Result<Self, ConfigError> {
        Ok(match block_type {
            BlockType::StixLoader => Self::StixLoader(StixLoaderConfig::from_configuration(configuration)?),
            BlockType::ThreatActor => Self::ThreatActor(ThreatActorConfig::from_configuration(configuration)?),
            BlockType::TechniqueFilter => {
                Self::TechniqueFilter(TechniqueFilterConfig::from_configuration(configuration)?)
            }
            BlockType::PlanGenerator => {
                Self::PlanGenerator(PlanGeneratorConfig::from_configuration(configuration)?)
            }
            BlockType::CommandBuilder => {
                Self::CommandBuilder(CommandBuilderConfig::from_configuration(configuration)?)
            }
            BlockType::ReportGenerator => {
                Self::ReportGenerator(ReportGeneratorConfig::from_configuration(configuration)?)
            }
        })
    }

    /// Parse the configuration of a workflow node
    pub fn for_node(node: &Node) -> Result<Self, ConfigError> {
        let block_type = node
            .block_type()
            .parse::<BlockType>()
            .map_err(ConfigError::UnknownBlockType)?;
        Self::parse(block_type, &node.data.configuration)
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Self::StixLoader(_) => BlockType::StixLoader,
            Self::ThreatActor(_) => BlockType::ThreatActor,
            Self::TechniqueFilter(_) => BlockType::TechniqueFilter,
            Self::PlanGenerator(_) => BlockType::PlanGenerator,
            Self::CommandBuilder(_) => BlockType::CommandBuilder,
            Self::ReportGenerator(_) => BlockType::ReportGenerator,
        }
    }

    /// Settings as an open configuration map, defaults filled in
    pub fn to_configuration(&self) -> Configuration {
        match self {
            Self::StixLoader(c) => c.to_configuration(),
            Self::ThreatActor(c) => c.to_configuration(),
            Self::TechniqueFilter(c) => c.to_configuration(),
            Self::PlanGenerator(c) => c.to_configuration(),
            Self::CommandBuilder(c) => c.to_configuration(),
            Self::ReportGenerator(c) => c.to_configuration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configuration(value: serde_json::Value) -> Configuration {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_empty_configuration_uses_defaults() {
        let plan = PlanGeneratorConfig::from_configuration(&Configuration::new()).unwrap();
        assert_eq!(plan.model, ModelId::OllamaLlama3);
        assert_eq!(plan.temperature, 0.7);
        assert_eq!(plan.impact, Impact::DataExfiltration);

        let filter = TechniqueFilterConfig::from_configuration(&Configuration::new()).unwrap();
        assert!(!filter.filter_by_platform);
        assert_eq!(filter.platform, Platform::Windows);

        let loader = StixLoaderConfig::from_configuration(&Configuration::new()).unwrap();
        assert_eq!(loader.source, StixSourceKind::Enterprise);
    }

    #[test]
    fn test_configuration_values_are_read() {
        let config = configuration(json!({
            "model": "openai/gpt-4",
            "temperature": 0.2,
            "impact": "service disruption",
            "selected": true
        }));
        let plan = PlanGeneratorConfig::from_configuration(&config).unwrap();
        assert_eq!(plan.model, ModelId::OpenAiGpt4);
        assert_eq!(plan.temperature, 0.2);
        assert_eq!(plan.impact, Impact::ServiceDisruption);

        let filter = TechniqueFilterConfig::from_configuration(&configuration(json!({
            "filterByPlatform": true,
            "platform": "macos"
        })))
        .unwrap();
        assert!(filter.filter_by_platform);
        assert_eq!(filter.platform, Platform::Macos);
    }

    #[test]
    fn test_unknown_option_value_is_rejected() {
        let err = TechniqueFilterConfig::from_configuration(&configuration(json!({
            "platform": "solaris"
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                block_type: BlockType::TechniqueFilter,
                ..
            }
        ));

        let err = ReportGeneratorConfig::from_configuration(&configuration(json!({
            "includeRemediation": "yes"
        })))
        .unwrap_err();
        assert!(err.to_string().starts_with("Invalid configuration for reportGenerator"));
    }

    #[test]
    fn test_temperature_range() {
        for ok in [0.0, 0.5, 1.0] {
            assert!(PlanGeneratorConfig::from_configuration(&configuration(json!({ "temperature": ok }))).is_ok());
        }
        let err = PlanGeneratorConfig::from_configuration(&configuration(json!({ "temperature": 1.5 })))
            .unwrap_err();
        assert_eq!(err, ConfigError::TemperatureOutOfRange(1.5));

        let err = CommandBuilderConfig::from_configuration(&configuration(json!({ "temperature": -0.1 })))
            .unwrap_err();
        assert_eq!(err, ConfigError::TemperatureOutOfRange(-0.1));
        assert!(CommandBuilderConfig::from_configuration(&Configuration::new()).is_ok());
    }

    #[test]
    fn test_block_config_selects_shape_by_type() {
        let config = configuration(json!({ "actor": "APT29" }));
        let parsed = BlockConfig::parse(BlockType::ThreatActor, &config).unwrap();
        assert_eq!(
            parsed,
            BlockConfig::ThreatActor(ThreatActorConfig {
                actor: "APT29".to_string()
            })
        );
        assert_eq!(parsed.block_type(), BlockType::ThreatActor);
        assert_eq!(parsed.to_configuration()["actor"], "APT29");

        let defaults = BlockConfig::parse(BlockType::PlanGenerator, &Configuration::new()).unwrap();
        let map = defaults.to_configuration();
        assert_eq!(map["model"], "ollama/llama3");
        assert_eq!(map["impact"], "data exfiltration");
    }

    #[test]
    fn test_for_node_reads_every_catalog_block() {
        let registry = flow_engine::NodeRegistry::with_builtins();
        for block_type in BlockType::ALL {
            let node = flow_engine::create_block(
                &registry,
                block_type.as_str(),
                flow_engine::Position::new(0.0, 0.0),
            )
            .unwrap();
            let parsed = BlockConfig::for_node(&node).unwrap();
            assert_eq!(parsed.block_type(), block_type);
            assert_eq!(parsed, BlockConfig::parse(block_type, &Configuration::new()).unwrap());
        }

        let mut node = flow_engine::create_block(
            &registry,
            BlockType::TechniqueFilter.as_str(),
            flow_engine::Position::new(0.0, 0.0),
        )
        .unwrap();
        node.data
            .configuration
            .insert("platform".to_string(), json!("linux"));
        let parsed = BlockConfig::for_node(&node).unwrap();
        assert_eq!(parsed.to_configuration()["platform"], "linux");

        node.data.block_type = "shellRunner".to_string();
        assert_eq!(
            BlockConfig::for_node(&node).unwrap_err(),
            ConfigError::UnknownBlockType("shellRunner".to_string())
        );
    }

    #[test]
    fn test_config_error_becomes_execution_failure() {
        let err: FlowError = ConfigError::TemperatureOutOfRange(2.0).into();
        assert!(matches!(err, FlowError::ExecutionFailed(msg) if msg.contains("outside the range")));
    }

    #[test]
    fn test_source_kind_from_str() {
        assert_eq!("ICS".parse::<StixSourceKind>().unwrap(), StixSourceKind::Ics);
        assert!("pre-attack".parse::<StixSourceKind>().is_err());
    }
}
