//! Attack Nodes
//!
//! The six built-in blocks of the attack simulation editor, plus the
//! collaborators they call.
//!
//! # Categories
//!
//! - **Input**: STIX Data Loader
//! - **Processing**: Threat Actor, Technique Filter, AI Plan Generator, Command Builder
//! - **Output**: Report Generator
//!
//! Hosts build a registry with [`builtin_registry`] and hand it to a
//! `flow_engine::WorkflowRunner`.

pub mod block_type;
pub mod config;
pub mod generation;
pub mod input;
pub mod output;
pub mod processing;
#[cfg(test)]
mod scenarios;
pub mod setup;
pub mod stix;
mod values;

pub use block_type::BlockType;
pub use config::{
    BlockConfig, BlockSettings, CommandBuilderConfig, ConfigError, Impact, ModelId,
    PlanGeneratorConfig, Platform, ReportFormat, ReportGeneratorConfig, StixLoaderConfig,
    StixSourceKind, TechniqueFilterConfig, ThreatActorConfig,
};
pub use generation::{
    CommandOptions, GenerationError, GeneratorConfig, PlanOptions, TemplateGenerator, TextGenerator,
};
pub use input::*;
pub use output::*;
pub use processing::*;
pub use setup::{builtin_registry, BlockServices};
pub use stix::{
    CachedStixSource, HttpStixSource, StaticStixSource, StixBundle, StixError, StixSource,
    StixSourceConfig, Technique, ThreatActor,
};

#[cfg(test)]
mod tests {
    use flow_engine::{NodeCategory, NodeRegistry};

    #[test]
    fn test_inventory_collects_all_builtins() {
        let registry = NodeRegistry::with_builtins();

        assert_eq!(registry.all_metadata().len(), 6, "Expected 6 built-in blocks");
        assert_eq!(
            registry.block_types(),
            vec![
                "stixLoader",
                "threatActor",
                "techniqueFilter",
                "aiGenerator",
                "commandBuilder",
                "reportGenerator",
            ]
        );
    }

    #[test]
    fn test_palette_groups() {
        let registry = NodeRegistry::with_builtins();
        let grouped = registry.metadata_by_category();

        assert_eq!(grouped[&NodeCategory::Input].len(), 1);
        assert_eq!(grouped[&NodeCategory::Processing].len(), 4);
        assert_eq!(grouped[&NodeCategory::Output][0].block_type, "reportGenerator");
    }
}
