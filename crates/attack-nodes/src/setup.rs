//! Registry setup for host applications.
//!
//! Hosts build a [`BlockServices`] once at startup and pass it to
//! [`builtin_registry`]. The services are the collaborators the blocks call
//! out to: a STIX source for the loader and a text generator for the plan and
//! command blocks.

use std::sync::Arc;

use flow_engine::{BlockDescriptor, NodeRegistry};

use crate::generation::{GeneratorConfig, TemplateGenerator, TextGenerator};
use crate::input::StixLoaderBlock;
use crate::output::ReportGeneratorBlock;
use crate::processing::{
    CommandBuilderBlock, PlanGeneratorBlock, TechniqueFilterBlock, ThreatActorBlock,
};
use crate::stix::{CachedStixSource, HttpStixSource, StaticStixSource, StixSource, StixSourceConfig};

/// Collaborators shared by the built-in blocks
#[derive(Clone)]
pub struct BlockServices {
    pub stix: Arc<dyn StixSource>,
    pub generator: Arc<dyn TextGenerator>,
}

impl BlockServices {
    pub fn new(stix: Arc<dyn StixSource>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { stix, generator }
    }

    /// Fetch ATT&CK data over HTTP, cached per dataset, and render plans
    /// from templates
    pub fn http(stix: StixSourceConfig, generator: GeneratorConfig) -> Self {
        log::info!(
            "Using MITRE ATT&CK data from {} (retry x{})",
            stix.enterprise_url,
            stix.retry.max_attempts
        );
        Self::new(
            Arc::new(CachedStixSource::new(HttpStixSource::new(stix))),
            Arc::new(TemplateGenerator::new(generator)),
        )
    }

    /// Serve ATT&CK data from memory; no network access
    pub fn offline(stix: StaticStixSource) -> Self {
        Self::new(Arc::new(stix), Arc::new(TemplateGenerator::default()))
    }
}

impl Default for BlockServices {
    fn default() -> Self {
        Self::http(StixSourceConfig::default(), GeneratorConfig::default())
    }
}

/// Registry with every built-in block and its behavior attached
///
/// Starts from the link-time catalog so descriptors contributed by other
/// crates stay listed, then registers the six built-in blocks explicitly.
pub fn builtin_registry(services: &BlockServices) -> NodeRegistry {
    let mut registry = NodeRegistry::with_builtins();

    registry.register(
        StixLoaderBlock::descriptor(),
        Arc::new(StixLoaderBlock::new(services.stix.clone())),
    );
    registry.register(ThreatActorBlock::descriptor(), Arc::new(ThreatActorBlock));
    registry.register(TechniqueFilterBlock::descriptor(), Arc::new(TechniqueFilterBlock));
    registry.register(
        PlanGeneratorBlock::descriptor(),
        Arc::new(PlanGeneratorBlock::new(services.generator.clone())),
    );
    registry.register(
        CommandBuilderBlock::descriptor(),
        Arc::new(CommandBuilderBlock::new(services.generator.clone())),
    );
    registry.register(ReportGeneratorBlock::descriptor(), Arc::new(ReportGeneratorBlock));

    log::debug!("Registered {} block types", registry.block_types().len());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_type::BlockType;

    #[test]
    fn test_every_builtin_has_a_behavior() {
        let registry = builtin_registry(&BlockServices::offline(StaticStixSource::new()));
        for block_type in BlockType::ALL {
            assert!(
                registry.get_executor(block_type.as_str()).is_some(),
                "{} has no executor",
                block_type
            );
        }
    }

    #[test]
    fn test_default_services_do_not_fetch_eagerly() {
        // Building the HTTP services must not touch the network
        let services = BlockServices::default();
        let registry = builtin_registry(&services);
        assert_eq!(registry.block_types().len(), BlockType::ALL.len());
    }
}
