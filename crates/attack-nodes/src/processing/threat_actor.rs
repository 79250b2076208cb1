//! Threat Actor selector
//!
//! Picks an intrusion set from the upstream dataset and emits the techniques
//! it uses.

use async_trait::async_trait;
use flow_engine::{
    BlockDescriptor, BlockMetadata, Configuration, FlowError, NodeCategory, NodeExecutor,
    PortDataType, PortMetadata, PortValues, Result,
};

use crate::block_type::BlockType;
use crate::config::{BlockSettings, ThreatActorConfig};
use crate::stix::{self, Technique};
use crate::values;

/// Selects the techniques of one threat actor
///
/// With no dataset connected the block emits the single default technique
/// `T1078 Valid Accounts`. With a dataset but no actor configured it emits
/// every technique in the dataset.
#[derive(Debug, Clone, Default)]
pub struct ThreatActorBlock;

impl ThreatActorBlock {
    pub const PORT_STIX_DATA: &'static str = "stixData";
    pub const PORT_TECHNIQUES: &'static str = "techniques";

    /// Techniques selected for `config` from an optional dataset
    pub fn select(bundle: Option<&stix::StixBundle>, config: &ThreatActorConfig) -> Result<Vec<Technique>> {
        let Some(bundle) = bundle else {
            return Ok(vec![Technique::valid_accounts()]);
        };

        let actor = config.actor.trim();
        if actor.is_empty() {
            return Ok(stix::all_techniques(bundle));
        }

        let found = stix::find_actor(bundle, actor)
            .ok_or_else(|| FlowError::failed(format!("Threat actor '{}' not found in dataset", actor)))?;
        Ok(stix::techniques_for_actor(bundle, &found.id))
    }
}

impl BlockDescriptor for ThreatActorBlock {
    fn descriptor() -> BlockMetadata {
        BlockMetadata {
            block_type: BlockType::ThreatActor.to_string(),
            category: NodeCategory::Processing,
            label: "Threat Actor".to_string(),
            description: "Selects the techniques used by a threat actor".to_string(),
            color: "#E5989B".to_string(),
            icon: "user-secret".to_string(),
            inputs: vec![PortMetadata::new(
                Self::PORT_STIX_DATA,
                "STIX Data",
                PortDataType::Json,
            )],
            outputs: vec![PortMetadata::new(
                Self::PORT_TECHNIQUES,
                "Techniques",
                PortDataType::List,
            )],
            order: BlockType::ThreatActor.order(),
        }
    }
}

inventory::submit!(flow_engine::DescriptorFn(ThreatActorBlock::descriptor));

#[async_trait]
impl NodeExecutor for ThreatActorBlock {
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues> {
        let config = ThreatActorConfig::from_configuration(configuration)?;
        let bundle = values::bundle(&inputs, Self::PORT_STIX_DATA)?;

        let techniques = Self::select(bundle.as_ref(), &config)?;
        log::debug!(
            "ThreatActorBlock {}: {} techniques for actor '{}'",
            node_id,
            techniques.len(),
            config.actor
        );

        values::output(Self::PORT_TECHNIQUES, &techniques)
    }
}
