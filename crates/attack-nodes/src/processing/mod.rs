//! Processing blocks
//!
//! Blocks that select, filter and generate from upstream data.

mod command_builder;
mod plan_generator;
mod technique_filter;
mod threat_actor;

pub use command_builder::CommandBuilderBlock;
pub use plan_generator::PlanGeneratorBlock;
pub use technique_filter::TechniqueFilterBlock;
pub use threat_actor::ThreatActorBlock;
