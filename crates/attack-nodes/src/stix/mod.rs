//! STIX / ATT&CK data: bundle model, queries and sources

mod model;
mod query;
mod source;

pub use model::{
    ExternalReference, KillChainPhase, StixBundle, StixObject, Technique, ThreatActor, ATTACK_PATTERN,
    INTRUSION_SET, MITRE_ATTACK_SOURCE, RELATIONSHIP, USES,
};
pub use query::{all_techniques, filter_by_platform, find_actor, techniques_for_actor, threat_actors};
pub use source::{
    defaults, CachedStixSource, HttpStixSource, RetryPolicy, StaticStixSource, StixError, StixSource,
    StixSourceConfig,
};
