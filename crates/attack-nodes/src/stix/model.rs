//! STIX 2.x bundle types
//!
//! Only the fields the blocks read are typed. Everything else an object
//! carries is kept in `extra` so a bundle passes through a workflow intact.

use serde::{Deserialize, Serialize};

/// STIX object type of ATT&CK techniques
pub const ATTACK_PATTERN: &str = "attack-pattern";
/// STIX object type of ATT&CK groups
pub const INTRUSION_SET: &str = "intrusion-set";
/// STIX object type of relationships
pub const RELATIONSHIP: &str = "relationship";
/// Relationship type linking a group to a technique it employs
pub const USES: &str = "uses";
/// `source_name` of the external reference holding the ATT&CK id
pub const MITRE_ATTACK_SOURCE: &str = "mitre-attack";

fn default_bundle_type() -> String {
    "bundle".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A STIX bundle: a flat list of objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StixBundle {
    #[serde(rename = "type", default = "default_bundle_type")]
    pub bundle_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub objects: Vec<StixObject>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StixBundle {
    pub fn new(objects: Vec<StixObject>) -> Self {
        Self {
            bundle_type: default_bundle_type(),
            id: String::new(),
            objects,
            extra: serde_json::Map::new(),
        }
    }

    /// Objects of one STIX type, in bundle order
    pub fn objects_of_type<'a>(&'a self, object_type: &'a str) -> impl Iterator<Item = &'a StixObject> + 'a {
        self.objects.iter().filter(move |o| o.object_type == object_type)
    }

    /// Find an object by STIX id
    pub fn get(&self, id: &str) -> Option<&StixObject> {
        self.objects.iter().find(|o| o.id == id)
    }
}

/// Phase of a kill chain an attack pattern belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillChainPhase {
    pub kill_chain_name: String,
    pub phase_name: String,
}

/// Pointer to an external catalog entry (e.g. the ATT&CK technique page)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReference {
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One STIX domain or relationship object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StixObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kill_chain_phases: Vec<KillChainPhase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,
    #[serde(rename = "x_mitre_platforms", default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub revoked: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StixObject {
    /// A bare object of `object_type` with the given id
    pub fn new(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: id.into(),
            name: None,
            description: None,
            aliases: Vec::new(),
            kill_chain_phases: Vec::new(),
            external_references: Vec::new(),
            platforms: Vec::new(),
            relationship_type: None,
            source_ref: None,
            target_ref: None,
            revoked: false,
            extra: serde_json::Map::new(),
        }
    }

    /// A `uses` relationship from `source` to `target`
    pub fn uses(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        let mut rel = Self::new(RELATIONSHIP, id);
        rel.relationship_type = Some(USES.to_string());
        rel.source_ref = Some(source.into());
        rel.target_ref = Some(target.into());
        rel
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// ATT&CK id (e.g. `T1059.001`) from the external references
    pub fn attack_id(&self) -> Option<&str> {
        self.external_references
            .iter()
            .find(|r| r.source_name == MITRE_ATTACK_SOURCE)
            .and_then(|r| r.external_id.as_deref())
    }
}

/// A technique as it travels between blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technique {
    /// ATT&CK id when known, the STIX id otherwise
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kill_chain_phases: Vec<KillChainPhase>,
    #[serde(default, alias = "x_mitre_platforms", skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stix_id: Option<String>,
}

impl Technique {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kill_chain_phases: Vec::new(),
            platforms: Vec::new(),
            stix_id: None,
        }
    }

    /// The technique a threat actor block emits when no dataset reaches it
    pub fn valid_accounts() -> Self {
        Self::new("T1078", "Valid Accounts")
    }

    /// Build from an `attack-pattern` object
    pub fn from_attack_pattern(object: &StixObject) -> Self {
        Self {
            id: object
                .attack_id()
                .map(str::to_string)
                .unwrap_or_else(|| object.id.clone()),
            name: object.name.clone().unwrap_or_default(),
            description: object.description.clone().unwrap_or_default(),
            kill_chain_phases: object.kill_chain_phases.clone(),
            platforms: object.platforms.clone(),
            stix_id: Some(object.id.clone()),
        }
    }

    /// Whether the technique belongs to a kill chain phase
    pub fn in_phase(&self, phase: &str) -> bool {
        self.kill_chain_phases.iter().any(|p| p.phase_name == phase)
    }

    /// Whether the technique declares support for `platform` (case-insensitive)
    pub fn supports_platform(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| p.eq_ignore_ascii_case(platform))
    }
}

/// An intrusion set as listed for actor selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatActor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl ThreatActor {
    pub fn from_intrusion_set(object: &StixObject) -> Self {
        Self {
            id: object.id.clone(),
            name: object.name.clone().unwrap_or_default(),
            description: object.description.clone().unwrap_or_default(),
            aliases: object.aliases.clone(),
        }
    }
}
