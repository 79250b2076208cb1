//! Identifiers of the six catalog blocks

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Catalog identifier of a built-in block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    StixLoader,
    ThreatActor,
    TechniqueFilter,
    #[serde(rename = "aiGenerator")]
    PlanGenerator,
    CommandBuilder,
    ReportGenerator,
}

impl BlockType {
    /// Every built-in block, in palette order
    pub const ALL: [BlockType; 6] = [
        BlockType::StixLoader,
        BlockType::ThreatActor,
        BlockType::TechniqueFilter,
        BlockType::PlanGenerator,
        BlockType::CommandBuilder,
        BlockType::ReportGenerator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::StixLoader => "stixLoader",
            BlockType::ThreatActor => "threatActor",
            BlockType::TechniqueFilter => "techniqueFilter",
            BlockType::PlanGenerator => "aiGenerator",
            BlockType::CommandBuilder => "commandBuilder",
            BlockType::ReportGenerator => "reportGenerator",
        }
    }

    /// Position in the palette
    pub fn order(&self) -> u32 {
        match self {
            BlockType::StixLoader => 0,
            BlockType::ThreatActor => 1,
            BlockType::TechniqueFilter => 2,
            BlockType::PlanGenerator => 3,
            BlockType::CommandBuilder => 4,
            BlockType::ReportGenerator => 5,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_round_trip() {
        for block_type in BlockType::ALL {
            assert_eq!(block_type.as_str().parse::<BlockType>(), Ok(block_type));
            let json = serde_json::to_value(block_type).unwrap();
            assert_eq!(json, block_type.as_str());
        }
        assert_eq!("portScanner".parse::<BlockType>(), Err("portScanner".to_string()));
    }
}
