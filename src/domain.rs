use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeggError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathwayId(String);

impl PathwayId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn ko_name(&self) -> String {
        format!("ko{}", self.0)
    }
}

impl fmt::Display for PathwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PathwayId {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let normalized = normalized
            .strip_prefix("ko")
            .or_else(|| normalized.strip_prefix("map"))
            .unwrap_or(normalized);
        let is_valid = !normalized.is_empty() && normalized.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(KeggError::Parse {
                line: 0,
                content: value.to_string(),
                reason: "pathway id must be numeric".to_string(),
            });
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub category: String,
    pub sub_category: String,
    pub pathway: String,
    pub pathway_id: PathwayId,
    pub gene_id: String,
    pub orthology_id: String,
    pub name: String,
    pub description: String,
    pub enzyme: Option<String>,
}
