use serde::{Deserialize, Serialize};

/// Server configuration as returned by the v1 config endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigV1Dto {
    pub default_branch: String,
    pub max_supported_api_version: u32,
}

/// Server configuration as returned by the v2 config endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigV2Dto {
    pub default_branch: String,
    pub min_supported_api_version: u32,
    pub max_supported_api_version: u32,
    pub actual_api_version: u32,
    pub spec_version: String,
}

/// Kind of a named reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Branch,
}

/// A named reference, without any commit metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceDto {
    #[serde(rename = "type")]
    pub reference_type: ReferenceType,
    pub name: String,
}

impl ReferenceDto {
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            reference_type: ReferenceType::Branch,
            name: name.into(),
        }
    }
}

/// Response for the reference listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferencesDto {
    pub references: Vec<ReferenceDto>,
}

/// Liveness/readiness body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthDto {
    pub status: String,
    pub service: String,
}
