use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    #[default]
    V2,
    V3,
}

impl ApiVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V2 => "v2",
            ApiVersion::V3 => "v3",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "v2" | "2" => Some(ApiVersion::V2),
            "v3" | "3" => Some(ApiVersion::V3),
            _ => None,
        }
    }

    /// Header NocoDB expects the API token under for this version.
    pub fn auth_header_name(self) -> &'static str {
        match self {
            ApiVersion::V3 => "xc-token",
            ApiVersion::V2 => "xc-auth",
        }
    }
}

/// One remote NocoDB instance.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub base_url: String,
    pub api_token: String,
    #[serde(default)]
    pub api_version: ApiVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl EnvironmentConfig {
    pub fn base_id(&self) -> Option<&str> {
        self.base_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn has_token(&self) -> bool {
        !self.api_token.trim().is_empty()
    }
}

impl fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &if self.has_token() { "***" } else { "" })
            .field("api_version", &self.api_version)
            .field("base_id", &self.base_id)
            .field("workspace_id", &self.workspace_id)
            .finish()
    }
}
