use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::remote::ApiVersion;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub default_source: Option<String>,
    pub default_target: Option<String>,
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
    pub options: Option<CompareOptions>,
    pub settings: Option<Settings>,
}

/// A named NocoDB instance as written in the config file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub api_token_env: Option<String>,
    pub api_version: Option<ApiVersion>,
    pub base_id: Option<String>,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompareOptions {
    pub ignore_case: Option<bool>,
    pub include_delete_ops: Option<bool>,
    pub include_system_columns: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// HTTP timeout in milliseconds; 0 disables it.
    pub timeout: Option<u64>,
    pub output: Option<OutputSettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub default_format: Option<OutputFormat>,
    pub json: Option<JsonSettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JsonSettings {
    pub pretty: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pretty,
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
        }
    }
}
