use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::error::AppError;
use crate::remote::endpoint::normalize_base_url;
use crate::remote::transport::{ApiRequest, Transport, auth_headers};
use crate::remote::types::{BaseSchema, BaseSummary, Table, text_field};
use crate::remote::{ApiVersion, EnvironmentConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub include_system_columns: bool,
}

/// Fail fast for API versions the schema fetcher cannot normalize.
pub fn ensure_supported(env: &EnvironmentConfig) -> Result<()> {
    if env.api_version != ApiVersion::V2 {
        return Err(AppError::config(format!(
            "Unsupported API version {}: schema fetch and compare support v2 only",
            env.api_version.as_str()
        ))
        .into());
    }
    Ok(())
}

pub async fn list_bases<T: Transport>(
    transport: &T,
    env: &EnvironmentConfig,
) -> Result<Vec<BaseSummary>> {
    let base_url = normalize_base_url(&env.base_url);
    let url = match env.api_version {
        ApiVersion::V2 => format!("{}/api/v2/meta/bases/", base_url),
        ApiVersion::V3 => {
            let workspace = env
                .workspace_id
                .as_deref()
                .filter(|ws| !ws.trim().is_empty())
                .ok_or_else(|| AppError::config("v3 requires workspaceId to list bases"))?;
            format!("{}/api/v3/meta/workspaces/{}/bases", base_url, workspace)
        }
    };

    let data = transport
        .send(&ApiRequest::get(url, auth_headers(env)))
        .await?;

    Ok(list_entries(&data)
        .iter()
        .map(|entry| BaseSummary {
            id: text_field(entry, "id").unwrap_or_default(),
            title: text_field(entry, "title").unwrap_or_default(),
        })
        .collect())
}

/// Fetch every table of `env.base_id` with its columns.
///
/// Any remote failure aborts the whole fetch; no partial schema is returned.
pub async fn fetch_base_schema<T: Transport>(
    transport: &T,
    env: &EnvironmentConfig,
    options: FetchOptions,
) -> Result<BaseSchema> {
    ensure_supported(env)?;
    let base_id = env
        .base_id()
        .ok_or_else(|| AppError::config("Missing baseId"))?
        .to_string();

    let base_url = normalize_base_url(&env.base_url);
    let headers = auth_headers(env);

    let tables_url = format!(
        "{}/api/v2/meta/bases/{}/tables?includeM2M=true",
        base_url, base_id
    );
    let listing = transport
        .send(&ApiRequest::get(tables_url, headers.clone()))
        .await
        .with_context(|| format!("Failed to list tables of base {}", base_id))?;
    let entries = listing
        .get("list")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut tables = Vec::with_capacity(entries.len());
    for entry in &entries {
        let table_id = text_field(entry, "id").unwrap_or_default();
        let meta_url = format!("{}/api/v2/meta/tables/{}", base_url, table_id);
        let meta = transport
            .send(&ApiRequest::get(meta_url, headers.clone()))
            .await
            .with_context(|| format!("Failed to fetch metadata of table {}", table_id))?;
        tables.push(Table::from_remote(
            entry,
            &meta,
            options.include_system_columns,
        ));
    }

    debug!("Fetched {} tables from base {}", tables.len(), base_id);
    Ok(BaseSchema { base_id, tables })
}

fn list_entries(data: &Value) -> Vec<Value> {
    match data.get("list") {
        Some(Value::Array(list)) => list.clone(),
        _ => data.as_array().cloned().unwrap_or_default(),
    }
}
