use serde::Serialize;
use serde_json::json;

use crate::config::{ResolvedConfig, Side};

pub fn emit_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

pub fn error_json(message: &str, kind: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "kind": kind,
        }
    })
}

/// Resolved configuration with tokens withheld; `apiTokenSaved` reports
/// whether one is available.
pub fn config_to_json(resolved: &ResolvedConfig) -> serde_json::Value {
    json!({
        "configPath": resolved.config_path.as_ref().map(|p| p.display().to_string()),
        "source": environment_to_json(resolved, Side::Source),
        "target": environment_to_json(resolved, Side::Target),
        "options": {
            "ignoreCase": resolved.options.ignore_case,
            "includeDeleteOps": resolved.options.include_delete_ops,
            "includeSystemColumns": resolved.options.include_system_columns,
        },
        "settings": {
            "timeoutMs": resolved.settings.timeout_ms,
            "output": {
                "defaultFormat": resolved.settings.output.default_format.as_str(),
                "json": {
                    "pretty": resolved.settings.output.json.pretty,
                },
            }
        }
    })
}

fn environment_to_json(resolved: &ResolvedConfig, side: Side) -> serde_json::Value {
    let name = match side {
        Side::Source => &resolved.source_name,
        Side::Target => &resolved.target_name,
    };
    let env = resolved.environment(side);
    json!({
        "name": name,
        "baseUrl": env.base_url,
        "apiToken": "",
        "apiTokenSaved": env.has_token(),
        "apiVersion": env.api_version.as_str(),
        "baseId": env.base_id,
        "workspaceId": env.workspace_id,
    })
}
