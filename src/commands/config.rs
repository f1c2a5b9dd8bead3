use std::io::{self, Write};

use anyhow::Result;

use crate::cli::CliArgs;
use crate::commands::common;
use crate::config::{OutputFormat, ResolvedConfig, Side};
use crate::output::json as json_out;
use crate::output::{TableOptions, table};

pub fn run(args: &CliArgs) -> Result<()> {
    let resolved = common::load_config(args)?;
    let format = common::output_format(args, &resolved);

    if args.quiet {
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let payload = json_out::config_to_json(&resolved);
            let body = json_out::emit_json(&payload, common::json_pretty(&resolved))?;
            println!("{}", body);
        }
        _ => {
            let rows = config_rows(&resolved);
            let rendered =
                table::render_key_value_table("Config", &rows, format, &TableOptions::default());
            writeln!(io::stdout(), "{}", rendered)?;
        }
    }

    Ok(())
}

fn config_rows(resolved: &ResolvedConfig) -> Vec<(String, String)> {
    let mut rows = vec![(
        "configPath".to_string(),
        resolved
            .config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string()),
    )];

    for side in [Side::Source, Side::Target] {
        let prefix = side.as_str();
        let name = match side {
            Side::Source => &resolved.source_name,
            Side::Target => &resolved.target_name,
        };
        let env = resolved.environment(side);
        rows.extend([
            (
                format!("{}.name", prefix),
                name.clone().unwrap_or_else(|| "(none)".to_string()),
            ),
            (format!("{}.baseUrl", prefix), env.base_url.clone()),
            (
                format!("{}.apiTokenSaved", prefix),
                env.has_token().to_string(),
            ),
            (
                format!("{}.apiVersion", prefix),
                env.api_version.as_str().to_string(),
            ),
            (
                format!("{}.baseId", prefix),
                env.base_id.clone().unwrap_or_default(),
            ),
        ]);
        if let Some(workspace) = &env.workspace_id {
            rows.push((format!("{}.workspaceId", prefix), workspace.clone()));
        }
    }

    rows.extend([
        (
            "ignoreCase".to_string(),
            resolved.options.ignore_case.to_string(),
        ),
        (
            "includeDeleteOps".to_string(),
            resolved.options.include_delete_ops.to_string(),
        ),
        (
            "includeSystemColumns".to_string(),
            resolved.options.include_system_columns.to_string(),
        ),
        (
            "timeoutMs".to_string(),
            resolved.settings.timeout_ms.to_string(),
        ),
    ]);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompareDefaults, SettingsResolved};
    use crate::remote::EnvironmentConfig;

    #[test]
    fn rows_never_include_tokens() {
        let resolved = ResolvedConfig {
            config_path: None,
            source_name: Some("prod".to_string()),
            target_name: None,
            source: EnvironmentConfig {
                base_url: "https://prod.example.com".to_string(),
                api_token: "super-secret".to_string(),
                workspace_id: Some("ws1".to_string()),
                ..EnvironmentConfig::default()
            },
            target: EnvironmentConfig::default(),
            options: CompareDefaults::default(),
            settings: SettingsResolved::default(),
        };
        let rows = config_rows(&resolved);
        assert!(rows.iter().all(|(_, value)| !value.contains("super-secret")));
        assert!(rows.contains(&("source.apiTokenSaved".to_string(), "true".to_string())));
        assert!(rows.contains(&("source.workspaceId".to_string(), "ws1".to_string())));
        assert!(rows.contains(&("target.name".to_string(), "(none)".to_string())));
    }
}
