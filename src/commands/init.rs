use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::{CliArgs, InitArgs};
use crate::commands::common;
use crate::config::OutputFormat;
use crate::error::AppError;
use crate::output::json as json_out;

const CONFIG_DIR: &str = ".ncsync";
const CONFIG_FILE: &str = "config.yaml";

pub fn run(args: &CliArgs, cmd: &InitArgs) -> Result<()> {
    let resolved = common::load_config(args)?;
    let format = common::output_format(args, &resolved);

    let target = resolve_target_path(cmd.path.as_deref());
    let existed = target.exists();
    if existed && !cmd.force {
        return Err(AppError::validation(format!(
            "Config already exists: {} (use --force to overwrite)",
            target.display()
        ))
        .into());
    }

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(&target, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    if args.quiet {
        return Ok(());
    }

    if matches!(format, OutputFormat::Json) {
        let payload = json!({
            "path": target.display().to_string(),
            "created": true,
            "overwritten": existed,
        });
        let body = json_out::emit_json(&payload, common::json_pretty(&resolved))?;
        println!("{}", body);
    } else {
        println!("Wrote config to {}", target.display());
    }

    Ok(())
}

fn resolve_target_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(path)
            if path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json")) =>
        {
            path.to_path_buf()
        }
        Some(dir) => dir.join(CONFIG_DIR).join(CONFIG_FILE),
        None => Path::new(CONFIG_DIR).join(CONFIG_FILE),
    }
}

const CONFIG_TEMPLATE: &str = r#"# ncsync configuration
# Tokens are best kept out of this file: point apiTokenEnv at an
# environment variable (a .env file next to the project works too).

defaultSource: staging
defaultTarget: production

environments:
  staging:
    baseUrl: https://staging.nocodb.example.com
    apiTokenEnv: NOCODB_STAGING_TOKEN
    # Values: v2 | v3 (schema compare supports v2 only)
    apiVersion: v2
    baseId: p_staging_base
  production:
    baseUrl: https://nocodb.example.com
    apiTokenEnv: NOCODB_PRODUCTION_TOKEN
    apiVersion: v2
    baseId: p_production_base
    # workspaceId is only needed to list bases over the v3 API.
    # workspaceId: ws_example

options:
  # Match table and column titles case-insensitively.
  ignoreCase: true
  # Plan deletions for tables and columns missing from the source.
  includeDeleteOps: false
  # Compare system-owned columns (id, created_at, ...).
  includeSystemColumns: false

settings:
  # HTTP timeout in milliseconds; 0 disables it.
  timeout: 30000
  output:
    # defaultFormat controls output when no explicit flag is used.
    # Values: pretty | markdown | json
    defaultFormat: pretty
    json:
      pretty: true
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    #[test]
    fn template_parses_as_config() {
        let parsed: ConfigFile = serde_yaml::from_str(CONFIG_TEMPLATE).expect("template yaml");
        assert_eq!(parsed.default_source.as_deref(), Some("staging"));
        assert_eq!(parsed.environments.len(), 2);
        assert_eq!(
            parsed.environments["production"].api_token_env.as_deref(),
            Some("NOCODB_PRODUCTION_TOKEN")
        );
    }

    #[test]
    fn directories_get_the_default_file_name() {
        assert_eq!(
            resolve_target_path(Some(Path::new("proj"))),
            Path::new("proj").join(".ncsync").join("config.yaml")
        );
        assert_eq!(
            resolve_target_path(Some(Path::new("custom.yml"))),
            PathBuf::from("custom.yml")
        );
    }
}
