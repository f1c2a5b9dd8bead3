use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use crate::cli::{CliArgs, SideFlags};
use crate::config::OutputFormat;
use crate::config::{self, CliOverrides, EnvOverrides, ResolvedConfig};
use crate::error::AppError;
use crate::output;
use crate::remote::ApiVersion;

pub fn overrides_from_args(args: &CliArgs) -> Result<CliOverrides> {
    let api_version = match args.api_version.as_deref() {
        Some(raw) => Some(
            ApiVersion::parse(raw)
                .ok_or_else(|| AppError::config(format!("Invalid --api-version: {}", raw)))?,
        ),
        None => None,
    };

    Ok(CliOverrides {
        config_path: args.config_path.clone(),
        env_file: args.env_file.clone(),
        source_env: args.source.env_name.clone(),
        target_env: args.target.env_name.clone(),
        source: side_overrides(&args.source),
        target: side_overrides(&args.target),
        api_version,
        timeout_ms: args.timeout_ms,
    })
}

fn side_overrides(flags: &SideFlags) -> EnvOverrides {
    EnvOverrides {
        url: flags.url.clone(),
        token: flags.token.clone(),
        base_id: flags.base_id.clone(),
    }
}

pub fn load_config(args: &CliArgs) -> Result<ResolvedConfig> {
    let overrides = overrides_from_args(args)?;
    config::load_from_system(&overrides).map_err(|err| {
        if err.downcast_ref::<AppError>().is_some() {
            err
        } else {
            AppError::config(format!("{:#}", err)).into()
        }
    })
}

pub fn output_format(args: &CliArgs, resolved: &ResolvedConfig) -> OutputFormat {
    output::select_format(&args.output, &resolved.settings)
}

pub fn json_pretty(resolved: &ResolvedConfig) -> bool {
    resolved.settings.output.json.pretty
}

pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to start async runtime")
}

/// Count column for summary tables; `None` when zero so it renders as a dash.
pub fn count_cell(count: usize) -> Option<String> {
    (count > 0).then(|| count.to_string())
}

pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
