use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::env::Env;
use super::schema::{CompareOptions, ConfigFile, Environment, OutputFormat, OutputSettings, Settings};
use crate::error::AppError;
use crate::remote::{ApiVersion, EnvironmentConfig, REDACTED};

const CONFIG_DIR: &str = ".ncsync";
const CONFIG_NAMES: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            Side::Source => "NCSYNC_SOURCE",
            Side::Target => "NCSYNC_TARGET",
        }
    }
}

/// Per-side connection flags.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub base_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub source_env: Option<String>,
    pub target_env: Option<String>,
    pub source: EnvOverrides,
    pub target: EnvOverrides,
    pub api_version: Option<ApiVersion>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub cli: CliOverrides,
    pub cwd: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub xdg_config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub source_name: Option<String>,
    pub target_name: Option<String>,
    pub source: EnvironmentConfig,
    pub target: EnvironmentConfig,
    pub options: CompareDefaults,
    pub settings: SettingsResolved,
}

impl ResolvedConfig {
    pub fn environment(&self, side: Side) -> &EnvironmentConfig {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// The environment for `side`, provided it has a URL and a token.
    pub fn require(&self, side: Side) -> Result<&EnvironmentConfig> {
        let env = self.environment(side);
        let prefix = side.env_prefix();
        if env.base_url.trim().is_empty() {
            return Err(AppError::config(format!(
                "No {} baseUrl configured (use --{}-url, {}_URL or a config environment)",
                side.as_str(),
                side.as_str(),
                prefix
            ))
            .into());
        }
        if !env.has_token() {
            return Err(AppError::config(format!(
                "No {} API token configured (use --{}-token, {}_TOKEN or apiTokenEnv)",
                side.as_str(),
                side.as_str(),
                prefix
            ))
            .into());
        }
        Ok(env)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareDefaults {
    pub ignore_case: bool,
    pub include_delete_ops: bool,
    pub include_system_columns: bool,
}

impl Default for CompareDefaults {
    fn default() -> Self {
        Self {
            ignore_case: true,
            include_delete_ops: false,
            include_system_columns: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsResolved {
    pub timeout_ms: u64,
    pub output: OutputSettingsResolved,
}

#[derive(Debug, Clone)]
pub struct OutputSettingsResolved {
    pub default_format: OutputFormat,
    pub json: JsonSettingsResolved,
}

#[derive(Debug, Clone)]
pub struct JsonSettingsResolved {
    pub pretty: bool,
}

impl Default for SettingsResolved {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            output: OutputSettingsResolved {
                default_format: OutputFormat::Pretty,
                json: JsonSettingsResolved { pretty: true },
            },
        }
    }
}

pub fn load_config(options: &LoadOptions, env: &Env) -> Result<ResolvedConfig> {
    let config_path = resolve_config_path(options, env)?;
    let config_file = match &config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let mut settings = SettingsResolved::default();
    if let Some(settings_cfg) = &config_file.settings {
        apply_settings(&mut settings, settings_cfg);
    }
    let mut compare = CompareDefaults::default();
    if let Some(options_cfg) = &config_file.options {
        apply_compare_options(&mut compare, options_cfg);
    }

    let source_name = resolve_env_name(
        options.cli.source_env.as_deref(),
        config_file.default_source.as_deref(),
        Side::Source,
        &config_file,
    );
    let target_name = resolve_env_name(
        options.cli.target_env.as_deref(),
        config_file.default_target.as_deref(),
        Side::Target,
        &config_file,
    );

    let source = resolve_side(
        Side::Source,
        source_name.as_deref(),
        &config_file,
        env,
        &options.cli.source,
        options.cli.api_version,
    )?;
    let target = resolve_side(
        Side::Target,
        target_name.as_deref(),
        &config_file,
        env,
        &options.cli.target,
        options.cli.api_version,
    )?;

    apply_env_overrides(&mut compare, &mut settings, env);
    if let Some(timeout_ms) = options.cli.timeout_ms {
        settings.timeout_ms = timeout_ms;
    }

    Ok(ResolvedConfig {
        config_path,
        source_name,
        target_name,
        source,
        target,
        options: compare,
        settings,
    })
}

/// Explicit flag, then the file's default, then an environment literally
/// named after the side.
fn resolve_env_name(
    flag: Option<&str>,
    default: Option<&str>,
    side: Side,
    config: &ConfigFile,
) -> Option<String> {
    flag.or(default).map(str::to_string).or_else(|| {
        config
            .environments
            .contains_key(side.as_str())
            .then(|| side.as_str().to_string())
    })
}

fn resolve_side(
    side: Side,
    name: Option<&str>,
    config: &ConfigFile,
    env: &Env,
    cli: &EnvOverrides,
    api_version: Option<ApiVersion>,
) -> Result<EnvironmentConfig> {
    let mut resolved = EnvironmentConfig::default();

    if let Some(name) = name {
        let environment = config.environments.get(name).ok_or_else(|| {
            AppError::config(format!(
                "Unknown {} environment '{}' (known: {})",
                side.as_str(),
                name,
                known_environments(config)
            ))
        })?;
        apply_environment(&mut resolved, environment, env);
    }

    let prefix = side.env_prefix();
    if let Some(url) = env.get(&format!("{}_URL", prefix)) {
        resolved.base_url = url;
    }
    if let Some(token) = env.get(&format!("{}_TOKEN", prefix)) {
        merge_token(&mut resolved.api_token, &token);
    }
    if let Some(base_id) = env.get(&format!("{}_BASE_ID", prefix)) {
        resolved.base_id = Some(base_id);
    }
    if let Some(workspace_id) = env.get(&format!("{}_WORKSPACE_ID", prefix)) {
        resolved.workspace_id = Some(workspace_id);
    }
    if let Some(version) = env.get(&format!("{}_API_VERSION", prefix)) {
        resolved.api_version = parse_api_version(&version)?;
    }

    if let Some(url) = &cli.url {
        resolved.base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        merge_token(&mut resolved.api_token, token);
    }
    if let Some(base_id) = &cli.base_id {
        resolved.base_id = Some(base_id.clone());
    }
    if let Some(version) = api_version {
        resolved.api_version = version;
    }

    Ok(resolved)
}

fn apply_environment(resolved: &mut EnvironmentConfig, environment: &Environment, env: &Env) {
    if let Some(base_url) = &environment.base_url {
        resolved.base_url = base_url.clone();
    }
    if let Some(token) = &environment.api_token {
        merge_token(&mut resolved.api_token, token);
    } else if let Some(env_key) = &environment.api_token_env {
        if let Some(value) = env.get(env_key) {
            merge_token(&mut resolved.api_token, &value);
        }
    }
    if let Some(version) = environment.api_version {
        resolved.api_version = version;
    }
    if let Some(base_id) = &environment.base_id {
        resolved.base_id = Some(base_id.clone());
    }
    if let Some(workspace_id) = &environment.workspace_id {
        resolved.workspace_id = Some(workspace_id.clone());
    }
}

/// A blank or redacted token never replaces one already known.
pub fn merge_token(current: &mut String, candidate: &str) {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate == REDACTED {
        return;
    }
    *current = candidate.to_string();
}

fn parse_api_version(input: &str) -> Result<ApiVersion> {
    ApiVersion::parse(input).ok_or_else(|| {
        AppError::config(format!("Invalid API version '{}': expected v2 or v3", input)).into()
    })
}

fn known_environments(config: &ConfigFile) -> String {
    if config.environments.is_empty() {
        return "none".to_string();
    }
    config
        .environments
        .keys()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

fn resolve_config_path(options: &LoadOptions, env: &Env) -> Result<Option<PathBuf>> {
    if let Some(path) = &options.cli.config_path {
        if !path.exists() {
            return Err(AppError::config(format!("Config file not found: {}", path.display())).into());
        }
        return Ok(Some(path.clone()));
    }

    if let Some(path) = env.get("NCSYNC_CONFIG") {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(AppError::config(format!("Config file not found: {}", path.display())).into());
        }
        return Ok(Some(path));
    }

    if let Some(path) = find_local_config(&options.cwd, options.home_dir.as_deref()) {
        return Ok(Some(path));
    }

    Ok(find_global_config(options.xdg_config_dir.as_deref()))
}

fn find_local_config(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
    for dir in start.ancestors() {
        for name in CONFIG_NAMES {
            let path = dir.join(CONFIG_DIR).join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        if home.is_some_and(|home_dir| dir == home_dir) {
            break;
        }
    }

    None
}

fn find_global_config(xdg_config: Option<&Path>) -> Option<PathBuf> {
    let base = xdg_config?.join("ncsync");
    CONFIG_NAMES
        .iter()
        .map(|name| base.join(name))
        .find(|path| path.is_file())
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")
        }
        Some("json") => serde_json::from_str(&content).context("Failed to parse JSON config"),
        _ => Err(AppError::config(format!(
            "Unsupported config file extension: {}",
            path.display()
        ))
        .into()),
    }
}

fn apply_settings(settings: &mut SettingsResolved, overrides: &Settings) {
    if let Some(timeout) = overrides.timeout {
        settings.timeout_ms = timeout;
    }
    if let Some(output) = &overrides.output {
        apply_output_settings(&mut settings.output, output);
    }
}

fn apply_output_settings(settings: &mut OutputSettingsResolved, overrides: &OutputSettings) {
    if let Some(default_format) = overrides.default_format {
        settings.default_format = default_format;
    }
    if let Some(pretty) = overrides.json.as_ref().and_then(|json| json.pretty) {
        settings.json.pretty = pretty;
    }
}

fn apply_compare_options(compare: &mut CompareDefaults, overrides: &CompareOptions) {
    if let Some(ignore_case) = overrides.ignore_case {
        compare.ignore_case = ignore_case;
    }
    if let Some(include_delete_ops) = overrides.include_delete_ops {
        compare.include_delete_ops = include_delete_ops;
    }
    if let Some(include_system_columns) = overrides.include_system_columns {
        compare.include_system_columns = include_system_columns;
    }
}

fn apply_env_overrides(compare: &mut CompareDefaults, settings: &mut SettingsResolved, env: &Env) {
    if let Some(ignore_case) = env.get_bool("NCSYNC_IGNORE_CASE") {
        compare.ignore_case = ignore_case;
    }
    if let Some(include_delete_ops) = env.get_bool("NCSYNC_INCLUDE_DELETE_OPS") {
        compare.include_delete_ops = include_delete_ops;
    }
    if let Some(include_system_columns) = env.get_bool("NCSYNC_INCLUDE_SYSTEM_COLUMNS") {
        compare.include_system_columns = include_system_columns;
    }
    if let Some(timeout) = env.get("NCSYNC_TIMEOUT") {
        if let Ok(timeout) = timeout.trim().parse::<u64>() {
            settings.timeout_ms = timeout;
        }
    }
}
