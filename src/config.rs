#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_DATABASE: &str = "tubegraph.db";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_SEARCH_INDEX: &str = "search-videos";
pub const DEFAULT_PAGE_SIZE_MAX: u32 = 100;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub database: PathBuf,
    pub asset_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub search_index: String,
    pub page_size_max: u32,
}

impl RuntimeConfig {
    /// Config for embedding the engine without any environment lookups.
    pub fn with_paths(database: impl Into<PathBuf>, asset_root: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            asset_root: asset_root.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            search_index: DEFAULT_SEARCH_INDEX.to_string(),
            page_size_max: DEFAULT_PAGE_SIZE_MAX,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub database: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_config(overrides: RuntimeOverrides) -> Result<RuntimeConfig> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    build_runtime_config(&file_vars, env_var_string, overrides)
}

fn build_runtime_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> Result<RuntimeConfig> {
    let database = overrides
        .database
        .map(|path| path.to_string_lossy().into_owned())
        .or_else(|| lookup_value("TUBEGRAPH_DATABASE", file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
    let asset_root = overrides
        .asset_root
        .map(|path| path.to_string_lossy().into_owned())
        .or_else(|| lookup_value("TUBEGRAPH_ASSET_ROOT", file_vars, &env_lookup))
        .ok_or_else(|| anyhow!("TUBEGRAPH_ASSET_ROOT not set"))?;
    let port = overrides
        .port
        .or_else(|| {
            lookup_value("TUBEGRAPH_PORT", file_vars, &env_lookup)
                .and_then(|value| value.parse::<u16>().ok())
        })
        .unwrap_or(DEFAULT_PORT);
    let host = overrides
        .host
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| lookup_value("TUBEGRAPH_HOST", file_vars, &env_lookup))
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let search_index = lookup_value("TUBEGRAPH_SEARCH_INDEX", file_vars, &env_lookup)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SEARCH_INDEX.to_string());
    let page_size_max = lookup_value("TUBEGRAPH_PAGE_SIZE_MAX", file_vars, &env_lookup)
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE_MAX);

    Ok(RuntimeConfig {
        database: PathBuf::from(database),
        asset_root: PathBuf::from(asset_root),
        host,
        port,
        search_index,
        page_size_max,
    })
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).cloned())
}

/// Parses `KEY=value` lines, tolerating `export` prefixes, quotes and
/// comments. A missing file yields an empty map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
