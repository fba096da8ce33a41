#![forbid(unsafe_code)]

//! Runtime configuration for the hub binaries.
//!
//! Values come from three layers with fixed precedence: explicit overrides
//! (CLI flags), process environment variables, then a `.env` file next to
//! the binary. Only the data root is mandatory; everything else has a
//! sensible local default.

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_PORT: u16 = 8750;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Directory under the data root where media files live, unless
/// `STREETTUBE_MEDIA_ROOT` points elsewhere.
pub const DEFAULT_MEDIA_SUBDIR: &str = "media";

/// Resolved locations and listen address for a hub instance.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub data_root: PathBuf,
    pub media_root: PathBuf,
    pub port: u16,
    pub host: String,
}

/// Values that beat both the environment and the `.env` file.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub data_root: Option<PathBuf>,
    pub media_root: Option<PathBuf>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub env_path: Option<PathBuf>,
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    resolve_runtime_config(RuntimeOverrides::default())
}

pub fn resolve_runtime_config(overrides: RuntimeOverrides) -> Result<RuntimeConfig> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    build_runtime_config(&file_vars, process_env, overrides)
}

fn build_runtime_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> Result<RuntimeConfig> {
    let data_root = overrides
        .data_root
        .or_else(|| lookup("STREETTUBE_DATA_ROOT", file_vars, &env_lookup).map(PathBuf::from))
        .ok_or_else(|| anyhow!("STREETTUBE_DATA_ROOT not set"))?;

    let media_root = overrides
        .media_root
        .or_else(|| lookup("STREETTUBE_MEDIA_ROOT", file_vars, &env_lookup).map(PathBuf::from))
        .unwrap_or_else(|| data_root.join(DEFAULT_MEDIA_SUBDIR));

    let port = match overrides.port {
        Some(port) => port,
        None => match lookup("STREETTUBE_PORT", file_vars, &env_lookup) {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("STREETTUBE_PORT is not a valid port: {raw}"))?,
            None => DEFAULT_PORT,
        },
    };

    let host = overrides
        .host
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| lookup("STREETTUBE_HOST", file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    Ok(RuntimeConfig {
        data_root,
        media_root,
        port,
        host,
    })
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).cloned())
}

/// Parses a dotenv-style file. A missing file is an empty configuration,
/// not an error.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content.lines().filter_map(parse_env_line).collect())
}

/// One `KEY=value` line, tolerating `export` prefixes, whitespace, comments
/// and single/double quotes. Returns `None` for anything that is not an
/// assignment.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let assignment = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, raw_value) = assignment.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = raw_value.trim();
    let value = strip_quotes(value, '"')
        .or_else(|| strip_quotes(value, '\''))
        .unwrap_or(value);
    Some((key.to_string(), value.to_string()))
}

fn strip_quotes(value: &str, quote: char) -> Option<&str> {
    value.strip_prefix(quote)?.strip_suffix(quote)
}
