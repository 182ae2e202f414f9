use anyhow::{anyhow, Context, Result};
use normalize::KeyScheme;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "scanload.yaml";
const DEFAULT_DB: &str = "scan.db";

/// Optional YAML file; every key may be omitted.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct FileConfig {
    pub data_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub key_scheme: Option<KeyScheme>,
    pub workers: Option<usize>,
    pub skip_malformed: Option<bool>,
}

/// Values from the process environment (`.env` already applied).
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub data_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub key_scheme: Option<String>,
    pub workers: Option<String>,
    pub skip_malformed: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        EnvConfig {
            data_path: get("DATA_PATH").map(PathBuf::from),
            db_path: get("DB_PATH").or_else(|| get("DB_NAME")).map(PathBuf::from),
            key_scheme: get("KEY_SCHEME"),
            workers: get("WORKERS"),
            skip_malformed: get("SKIP_MALFORMED"),
        }
    }
}

/// Command-line values; `None`/`false` defers to the lower layers.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub key_scheme: Option<KeyScheme>,
    pub workers: Option<usize>,
    pub skip_malformed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_path: PathBuf,
    pub db_path: PathBuf,
    pub key_scheme: KeyScheme,
    pub workers: usize,
    pub skip_malformed: bool,
}

impl Settings {
    pub fn resolve(cli: &Overrides, env: &EnvConfig, file: &FileConfig) -> Result<Self> {
        let data_path = cli
            .data_path
            .clone()
            .or_else(|| env.data_path.clone())
            .or_else(|| file.data_path.clone())
            .ok_or_else(|| anyhow!("no data directory: pass --data, set DATA_PATH or data_path"))?;
        let key_scheme = match (cli.key_scheme, env.key_scheme.as_deref()) {
            (Some(s), _) => s,
            (None, Some(s)) => s.parse().map_err(|e: String| anyhow!("KEY_SCHEME: {e}"))?,
            (None, None) => file.key_scheme.unwrap_or_default(),
        };
        let workers = match (cli.workers, env.workers.as_deref()) {
            (Some(n), _) => n,
            (None, Some(s)) => s.trim().parse().with_context(|| format!("WORKERS: invalid count {s:?}"))?,
            (None, None) => file.workers.unwrap_or(1),
        };
        let skip_malformed = cli.skip_malformed
            || match env.skip_malformed.as_deref() {
                Some(s) => parse_flag(s).ok_or_else(|| anyhow!("SKIP_MALFORMED: expected a boolean, got {s:?}"))?,
                None => file.skip_malformed.unwrap_or(false),
            };
        Ok(Settings {
            data_path,
            db_path: resolve_db_path(cli.db_path.as_deref(), env, file),
            key_scheme,
            workers: workers.max(1),
            skip_malformed,
        })
    }
}

pub fn resolve_db_path(cli: Option<&Path>, env: &EnvConfig, file: &FileConfig) -> PathBuf {
    cli.map(Path::to_path_buf)
        .or_else(|| env.db_path.clone())
        .or_else(|| file.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// An explicit path must exist; otherwise `./scanload.yaml` is used if present.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() { p.to_path_buf() } else { return Ok(FileConfig::default()); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    serde_yaml::from_str(&s).with_context(|| format!("parsing config {}", path.display()))
}
