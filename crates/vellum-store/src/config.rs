use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use vellum_core::SizeLimits;

pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 120;

/// Typed view of `.vellum/config.json`. Keys this struct does not know are
/// kept in the file untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VellumConfig {
    pub limits: SizeLimits,
    pub verify_timeout_secs: u64,
    /// Append audit records to `.vellum/audit.jsonl`.
    pub audit_log: bool,
    /// Fsync the version log after every append.
    pub fsync: bool,
}

impl Default for VellumConfig {
    fn default() -> Self {
        Self {
            limits: SizeLimits::default(),
            verify_timeout_secs: DEFAULT_VERIFY_TIMEOUT_SECS,
            audit_log: true,
            fsync: false,
        }
    }
}

impl VellumConfig {
    pub fn verify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.verify_timeout_secs)
    }
}

/// Read the config file as a raw JSON object. Empty if the file doesn't exist.
pub fn read_config_map(path: &Path) -> anyhow::Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content)? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} is not a JSON object", path.display()),
    }
}

pub fn write_config_map(path: &Path, config: &Map<String, Value>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    crate::write_atomic(path, json.as_bytes())
}

/// Load the typed config, falling back to defaults for anything unset.
pub fn load_config(path: &Path) -> anyhow::Result<VellumConfig> {
    let map = read_config_map(path)?;
    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Parse a command-line value into bool, integer, float or string.
pub fn parse_value(s: &str) -> Value {
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                Value::String(s.to_string())
            }
        }
    }
}

/// Set `key` (dotted, e.g. `limits.code`) in `config`, creating intermediate
/// objects as needed.
pub fn set_key(config: &mut Map<String, Value>, key: &str, value: Value) -> anyhow::Result<()> {
    let mut parts = key.split('.').peekable();
    let mut node = config;
    while let Some(part) = parts.next() {
        if part.is_empty() {
            anyhow::bail!("invalid config key: {key}");
        }
        if parts.peek().is_none() {
            node.insert(part.to_string(), value);
            return Ok(());
        }
        let child = node
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        node = match child {
            Value::Object(map) => map,
            _ => anyhow::bail!("config key {part} is not an object"),
        };
    }
    anyhow::bail!("invalid config key: {key}")
}

pub fn get_key<'a>(config: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut value = config.get(parts.next()?)?;
    for part in parts {
        value = value.as_object()?.get(part)?;
    }
    Some(value)
}
