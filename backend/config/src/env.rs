//! Environment variable substitution for config values.
//!
//! Supports `${VAR_NAME}` syntax in string leaves, resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` variable names are matched; `$${}`
//! escapes to a literal `${}`.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

static ESCAPED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config value tree.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => {
            let result: Result<Vec<_>> = items
                .iter()
                .enumerate()
                .map(|(i, item)| substitute_value(item, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::with_capacity(map.len());
            for (key, nested) in map {
                let nested_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                result.insert(key.clone(), substitute_value(nested, env, &nested_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(input: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    // Rewrite $${VAR} escapes into a form the substitution pattern cannot
    // match, restore them as literal ${VAR} afterwards.
    let protected = ESCAPED_PATTERN.replace_all(input, "\u{0}{$1}\u{0}");

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(&protected, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        match env.get(var_name).filter(|value| !value.is_empty()) {
            Some(value) => value.clone(),
            None => {
                if missing.is_none() {
                    missing = Some(MissingEnvVarError {
                        var_name: var_name.to_string(),
                        config_path: path.to_string(),
                    });
                }
                String::new()
            }
        }
    });
    if let Some(err) = missing {
        return Err(err.into());
    }
    Ok(substituted.replace("\u{0}{", "${").replace("}\u{0}", "}"))
}
