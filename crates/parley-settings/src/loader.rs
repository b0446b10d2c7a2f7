//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ParleySettings::default()`]
//! 2. If `~/.parley/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `PARLEY_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::ParleySettings;

/// Resolve the path to the settings file (`~/.parley/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".parley").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ParleySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// [`ParleySettings::validate`] is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ParleySettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

pub(crate) fn load_with_env<F>(path: &Path, lookup: F) -> Result<ParleySettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(ParleySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ParleySettings = serde_json::from_value(merged)?;
    apply_env_overrides_from(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut ParleySettings) {
    apply_env_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Integers must parse and fall within range, booleans accept
/// `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`. Anything else is
/// logged and ignored.
pub fn apply_env_overrides_from<F>(settings: &mut ParleySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Context window ──────────────────────────────────────────────
    if let Some(v) = env.usize("PARLEY_WINDOW_SIZE", 1, 100) {
        settings.context.window_size = v;
    }
    if let Some(v) = env.usize("PARLEY_SUMMARY_INTERVAL", 1, 1_000) {
        settings.context.summary_interval = v;
    }
    if let Some(v) = env.usize("PARLEY_CONVERSATION_SUMMARY_CHARS", 50, 10_000) {
        settings.context.conversation_summary_chars = v;
    }

    // ── Semantic memory ─────────────────────────────────────────────
    if let Some(v) = env.bool("PARLEY_MEMORY_ENABLED") {
        settings.memory.enabled = v;
    }
    if let Some(v) = env.bool("PARLEY_MEMORY_DELETE_ON_FINISH") {
        settings.memory.delete_on_finish = v;
    }

    // ── Backend ─────────────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_RECORD_STORE_URL") {
        settings.backend.record_store_url = v;
    }
    if let Some(v) = env.string("PARLEY_SEMANTIC_STORE_URL") {
        settings.backend.semantic_store_url = v;
    }
    if let Some(v) = env.string("PARLEY_LLM_URL") {
        settings.backend.llm_url = v;
    }
    if let Some(v) = env.string("PARLEY_LLM_MODEL") {
        settings.backend.llm_model = v;
    }
    if let Some(v) = env.u64("PARLEY_REQUEST_TIMEOUT_MS", 100, 600_000) {
        settings.backend.request_timeout_ms = v;
    }
    if let Some(v) = env.string("PARLEY_API_TOKEN") {
        settings.backend.api_token = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("PARLEY_LOG_JSON") {
        settings.logging.json = v;
    }
}

/// Parse a boolean from common string representations.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = (self.lookup)(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn deep_merge_nested_objects() {
        let target = json!({"context": {"windowSize": 3, "summaryInterval": 5}});
        let source = json!({"context": {"windowSize": 4}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["context"]["windowSize"], 4);
        assert_eq!(merged["context"]["summaryInterval"], 5);
    }

    #[test]
    fn deep_merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn deep_merge_arrays_replaced() {
        let merged = deep_merge(json!({"a": [1, 2]}), json!({"a": [3]}));
        assert_eq!(merged["a"], json!([3]));
    }

    #[test]
    fn deep_merge_adds_new_keys() {
        let merged = deep_merge(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── load_with_env ───────────────────────────────────────────────

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_with_env(&dir.path().join("nope.json"), no_env).unwrap();
        assert_eq!(settings.context.window_size, 3);
        assert_eq!(settings.memory.jd_chunk_chars, 300);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"context": {"summaryInterval": 8}, "backend": {"llmModel": "qwen"}}"#,
        )
        .unwrap();

        let settings = load_with_env(&path, no_env).unwrap();
        assert_eq!(settings.context.summary_interval, 8);
        assert_eq!(settings.context.window_size, 3);
        assert_eq!(settings.backend.llm_model, "qwen");
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_with_env(&path, no_env).is_err());
    }

    #[test]
    fn invalid_value_in_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"context": {"windowSize": 0}}"#).unwrap();
        let err = load_with_env(&path, no_env).unwrap_err();
        assert!(err.to_string().contains("windowSize"));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"context": {"windowSize": 4}}"#).unwrap();

        let settings = load_with_env(
            &path,
            env_of(&[
                ("PARLEY_WINDOW_SIZE", "6"),
                ("PARLEY_MEMORY_ENABLED", "off"),
                ("PARLEY_LLM_URL", "http://llm.internal/v1"),
                ("PARLEY_API_TOKEN", "tok"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.context.window_size, 6);
        assert!(!settings.memory.enabled);
        assert_eq!(settings.backend.llm_url, "http://llm.internal/v1");
        assert_eq!(settings.backend.api_token.as_deref(), Some("tok"));
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = ParleySettings::default();
        apply_env_overrides_from(
            &mut settings,
            env_of(&[
                ("PARLEY_WINDOW_SIZE", "0"),
                ("PARLEY_SUMMARY_INTERVAL", "lots"),
                ("PARLEY_MEMORY_ENABLED", "maybe"),
                ("PARLEY_LLM_MODEL", ""),
            ]),
        );
        assert_eq!(settings.context.window_size, 3);
        assert_eq!(settings.context.summary_interval, 5);
        assert!(settings.memory.enabled);
        assert_eq!(settings.backend.llm_model, "deepseek-chat");
    }

    // ── parse helpers ───────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in &["true", "1", "yes", "on", "TRUE", "On"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in &["false", "0", "no", "off", "FALSE", "Off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_usize_range("3", 1, 100), Some(3));
        assert_eq!(parse_usize_range("0", 1, 100), None);
        assert_eq!(parse_usize_range("101", 1, 100), None);
        assert_eq!(parse_u64_range("60000", 100, 600_000), Some(60_000));
        assert_eq!(parse_u64_range("-1", 100, 600_000), None);
    }
}
