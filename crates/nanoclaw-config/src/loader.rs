//! Config file discovery and layered loading.
//!
//! Implements NanoClaw's (deliberately flat) version of the load algorithm:
//! 1. Start from [`Config::default`].
//! 2. Merge a TOML file, if one is found.
//! 3. Apply recognized environment variable overrides (spec.md §6).
//! 4. Validate.
//!
//! Unlike a multi-source config layering stack with per-layer restriction
//! enforcement, NanoClaw has exactly one file layer and one env layer - the
//! restriction-merge machinery a nested workspace/user/system hierarchy
//! would need has no counterpart here and was not carried over.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Load configuration, merging a TOML file at `path` (if given and
/// present) over the defaults, then applying recognized environment
/// variable overrides from the process environment.
///
/// # Errors
/// Returns a [`ConfigError`] if `path` is given but unreadable or not
/// valid TOML, if a recognized environment variable has a value that does
/// not parse as its field's type, or if the merged configuration fails
/// validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    let env_vars: HashMap<String, String> = std::env::vars().collect();
    load_with(path, &env_vars)
}

/// Same as [`load`], but takes an explicit environment map - used by tests
/// so they don't depend on (or mutate) the real process environment.
///
/// # Errors
/// See [`load`].
pub fn load_with(path: Option<&Path>, env_vars: &HashMap<String, String>) -> ConfigResult<Config> {
    let mut base = toml::Value::try_from(Config::default())
        .expect("Config::default always serializes to a TOML table");

    if let Some(path) = path {
        if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let overlay: toml::Value =
                toml::from_str(&raw).map_err(|source| ConfigError::ParseError {
                    path: path.display().to_string(),
                    source,
                })?;
            deep_merge(&mut base, &overlay);
            info!(path = %path.display(), "loaded config file");
        }
    }

    let mut config: Config = base
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Invalid(e.to_string()))?;

    apply_env_overrides(&mut config, env_vars)?;
    validate::validate(&config)?;
    Ok(config)
}

/// Recursively merge `overlay` onto `base`, overlay winning on conflicts.
/// Tables merge key-by-key; any other value (including arrays) is
/// replaced wholesale.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_table.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

fn env_string(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key).cloned()
}

fn env_parse<T>(env: &HashMap<String, String>, key: &str, field: &str) -> ConfigResult<Option<T>>
where
    T: std::str::FromStr,
{
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvValue {
            var: key.to_string(),
            field: field.to_string(),
            value: raw.clone(),
        })
}

fn env_bool(env: &HashMap<String, String>, key: &str, field: &str) -> ConfigResult<Option<bool>> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidEnvValue {
            var: key.to_string(),
            field: field.to_string(),
            value: raw.clone(),
        }),
    }
}

/// Apply the recognized environment variables from spec.md §6 over an
/// already file-merged configuration. Per-operation limit thresholds
/// (`RL_*`, `QUOTA_*`, `BREAK_*`) are not applied here - their operation
/// set is open-ended, so `nanoclaw-limits` reads them directly via
/// [`limits_env_vars`].
fn apply_env_overrides(config: &mut Config, env: &HashMap<String, String>) -> ConfigResult<()> {
    if let Some(v) = env_string(env, "ASSISTANT_NAME") {
        config.router.assistant_name = v;
    }
    if let Some(v) = env_parse(env, "POLL_INTERVAL", "router.poll_interval_ms")? {
        config.router.poll_interval_ms = v;
    }
    if let Some(v) = env_parse(
        env,
        "SCHEDULER_POLL_INTERVAL",
        "scheduler.poll_interval_ms",
    )? {
        config.scheduler.poll_interval_ms = v;
    }
    if let Some(v) = env_string(env, "TZ") {
        config.scheduler.timezone = v;
    }
    if let Some(v) = env_parse(env, "IPC_POLL_INTERVAL", "ipc.poll_interval_ms")? {
        config.ipc.poll_interval_ms = v;
    }
    if let Some(v) = env_parse(
        env,
        "CONTAINER_TIMEOUT",
        "runtime.container_timeout_sec",
    )? {
        config.runtime.container_timeout_sec = v;
    }
    if let Some(v) = env_parse(env, "IDLE_TIMEOUT", "runtime.idle_timeout_sec")? {
        config.runtime.idle_timeout_sec = v;
    }
    if let Some(v) = env_parse(
        env,
        "MAX_CONCURRENT_CONTAINERS",
        "runtime.max_concurrent_containers",
    )? {
        config.runtime.max_concurrent_containers = v;
    }
    if let Some(v) = env_parse(env, "WORKER_PORT", "worker.port")? {
        config.worker.port = v;
    }
    if let Some(v) = env_string(env, "WORKER_SHARED_SECRET") {
        config.worker.shared_secret = Some(v);
    }
    if let Some(v) = env_parse(env, "NONCE_TTL_MS", "worker.nonce_ttl_ms")? {
        config.worker.nonce_ttl_ms = v;
    }
    if let Some(v) = env_parse(env, "NONCE_CAP", "worker.nonce_cap")? {
        config.worker.nonce_cap = v;
    }
    if let Some(v) = env_parse(
        env,
        "NONCE_CLEANUP_INTERVAL_MS",
        "worker.nonce_cleanup_interval_ms",
    )? {
        config.worker.nonce_cleanup_interval_ms = v;
    }
    if let Some(v) = env_string(env, "OS_HTTP_SECRET") {
        config.ops.http_secret = Some(v);
    }
    if let Some(v) = env_string(env, "COCKPIT_WRITE_SECRET_CURRENT") {
        config.ops.write_secret_current = Some(v);
    }
    if let Some(v) = env_string(env, "COCKPIT_WRITE_SECRET_PREVIOUS") {
        config.ops.write_secret_previous = Some(v);
    }
    if let Some(v) = env_bool(env, "LIMITS_ENABLED", "limits.enabled")? {
        config.limits.enabled = v;
    }
    if let Some(v) = env_bool(env, "EXT_CALLS_ENABLED", "limits.ext_calls_enabled")? {
        config.limits.ext_calls_enabled = v;
    }
    if let Some(v) = env_bool(env, "EMBEDDINGS_ENABLED", "limits.embeddings_enabled")? {
        config.limits.embeddings_enabled = v;
    }
    if let Some(v) = env_string(env, "NANOCLAW_DATA_DIR") {
        config.storage.data_dir = v;
    }
    Ok(())
}

/// Raw `RL_*`, `QUOTA_*`, and `BREAK_*` environment variables, handed to
/// `nanoclaw-limits`'s own config builder verbatim since the operation
/// set they key on is open-ended and not known to this crate.
#[must_use]
pub fn limits_env_vars(env: &HashMap<String, String>) -> HashMap<String, String> {
    env.iter()
        .filter(|(k, _)| {
            k.starts_with("RL_") || k.starts_with("QUOTA_") || k.starts_with("BREAK_")
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
