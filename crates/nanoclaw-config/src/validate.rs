//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully merged configuration.
///
/// # Errors
/// Returns [`ConfigError::Invalid`] describing the first violation found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.router.assistant_name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "router.assistant_name must not be empty".to_string(),
        ));
    }
    if config.router.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "router.poll_interval_ms must be positive".to_string(),
        ));
    }
    if config.scheduler.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "scheduler.poll_interval_ms must be positive".to_string(),
        ));
    }
    if config.ipc.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "ipc.poll_interval_ms must be positive".to_string(),
        ));
    }
    if config.worker.nonce_ttl_ms <= 0 {
        return Err(ConfigError::Invalid(
            "worker.nonce_ttl_ms must be positive".to_string(),
        ));
    }
    if config.worker.nonce_cap == 0 {
        return Err(ConfigError::Invalid(
            "worker.nonce_cap must be positive".to_string(),
        ));
    }
    if config.runtime.max_concurrent_containers == 0 {
        return Err(ConfigError::Invalid(
            "runtime.max_concurrent_containers must be positive".to_string(),
        ));
    }
    if config.storage.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "storage.data_dir must not be empty".to_string(),
        ));
    }
    if config.groups.main_group.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "groups.main_group must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_assistant_name_is_invalid() {
        let mut config = Config::default();
        config.router.assistant_name = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_poll_interval_is_invalid() {
        let mut config = Config::default();
        config.scheduler.poll_interval_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_main_group_is_invalid() {
        let mut config = Config::default();
        config.groups.main_group = String::new();
        assert!(validate(&config).is_err());
    }
}
