use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Loads and validates the config file. Relative `processed_file` and
/// `log_file` paths are resolved against the directory holding the config.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;

    if let Some(base) = path.parent() {
        if config.processed_file.is_relative() {
            config.processed_file = base.join(&config.processed_file);
        }
        if config.log_file.is_relative() {
            config.log_file = base.join(&config.log_file);
        }
    }

    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.email.trim().is_empty() {
        return Err(invalid("email must not be empty"));
    }

    if !config.password_source().is_configured() {
        return Err(invalid(
            "one of app_password, app_password_file or app_password_env_var is required",
        ));
    }

    if config.imap_host.trim().is_empty() {
        return Err(invalid("imap_host must not be empty"));
    }

    if config.imap_port == 0 {
        return Err(invalid("imap_port must be non-zero"));
    }

    if config.folder.is_empty() {
        return Err(invalid("folder must not be empty"));
    }

    if config.sender.trim().is_empty() {
        return Err(invalid("sender must not be empty"));
    }

    if config.check_interval_secs == 0 {
        return Err(invalid("check_interval_secs must be at least 1"));
    }

    if config.http_timeout_secs == 0 || config.mailbox_timeout_secs == 0 {
        return Err(invalid("timeouts must be at least 1 second"));
    }

    if config.subject_keywords.is_empty() {
        return Err(invalid("subject_keywords must contain at least one keyword"));
    }

    if config.subject_keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(invalid("subject_keywords must not contain blank keywords"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
