use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - API scheme is http:// or https://
/// - At least one host, with unique ids
/// - HTTP timeout is not 0
/// - Session host key (if any) names a configured host
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.api.scheme != "https://" && config.api.scheme != "http://" {
        return Err(ConfigError::ValidationError(format!(
            "api.scheme must be \"https://\" or \"http://\", got {:?}",
            config.api.scheme
        )));
    }

    if config.api.hosts.is_empty() {
        return Err(ConfigError::ValidationError(
            "api.hosts cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for host in &config.api.hosts {
        if !seen.insert(host.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate host id: {}",
                host.id
            )));
        }
    }

    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "http.timeout_secs cannot be 0".to_string(),
        ));
    }

    if let Some(session) = &config.session {
        if !seen.contains(session.host_key.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "session.host_key {} is not a configured host",
                session.host_key
            )));
        }
    }

    Ok(())
}
