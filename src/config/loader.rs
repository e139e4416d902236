//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"

            [upstream]
            address = "127.0.0.1:3000"

            [[redirects]]
            name = "force-https"
            regex = "^http://(.*)$"
            replacement = "https://$1"
            permanent = true

            [[redirects]]
            name = "tenant"
            regex = '^https://app\.example\.com/(.*)$'
            replacement = 'https://{{ header "X-Tenant" }}.example.com/$1'
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.upstream.unwrap().address, "127.0.0.1:3000");
        assert_eq!(config.redirects.len(), 2);
        assert_eq!(config.redirects[0].name, "force-https");
        assert!(config.redirects[0].redirect.permanent);
        assert!(!config.redirects[1].redirect.permanent);
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.redirects.is_empty());
        assert!(config.upstream.is_none());
    }

    #[test]
    fn test_invalid_redirect_rejected() {
        let err = parse_config(
            r#"
            [[redirects]]
            name = "broken"
            regex = "^(.*"
            replacement = "$1"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[listener\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/regex-redirect.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
