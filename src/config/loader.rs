//! Configuration loader for YAML files
//!
//! This module handles loading and validating configuration from YAML files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::AppError;

use super::types::GatewayConfig;

/// Load configuration from a YAML file
///
/// # Returns
/// * `Ok(GatewayConfig)` - Successfully loaded and validated configuration
/// * `Err(AppError)` - File not found, parse error, or validation failure
pub fn load_config(path: &Path) -> Result<GatewayConfig, AppError> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let config: GatewayConfig = serde_yaml::from_reader(reader).map_err(|e| {
        AppError::Config(format!("YAML parse error in '{}': {}", path.display(), e))
    })?;

    config.validate()?;

    Ok(config)
}

/// Load configuration from a YAML string (useful for testing)
pub fn load_config_from_str(yaml_content: &str) -> Result<GatewayConfig, AppError> {
    let config: GatewayConfig = serde_yaml::from_str(yaml_content)
        .map_err(|e| AppError::Config(format!("YAML parse error: {}", e)))?;

    config.validate()?;

    Ok(config)
}

/// Load `path` when it exists, otherwise fall back to built-in defaults
pub fn load_config_or_default(path: &Path) -> Result<GatewayConfig, AppError> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(
            phase = "init",
            path = %path.display(),
            "No gateway config file, using defaults"
        );
        Ok(GatewayConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG_YAML: &str = r#"
server:
  port: 9090
timeouts:
  request_ms: 8000
  connect_ms: 3000
  exchange_ms: 12000
fallback:
  trail_limit: 4
  redact_snippets: false
bybit:
  base_url: https://api-testnet.bybit.com
bitunix:
  position_paths:
    - /api/v1/futures/position/get_pending_positions
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(VALID_CONFIG_YAML).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.fallback.trail_limit, 4);
        assert!(!config.fallback.redact_snippets);
        // unspecified keys keep defaults
        assert_eq!(config.fallback.snippet_chars, 120);
        assert_eq!(config.bybit.base_url, "https://api-testnet.bybit.com");
        assert_eq!(config.bitunix.position_paths.len(), 1);
        assert_eq!(config.okx.base_url, "https://www.okx.com");
    }

    #[test]
    fn test_load_config_from_str_empty_document_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.bitunix.base_urls.len(), 2);
    }

    #[test]
    fn test_load_config_from_str_invalid_yaml() {
        let result = load_config_from_str("invalid: yaml: content: [");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_load_config_from_str_validation_failure() {
        let result = load_config_from_str("fallback:\n  trail_limit: 0\n");
        assert!(result.unwrap_err().to_string().contains("trail_limit"));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/gateway.yaml"));
        assert!(result.unwrap_err().to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_load_config_or_default_missing_file() {
        let config = load_config_or_default(Path::new("/nonexistent/gateway.yaml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_config_from_file_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config_or_default(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_load_config_from_file_invalid_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"invalid: [yaml: content").unwrap();
        temp_file.flush().unwrap();

        let result = load_config(temp_file.path());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }
}
