//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let result = ConfigValidationResult::valid();
    let result = validate_sandbox_config(config, result);
    validate_bridge_config(config, result)
}

fn validate_sandbox_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let sandbox = &config.sandbox;

    if sandbox.port_scan_attempts == 0 {
        result = result.with_error(
            ValidationIssue::new("sandbox.port_scan_attempts", "Port scan window is empty")
                .with_suggestion("Use a value of at least 1 (default 1000)"),
        );
    }

    if u32::from(sandbox.port_range_start) + u32::from(sandbox.port_scan_attempts) > u32::from(u16::MAX) + 1 {
        result = result.with_warning(
            ValidationIssue::new(
                "sandbox.port_scan_attempts",
                "Port scan window extends past 65535 and will be truncated",
            ),
        );
    }

    if sandbox.port_range_start < 1024 {
        result = result.with_warning(
            ValidationIssue::new(
                "sandbox.port_range_start",
                format!("Port {} is privileged", sandbox.port_range_start),
            )
            .with_suggestion("Start the scan at 1024 or above"),
        );
    }

    if sandbox.default_image.trim().is_empty() {
        result = result.with_error(
            ValidationIssue::new("sandbox.default_image", "No default image specified")
                .with_suggestion("Set sandbox.default_image to a valid image reference"),
        );
    }

    for (sandbox_type, image) in &sandbox.images {
        if image.trim().is_empty() {
            result = result.with_error(ValidationIssue::new(
                format!("sandbox.images.{}", sandbox_type),
                "Image override is empty",
            ));
        }
    }

    if !sandbox.workdir.starts_with('/') {
        result = result.with_error(
            ValidationIssue::new("sandbox.workdir", "Container working directory must be absolute")
                .with_suggestion("Use a path such as /workspace"),
        );
    }

    if sandbox.token_env_var.trim().is_empty() {
        result = result.with_error(ValidationIssue::new(
            "sandbox.token_env_var",
            "Token environment variable name is empty",
        ));
    }

    result
}

fn validate_bridge_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let bridge = &config.bridge;

    if bridge.request_timeout.is_zero() {
        result = result.with_error(ValidationIssue::new(
            "bridge.request_timeout",
            "Request timeout must be greater than zero",
        ));
    }

    if bridge.readiness.initial_interval > bridge.readiness.max_interval {
        result = result.with_warning(ValidationIssue::new(
            "bridge.readiness.initial_interval",
            "Initial readiness interval is larger than the maximum interval",
        ));
    }

    if bridge.readiness.timeout < bridge.readiness.initial_interval {
        result = result.with_warning(
            ValidationIssue::new(
                "bridge.readiness.timeout",
                "Readiness timeout is shorter than one polling interval",
            )
            .with_suggestion("A started sandbox will be probed at most once"),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);

        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.sandbox.port_scan_attempts = 0;
        config.sandbox.workdir = "workspace".to_string();
        config.bridge.request_timeout = Duration::ZERO;

        let result = validate_config(&config);
        assert!(!result.valid);
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"sandbox.port_scan_attempts"));
        assert!(paths.contains(&"sandbox.workdir"));
        assert!(paths.contains(&"bridge.request_timeout"));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut config = Config::default();
        config.sandbox.port_range_start = 80;

        let result = validate_config(&config);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].to_string().contains("privileged"));
    }
}
