use crate::config::types::{
    Config, FieldMapping, OutputConfig, PlatformSignatures, ProbeConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_probe_config(&config.probe)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_field_mapping(&config.fields)?;
    validate_platform_signatures(&config.platform)?;
    validate_output_config(&config.output)?;

    if config.input.path.is_empty() {
        return Err(ConfigError::Validation(
            "input path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates probe configuration
fn validate_probe_config(config: &ProbeConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.max_redirects < 1 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be >= 1, got {}",
            config.max_redirects
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Probe name: non-empty, alphanumeric + hyphens only
    if config.probe_name.is_empty() {
        return Err(ConfigError::Validation(
            "probe_name cannot be empty".to_string(),
        ));
    }

    if !config
        .probe_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "probe_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.probe_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Identifier and URL must be distinct, non-empty column names
fn validate_field_mapping(fields: &FieldMapping) -> Result<(), ConfigError> {
    if fields.id_field.trim().is_empty() || fields.url_field.trim().is_empty() {
        return Err(ConfigError::Validation(
            "id_field and url_field cannot be empty".to_string(),
        ));
    }

    if fields.id_field == fields.url_field {
        return Err(ConfigError::Validation(format!(
            "id_field and url_field must differ, both are '{}'",
            fields.id_field
        )));
    }

    Ok(())
}

fn validate_platform_signatures(platform: &PlatformSignatures) -> Result<(), ConfigError> {
    let entries = [
        ("host_marker", &platform.host_marker),
        ("server_token", &platform.server_token),
        ("meta_name", &platform.meta_name),
        ("script_token", &platform.script_token),
        ("password_path", &platform.password_path),
    ];

    for (name, value) in entries {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if !platform.password_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "password_path must start with '/', got '{}'",
            platform.password_path
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
