// crates/narrative-config/src/config.rs
// ============================================================================
// Module: Narrative Agent Configuration
// Description: Configuration loading and validation for the KBase client layer.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! An explicitly requested file must exist; when only the default file name is
//! used and it is absent, built-in defaults apply. Every loaded config is
//! validated before it is returned.
//! Security posture: config inputs are untrusted; tokens are never stored in
//! the file, only the name of the environment variable holding them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "narrative-agent.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "NARRATIVE_AGENT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default KBase services root.
pub const DEFAULT_SERVICES_BASE_URL: &str = "https://kbase.us/services";
/// Default environment variable carrying the KBase auth token.
pub const DEFAULT_TOKEN_ENV: &str = "KB_AUTH_TOKEN";
/// Default request timeout in milliseconds.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Minimum request timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 600_000;
/// Default maximum service response size in bytes.
pub(crate) const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Minimum accepted service response limit in bytes.
pub(crate) const MIN_MAX_RESPONSE_BYTES: usize = 1024;
/// Maximum accepted service response limit in bytes.
pub(crate) const MAX_MAX_RESPONSE_BYTES: usize = 256 * 1024 * 1024;
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Narrative agent client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NarrativeConfig {
    /// Service endpoint configuration.
    #[serde(default)]
    pub services: ServicesConfig,
    /// HTTP client limits.
    #[serde(default)]
    pub client: ClientConfig,
    /// Auth token lookup configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Service call audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl NarrativeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.services.validate()?;
        self.client.validate()?;
        self.auth.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// KBase service endpoint configuration.
///
/// # Invariants
/// - Per-service overrides take precedence over `base_url` derived endpoints.
/// - All URLs use `http` or `https` and carry no embedded credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Root of the KBase services deployment.
    #[serde(default = "default_services_base_url")]
    pub base_url: String,
    /// Auth service override.
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Workspace service override.
    #[serde(default)]
    pub workspace_url: Option<String>,
    /// Narrative Method Store override.
    #[serde(default)]
    pub method_store_url: Option<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: default_services_base_url(),
            auth_url: None,
            workspace_url: None,
            method_store_url: None,
        }
    }
}

impl ServicesConfig {
    /// Returns the effective auth service URL.
    #[must_use]
    pub fn auth_url(&self) -> String {
        self.auth_url.clone().unwrap_or_else(|| self.derived("auth"))
    }

    /// Returns the effective workspace service URL.
    #[must_use]
    pub fn workspace_url(&self) -> String {
        self.workspace_url.clone().unwrap_or_else(|| self.derived("ws"))
    }

    /// Returns the effective Narrative Method Store URL.
    #[must_use]
    pub fn method_store_url(&self) -> String {
        self.method_store_url.clone().unwrap_or_else(|| self.derived("narrative_method_store/rpc"))
    }

    /// Joins a service path onto the base URL.
    fn derived(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.base_url.trim_end_matches('/'))
    }

    /// Validates every configured endpoint.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_service_url("services.base_url", &self.base_url)?;
        if let Some(url) = &self.auth_url {
            validate_service_url("services.auth_url", url)?;
        }
        if let Some(url) = &self.workspace_url {
            validate_service_url("services.workspace_url", url)?;
        }
        if let Some(url) = &self.method_store_url {
            validate_service_url("services.method_store_url", url)?;
        }
        Ok(())
    }
}

/// HTTP client limits shared by every service client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum accepted response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Validates client limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "client.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        if !(MIN_MAX_RESPONSE_BYTES ..= MAX_MAX_RESPONSE_BYTES).contains(&self.max_response_bytes)
        {
            return Err(ConfigError::Invalid(format!(
                "client.max_response_bytes must be between {MIN_MAX_RESPONSE_BYTES} and \
                 {MAX_MAX_RESPONSE_BYTES}"
            )));
        }
        let agent = self.user_agent.trim();
        if agent.is_empty() {
            return Err(ConfigError::Invalid("client.user_agent must be non-empty".to_string()));
        }
        if agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid("client.user_agent exceeds max length".to_string()));
        }
        Ok(())
    }
}

/// Auth token lookup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the KBase token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

impl AuthConfig {
    /// Reads the token from the configured environment variable.
    ///
    /// Blank values are treated as absent.
    #[must_use]
    pub fn token_from_env(&self) -> Option<String> {
        env::var(&self.token_env)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Validates the token variable name.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.token_env.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("auth.token_env must be non-empty".to_string()));
        }
        if name.contains('=') || name.contains('\0') {
            return Err(ConfigError::Invalid(
                "auth.token_env must be a valid environment variable name".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit logging destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// Discard audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
}

/// Service call audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Selected audit destination.
    #[serde(default)]
    pub mode: AuditMode,
    /// Audit log path (JSON lines) for file mode.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.mode, &self.path) {
            (AuditMode::File, None) => {
                Err(ConfigError::Invalid("audit.mode=file requires audit.path".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// The returned flag is true when the path was explicitly requested.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a service URL: parseable, http(s), host present, no credentials.
fn validate_service_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::Invalid(format!(
                "{field} must use http:// or https:// (got {other})"
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::Invalid(format!("{field} must not embed credentials")));
    }
    Ok(())
}

/// Default services root.
fn default_services_base_url() -> String {
    DEFAULT_SERVICES_BASE_URL.to_string()
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default response size limit.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default user agent.
fn default_user_agent() -> String {
    format!("narrative-agent/{}", env!("CARGO_PKG_VERSION"))
}

/// Default token environment variable.
fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}
