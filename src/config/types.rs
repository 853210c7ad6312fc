use serde::Deserialize;

/// Main configuration structure for Storefront-Probe
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fields: FieldMapping,
    #[serde(default)]
    pub platform: PlatformSignatures,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Probe behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Maximum number of classifications in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per request, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff unit between attempts (milliseconds)
    #[serde(rename = "backoff-ms", default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Redirect cap for the password gate request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_concurrency() -> u32 {
    15
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    3_000
}

fn default_max_redirects() -> usize {
    5
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the prober
    #[serde(rename = "probe-name")]
    pub probe_name: String,

    /// Version of the prober
    #[serde(rename = "probe-version")]
    pub probe_version: String,

    /// URL with information about the prober
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for prober-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Which input fields identify a row and hold its URL
///
/// Any other field is opaque passthrough data. When `passthrough` is set,
/// only the listed fields (plus the identifier and URL) reach the report;
/// otherwise every field is carried verbatim.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FieldMapping {
    #[serde(rename = "id-field", default = "default_id_field")]
    pub id_field: String,

    #[serde(rename = "url-field", default = "default_url_field")]
    pub url_field: String,

    #[serde(default)]
    pub passthrough: Option<Vec<String>>,
}

fn default_id_field() -> String {
    "Record ID".to_string()
}

fn default_url_field() -> String {
    "Website URL".to_string()
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            url_field: default_url_field(),
            passthrough: None,
        }
    }
}

/// Signals that identify the target platform and its password gate
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PlatformSignatures {
    /// Substring of a hosted-subdomain host (short-circuits detection)
    #[serde(rename = "host-marker", default = "default_host_marker")]
    pub host_marker: String,

    /// Token looked for in the `Server` response header
    #[serde(rename = "server-token", default = "default_server_token")]
    pub server_token: String,

    /// `name` attribute of the platform meta tag
    #[serde(rename = "meta-name", default = "default_meta_name")]
    pub meta_name: String,

    /// Substring of a platform script `src`
    #[serde(rename = "script-token", default = "default_script_token")]
    pub script_token: String,

    /// Path suffix of the password gate page
    #[serde(rename = "password-path", default = "default_password_path")]
    pub password_path: String,
}

fn default_host_marker() -> String {
    "myshopify.com".to_string()
}

fn default_server_token() -> String {
    "shopify".to_string()
}

fn default_meta_name() -> String {
    "shopify-digital-wallet".to_string()
}

fn default_script_token() -> String {
    "shopify".to_string()
}

fn default_password_path() -> String {
    "/password".to_string()
}

impl Default for PlatformSignatures {
    fn default() -> Self {
        Self {
            host_marker: default_host_marker(),
            server_token: default_server_token(),
            meta_name: default_meta_name(),
            script_token: default_script_token(),
            password_path: default_password_path(),
        }
    }
}

/// Input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the JSON array of input rows
    pub path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON report file
    #[serde(rename = "report-path")]
    pub report_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}
