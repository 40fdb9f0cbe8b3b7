use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub imap: ImapConfig,
    pub requester: RequesterConfig,
    pub output_path: String,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub quiet: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub folder: String,
    pub search_query: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RequesterConfig {
    pub timeout_seconds: u64,
    #[serde(default)]
    pub allow_private_targets: bool,
}

pub const DEFAULT_IMAP_HOST: &str = "imap.gmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_FOLDER: &str = "INBOX";
pub const DEFAULT_SEARCH_QUERY: &str = "BODY \"unsubscribe\"";
pub const DEFAULT_OUTPUT_PATH: &str = "links.txt";

// Upper bound on a single unsubscribe request
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

// Credentials come from these two variables rather than the PLUNGER_ prefix
const EMAIL_ADDRESS_VAR: &str = "EMAIL_ADDRESS";
const PASSWORD_VAR: &str = "PASSWORD";

impl AppConfig {
    // Load config from defaults, then config.toml (if exists), then environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            .add_source(File::with_name("config").required(false))
            .add_source(Self::environment())
            .set_override_option("imap.username", std::env::var(EMAIL_ADDRESS_VAR).ok())?
            .set_override_option("imap.password", std::env::var(PASSWORD_VAR).ok())?
            .build()?
            .try_deserialize()
    }

    // Load config from a specific file path
    pub fn new_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            .add_source(File::with_name(path).required(true))
            .add_source(Self::environment())
            .set_override_option("imap.username", std::env::var(EMAIL_ADDRESS_VAR).ok())?
            .set_override_option("imap.password", std::env::var(PASSWORD_VAR).ok())?
            .build()?
            .try_deserialize()
    }

    // e.g. PLUNGER_OUTPUT_PATH=... PLUNGER_IMAP__HOST=...
    fn environment() -> Environment {
        Environment::with_prefix("PLUNGER")
            .prefix_separator("_")
            .separator("__")
    }

    fn configure_defaults()
    -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("imap.host", DEFAULT_IMAP_HOST)?
            .set_default("imap.port", DEFAULT_IMAP_PORT)?
            .set_default("imap.folder", DEFAULT_FOLDER)?
            .set_default("imap.search_query", DEFAULT_SEARCH_QUERY)?
            .set_default("requester.timeout_seconds", DEFAULT_REQUEST_TIMEOUT_SECONDS)?
            .set_default("output_path", DEFAULT_OUTPUT_PATH)
    }
}
