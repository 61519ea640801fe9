//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The account password is loaded from the TIMECLOCK_PASSWORD env var or
//! password_file, never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use api_client::ClientConfig;
use common::Secret;
use serde::Deserialize;
use session_auth::{
    API_VERSION, CSRF_COOKIE_NAME, CSRF_HEADER_NAME, CredentialStore, DEFAULT_BASE_URL,
    LOGIN_ROUTE,
};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub account: AccountConfig,
}

/// API connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
}

/// Session credential behaviour
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_lifetime")]
    pub access_token_lifetime_secs: u64,
    #[serde(default = "default_threshold")]
    pub refresh_threshold_secs: u64,
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Refresh in the background before the access token expires
    #[serde(default)]
    pub proactive_refresh: bool,
    #[serde(default = "default_check_interval")]
    pub refresh_check_interval_secs: u64,
}

/// Account used to log in
#[derive(Debug, Deserialize)]
pub struct AccountConfig {
    pub email: String,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// Path to a file containing the password (alternative to TIMECLOCK_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_auth_timeout() -> u64 {
    10
}

fn default_lifetime() -> u64 {
    15 * 60
}

fn default_threshold() -> u64 {
    2 * 60
}

fn default_csrf_cookie() -> String {
    CSRF_COOKIE_NAME.to_string()
}

fn default_csrf_header() -> String {
    CSRF_HEADER_NAME.to_string()
}

fn default_login_route() -> String {
    LOGIN_ROUTE.to_string()
}

fn default_check_interval() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            auth_timeout_secs: default_auth_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime_secs: default_lifetime(),
            refresh_threshold_secs: default_threshold(),
            csrf_cookie: default_csrf_cookie(),
            csrf_header: default_csrf_header(),
            login_route: default_login_route(),
            proactive_refresh: false,
            refresh_check_interval_secs: default_check_interval(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Password resolution order:
    /// 1. TIMECLOCK_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        if let Ok(password) = std::env::var("TIMECLOCK_PASSWORD") {
            config.account.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.account.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = password.trim().to_owned();
            if !password.is_empty() {
                config.account.password = Some(Secret::new(password));
            }
        }

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        let non_zero = [
            ("timeout_secs", self.api.timeout_secs),
            ("auth_timeout_secs", self.api.auth_timeout_secs),
            ("access_token_lifetime_secs", self.session.access_token_lifetime_secs),
            ("refresh_check_interval_secs", self.session.refresh_check_interval_secs),
        ];
        if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(common::Error::Config(format!("{name} must be greater than 0")));
        }

        if self.session.refresh_threshold_secs >= self.session.access_token_lifetime_secs {
            return Err(common::Error::Config(
                "refresh_threshold_secs must be less than access_token_lifetime_secs".into(),
            ));
        }

        if self.account.email.trim().is_empty() {
            return Err(common::Error::Config("account.email must not be empty".into()));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("timeclock.toml")
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            api_version: API_VERSION.to_string(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            auth_timeout: Duration::from_secs(self.api.auth_timeout_secs),
            csrf_cookie: self.session.csrf_cookie.clone(),
            csrf_header: self.session.csrf_header.clone(),
            login_route: self.session.login_route.clone(),
        }
    }

    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(
            Duration::from_secs(self.session.access_token_lifetime_secs),
            Duration::from_secs(self.session.refresh_threshold_secs),
        )
    }

    pub fn refresh_check_interval(&self) -> Duration {
        Duration::from_secs(self.session.refresh_check_interval_secs)
    }
}
