//! Harness configuration — target site, credentials, retry policy.
//!
//! Everything the tests need to know about their environment is carried
//! here explicitly; there are no process-wide mutable paths. The default
//! values target the production shop and can be overridden from a YAML
//! file (`configs/e2e.yaml`) and, for credentials, from the environment.

use crate::retry::RetryPolicy;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the login email.
pub const EMAIL_ENV: &str = "DCS_EMAIL";
/// Environment variable holding the login password.
pub const PASSWORD_ENV: &str = "DCS_PASSWORD";

/// Top-level harness configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Site root, e.g. "https://www.dogcatstar.com".
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Account page path.
    #[serde(default = "default_account_path")]
    pub account_path: String,

    /// Cart page path.
    #[serde(default = "default_cart_path")]
    pub cart_path: String,

    /// Cat category listing path.
    #[serde(default = "default_cat_category_path")]
    pub cat_category_path: String,

    /// Where the auth-session snapshot lives. Absence of this file is
    /// not an error; tests that need it skip.
    #[serde(default = "default_auth_state_file")]
    pub auth_state_file: PathBuf,

    /// Directory for diagnostic screenshots.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Product variant preferred by the customization handler.
    #[serde(default = "default_preferred_variant")]
    pub preferred_variant: String,

    /// Login credentials. Empty fields fall back to the environment.
    #[serde(default)]
    pub credentials: Credentials,

    /// Browser launch settings.
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Retry settings for flaky interactions.
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_base_url() -> String {
    "https://www.dogcatstar.com".into()
}
fn default_account_path() -> String {
    "/my-account/".into()
}
fn default_cart_path() -> String {
    "/cart/".into()
}
fn default_cat_category_path() -> String {
    "/product-category/cat/".into()
}
fn default_auth_state_file() -> PathBuf {
    PathBuf::from("fixtures/auth.json")
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("test-results")
}
fn default_preferred_variant() -> String {
    "鲁斯佛".into()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            account_path: default_account_path(),
            cart_path: default_cart_path(),
            cat_category_path: default_cat_category_path(),
            auth_state_file: default_auth_state_file(),
            results_dir: default_results_dir(),
            preferred_variant: default_preferred_variant(),
            credentials: Credentials::default(),
            browser: BrowserSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl HarnessConfig {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse config from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: HarnessConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("base_url is required".into()));
        }
        if !self.base_url.starts_with("http") {
            return Err(Error::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.retry.attempts == 0 {
            return Err(Error::Config("retry.attempts must be at least 1".into()));
        }
        Ok(())
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Full URL of the site root.
    pub fn home_url(&self) -> String {
        self.join("/")
    }

    /// Full URL of the account page.
    pub fn account_url(&self) -> String {
        self.join(&self.account_path)
    }

    /// Full URL of the cart page.
    pub fn cart_url(&self) -> String {
        self.join(&self.cart_path)
    }

    /// Full URL of the cat category listing.
    pub fn cat_category_url(&self) -> String {
        self.join(&self.cat_category_path)
    }

    /// Retry policy derived from the settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.attempts,
            delay: Duration::from_millis(self.retry.delay_ms),
            rate_limit_cooldown: Duration::from_millis(self.retry.rate_limit_cooldown_ms),
        }
    }

    /// Credentials with environment fallback, or `None` if neither the
    /// config nor the environment provides them.
    pub fn resolved_credentials(&self) -> Option<Credentials> {
        let email = non_empty(&self.credentials.email).or_else(|| env_var(EMAIL_ENV))?;
        let password = non_empty(&self.credentials.password).or_else(|| env_var(PASSWORD_ENV))?;
        Some(Credentials { email, password })
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Login credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Browser launch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// Run in headless mode.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Viewport size.
    pub viewport: Option<Viewport>,
}

fn default_headless() -> bool {
    true
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: None,
        }
    }
}

/// Viewport dimensions.
#[derive(Debug, Clone, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Retry settings for flaky interactions.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Number of attempts per interaction.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay between ordinary attempts in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Cooldown after a rate-limit signal in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,
}

fn default_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    500
}
fn default_cooldown_ms() -> u64 {
    30_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
            rate_limit_cooldown_ms: default_cooldown_ms(),
        }
    }
}
