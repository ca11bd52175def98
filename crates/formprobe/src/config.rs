//! Probe configuration.
//!
//! Loaded in layers: built-in defaults, then an optional YAML file, then
//! environment overrides. [`ProbeConfig::validate`] runs last.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interstitial::InterstitialConfig;
use crate::locator::LocatorCandidate;
use crate::login::LoginLocators;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{Predicate, WaitSpec};

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "formprobe.yaml";

/// Environment variable overriding `base_url`
pub const ENV_BASE_URL: &str = "FORMPROBE_BASE_URL";
/// Environment variable overriding `credentials.email`
pub const ENV_EMAIL: &str = "FORMPROBE_EMAIL";
/// Environment variable overriding `credentials.password`
pub const ENV_PASSWORD: &str = "FORMPROBE_PASSWORD";
/// Environment variable overriding `browser.headless`
pub const ENV_HEADLESS: &str = "FORMPROBE_HEADLESS";
/// Environment variable overriding `browser.chromium_path`
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Element wait timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Per-candidate timeout
    pub timeout_ms: u64,
    /// Polling interval
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: 250,
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Chromium sandbox (disable for containers)
    pub sandbox: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Extra command line switches
    pub args: Vec<String>,
    /// Navigation timeout
    pub page_load_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            chromium_path: None,
            args: vec![
                "--disable-notifications".to_string(),
                "--disable-popup-blocking".to_string(),
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
            page_load_timeout_ms: 15_000,
        }
    }
}

impl BrowserConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Enable or disable the sandbox
    #[must_use]
    pub const fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }
}

/// Login credentials used by the scenario suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "test@janitri.com".to_string(),
            password: "testpassword123".to_string(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Login page URL
    pub base_url: String,
    /// Host the login page lives on
    pub login_host: String,
    /// Element wait timing
    pub wait: WaitConfig,
    /// Permission interstitial markers and settle pause
    pub interstitial: InterstitialConfig,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Credentials for the scenario suite
    pub credentials: Credentials,
    /// Candidate list overrides by logical element name
    pub locators: BTreeMap<String, Vec<LocatorCandidate>>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dev-dash.janitri.in/".to_string(),
            login_host: "dev-dash.janitri.in".to_string(),
            wait: WaitConfig::default(),
            interstitial: InterstitialConfig::default(),
            browser: BrowserConfig::default(),
            credentials: Credentials::default(),
            locators: BTreeMap::new(),
        }
    }
}

impl ProbeConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the login page URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the login host
    #[must_use]
    pub fn with_login_host(mut self, host: impl Into<String>) -> Self {
        self.login_host = host.into();
        self
    }

    /// Set element wait timing
    #[must_use]
    pub const fn with_wait(mut self, timeout_ms: u64, poll_interval_ms: u64) -> Self {
        self.wait = WaitConfig {
            timeout_ms,
            poll_interval_ms,
        };
        self
    }

    /// Set browser settings
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Parse YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| ProbeError::config(e.to_string()))
    }

    /// Read and parse a YAML file
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        serde_yaml_ng::to_string(self).map_err(|e| ProbeError::config(e.to_string()))
    }

    /// Defaults, then `path` (or `formprobe.yaml` if it exists), then the
    /// process environment; validated.
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };
        let config = match file {
            Some(p) => {
                debug!(path = %p.display(), "loading config file");
                Self::from_file(&p)?
            }
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> ProbeResult<Self> {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(email) = lookup(ENV_EMAIL) {
            self.credentials.email = email;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.credentials.password = password;
        }
        if let Some(headless) = lookup(ENV_HEADLESS) {
            self.browser.headless = parse_bool(ENV_HEADLESS, &headless)?;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH).filter(|p| !p.is_empty()) {
            self.browser.chromium_path = Some(path);
        }
        Ok(self)
    }

    /// Check URLs, wait timing and locator overrides
    pub fn validate(&self) -> ProbeResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProbeError::config("base_url must not be empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got `{}`",
                self.base_url
            )));
        }
        if self.login_host.trim().is_empty() {
            return Err(ProbeError::config("login_host must not be empty"));
        }
        if self.browser.page_load_timeout_ms == 0 {
            return Err(ProbeError::config("browser.page_load_timeout_ms must be greater than zero"));
        }
        let _ = self.wait_spec()?;
        let _ = self.login_locators()?;
        Ok(())
    }

    /// Wait spec for element resolution (`Clickable`)
    pub fn wait_spec(&self) -> ProbeResult<WaitSpec> {
        WaitSpec::new(
            self.wait.timeout_ms,
            self.wait.poll_interval_ms,
            Predicate::Clickable,
        )
    }

    /// Default registry with this config's overrides applied
    pub fn login_locators(&self) -> ProbeResult<LoginLocators> {
        LoginLocators::default().with_overrides(&self.locators)
    }
}

fn parse_bool(key: &str, value: &str) -> ProbeResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProbeError::config(format!(
            "{key} must be a boolean, got `{other}`"
        ))),
    }
}
