use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;
use url::Url;

/// Default chromedriver endpoint
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Default Blume customer portal
pub const DEFAULT_BLUME_PORTAL_URL: &str = "https://portal.blume.com.br";

/// Default number of worker threads for background tasks
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default time to wait for a single invoice download to finish
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration for background automation.
///
/// Read from the environment (after `.env` is loaded in `main`). Unlike
/// [`crate::settings::Settings`], nothing here is written back to disk.
#[derive(Clone, Debug, PartialEq)]
pub struct AutomationConfig {
    pub webdriver_url: Url,
    pub blume_portal_url: Url,
    pub headless: bool,
    pub worker_threads: usize,
    pub download_timeout: Duration,
}

impl AutomationConfig {
    /// Build the configuration from `COLETA_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    /// Unset or blank keys fall back to defaults; malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let webdriver_url = parse_url(
            "COLETA_WEBDRIVER_URL",
            get("COLETA_WEBDRIVER_URL").as_deref().unwrap_or(DEFAULT_WEBDRIVER_URL),
        )?;
        let blume_portal_url = parse_url(
            "COLETA_BLUME_PORTAL_URL",
            get("COLETA_BLUME_PORTAL_URL").as_deref().unwrap_or(DEFAULT_BLUME_PORTAL_URL),
        )?;

        let headless = match get("COLETA_HEADLESS") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| anyhow!("COLETA_HEADLESS must be true/false, got '{}'", v))?,
            None => false,
        };

        let worker_threads = match get("COLETA_WORKER_THREADS") {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(anyhow!("COLETA_WORKER_THREADS must be a positive integer, got '{}'", v)),
            },
            None => DEFAULT_WORKER_THREADS,
        };

        let download_timeout_secs = match get("COLETA_DOWNLOAD_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .map_err(|_| anyhow!("COLETA_DOWNLOAD_TIMEOUT_SECS must be a number of seconds, got '{}'", v))?,
            None => DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        };

        Ok(Self {
            webdriver_url,
            blume_portal_url,
            headless,
            worker_threads,
            download_timeout: Duration::from_secs(download_timeout_secs),
        })
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            webdriver_url: Url::parse(DEFAULT_WEBDRIVER_URL).expect("default webdriver url is valid"),
            blume_portal_url: Url::parse(DEFAULT_BLUME_PORTAL_URL).expect("default portal url is valid"),
            headless: false,
            worker_threads: DEFAULT_WORKER_THREADS,
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| anyhow!("{} is not a valid URL ('{}'): {}", key, value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("{} must use http or https, got '{}'", key, other)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "sim" | "on" => Some(true),
        "0" | "false" | "no" | "nao" | "não" | "off" => Some(false),
        _ => None,
    }
}
