//! [`PortalSession`] backed by a Chrome browser through `thirtyfour`.
//!
//! Downloads land in a hidden staging folder inside the save directory; the
//! automator moves each finished file to its final name.

use super::blume::{PortalCredentials, PortalSession, SessionFactory};
use crate::config::AutomationConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thirtyfour::prelude::*;
use thirtyfour::{ChromeCapabilities, ChromiumLikeCapabilities};
use tokio::sync::Mutex;

/// Staging folder created inside the save directory
pub const DOWNLOAD_STAGING_DIR: &str = ".coleta-downloads";

/// Suffixes browsers use for files still being written
const PARTIAL_DOWNLOAD_SUFFIXES: &[&str] = &["crdownload", "part", "tmp"];

const LOGIN_PATH: &str = "login";
const INVOICES_PATH: &str = "faturas";

const SELECTOR_LOGIN_INPUT: &str = "input[name='login']";
const SELECTOR_PASSWORD_INPUT: &str = "input[name='senha']";
const SELECTOR_LOGIN_SUBMIT: &str = "button[type='submit']";
const SELECTOR_LOGGED_IN: &str = "a[href*='faturas']";
const SELECTOR_LOGOUT: &str = "a[href*='sair']";

const ELEMENT_WAIT: Duration = Duration::from_secs(20);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct WebDriverSessionFactory {
    config: AutomationConfig,
    download_dir: PathBuf,
}

impl WebDriverSessionFactory {
    pub fn new(config: AutomationConfig, save_directory: PathBuf) -> Self {
        Self {
            config,
            download_dir: save_directory.join(DOWNLOAD_STAGING_DIR),
        }
    }

    fn capabilities(&self) -> Result<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();
        if self.config.headless {
            caps.set_headless()?;
        }
        caps.add_arg("--window-size=1280,900")?;
        caps.add_experimental_option(
            "prefs",
            json!({
                "download.default_directory": self.download_dir.to_string_lossy(),
                "download.prompt_for_download": false,
                "plugins.always_open_pdf_externally": true,
            }),
        )?;
        Ok(caps)
    }
}

#[async_trait]
impl SessionFactory for WebDriverSessionFactory {
    async fn open(&self) -> Result<Arc<dyn PortalSession>> {
        fs::create_dir_all(&self.download_dir)
            .with_context(|| format!("failed to create {}", self.download_dir.display()))?;
        let caps = self.capabilities()?;
        let driver = WebDriver::new(self.config.webdriver_url.as_str(), caps)
            .await
            .with_context(|| format!("could not reach WebDriver at {}", self.config.webdriver_url))?;
        tracing::info!("Browser session started via {}", self.config.webdriver_url);
        Ok(Arc::new(WebDriverSession {
            driver: Mutex::new(Some(driver)),
            portal: self.config.blume_portal_url.clone(),
            download_dir: self.download_dir.clone(),
            download_timeout: self.config.download_timeout,
        }))
    }
}

pub struct WebDriverSession {
    driver: Mutex<Option<WebDriver>>,
    portal: url::Url,
    download_dir: PathBuf,
    download_timeout: Duration,
}

impl WebDriverSession {
    async fn driver(&self) -> Result<WebDriver> {
        self.driver
            .lock()
            .await
            .clone()
            .ok_or_else(|| anyhow!("browser session already closed"))
    }

    fn page(&self, path: &str) -> Result<url::Url> {
        self.portal
            .join(path)
            .map_err(|e| anyhow!("invalid portal path {}: {}", path, e))
    }
}

#[async_trait]
impl PortalSession for WebDriverSession {
    async fn login(&self, credentials: &PortalCredentials) -> Result<()> {
        let driver = self.driver().await?;
        driver.goto(self.page(LOGIN_PATH)?.as_str()).await?;

        let login = driver
            .query(By::Css(SELECTOR_LOGIN_INPUT))
            .wait(ELEMENT_WAIT, POLL_INTERVAL)
            .first()
            .await?;
        login.clear().await?;
        login.send_keys(credentials.login.as_str()).await?;
        let password = driver.find(By::Css(SELECTOR_PASSWORD_INPUT)).await?;
        password.clear().await?;
        password.send_keys(credentials.password.as_str()).await?;
        driver.find(By::Css(SELECTOR_LOGIN_SUBMIT)).await?.click().await?;

        driver
            .query(By::Css(SELECTOR_LOGGED_IN))
            .wait(ELEMENT_WAIT, POLL_INTERVAL)
            .first()
            .await
            .map_err(|_| anyhow!("login não confirmado pelo portal"))?;
        Ok(())
    }

    async fn download_invoice(&self, due_date: NaiveDate, account: Option<&str>) -> Result<PathBuf> {
        let driver = self.driver().await?;
        driver.goto(self.page(INVOICES_PATH)?.as_str()).await?;

        let link = driver
            .query(By::XPath(invoice_link_xpath(due_date, account)))
            .wait(ELEMENT_WAIT, POLL_INTERVAL)
            .first()
            .await
            .map_err(|_| anyhow!("fatura não encontrada no portal"))?;

        let before = directory_entries(&self.download_dir)?;
        link.click().await?;
        wait_for_download(&self.download_dir, &before, self.download_timeout).await
    }

    async fn logout(&self) -> Result<()> {
        let driver = self.driver().await?;
        driver.find(By::Css(SELECTOR_LOGOUT)).await?.click().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(driver) = self.driver.lock().await.take() else {
            return Ok(());
        };
        // only removed when nothing was left behind
        let _ = fs::remove_dir(&self.download_dir);
        driver.quit().await?;
        tracing::info!("Browser session closed");
        Ok(())
    }
}

/// XPath of the download link in the invoice row for `due_date` (and `account`, when given)
fn invoice_link_xpath(due_date: NaiveDate, account: Option<&str>) -> String {
    let mut row = format!("//tr[contains(., '{}')", due_date.format("%d/%m/%Y"));
    if let Some(account) = account.filter(|a| !a.contains('\'')) {
        row.push_str(&format!(" and contains(., '{}')", account));
    }
    row.push_str("]//a[contains(@href, 'download') or contains(@class, 'download')]");
    row
}

fn directory_entries(dir: &Path) -> Result<HashSet<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    Ok(entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
}

fn is_partial_download(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            PARTIAL_DOWNLOAD_SUFFIXES.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// A finished file in `dir` that was not there before the click
pub fn completed_download(dir: &Path, before: &HashSet<PathBuf>) -> Result<Option<PathBuf>> {
    let mut fresh: Vec<PathBuf> = directory_entries(dir)?
        .into_iter()
        .filter(|p| !before.contains(p) && p.is_file())
        .collect();
    if fresh.iter().any(|p| is_partial_download(p)) {
        return Ok(None);
    }
    fresh.sort();
    Ok(fresh.into_iter().next())
}

/// Poll `dir` until a new finished file shows up or `timeout` elapses
pub async fn wait_for_download(dir: &Path, before: &HashSet<PathBuf>, timeout: Duration) -> Result<PathBuf> {
    let started = Instant::now();
    loop {
        if let Some(path) = completed_download(dir, before)? {
            return Ok(path);
        }
        if started.elapsed() >= timeout {
            return Err(anyhow!("download não concluído em {} s", timeout.as_secs()));
        }
        tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
    }
}
