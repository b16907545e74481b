//! Blume portal automator.
//!
//! Rows are grouped by portal login so each customer account is logged into
//! once; within a login, invoices are fetched in due-date order. The browser
//! itself sits behind [`PortalSession`] so the flow can run against a fake.

use super::webdriver::WebDriverSessionFactory;
use super::{AutomatorContext, CollectionSummary, InvoiceAutomator, LogSink};
use crate::invoices::InvoiceRow;
use crate::utils::{move_file, sanitize_file_name, unique_destination};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const BLUME_CARRIER: &str = "BLUME";

pub const FIELD_LOGIN: &str = "LOGIN";
pub const FIELD_PASSWORD: &str = "SENHA";
pub const FIELD_ACCOUNT: &str = "CONTA";

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PortalCredentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// One browser session on the carrier portal
#[async_trait]
pub trait PortalSession: Send + Sync {
    async fn login(&self, credentials: &PortalCredentials) -> Result<()>;

    /// Download the invoice due on `due_date` and return where the browser saved it
    async fn download_invoice(&self, due_date: NaiveDate, account: Option<&str>) -> Result<PathBuf>;

    async fn logout(&self) -> Result<()>;

    /// Quit the browser
    async fn close(&self) -> Result<()>;
}

/// Opens browser sessions
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn PortalSession>>;
}

/// Rows that share one portal login
struct LoginGroup<'a> {
    credentials: PortalCredentials,
    rows: Vec<&'a InvoiceRow>,
}

pub struct Blume {
    factory: Arc<dyn SessionFactory>,
    save_directory: PathBuf,
    sessions: Mutex<Vec<Arc<dyn PortalSession>>>,
}

impl Blume {
    pub fn new(factory: Arc<dyn SessionFactory>, save_directory: PathBuf) -> Self {
        Self {
            factory,
            save_directory,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Blume automator driving a real browser through WebDriver
    pub fn with_webdriver(ctx: &AutomatorContext) -> Self {
        let factory = WebDriverSessionFactory::new(ctx.config.clone(), ctx.save_directory.clone());
        Self::new(Arc::new(factory), ctx.save_directory.clone())
    }

    /// Number of browser sessions currently open
    pub async fn open_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn release(&self, session: &Arc<dyn PortalSession>) {
        self.sessions.lock().await.retain(|s| !Arc::ptr_eq(s, session));
        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close Blume browser session: {:#}", e);
        }
    }

    /// Log in and download every invoice of one group; returns (collected, failed)
    async fn collect_group(
        &self,
        session: &Arc<dyn PortalSession>,
        group: &LoginGroup<'_>,
        reserved: &mut HashSet<PathBuf>,
        log: &LogSink,
    ) -> (usize, usize) {
        let login = &group.credentials.login;
        log.technical(format!("Acessando o portal Blume com o login {}...", login));
        if let Err(e) = session.login(&group.credentials).await {
            log.technical(format!(
                "Falha no login {}: {:#}. {} fatura(s) não coletada(s).",
                login,
                e,
                group.rows.len()
            ));
            return (0, group.rows.len());
        }

        let mut collected = 0;
        let mut failed = 0;
        for row in &group.rows {
            // rows without due date were filtered out when grouping
            let Some(due_date) = row.due_date else { continue };
            let account = row.text(FIELD_ACCOUNT);
            match session.download_invoice(due_date, account.as_deref()).await {
                Ok(downloaded) => {
                    let name = invoice_file_name(account.as_deref().unwrap_or(login), due_date, &downloaded);
                    let target = unique_destination(&self.save_directory, &name, reserved);
                    match move_file(&downloaded, &target) {
                        Ok(()) => {
                            reserved.insert(target.clone());
                            collected += 1;
                            log.invoice(format!(
                                "{} | vencimento {} | {}",
                                account.as_deref().unwrap_or(login),
                                due_date.format("%d/%m/%Y"),
                                display_name(&target)
                            ));
                        }
                        Err(e) => {
                            failed += 1;
                            log.technical(format!("Fatura baixada mas não foi possível salvá-la: {:#}", e));
                        }
                    }
                }
                Err(e) => {
                    failed += 1;
                    log.technical(format!(
                        "Falha ao baixar a fatura de {} com vencimento {}: {:#}",
                        login,
                        due_date.format("%d/%m/%Y"),
                        e
                    ));
                }
            }
        }

        if let Err(e) = session.logout().await {
            tracing::warn!("Logout from Blume portal failed: {:#}", e);
        }
        (collected, failed)
    }
}

#[async_trait]
impl InvoiceAutomator for Blume {
    fn carrier(&self) -> &str {
        BLUME_CARRIER
    }

    async fn collect(&self, rows: &[InvoiceRow], log: &LogSink) -> Result<CollectionSummary> {
        let mut summary = CollectionSummary::default();
        let groups = group_by_login(rows, log, &mut summary);
        if groups.is_empty() {
            log.technical("Nenhuma fatura Blume com dados suficientes para coleta.");
            return Ok(summary);
        }
        if !self.save_directory.is_dir() {
            return Err(anyhow!(
                "diretório de salvamento não encontrado: {}",
                self.save_directory.display()
            ));
        }

        log.technical("Abrindo o navegador...");
        let session = self.factory.open().await?;
        self.sessions.lock().await.push(session.clone());

        let mut reserved = HashSet::new();
        for group in &groups {
            let (collected, failed) = self.collect_group(&session, group, &mut reserved, log).await;
            summary.collected += collected;
            summary.failed += failed;
        }

        self.release(&session).await;
        log.technical("Navegador encerrado.");
        Ok(summary)
    }

    async fn shutdown(&self) -> Result<()> {
        let sessions: Vec<_> = self.sessions.lock().await.drain(..).collect();
        let mut failures = 0;
        for session in sessions {
            if let Err(e) = session.close().await {
                failures += 1;
                tracing::warn!("Failed to close Blume browser session on shutdown: {:#}", e);
            }
        }
        if failures > 0 {
            return Err(anyhow!("{} browser session(s) could not be closed", failures));
        }
        Ok(())
    }
}

fn row_credentials(row: &InvoiceRow) -> Option<PortalCredentials> {
    Some(PortalCredentials {
        login: row.text(FIELD_LOGIN)?,
        password: row.text(FIELD_PASSWORD)?,
    })
}

/// Group rows by login in first-appearance order; unusable rows are logged and counted as skipped
fn group_by_login<'a>(rows: &'a [InvoiceRow], log: &LogSink, summary: &mut CollectionSummary) -> Vec<LoginGroup<'a>> {
    let mut groups: Vec<LoginGroup<'a>> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let Some(credentials) = row_credentials(row) else {
            summary.skipped += 1;
            log.technical(format!(
                "Linha {} ignorada: colunas {} e {} são obrigatórias.",
                i + 1,
                FIELD_LOGIN,
                FIELD_PASSWORD
            ));
            continue;
        };
        if row.due_date.is_none() {
            summary.skipped += 1;
            log.technical(format!(
                "Linha {} ({}) ignorada: vencimento inválido.",
                i + 1,
                credentials.login
            ));
            continue;
        }
        match groups.iter_mut().find(|g| g.credentials == credentials) {
            Some(group) => group.rows.push(row),
            None => groups.push(LoginGroup {
                credentials,
                rows: vec![row],
            }),
        }
    }
    groups
}

/// `BLUME_<account>_<yyyy-mm-dd>.<ext>` keeping the downloaded file's extension
pub fn invoice_file_name(account: &str, due_date: NaiveDate, downloaded: &Path) -> String {
    let ext = downloaded
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "pdf".to_string());
    sanitize_file_name(&format!(
        "{}_{}_{}.{}",
        BLUME_CARRIER,
        account,
        due_date.format("%Y-%m-%d"),
        ext
    ))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{log_channel, LogSurface};
    use crate::sheet::CellValue;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    /// Fake portal that "downloads" by writing a file into a staging folder
    struct FakeSession {
        staging: PathBuf,
        calls: Arc<StdMutex<Vec<String>>>,
        reject_login: Option<String>,
        missing_due: Option<NaiveDate>,
        fail_close: bool,
    }

    #[async_trait]
    impl PortalSession for FakeSession {
        async fn login(&self, credentials: &PortalCredentials) -> Result<()> {
            self.calls.lock().unwrap().push(format!("login:{}", credentials.login));
            if self.reject_login.as_deref() == Some(credentials.login.as_str()) {
                return Err(anyhow!("senha inválida"));
            }
            Ok(())
        }

        async fn download_invoice(&self, due_date: NaiveDate, account: Option<&str>) -> Result<PathBuf> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("download:{}:{}", due_date, account.unwrap_or("-")));
            if self.missing_due == Some(due_date) {
                return Err(anyhow!("fatura não encontrada"));
            }
            let path = self.staging.join(format!("fatura-{}.pdf", due_date));
            std::fs::write(&path, b"%PDF")?;
            Ok(path)
        }

        async fn logout(&self) -> Result<()> {
            self.calls.lock().unwrap().push("logout".into());
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.calls.lock().unwrap().push("close".into());
            if self.fail_close {
                return Err(anyhow!("driver já encerrado"));
            }
            Ok(())
        }
    }

    struct FakeFactory {
        session: Arc<FakeSession>,
    }

    #[async_trait]
    impl SessionFactory for FakeFactory {
        async fn open(&self) -> Result<Arc<dyn PortalSession>> {
            Ok(self.session.clone())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        save_dir: PathBuf,
        calls: Arc<StdMutex<Vec<String>>>,
        blume: Blume,
    }

    fn harness(reject_login: Option<&str>, missing_due: Option<NaiveDate>, fail_close: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let save_dir = dir.path().join("faturas");
        let staging = dir.path().join("downloads");
        std::fs::create_dir_all(&save_dir).unwrap();
        std::fs::create_dir_all(&staging).unwrap();
        let calls = Arc::new(StdMutex::new(Vec::new()));
        let session = Arc::new(FakeSession {
            staging,
            calls: calls.clone(),
            reject_login: reject_login.map(String::from),
            missing_due,
            fail_close,
        });
        let blume = Blume::new(Arc::new(FakeFactory { session }), save_dir.clone());
        Harness {
            _dir: dir,
            save_dir,
            calls,
            blume,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(login: Option<&str>, account: Option<&str>, due: Option<NaiveDate>) -> InvoiceRow {
        let mut fields = BTreeMap::new();
        if let Some(login) = login {
            fields.insert(FIELD_LOGIN.to_string(), CellValue::Text(login.into()));
            fields.insert(FIELD_PASSWORD.to_string(), CellValue::Text("segredo".into()));
        }
        if let Some(account) = account {
            fields.insert(FIELD_ACCOUNT.to_string(), CellValue::Text(account.into()));
        }
        InvoiceRow {
            carrier: Some(BLUME_CARRIER.into()),
            due_date: due,
            status: Some("PENDENTE".into()),
            fields,
        }
    }

    fn calls(h: &Harness) -> Vec<String> {
        h.calls.lock().unwrap().clone()
    }

    // ==================== collect ====================

    #[test]
    fn test_collect_groups_rows_by_login() {
        let h = harness(None, None, false);
        let rows = vec![
            row(Some("ana"), Some("100"), Some(date(5))),
            row(Some("bia"), None, Some(date(6))),
            row(Some("ana"), Some("101"), Some(date(7))),
        ];
        let (sink, mut receiver) = log_channel();

        let summary = tokio_test::block_on(h.blume.collect(&rows, &sink)).unwrap();

        assert_eq!(summary, CollectionSummary { collected: 3, failed: 0, skipped: 0 });
        assert_eq!(
            calls(&h),
            vec![
                "login:ana",
                "download:2024-01-05:100",
                "download:2024-01-07:101",
                "logout",
                "login:bia",
                "download:2024-01-06:-",
                "logout",
                "close",
            ]
        );
        assert!(h.save_dir.join("BLUME_100_2024-01-05.pdf").exists());
        assert!(h.save_dir.join("BLUME_bia_2024-01-06.pdf").exists());
        let invoices: Vec<_> = receiver
            .drain()
            .into_iter()
            .filter(|e| e.surface == LogSurface::Invoices)
            .collect();
        assert_eq!(invoices.len(), 3);
        assert!(invoices[0].message.contains("BLUME_100_2024-01-05.pdf"));
    }

    #[test]
    fn test_rows_without_credentials_or_due_date_are_skipped() {
        let h = harness(None, None, false);
        let rows = vec![
            row(None, None, Some(date(5))),
            row(Some("ana"), None, None),
            row(Some("ana"), None, Some(date(8))),
        ];
        let (sink, _receiver) = log_channel();

        let summary = tokio_test::block_on(h.blume.collect(&rows, &sink)).unwrap();

        assert_eq!(summary, CollectionSummary { collected: 1, failed: 0, skipped: 2 });
    }

    #[test]
    fn test_no_usable_rows_does_not_open_browser() {
        let h = harness(None, None, false);
        let (sink, _receiver) = log_channel();

        let summary = tokio_test::block_on(h.blume.collect(&[row(None, None, None)], &sink)).unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(calls(&h).is_empty());
    }

    #[test]
    fn test_login_failure_fails_that_group_and_continues() {
        let h = harness(Some("ana"), None, false);
        let rows = vec![
            row(Some("ana"), None, Some(date(5))),
            row(Some("ana"), None, Some(date(6))),
            row(Some("bia"), None, Some(date(7))),
        ];
        let (sink, _receiver) = log_channel();

        let summary = tokio_test::block_on(h.blume.collect(&rows, &sink)).unwrap();

        assert_eq!(summary, CollectionSummary { collected: 1, failed: 2, skipped: 0 });
        assert!(!calls(&h).contains(&"download:2024-01-05:-".to_string()));
    }

    #[test]
    fn test_download_failure_is_logged_and_counted() {
        let h = harness(None, Some(date(6)), false);
        let rows = vec![
            row(Some("ana"), None, Some(date(5))),
            row(Some("ana"), None, Some(date(6))),
        ];
        let (sink, mut receiver) = log_channel();

        let summary = tokio_test::block_on(h.blume.collect(&rows, &sink)).unwrap();

        assert_eq!(summary, CollectionSummary { collected: 1, failed: 1, skipped: 0 });
        assert!(receiver
            .drain()
            .iter()
            .any(|e| e.surface == LogSurface::Technical && e.message.contains("fatura não encontrada")));
    }

    #[test]
    fn test_missing_save_directory_is_error() {
        let h = harness(None, None, false);
        std::fs::remove_dir_all(&h.save_dir).unwrap();
        let (sink, _receiver) = log_channel();

        let result = tokio_test::block_on(h.blume.collect(&[row(Some("ana"), None, Some(date(5)))], &sink));

        assert!(result.is_err());
    }

    #[test]
    fn test_same_account_and_date_get_numbered_names() {
        let h = harness(None, None, false);
        let rows = vec![
            row(Some("ana"), Some("100"), Some(date(5))),
            row(Some("bia"), Some("100"), Some(date(5))),
        ];
        let (sink, _receiver) = log_channel();

        tokio_test::block_on(h.blume.collect(&rows, &sink)).unwrap();

        assert!(h.save_dir.join("BLUME_100_2024-01-05.pdf").exists());
        assert!(h.save_dir.join("BLUME_100_2024-01-05 (1).pdf").exists());
    }

    // ==================== sessions ====================

    #[test]
    fn test_session_released_after_collect() {
        let h = harness(None, None, false);
        let (sink, _receiver) = log_channel();

        tokio_test::block_on(h.blume.collect(&[row(Some("ana"), None, Some(date(5)))], &sink)).unwrap();

        assert_eq!(tokio_test::block_on(h.blume.open_sessions()), 0);
        assert!(tokio_test::block_on(h.blume.shutdown()).is_ok());
    }

    #[test]
    fn test_shutdown_closes_open_sessions_and_reports_failures() {
        let h = harness(None, None, true);
        let session: Arc<dyn PortalSession> = tokio_test::block_on(h.blume.factory.open()).unwrap();
        tokio_test::block_on(async { h.blume.sessions.lock().await.push(session) });

        let result = tokio_test::block_on(h.blume.shutdown());

        assert!(result.is_err());
        assert_eq!(calls(&h), vec!["close"]);
        assert_eq!(tokio_test::block_on(h.blume.open_sessions()), 0);
    }

    // ==================== file naming ====================

    #[test]
    fn test_invoice_file_name_keeps_extension_and_sanitizes() {
        let name = invoice_file_name("12/34", date(9), Path::new("/tmp/x.PDF"));
        assert_eq!(name, "BLUME_12_34_2024-01-09.pdf");
        let name = invoice_file_name("ana", date(9), Path::new("/tmp/sem_extensao"));
        assert_eq!(name, "BLUME_ana_2024-01-09.pdf");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = PortalCredentials {
            login: "ana".into(),
            password: "segredo".into(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("ana"));
        assert!(!debug.contains("segredo"));
    }
}
