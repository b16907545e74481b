use anyhow::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log file name
const OPERATION_LOG_FILE: &str = "operation_log.txt";

/// Directory where app data is stored (same as settings)
fn app_data_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(config_dir) => config_dir.join("coleta"),
        None => PathBuf::from("."),
    }
}

fn log_path() -> PathBuf {
    app_data_dir().join(OPERATION_LOG_FILE)
}

/// Full path to the operation log file, for display
pub fn log_file_path() -> String {
    log_path().display().to_string()
}

/// Append an entry describing a finished user operation (collection started,
/// folders organized, spreadsheets merged, ...) to the operation log.
pub fn append_log(operation: &str, details: impl AsRef<str>) -> Result<()> {
    append_log_at(&log_path(), operation, details.as_ref())
}

fn append_log_at(path: &Path, operation: &str, details: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "[{}] operation={}", Local::now().format("%Y-%m-%d %H:%M:%S"), operation)?;

    if details.trim().is_empty() {
        writeln!(file, "  (sem detalhes)")?;
    } else {
        for line in details.lines().filter(|l| !l.trim().is_empty()) {
            writeln!(file, "  {}", line)?;
        }
    }
    writeln!(file)?;
    Ok(())
}

/// Read the entire log file content
pub fn read_log() -> Result<String> {
    read_log_at(&log_path())
}

fn read_log_at(path: &Path) -> Result<String> {
    if path.exists() {
        Ok(fs::read_to_string(path)?)
    } else {
        Ok(String::new())
    }
}
