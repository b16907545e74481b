use anyhow::Result;
use ini::Ini;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "config.ini";
const SETTINGS_SECTION: &str = "General";

const KEY_SAVE_DIRECTORY: &str = "save_directory";
const KEY_DATA_PATH: &str = "data_path";
const KEY_LAST_OPEN_DIR: &str = "last_open_dir";
const KEY_LAST_SAVE_DIR: &str = "last_save_dir";

/// User settings that persist between sessions.
///
/// Stored as an INI file so operators can inspect or fix it by hand. Every
/// setter writes through to disk immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Folder where collected invoices are saved
    pub save_directory: String,
    /// Spreadsheet loaded on the last successful load
    pub data_path: String,
    /// Folder the spreadsheet picker opens in
    pub last_open_dir: String,
    /// Folder the save-directory picker opens in
    pub last_save_dir: String,
    path: PathBuf,
}

impl Settings {
    /// Empty settings bound to the given file (nothing is read or written)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            save_directory: String::new(),
            data_path: String::new(),
            last_open_dir: String::new(),
            last_save_dir: String::new(),
            path: path.into(),
        }
    }

    /// Get the settings file path.
    /// `COLETA_SETTINGS` wins; otherwise the app config directory, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        if let Ok(custom) = env::var("COLETA_SETTINGS") {
            if !custom.trim().is_empty() {
                return PathBuf::from(custom);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("coleta");
            if !app_dir.exists() {
                let _ = fs::create_dir_all(&app_dir);
            }
            app_dir.join(SETTINGS_FILE)
        } else {
            PathBuf::from(SETTINGS_FILE)
        }
    }

    /// Load settings from the default location, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load settings from `path`, or return empty settings bound to it
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut settings = Self::new(path.clone());
        if !path.exists() {
            tracing::info!("No settings file at {:?}, using defaults", path);
            return settings;
        }

        match Ini::load_from_file(&path) {
            Ok(ini) => {
                if let Some(section) = ini.section(Some(SETTINGS_SECTION)) {
                    let get = |key: &str| section.get(key).unwrap_or_default().to_string();
                    settings.save_directory = get(KEY_SAVE_DIRECTORY);
                    settings.data_path = get(KEY_DATA_PATH);
                    settings.last_open_dir = get(KEY_LAST_OPEN_DIR);
                    settings.last_save_dir = get(KEY_LAST_SAVE_DIR);
                }
                tracing::info!("Loaded settings from {:?}", path);
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings file {:?}: {}", path, e);
            }
        }
        settings
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut ini = Ini::new();
        ini.with_section(Some(SETTINGS_SECTION))
            .set(KEY_SAVE_DIRECTORY, self.save_directory.as_str())
            .set(KEY_DATA_PATH, self.data_path.as_str())
            .set(KEY_LAST_OPEN_DIR, self.last_open_dir.as_str())
            .set(KEY_LAST_SAVE_DIR, self.last_save_dir.as_str());
        ini.write_to_file(&self.path)?;
        tracing::info!("Saved settings to {:?}", self.path);
        Ok(())
    }

    /// Remember a successfully loaded spreadsheet and the folder it came from
    pub fn set_data_path(&mut self, data_path: &Path) -> Result<()> {
        self.data_path = data_path.display().to_string();
        self.last_open_dir = data_path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.save()
    }

    /// Remember the folder where invoices should be saved
    pub fn set_save_directory(&mut self, dir: &Path) -> Result<()> {
        self.save_directory = dir.display().to_string();
        self.last_save_dir = self.save_directory.clone();
        self.save()
    }

    pub fn has_save_directory(&self) -> bool {
        !self.save_directory.trim().is_empty()
    }

    pub fn has_data_path(&self) -> bool {
        !self.data_path.trim().is_empty()
    }

    /// Get the settings file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the settings file path for display
    pub fn path_display(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        (dir, path)
    }

    // ==================== load tests ====================

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let (_dir, path) = temp_settings();
        let settings = Settings::load_from(&path);
        assert!(settings.save_directory.is_empty());
        assert!(settings.data_path.is_empty());
        assert!(!settings.has_save_directory());
        assert!(!settings.has_data_path());
        assert_eq!(settings.path(), path.as_path());
    }

    #[test]
    fn test_load_reads_all_four_keys() {
        let (_dir, path) = temp_settings();
        fs::write(
            &path,
            "[General]\nsave_directory=/faturas\ndata_path=/dados/planilha.xlsx\nlast_open_dir=/dados\nlast_save_dir=/faturas\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path);

        assert_eq!(settings.save_directory, "/faturas");
        assert_eq!(settings.data_path, "/dados/planilha.xlsx");
        assert_eq!(settings.last_open_dir, "/dados");
        assert_eq!(settings.last_save_dir, "/faturas");
    }

    #[test]
    fn test_load_without_general_section_gives_defaults() {
        let (_dir, path) = temp_settings();
        fs::write(&path, "[Other]\nsave_directory=/x\n").unwrap();

        let settings = Settings::load_from(&path);

        assert!(settings.save_directory.is_empty());
    }

    // ==================== save tests ====================

    #[test]
    fn test_save_and_reload_round_trip() {
        let (_dir, path) = temp_settings();
        let mut settings = Settings::new(&path);
        settings.save_directory = "/saida".to_string();
        settings.data_path = "/entrada/base.xlsm".to_string();
        settings.last_open_dir = "/entrada".to_string();
        settings.last_save_dir = "/saida".to_string();

        settings.save().unwrap();
        let reloaded = Settings::load_from(&path);

        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_save_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        Settings::new(&path).save().unwrap();

        assert!(path.exists());
    }

    // ==================== setter tests ====================

    #[test]
    fn test_set_data_path_persists_path_and_folder() {
        let (dir, path) = temp_settings();
        let data = dir.path().join("planilhas").join("faturas.xlsx");
        let mut settings = Settings::new(&path);

        settings.set_data_path(&data).unwrap();

        let reloaded = Settings::load_from(&path);
        assert_eq!(reloaded.data_path, data.display().to_string());
        assert_eq!(reloaded.last_open_dir, dir.path().join("planilhas").display().to_string());
        assert!(reloaded.has_data_path());
    }

    #[test]
    fn test_set_save_directory_updates_last_save_dir() {
        let (dir, path) = temp_settings();
        let mut settings = Settings::new(&path);

        settings.set_save_directory(dir.path()).unwrap();

        let reloaded = Settings::load_from(&path);
        assert_eq!(reloaded.save_directory, dir.path().display().to_string());
        assert_eq!(reloaded.last_save_dir, reloaded.save_directory);
        assert!(reloaded.has_save_directory());
    }

    #[test]
    fn test_whitespace_save_directory_is_not_set() {
        let (_dir, path) = temp_settings();
        let mut settings = Settings::new(&path);
        settings.save_directory = "   ".to_string();
        assert!(!settings.has_save_directory());
    }
}
