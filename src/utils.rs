//! Small filesystem helpers shared by the automation and file tools.

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Characters Windows refuses in file names
const FORBIDDEN_FILE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace characters that are invalid in file names and trim the result
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_FILE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    cleaned.trim().trim_end_matches('.').to_string()
}

/// Insert ` (n)` before the extension: `fatura.pdf` → `fatura (2).pdf`
pub fn numbered_file_name(name: &str, n: usize) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!("{} ({}).{}", stem.to_string_lossy(), n, ext.to_string_lossy()),
        _ => format!("{} ({})", name, n),
    }
}

/// First path in `dir` for `name` that neither exists on disk nor is in `reserved`
pub fn unique_destination(dir: &Path, name: &str, reserved: &HashSet<PathBuf>) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() && !reserved.contains(&candidate) {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(numbered_file_name(name, n)))
        .find(|p| !p.exists() && !reserved.contains(p))
        .unwrap_or(candidate)
}

/// Move a file, falling back to copy + delete across filesystems
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            fs::copy(from, to).map_err(|e| {
                anyhow!("failed to move {:?} to {:?}: {} (copy: {})", from, to, rename_err, e)
            })?;
            fs::remove_file(from)?;
            Ok(())
        }
    }
}

/// Hidden files (dot-prefixed) are ignored by the folder tools
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Lower-case extension without the dot
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name_replaces_forbidden_chars() {
        assert_eq!(sanitize_file_name("BLUME/123:abc?"), "BLUME_123_abc_");
        assert_eq!(sanitize_file_name("  nota fiscal. "), "nota fiscal");
    }

    #[test]
    fn test_numbered_file_name() {
        assert_eq!(numbered_file_name("fatura.pdf", 1), "fatura (1).pdf");
        assert_eq!(numbered_file_name("LEIAME", 3), "LEIAME (3)");
    }

    #[test]
    fn test_unique_destination_skips_existing_and_reserved() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let mut reserved = HashSet::new();
        reserved.insert(dir.path().join("a (1).txt"));

        let dest = unique_destination(dir.path(), "a.txt", &reserved);

        assert_eq!(dest, dir.path().join("a (2).txt"));
    }

    #[test]
    fn test_unique_destination_free_name_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let dest = unique_destination(dir.path(), "b.txt", &HashSet::new());
        assert_eq!(dest, dir.path().join("b.txt"));
    }

    #[test]
    fn test_move_file_creates_target_folder() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("origem.pdf");
        fs::write(&from, "pdf").unwrap();
        let to = dir.path().join("PDF").join("origem.pdf");

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "pdf");
    }

    #[test]
    fn test_is_hidden_and_extension_lower() {
        assert!(is_hidden(Path::new("/tmp/.DS_Store")));
        assert!(!is_hidden(Path::new("/tmp/nota.PDF")));
        assert_eq!(extension_lower(Path::new("nota.PDF")).as_deref(), Some("pdf"));
        assert_eq!(extension_lower(Path::new("LEIAME")), None);
    }
}
