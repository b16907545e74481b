//! Simple find/replace over file contents and file names.

use crate::utils::{extension_lower, is_hidden, sanitize_file_name};
use regex::{NoExpand, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "csv", "xml", "json", "ini"];

#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("Informe o texto a ser localizado.")]
    EmptyFind,
    #[error("Expressão regular inválida: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Pasta não encontrada: {0}")]
    RootNotFound(PathBuf),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Literal,
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceTarget {
    Contents,
    FileNames,
    Both,
}

impl ReplaceTarget {
    fn contents(self) -> bool {
        matches!(self, ReplaceTarget::Contents | ReplaceTarget::Both)
    }

    fn file_names(self) -> bool {
        matches!(self, ReplaceTarget::FileNames | ReplaceTarget::Both)
    }
}

#[derive(Debug, Clone)]
pub struct ReplaceJob {
    pub root: PathBuf,
    pub find: String,
    pub replace: String,
    pub mode: MatchMode,
    pub target: ReplaceTarget,
    pub recursive: bool,
    /// Lower-case extensions whose contents are edited
    pub extensions: Vec<String>,
}

impl ReplaceJob {
    pub fn new(root: impl Into<PathBuf>, find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            find: find.into(),
            replace: replace.into(),
            mode: MatchMode::Literal,
            target: ReplaceTarget::Contents,
            recursive: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Parse a user-typed list like `txt, .CSV;xml`
    pub fn parse_extensions(list: &str) -> Vec<String> {
        list.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    fn pattern(&self) -> Result<Regex, ReplaceError> {
        if self.find.is_empty() {
            return Err(ReplaceError::EmptyFind);
        }
        let pattern = match self.mode {
            MatchMode::Literal => regex::escape(&self.find),
            MatchMode::Regex => self.find.clone(),
        };
        Ok(Regex::new(&pattern)?)
    }

    fn substitute(&self, pattern: &Regex, text: &str) -> String {
        match self.mode {
            MatchMode::Literal => pattern.replace_all(text, NoExpand(&self.replace)).into_owned(),
            MatchMode::Regex => pattern.replace_all(text, self.replace.as_str()).into_owned(),
        }
    }

    fn edits_contents_of(&self, path: &Path) -> bool {
        extension_lower(path)
            .map(|e| self.extensions.iter().any(|x| *x == e))
            .unwrap_or(false)
    }
}

/// One file the job touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceHit {
    pub path: PathBuf,
    /// Matches inside the file contents
    pub occurrences: usize,
    /// New file name, when the name matches
    pub new_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub files_rewritten: usize,
    pub files_renamed: usize,
    pub occurrences: usize,
    pub skipped_non_utf8: usize,
    /// Per-file failures; the rest of the job still ran
    pub errors: Vec<String>,
}

fn candidate_files(job: &ReplaceJob) -> Result<Vec<PathBuf>, ReplaceError> {
    if !job.root.is_dir() {
        return Err(ReplaceError::RootNotFound(job.root.clone()));
    }
    let max_depth = if job.recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(&job.root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn renamed(job: &ReplaceJob, pattern: &Regex, path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy().to_string();
    if !pattern.is_match(&stem) {
        return None;
    }
    let new_stem = job.substitute(pattern, &stem);
    let name = match path.extension() {
        Some(ext) => format!("{}.{}", new_stem, ext.to_string_lossy()),
        None => new_stem,
    };
    let original = path.file_name()?.to_string_lossy().to_string();
    (name != original).then_some(name)
}

/// Matches the job would change, without touching any file
pub fn preview(job: &ReplaceJob) -> Result<Vec<ReplaceHit>, ReplaceError> {
    run(job, false).map(|(hits, _)| hits)
}

/// Rewrite contents and rename files
pub fn apply(job: &ReplaceJob) -> Result<ReplaceSummary, ReplaceError> {
    let (_, summary) = run(job, true)?;
    tracing::info!(
        "Replace in {}: {} file(s) rewritten, {} renamed, {} error(s)",
        job.root.display(),
        summary.files_rewritten,
        summary.files_renamed,
        summary.errors.len()
    );
    Ok(summary)
}

fn run(job: &ReplaceJob, write: bool) -> Result<(Vec<ReplaceHit>, ReplaceSummary), ReplaceError> {
    let pattern = job.pattern()?;
    let mut hits = Vec::new();
    let mut summary = ReplaceSummary::default();

    for path in candidate_files(job)? {
        let mut hit = ReplaceHit {
            path: path.clone(),
            occurrences: 0,
            new_name: None,
        };

        if job.target.contents() && job.edits_contents_of(&path) {
            match fs::read(&path).map(String::from_utf8) {
                Ok(Ok(text)) => {
                    let count = pattern.find_iter(&text).count();
                    if count > 0 {
                        let updated = job.substitute(&pattern, &text);
                        if updated != text {
                            hit.occurrences = count;
                            if write {
                                match fs::write(&path, updated) {
                                    Ok(()) => {
                                        summary.files_rewritten += 1;
                                        summary.occurrences += count;
                                    }
                                    Err(e) => summary.errors.push(format!("{}: {}", path.display(), e)),
                                }
                            }
                        }
                    }
                }
                Ok(Err(_)) => {
                    tracing::warn!("Skipping non UTF-8 file {}", path.display());
                    summary.skipped_non_utf8 += 1;
                }
                Err(e) => summary.errors.push(format!("{}: {}", path.display(), e)),
            }
        }

        if job.target.file_names() {
            if let Some(name) = renamed(job, &pattern, &path) {
                hit.new_name = Some(name.clone());
                if write {
                    if let Err(msg) = rename_file(&path, &name) {
                        summary.errors.push(msg);
                    } else {
                        summary.files_renamed += 1;
                    }
                }
            }
        }

        if hit.occurrences > 0 || hit.new_name.is_some() {
            hits.push(hit);
        }
    }
    Ok((hits, summary))
}

fn rename_file(path: &Path, name: &str) -> Result<(), String> {
    if name.trim().is_empty() || sanitize_file_name(name) != name {
        return Err(format!("{}: nome inválido '{}'", path.display(), name));
    }
    let target = path.with_file_name(name);
    if target.exists() {
        return Err(format!("{}: já existe um arquivo chamado '{}'", path.display(), name));
    }
    fs::rename(path, &target).map_err(|e| format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn job(root: &Path, find: &str, replace: &str) -> ReplaceJob {
        ReplaceJob::new(root, find, replace)
    }

    // ==================== job setup ====================

    #[test]
    fn test_empty_find_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(preview(&job(dir.path(), "", "x")), Err(ReplaceError::EmptyFind)));
    }

    #[test]
    fn test_invalid_regex_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path(), "(", "x");
        job.mode = MatchMode::Regex;
        assert!(matches!(apply(&job), Err(ReplaceError::InvalidPattern(_))));
    }

    #[test]
    fn test_parse_extensions() {
        assert_eq!(ReplaceJob::parse_extensions("txt, .CSV;xml  "), vec!["txt", "csv", "xml"]);
        assert!(ReplaceJob::parse_extensions(" ").is_empty());
    }

    // ==================== contents ====================

    #[test]
    fn test_preview_does_not_modify_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.txt", "Blume Blume");

        let hits = preview(&job(dir.path(), "Blume", "BLUME")).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].occurrences, 2);
        assert_eq!(fs::read_to_string(file).unwrap(), "Blume Blume");
    }

    #[test]
    fn test_apply_rewrites_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", "valor: 1.5");
        let b = write(dir.path(), "b.csv", "sem ocorrencias");
        let c = write(dir.path(), "c.pdf", "valor");

        let summary = apply(&job(dir.path(), "valor", "preço")).unwrap();

        assert_eq!(summary.files_rewritten, 1);
        assert_eq!(summary.occurrences, 1);
        assert_eq!(fs::read_to_string(a).unwrap(), "preço: 1.5");
        assert_eq!(fs::read_to_string(b).unwrap(), "sem ocorrencias");
        assert_eq!(fs::read_to_string(c).unwrap(), "valor");
    }

    #[test]
    fn test_literal_mode_treats_dollar_and_dots_literally() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.txt", "1.5 e 105");

        apply(&job(dir.path(), "1.5", "$1")).unwrap();

        assert_eq!(fs::read_to_string(file).unwrap(), "$1 e 105");
    }

    #[test]
    fn test_regex_mode_supports_groups() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "datas.csv", "10/03/2024;11/04/2024");
        let mut job = job(dir.path(), r"(\d{2})/(\d{2})/(\d{4})", "$3-$2-$1");
        job.mode = MatchMode::Regex;

        let summary = apply(&job).unwrap();

        assert_eq!(summary.occurrences, 2);
        assert_eq!(fs::read_to_string(file).unwrap(), "2024-03-10;2024-04-11");
    }

    #[test]
    fn test_non_utf8_files_are_counted_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [0x63, 0x61, 0x66, 0xE9]).unwrap();

        let summary = apply(&job(dir.path(), "caf", "x")).unwrap();

        assert_eq!(summary.skipped_non_utf8, 1);
        assert_eq!(fs::read(&path).unwrap(), vec![0x63, 0x61, 0x66, 0xE9]);
    }

    #[test]
    fn test_recursive_flag_controls_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "x");
        write(dir.path(), "sub/b.txt", "x");
        write(dir.path(), ".git/c.txt", "x");

        assert_eq!(preview(&job(dir.path(), "x", "y")).unwrap().len(), 1);

        let mut recursive = job(dir.path(), "x", "y");
        recursive.recursive = true;
        let hits = preview(&recursive).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| !h.path.to_string_lossy().contains(".git")));
    }

    // ==================== file names ====================

    #[test]
    fn test_rename_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "fatura_jan.pdf", "");
        let mut job = job(dir.path(), "jan", "01");
        job.target = ReplaceTarget::FileNames;

        let summary = apply(&job).unwrap();

        assert_eq!(summary.files_renamed, 1);
        assert!(dir.path().join("fatura_01.pdf").exists());
        assert!(!dir.path().join("fatura_jan.pdf").exists());
    }

    #[test]
    fn test_rename_collision_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "1");
        write(dir.path(), "b.txt", "2");
        let mut job = job(dir.path(), "a", "b");
        job.target = ReplaceTarget::FileNames;

        let summary = apply(&job).unwrap();

        assert_eq!(summary.files_renamed, 0);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "2");
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_both_rewrites_then_renames() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "velho.txt", "texto velho");
        let mut job = job(dir.path(), "velho", "novo");
        job.target = ReplaceTarget::Both;

        let hits = preview(&job).unwrap();
        assert_eq!(hits[0].occurrences, 1);
        assert_eq!(hits[0].new_name.as_deref(), Some("novo.txt"));

        let summary = apply(&job).unwrap();

        assert_eq!((summary.files_rewritten, summary.files_renamed), (1, 1));
        assert_eq!(fs::read_to_string(dir.path().join("novo.txt")).unwrap(), "texto novo");
    }
}
