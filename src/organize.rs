//! Folder organization: move the files of one folder into subfolders.

use crate::utils::{extension_lower, is_hidden, move_file, sanitize_file_name, unique_destination};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const NO_EXTENSION_FOLDER: &str = "SEM EXTENSAO";
pub const OTHERS_FOLDER: &str = "OUTROS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizeStrategy {
    /// One folder per upper-case extension
    ByExtension,
    /// One `YYYY-MM` folder per modification month
    ByModifiedMonth,
    /// Folder named after the text before the first `separator`
    ByPrefix { separator: String },
}

impl fmt::Display for OrganizeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizeStrategy::ByExtension => write!(f, "Por extensão"),
            OrganizeStrategy::ByModifiedMonth => write!(f, "Por mês de modificação"),
            OrganizeStrategy::ByPrefix { .. } => write!(f, "Por prefixo do nome"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl PlannedMove {
    /// Target folder name, relative to the organized root
    pub fn folder(&self) -> String {
        self.to
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub moved: usize,
    pub folders: usize,
}

fn folder_for(path: &Path, strategy: &OrganizeStrategy) -> Result<String> {
    let folder = match strategy {
        OrganizeStrategy::ByExtension => extension_lower(path)
            .filter(|e| !e.is_empty())
            .map(|e| e.to_uppercase())
            .unwrap_or_else(|| NO_EXTENSION_FOLDER.to_string()),
        OrganizeStrategy::ByModifiedMonth => {
            let modified = path
                .metadata()
                .and_then(|m| m.modified())
                .with_context(|| format!("failed to read modification time of {}", path.display()))?;
            DateTime::<Local>::from(modified).format("%Y-%m").to_string()
        }
        OrganizeStrategy::ByPrefix { separator } => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match name.split_once(separator.as_str()) {
                Some((prefix, _)) if !separator.is_empty() && !prefix.trim().is_empty() => {
                    prefix.trim().to_string()
                }
                _ => OTHERS_FOLDER.to_string(),
            }
        }
    };
    let folder = sanitize_file_name(&folder);
    Ok(if folder.is_empty() {
        OTHERS_FOLDER.to_string()
    } else {
        folder
    })
}

/// Decide where every visible file directly inside `root` goes. Nothing is moved.
pub fn plan_organization(root: &Path, strategy: &OrganizeStrategy) -> Result<Vec<PlannedMove>> {
    if !root.is_dir() {
        return Err(anyhow!("Pasta não encontrada: {}", root.display()));
    }

    let mut reserved = HashSet::new();
    let mut plan = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || is_hidden(entry.path()) {
            continue;
        }
        let folder = folder_for(entry.path(), strategy)?;
        let name = entry.file_name().to_string_lossy().to_string();
        let to = unique_destination(&root.join(&folder), &name, &reserved);
        reserved.insert(to.clone());
        plan.push(PlannedMove {
            from: entry.path().to_path_buf(),
            to,
        });
    }
    tracing::debug!("Planned {} move(s) in {}", plan.len(), root.display());
    Ok(plan)
}

/// Perform the moves in order; stops at the first failure
pub fn apply_plan(plan: &[PlannedMove]) -> Result<OrganizeSummary> {
    let mut folders = BTreeSet::new();
    for (i, planned) in plan.iter().enumerate() {
        move_file(&planned.from, &planned.to).with_context(|| {
            format!(
                "Falha ao mover {} ({} de {} arquivos já movidos)",
                planned.from.display(),
                i,
                plan.len()
            )
        })?;
        if let Some(parent) = planned.to.parent() {
            folders.insert(parent.to_path_buf());
        }
    }
    Ok(OrganizeSummary {
        moved: plan.len(),
        folders: folders.len(),
    })
}
