use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

mod migrator;
pub mod report;
pub mod rules;

pub use migrator::TreeNode;
pub use report::{Action, MigrationReport, ReportEntry, SkipReason};
pub use rules::{CompiledRules, ContentRule, FileSelector, NodeKind, RenameRule, RuleSet, Substitution};

use migrator::Migrator;

#[derive(thiserror::Error, Debug)]
pub enum MigrateError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Rename target already exists: {path:?} -> {target:?}")]
    Conflict { path: PathBuf, target: PathBuf },
    #[error("Invalid root {path:?}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },
    #[error("Invalid rule: {message}")]
    InvalidRule { message: String },
}

pub struct MigrateOptions {
    pub process_paths: bool,
    pub process_contents: bool,
    pub dry_run: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            process_paths: true,
            process_contents: true,
            dry_run: false,
        }
    }
}

/// Migrates everything below `root` in place. Per-entry problems end up in the
/// report; only an unusable root or rule set is an error.
pub fn migrate(
    root: &Path,
    rules: &RuleSet,
    options: &MigrateOptions,
) -> Result<MigrationReport, MigrateError> {
    migrate_interactive(root, rules, options, |_, _, _| Ok(true), |_, _, _| Ok(true))
}

/// Like [`migrate`], but asks `content_callback` (path, old text, new text)
/// and `path_callback` (old path, new path, kind) before each change.
pub fn migrate_interactive<F, G>(
    root: &Path,
    rules: &RuleSet,
    options: &MigrateOptions,
    content_callback: F,
    path_callback: G,
) -> Result<MigrationReport, MigrateError>
where
    F: Fn(&Path, &str, &str) -> anyhow::Result<bool>,
    G: Fn(&Path, &Path, NodeKind) -> anyhow::Result<bool>,
{
    validate_root(root)?;
    let compiled = rules.compile()?;

    info!("Starting migration: {:?}", root);

    let mut report = MigrationReport::new(options.dry_run);
    Migrator::new(&compiled, options, &content_callback, &path_callback, &mut report)
        .walk(root, Path::new(""))?;

    info!(
        "Migration complete: {} entries visited, {} paths renamed, {} content changes, {} skipped, {} failed",
        report.entries_visited(),
        report.paths_renamed(),
        report.content_changes(),
        report.skipped(),
        report.failed()
    );

    Ok(report)
}

fn validate_root(root: &Path) -> Result<(), MigrateError> {
    let invalid = |reason: String| MigrateError::InvalidRoot {
        path: root.to_path_buf(),
        reason,
    };

    let metadata = fs::metadata(root).map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    fs::read_dir(root).map_err(|e| invalid(e.to_string()))?;

    Ok(())
}
