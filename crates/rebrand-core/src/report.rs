use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither the name nor the contents needed a change.
    Unchanged,
    /// The resolved name is already taken by a sibling.
    Conflict { target: PathBuf },
    /// The name is on the ignore list.
    Ignored,
    /// Turned down at the interactive prompt.
    Declined,
    /// No rule can match a name that is not valid UTF-8.
    NonUtf8Name,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unchanged => write!(f, "unchanged"),
            SkipReason::Conflict { target } => {
                write!(f, "conflict: {} already exists", target.display())
            }
            SkipReason::Ignored => write!(f, "ignored"),
            SkipReason::Declined => write!(f, "declined"),
            SkipReason::NonUtf8Name => write!(f, "name is not valid UTF-8"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RenamedDir,
    RenamedFile,
    RewroteContents,
    Skipped(SkipReason),
    Failed,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::RenamedDir => write!(f, "renamed-dir"),
            Action::RenamedFile => write!(f, "renamed-file"),
            Action::RewroteContents => write!(f, "rewrote-contents"),
            Action::Skipped(_) => write!(f, "skipped"),
            Action::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// Path relative to the migration root, after any rename of the entry.
    pub path: PathBuf,
    pub action: Action,
    pub detail: Option<String>,
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.path.display())?;
        if let Some(detail) = &self.detail {
            write!(f, " [{}]", detail)?;
        }
        Ok(())
    }
}

/// Ordered account of one migration run. Records are only ever appended.
#[derive(Debug, Default)]
pub struct MigrationReport {
    entries: Vec<ReportEntry>,
    entries_visited: usize,
    dry_run: bool,
}

impl MigrationReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            entries: Vec::new(),
            entries_visited: 0,
            dry_run,
        }
    }

    pub(crate) fn visit(&mut self) {
        self.entries_visited += 1;
    }

    pub(crate) fn record(&mut self, path: &Path, action: Action, detail: Option<String>) {
        let detail = match (&action, detail) {
            (Action::Skipped(reason), None) => Some(reason.to_string()),
            (Action::RenamedDir | Action::RenamedFile | Action::RewroteContents, detail) if self.dry_run => {
                Some(match detail {
                    Some(detail) => format!("{} (dry run)", detail),
                    None => "dry run".to_string(),
                })
            }
            (_, detail) => detail,
        };

        self.entries.push(ReportEntry {
            path: path.to_path_buf(),
            action,
            detail,
        });
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn entries_visited(&self) -> usize {
        self.entries_visited
    }

    pub fn paths_renamed(&self) -> usize {
        self.count(|a| matches!(a, Action::RenamedDir | Action::RenamedFile))
    }

    pub fn content_changes(&self) -> usize {
        self.count(|a| matches!(a, Action::RewroteContents))
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, Action::Skipped(_)))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|a| matches!(a, Action::Skipped(SkipReason::Conflict { .. })))
    }

    pub fn failed(&self) -> usize {
        self.count(|a| matches!(a, Action::Failed))
    }

    /// True when the run changed nothing and nothing went wrong.
    pub fn is_converged(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(e.action, Action::Skipped(SkipReason::Unchanged | SkipReason::Ignored)))
    }

    fn count(&self, predicate: impl Fn(&Action) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.action)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_display() {
        let mut report = MigrationReport::new(false);
        report.record(Path::new("FASTN"), Action::RenamedDir, Some("from FPM".to_string()));
        report.record(Path::new("FASTN/inner.ftd"), Action::RewroteContents, None);
        report.record(
            Path::new("fpm_old.txt"),
            Action::Skipped(SkipReason::Conflict {
                target: PathBuf::from("fastn_old.txt"),
            }),
            None,
        );

        let lines: Vec<String> = report.entries().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "renamed-dir: FASTN [from FPM]",
                "rewrote-contents: FASTN/inner.ftd",
                "skipped: fpm_old.txt [conflict: fastn_old.txt already exists]",
            ]
        );
    }

    #[test]
    fn test_dry_run_detail() {
        let mut report = MigrationReport::new(true);
        report.record(Path::new("a.ftd"), Action::RewroteContents, Some("1 substitution(s)".to_string()));
        report.record(Path::new("b.ftd"), Action::Skipped(SkipReason::Unchanged), None);

        assert_eq!(report.entries()[0].to_string(), "rewrote-contents: a.ftd [1 substitution(s) (dry run)]");
        assert_eq!(report.entries()[1].to_string(), "skipped: b.ftd [unchanged]");
    }

    #[test]
    fn test_counters() {
        let mut report = MigrationReport::new(false);
        report.record(Path::new("a"), Action::RenamedFile, None);
        report.record(Path::new("a"), Action::RewroteContents, None);
        report.record(Path::new("b"), Action::Failed, Some("boom".to_string()));
        report.record(Path::new("c"), Action::Skipped(SkipReason::Unchanged), None);

        assert_eq!(report.paths_renamed(), 1);
        assert_eq!(report.content_changes(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.conflicts(), 0);
        assert!(!report.is_converged());
    }

    #[test]
    fn test_non_utf8_name_is_not_converged() {
        let mut report = MigrationReport::new(false);
        report.record(Path::new("x.ftd"), Action::Skipped(SkipReason::NonUtf8Name), None);

        assert_eq!(report.entries()[0].to_string(), "skipped: x.ftd [name is not valid UTF-8]");
        assert!(!report.is_converged());
    }

    #[test]
    fn test_converged() {
        let mut report = MigrationReport::new(false);
        report.record(Path::new(".git"), Action::Skipped(SkipReason::Ignored), None);
        report.record(Path::new("x"), Action::Skipped(SkipReason::Unchanged), None);

        assert!(report.is_converged());
    }
}
