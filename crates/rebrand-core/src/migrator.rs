use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::report::{Action, MigrationReport, SkipReason};
use crate::rules::{CompiledRules, NodeKind};
use crate::{MigrateError, MigrateOptions};

/// A filesystem entry seen during traversal.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub kind: NodeKind,
    /// Path relative to the root, with every ancestor rename applied.
    pub path: PathBuf,
    /// Where the entry sat on disk when its directory was snapshotted.
    pub origin: PathBuf,
}

impl TreeNode {
    fn name(&self) -> Option<&str> {
        self.origin.file_name().and_then(|n| n.to_str())
    }
}

enum RenameOutcome {
    Renamed { origin: PathBuf, path: PathBuf },
    Kept,
    /// The entry reached a terminal state while renaming.
    Finished,
}

/// Top-down walker. A directory is renamed before its children are read, and
/// the children are then read from the directory's new location.
pub(crate) struct Migrator<'a, F, G> {
    rules: &'a CompiledRules,
    options: &'a MigrateOptions,
    content_callback: &'a F,
    path_callback: &'a G,
    report: &'a mut MigrationReport,
}

impl<'a, F, G> Migrator<'a, F, G>
where
    F: Fn(&Path, &str, &str) -> anyhow::Result<bool>,
    G: Fn(&Path, &Path, NodeKind) -> anyhow::Result<bool>,
{
    pub(crate) fn new(
        rules: &'a CompiledRules,
        options: &'a MigrateOptions,
        content_callback: &'a F,
        path_callback: &'a G,
        report: &'a mut MigrationReport,
    ) -> Self {
        Self {
            rules,
            options,
            content_callback,
            path_callback,
            report,
        }
    }

    /// Processes every entry below `dir`. `logical` is `dir` relative to the
    /// root as it reads after all renames so far.
    pub(crate) fn walk(&mut self, dir: &Path, logical: &Path) -> Result<(), MigrateError> {
        debug!("Processing directory: {:?}", dir);

        let nodes = snapshot(dir, logical)?;
        let mut occupied: HashSet<OsString> = nodes
            .iter()
            .filter_map(|node| node.origin.file_name().map(|n| n.to_os_string()))
            .collect();

        for node in nodes {
            self.process_node(node, &mut occupied);
        }

        Ok(())
    }

    fn process_node(&mut self, node: TreeNode, occupied: &mut HashSet<OsString>) {
        self.report.visit();

        let Some(name) = node.name().map(str::to_string) else {
            // No rule can match the name, but the extension may still select
            // a content rule.
            debug!("Not renaming entry with a non UTF-8 name: {:?}", node.origin);
            self.report.record(&node.path, Action::Skipped(SkipReason::NonUtf8Name), None);
            match node.kind {
                NodeKind::Directory => self.descend(&node.origin, &node.path),
                NodeKind::File if self.options.process_contents => {
                    self.rewrite_contents(&node.origin, &node.path)
                }
                NodeKind::File | NodeKind::Symlink => {}
            }
            return;
        };

        if self.rules.is_ignored(&name) {
            debug!("Ignoring: {:?}", node.origin);
            self.report.record(&node.path, Action::Skipped(SkipReason::Ignored), None);
            return;
        }

        let entries_before = self.report.entries().len();

        let (origin, path) = match self.rename(&node, &name, occupied) {
            RenameOutcome::Renamed { origin, path } => (origin, path),
            RenameOutcome::Kept => (node.origin.clone(), node.path.clone()),
            RenameOutcome::Finished => {
                if node.kind == NodeKind::Directory {
                    self.descend(&node.origin, &node.path);
                }
                return;
            }
        };

        if node.kind == NodeKind::File && self.options.process_contents {
            self.rewrite_contents(&origin, &path);
        }

        if self.report.entries().len() == entries_before {
            self.report.record(&path, Action::Skipped(SkipReason::Unchanged), None);
        }

        if node.kind == NodeKind::Directory {
            self.descend(&origin, &path);
        }
    }

    fn descend(&mut self, dir: &Path, logical: &Path) {
        if let Err(e) = self.walk(dir, logical) {
            warn!("Failed to read directory {:?}: {}", dir, e);
            self.report.record(logical, Action::Failed, Some(e.to_string()));
        }
    }

    fn rename(&mut self, node: &TreeNode, name: &str, occupied: &mut HashSet<OsString>) -> RenameOutcome {
        if !self.options.process_paths {
            return RenameOutcome::Kept;
        }
        let Some(new_name) = self.rules.resolve_name(node.kind, name) else {
            return RenameOutcome::Kept;
        };

        let target = node.origin.with_file_name(&new_name);
        let logical_target = node.path.with_file_name(&new_name);

        if let Err(e) = self.check_conflict(&node.origin, &target, occupied) {
            warn!("Not renaming {:?}: {}", node.origin, e);
            self.report.record(
                &node.path,
                Action::Skipped(SkipReason::Conflict {
                    target: logical_target,
                }),
                None,
            );
            return RenameOutcome::Finished;
        }

        match (self.path_callback)(&node.origin, &target, node.kind) {
            Ok(true) => {}
            Ok(false) => {
                self.report.record(&node.path, Action::Skipped(SkipReason::Declined), None);
                return RenameOutcome::Kept;
            }
            Err(e) => {
                self.report.record(&node.path, Action::Failed, Some(format!("{:#}", e)));
                return RenameOutcome::Finished;
            }
        }

        match self.commit_rename(&node.origin, &target) {
            Ok(()) => {
                let action = match node.kind {
                    NodeKind::Directory => Action::RenamedDir,
                    NodeKind::File | NodeKind::Symlink => Action::RenamedFile,
                };
                self.report.record(&logical_target, action, Some(format!("from {}", name)));
                if let Some(old_name) = node.origin.file_name() {
                    occupied.remove(old_name);
                }
                occupied.insert(OsString::from(&new_name));

                // In a dry run nothing moved, so keep reading from the old location.
                let origin = if self.options.dry_run { node.origin.clone() } else { target };
                RenameOutcome::Renamed {
                    origin,
                    path: logical_target,
                }
            }
            Err(e) => {
                warn!("Failed to rename {:?}: {}", node.origin, e);
                self.report.record(&node.path, Action::Failed, Some(e.to_string()));
                RenameOutcome::Finished
            }
        }
    }

    /// A target is taken when a sibling already holds (or, in a dry run, is
    /// planned to hold) the name.
    fn check_conflict(
        &self,
        origin: &Path,
        target: &Path,
        occupied: &HashSet<OsString>,
    ) -> Result<(), MigrateError> {
        let taken_in_snapshot = target.file_name().is_some_and(|n| occupied.contains(n));
        // In a dry run the disk still holds names that are planned to move away.
        let taken_on_disk = !self.options.dry_run && fs::symlink_metadata(target).is_ok();

        if taken_in_snapshot || taken_on_disk {
            return Err(MigrateError::Conflict {
                path: origin.to_path_buf(),
                target: target.to_path_buf(),
            });
        }

        Ok(())
    }

    fn commit_rename(&self, origin: &Path, target: &Path) -> Result<(), MigrateError> {
        if self.options.dry_run {
            info!("Would rename: {:?} -> {:?}", origin, target);
        } else {
            info!("Renaming: {:?} -> {:?}", origin, target);
            fs::rename(origin, target).map_err(|source| MigrateError::Io {
                path: origin.to_path_buf(),
                source,
            })?;
        }

        Ok(())
    }

    /// `origin` is where the file is on disk right now; `path` is its
    /// logical path. Both already reflect the file's own rename.
    fn rewrite_contents(&mut self, origin: &Path, path: &Path) {
        let rules = self.rules;
        let Some(rule) = rules.select_content_rule(path) else {
            debug!("No content rule for: {:?}", path);
            return;
        };

        let content = match fs::read_to_string(origin) {
            Ok(content) => content,
            Err(source) => {
                let e = MigrateError::Io {
                    path: origin.to_path_buf(),
                    source,
                };
                warn!("{}", e);
                self.report.record(path, Action::Failed, Some(e.to_string()));
                return;
            }
        };

        let Some((new_content, occurrences)) = rule.apply(&content) else {
            debug!("Contents already migrated: {:?}", path);
            return;
        };

        match (self.content_callback)(origin, &content, &new_content) {
            Ok(true) => {}
            Ok(false) => {
                self.report.record(path, Action::Skipped(SkipReason::Declined), None);
                return;
            }
            Err(e) => {
                self.report.record(path, Action::Failed, Some(format!("{:#}", e)));
                return;
            }
        }

        if self.options.dry_run {
            info!("Would update contents of: {:?}", origin);
        } else {
            info!("Updating contents of: {:?}", origin);
            if let Err(source) = fs::write(origin, new_content) {
                let e = MigrateError::Io {
                    path: origin.to_path_buf(),
                    source,
                };
                warn!("{}", e);
                self.report.record(path, Action::Failed, Some(e.to_string()));
                return;
            }
        }

        self.report.record(
            path,
            Action::RewroteContents,
            Some(format!("{} substitution(s)", occurrences)),
        );
    }
}

/// Reads `dir` completely before anything in it is touched. Entries come back
/// sorted by name so runs are reproducible.
fn snapshot(dir: &Path, logical: &Path) -> Result<Vec<TreeNode>, MigrateError> {
    let io_error = |source| MigrateError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut nodes = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let file_type = entry.file_type().map_err(io_error)?;
        let kind = if file_type.is_symlink() {
            NodeKind::Symlink
        } else if file_type.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        nodes.push(TreeNode {
            kind,
            path: logical.join(entry.file_name()),
            origin: entry.path(),
        });
    }

    nodes.sort_by(|a, b| a.origin.file_name().cmp(&b.origin.file_name()));
    Ok(nodes)
}
