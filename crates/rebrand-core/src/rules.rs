use std::collections::HashSet;
use std::path::Path;

use convert_case::{Case, Casing};
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::MigrateError;

/// Cases generated for a compound identifier such as `old-tool`.
const COMPOUND_CASES: [Case; 7] = [
    Case::ScreamingSnake, // OLD_TOOL
    Case::Cobol,          // OLD-TOOL
    Case::Train,          // Old-Tool
    Case::Pascal,         // OldTool
    Case::Camel,          // oldTool
    Case::Snake,          // old_tool
    Case::Kebab,          // old-tool
];

/// Cases generated for a single-word identifier such as `fpm`.
const WORD_CASES: [Case; 2] = [Case::UpperFlat, Case::Flat];

/// File extension whose files carry the identifier in their content.
const DOCUMENT_EXTENSION: &str = "ftd";

/// Deployment workflow that names the old tool on its command lines.
const DEPLOY_WORKFLOW: &str = "deploy.yml";

/// Names that are never visited.
const DEFAULT_IGNORED: [&str; 1] = [".git"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
    Symlink,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Directory => write!(f, "Directory"),
            NodeKind::File => write!(f, "File"),
            NodeKind::Symlink => write!(f, "Symlink"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameRule {
    /// Whole directory name equals `pattern`.
    ExactDirName { pattern: String, replacement: String },
    /// Whole file name equals `pattern`. Wins over every substring rule.
    ExactFileName { pattern: String, replacement: String },
    /// Every occurrence of `pattern` inside a file name.
    SubstringInFileName { pattern: String, replacement: String },
}

impl RenameRule {
    pub fn pattern(&self) -> &str {
        match self {
            RenameRule::ExactDirName { pattern, .. }
            | RenameRule::ExactFileName { pattern, .. }
            | RenameRule::SubstringInFileName { pattern, .. } => pattern,
        }
    }

    pub fn replacement(&self) -> &str {
        match self {
            RenameRule::ExactDirName { replacement, .. }
            | RenameRule::ExactFileName { replacement, .. }
            | RenameRule::SubstringInFileName { replacement, .. } => replacement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelector {
    Basename(String),
    /// Extension without the leading dot.
    Extension(String),
}

impl FileSelector {
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            FileSelector::Basename(name) => {
                path.file_name().and_then(|n| n.to_str()) == Some(name.as_str())
            }
            FileSelector::Extension(ext) => {
                path.extension().and_then(|e| e.to_str()) == Some(ext.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub find: String,
    pub replace: String,
}

impl Substitution {
    pub fn new(find: &str, replace: &str) -> Self {
        Self {
            find: find.to_string(),
            replace: replace.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRule {
    pub selector: FileSelector,
    pub substitutions: Vec<Substitution>,
}

impl ContentRule {
    /// Applies the substitutions in order, each one against the output of the
    /// previous. Returns the new text and the number of replaced occurrences,
    /// or `None` when the text comes out unchanged.
    pub fn apply(&self, content: &str) -> Option<(String, usize)> {
        let mut text = content.to_string();
        let mut occurrences = 0;

        for substitution in &self.substitutions {
            let count = text.matches(&substitution.find).count();
            if count > 0 {
                text = text.replace(&substitution.find, &substitution.replace);
                occurrences += count;
                debug!(
                    "Content substitution: '{}' -> '{}' ({} occurrences)",
                    substitution.find, substitution.replace, count
                );
            }
        }

        if text == content {
            None
        } else {
            Some((text, occurrences))
        }
    }
}

/// Everything a migration run is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub rename_rules: Vec<RenameRule>,
    pub content_rules: Vec<ContentRule>,
    pub ignored: Vec<String>,
}

impl Default for RuleSet {
    /// The FPM to FASTN migration.
    fn default() -> Self {
        Self::for_identifiers("fpm", "fastn")
    }
}

impl RuleSet {
    /// Derives the rename and content rules for moving every case variant of
    /// `from` to the matching variant of `to`.
    pub fn for_identifiers(from: &str, to: &str) -> Self {
        let variants = identifier_variants(from, to);

        let mut rename_rules = Vec::new();
        for (pattern, replacement) in &variants {
            rename_rules.push(RenameRule::ExactDirName {
                pattern: pattern.clone(),
                replacement: replacement.clone(),
            });
        }
        if let Some((pattern, replacement)) = variants.first() {
            rename_rules.push(RenameRule::ExactFileName {
                pattern: format!("{}.{}", pattern, DOCUMENT_EXTENSION),
                replacement: format!("{}.{}", replacement, DOCUMENT_EXTENSION),
            });
        }
        for (pattern, replacement) in &variants {
            rename_rules.push(RenameRule::SubstringInFileName {
                pattern: pattern.clone(),
                replacement: replacement.clone(),
            });
        }

        let substitutions: Vec<Substitution> = variants
            .iter()
            .map(|(find, replace)| Substitution::new(find, replace))
            .collect();

        let content_rules = vec![
            ContentRule {
                selector: FileSelector::Basename(DEPLOY_WORKFLOW.to_string()),
                substitutions: substitutions.clone(),
            },
            ContentRule {
                selector: FileSelector::Extension(DOCUMENT_EXTENSION.to_string()),
                substitutions,
            },
        ];

        Self {
            rename_rules,
            content_rules,
            ignored: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Logs every rule whose output would match again on a second run.
    /// Returns the number of such rules.
    pub fn validate(&self) -> usize {
        let mut problems = 0;

        let substring_patterns: Vec<&str> = self
            .rename_rules
            .iter()
            .filter(|r| matches!(r, RenameRule::SubstringInFileName { .. }))
            .map(RenameRule::pattern)
            .collect();

        for rule in &self.rename_rules {
            let rematched = match rule {
                RenameRule::ExactDirName { replacement, .. } => {
                    self.rename_rules.iter().any(|other| {
                        matches!(other, RenameRule::ExactDirName { pattern, .. } if pattern == replacement)
                    })
                }
                RenameRule::ExactFileName { .. } => false,
                RenameRule::SubstringInFileName { replacement, .. } => substring_patterns
                    .iter()
                    .any(|pattern| replacement.contains(pattern)),
            };
            if rematched {
                warn!(
                    "Rename rule '{}' -> '{}' is not idempotent: its result matches again",
                    rule.pattern(),
                    rule.replacement()
                );
                problems += 1;
            }
        }

        for content_rule in &self.content_rules {
            for substitution in &content_rule.substitutions {
                if content_rule
                    .substitutions
                    .iter()
                    .any(|other| substitution.replace.contains(&other.find))
                {
                    warn!(
                        "Content substitution '{}' -> '{}' is not idempotent: its result matches again",
                        substitution.find, substitution.replace
                    );
                    problems += 1;
                }
            }
        }

        problems
    }

    pub fn compile(&self) -> Result<CompiledRules, MigrateError> {
        for rule in &self.rename_rules {
            if rule.pattern().is_empty() {
                return Err(MigrateError::InvalidRule {
                    message: format!("rename rule to '{}' has an empty pattern", rule.replacement()),
                });
            }
        }
        for content_rule in &self.content_rules {
            if content_rule.substitutions.iter().any(|s| s.find.is_empty()) {
                return Err(MigrateError::InvalidRule {
                    message: format!("content rule for {:?} has an empty search string", content_rule.selector),
                });
            }
        }

        self.validate();

        let mut exact_dirs = Vec::new();
        let mut exact_files = Vec::new();
        let mut substrings = Vec::new();
        for rule in &self.rename_rules {
            let pair = (rule.pattern().to_string(), rule.replacement().to_string());
            match rule {
                RenameRule::ExactDirName { .. } => exact_dirs.push(pair),
                RenameRule::ExactFileName { .. } => exact_files.push(pair),
                RenameRule::SubstringInFileName { .. } => substrings.push(pair),
            }
        }

        let substring_matcher = if substrings.is_empty() {
            None
        } else {
            let alternation = substrings
                .iter()
                .map(|(pattern, _)| format!("({})", regex::escape(pattern)))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&alternation).map_err(|e| MigrateError::InvalidRule {
                message: e.to_string(),
            })?;
            Some(SubstringMatcher {
                regex,
                replacements: substrings.into_iter().map(|(_, r)| r).collect(),
            })
        };

        Ok(CompiledRules {
            exact_dirs,
            exact_files,
            substring_matcher,
            content_rules: self.content_rules.clone(),
            ignored: self.ignored.iter().cloned().collect(),
        })
    }
}

/// All substring rules folded into one leftmost-first alternation, so each
/// rule sees only the original name and results never chain.
#[derive(Debug)]
struct SubstringMatcher {
    regex: Regex,
    replacements: Vec<String>,
}

impl SubstringMatcher {
    fn replace_all(&self, name: &str) -> String {
        self.regex
            .replace_all(name, |caps: &Captures| {
                match (1..caps.len()).find(|&i| caps.get(i).is_some()) {
                    Some(group) => self.replacements[group - 1].clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

#[derive(Debug)]
pub struct CompiledRules {
    exact_dirs: Vec<(String, String)>,
    exact_files: Vec<(String, String)>,
    substring_matcher: Option<SubstringMatcher>,
    content_rules: Vec<ContentRule>,
    ignored: HashSet<String>,
}

impl CompiledRules {
    /// New name for an entry, or `None` when no rule changes it.
    pub fn resolve_name(&self, kind: NodeKind, name: &str) -> Option<String> {
        let new_name = match kind {
            NodeKind::Directory => self
                .exact_dirs
                .iter()
                .find(|(pattern, _)| pattern == name)
                .map(|(_, replacement)| replacement.clone())?,
            NodeKind::File | NodeKind::Symlink => {
                if let Some((_, replacement)) =
                    self.exact_files.iter().find(|(pattern, _)| pattern == name)
                {
                    replacement.clone()
                } else {
                    self.substring_matcher.as_ref()?.replace_all(name)
                }
            }
        };

        if new_name == name {
            None
        } else {
            debug!("Name resolution: '{}' -> '{}'", name, new_name);
            Some(new_name)
        }
    }

    /// Content rule for a file: a basename match beats an extension match.
    pub fn select_content_rule(&self, path: &Path) -> Option<&ContentRule> {
        let by_basename = self
            .content_rules
            .iter()
            .find(|rule| matches!(rule.selector, FileSelector::Basename(_)) && rule.selector.matches(path));

        by_basename.or_else(|| {
            self.content_rules
                .iter()
                .find(|rule| matches!(rule.selector, FileSelector::Extension(_)) && rule.selector.matches(path))
        })
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }
}

fn is_compound(word: &str) -> bool {
    word.contains('-')
        || word.contains('_')
        || (word.chars().any(|c| c.is_uppercase()) && word.chars().any(|c| c.is_lowercase()))
}

/// Case variant pairs, upper-case shapes first, longest patterns ahead of
/// shorter ones.
fn identifier_variants(from: &str, to: &str) -> Vec<(String, String)> {
    let cases: &[Case] = if is_compound(from) || is_compound(to) {
        &COMPOUND_CASES
    } else {
        &WORD_CASES
    };

    let mut seen = HashSet::new();
    let mut variants = Vec::new();
    for case in cases {
        let pattern = from.to_case(*case);
        let replacement = to.to_case(*case);
        if seen.insert(pattern.clone()) {
            debug!("Identifier variant: {} -> {}", pattern, replacement);
            variants.push((pattern, replacement));
        }
    }

    variants.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substring_rules(pairs: &[(&str, &str)]) -> RuleSet {
        RuleSet {
            rename_rules: pairs
                .iter()
                .map(|(p, r)| RenameRule::SubstringInFileName {
                    pattern: p.to_string(),
                    replacement: r.to_string(),
                })
                .collect(),
            content_rules: Vec::new(),
            ignored: Vec::new(),
        }
    }

    #[test]
    fn test_default_rule_set() {
        let rules = RuleSet::default();

        assert!(rules.rename_rules.contains(&RenameRule::ExactDirName {
            pattern: "FPM".to_string(),
            replacement: "FASTN".to_string(),
        }));
        assert!(rules.rename_rules.contains(&RenameRule::ExactFileName {
            pattern: "FPM.ftd".to_string(),
            replacement: "FASTN.ftd".to_string(),
        }));
        assert!(rules.rename_rules.contains(&RenameRule::SubstringInFileName {
            pattern: "fpm".to_string(),
            replacement: "fastn".to_string(),
        }));
        assert_eq!(rules.content_rules.len(), 2);
        assert_eq!(rules.ignored, vec![".git".to_string()]);
        assert_eq!(rules.validate(), 0);
    }

    #[test]
    fn test_substring_rename() {
        let compiled = RuleSet::default().compile().unwrap();

        assert_eq!(
            compiled.resolve_name(NodeKind::File, "abc-fpm-config.txt"),
            Some("abc-fastn-config.txt".to_string())
        );
        assert_eq!(
            compiled.resolve_name(NodeKind::File, "FPM-fpm.txt"),
            Some("FASTN-fastn.txt".to_string())
        );
        assert_eq!(compiled.resolve_name(NodeKind::File, "other.txt"), None);
    }

    #[test]
    fn test_exact_file_name_wins() {
        let rules = RuleSet {
            rename_rules: vec![
                RenameRule::SubstringInFileName {
                    pattern: "FPM".to_string(),
                    replacement: "X".to_string(),
                },
                RenameRule::ExactFileName {
                    pattern: "FPM.ftd".to_string(),
                    replacement: "FASTN.ftd".to_string(),
                },
            ],
            content_rules: Vec::new(),
            ignored: Vec::new(),
        };
        let compiled = rules.compile().unwrap();

        assert_eq!(
            compiled.resolve_name(NodeKind::File, "FPM.ftd"),
            Some("FASTN.ftd".to_string())
        );
        assert_eq!(
            compiled.resolve_name(NodeKind::File, "FPM.md"),
            Some("X.md".to_string())
        );
    }

    #[test]
    fn test_directories_only_use_exact_rules() {
        let compiled = RuleSet::default().compile().unwrap();

        assert_eq!(
            compiled.resolve_name(NodeKind::Directory, "FPM"),
            Some("FASTN".to_string())
        );
        assert_eq!(compiled.resolve_name(NodeKind::Directory, "my-fpm-dir"), None);
    }

    #[test]
    fn test_substring_rules_do_not_chain() {
        let compiled = substring_rules(&[("a", "b"), ("b", "c")]).compile().unwrap();

        assert_eq!(
            compiled.resolve_name(NodeKind::File, "ab"),
            Some("bc".to_string())
        );
    }

    #[test]
    fn test_substring_overlap_prefers_declared_order() {
        let compiled = substring_rules(&[("fpm", "fastn"), ("fp", "xx")]).compile().unwrap();

        assert_eq!(
            compiled.resolve_name(NodeKind::File, "fpm-fp"),
            Some("fastn-xx".to_string())
        );
    }

    #[test]
    fn test_content_sequential_substitution() {
        let rule = ContentRule {
            selector: FileSelector::Extension("ftd".to_string()),
            substitutions: vec![Substitution::new("a", "b"), Substitution::new("b", "c")],
        };

        let (text, occurrences) = rule.apply("a").unwrap();
        assert_eq!(text, "c");
        assert_eq!(occurrences, 2);
    }

    #[test]
    fn test_content_unchanged() {
        let rule = ContentRule {
            selector: FileSelector::Extension("ftd".to_string()),
            substitutions: vec![Substitution::new("fpm", "fastn")],
        };

        assert!(rule.apply("already fastn").is_none());
    }

    #[test]
    fn test_basename_selector_beats_extension() {
        let rules = RuleSet {
            rename_rules: Vec::new(),
            content_rules: vec![
                ContentRule {
                    selector: FileSelector::Extension("yml".to_string()),
                    substitutions: vec![Substitution::new("a", "by-extension")],
                },
                ContentRule {
                    selector: FileSelector::Basename("deploy.yml".to_string()),
                    substitutions: vec![Substitution::new("a", "by-name")],
                },
            ],
            ignored: Vec::new(),
        };
        let compiled = rules.compile().unwrap();

        let rule = compiled.select_content_rule(Path::new("ci/deploy.yml")).unwrap();
        assert_eq!(rule.selector, FileSelector::Basename("deploy.yml".to_string()));

        let rule = compiled.select_content_rule(Path::new("ci/test.yml")).unwrap();
        assert_eq!(rule.selector, FileSelector::Extension("yml".to_string()));

        assert!(compiled.select_content_rule(Path::new("logo.png")).is_none());
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let result = substring_rules(&[("", "fastn")]).compile();
        assert!(matches!(result, Err(MigrateError::InvalidRule { .. })));
    }

    #[test]
    fn test_validate_flags_rematching_rules() {
        let rules = substring_rules(&[("fpm", "fpm2")]);
        assert_eq!(rules.validate(), 1);
    }

    #[test]
    fn test_compound_identifier_variants() {
        let rules = RuleSet::for_identifiers("old-tool", "new-tool");
        let compiled = rules.compile().unwrap();

        assert_eq!(
            compiled.resolve_name(NodeKind::File, "OldTool.java"),
            Some("NewTool.java".to_string())
        );
        assert_eq!(
            compiled.resolve_name(NodeKind::File, "OLD_TOOL_CONFIG"),
            Some("NEW_TOOL_CONFIG".to_string())
        );
        assert_eq!(
            compiled.resolve_name(NodeKind::Directory, "old_tool"),
            Some("new_tool".to_string())
        );
    }
}
