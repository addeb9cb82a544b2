use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rebrand")]
#[command(version)]
#[command(about = "Migrate a project tree from the FPM identifier to FASTN")]
#[command(long_about = "Walks a directory tree and rewrites an old project identifier to a new one across directory names, file names and the contents of .ftd files and deploy.yml workflows. Safe to run again: an already migrated tree is left untouched.")]
pub struct Cli {
    #[arg(help = "Root directory to migrate")]
    pub root: PathBuf,

    #[arg(long, help = "Report what would change without touching the tree")]
    pub dry_run: bool,

    #[arg(short, long, help = "Interactive mode - prompt for each change")]
    pub interactive: bool,

    #[arg(long, requires = "to", help = "Old identifier (defaults to 'fpm'); case variants are derived")]
    pub from: Option<String>,

    #[arg(long, requires = "from", help = "New identifier (defaults to 'fastn'); case variants are derived")]
    pub to: Option<String>,

    #[arg(long = "ignore", value_name = "NAME", help = "Entry name never visited, in addition to .git")]
    pub ignore: Vec<String>,

    #[arg(long, conflicts_with = "no_contents", help = "Leave names alone, rewrite contents only")]
    pub no_rename: bool,

    #[arg(long, help = "Rename only, never open files")]
    pub no_contents: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_root_only() {
        let cli = Cli::try_parse_from(["rebrand", "/path/to/package"]).unwrap();

        assert_eq!(cli.root, PathBuf::from("/path/to/package"));
        assert!(!cli.dry_run);
        assert!(!cli.interactive);
        assert!(cli.from.is_none());
        assert!(cli.ignore.is_empty());
    }

    #[test]
    fn test_root_is_required() {
        assert!(Cli::try_parse_from(["rebrand"]).is_err());
    }

    #[test]
    fn test_all_options() {
        let args = vec![
            "rebrand",
            "site",
            "--dry-run",
            "--interactive",
            "--from",
            "old-tool",
            "--to",
            "new-tool",
            "--ignore",
            "target",
            "--ignore",
            "node_modules",
            "--no-contents",
        ];

        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.root, PathBuf::from("site"));
        assert!(cli.dry_run);
        assert!(cli.interactive);
        assert_eq!(cli.from.as_deref(), Some("old-tool"));
        assert_eq!(cli.to.as_deref(), Some("new-tool"));
        assert_eq!(cli.ignore, vec!["target".to_string(), "node_modules".to_string()]);
        assert!(cli.no_contents);
        assert!(!cli.no_rename);
    }

    #[test]
    fn test_from_requires_to() {
        assert!(Cli::try_parse_from(["rebrand", "site", "--from", "fpm"]).is_err());
    }

    #[test]
    fn test_no_rename_conflicts_with_no_contents() {
        assert!(Cli::try_parse_from(["rebrand", "site", "--no-rename", "--no-contents"]).is_err());
    }
}
