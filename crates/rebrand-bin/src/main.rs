mod cli;
mod diff;

use anyhow::Result;
use cli::Cli;
use rebrand_core::{MigrateOptions, MigrationReport, RuleSet};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    setup_logging(&cli)?;

    info!("Starting rebrand");

    let mut rules = match (&cli.from, &cli.to) {
        (Some(from), Some(to)) => {
            info!("Identifier migration: '{}' -> '{}'", from, to);
            RuleSet::for_identifiers(from, to)
        }
        _ => RuleSet::default(),
    };
    rules.ignored.extend(cli.ignore.iter().cloned());

    let options = MigrateOptions {
        process_paths: !cli.no_rename,
        process_contents: !cli.no_contents,
        dry_run: cli.dry_run,
    };

    info!("Root directory: {:?}", cli.root);
    info!("Path migration: {}", options.process_paths);
    info!("Contents migration: {}", options.process_contents);
    info!("Interactive mode: {}", cli.interactive);

    if cli.dry_run {
        warn!("Dry run mode - no changes will be made");
    }

    let report = if cli.interactive {
        let content_callback = |file_path: &std::path::Path, old_content: &str, new_content: &str| {
            diff::show_diff_and_confirm(file_path, old_content, new_content)
        };

        let path_callback = |old_path: &std::path::Path, new_path: &std::path::Path, kind| {
            diff::show_rename_and_confirm(old_path, new_path, kind)
        };

        rebrand_core::migrate_interactive(&cli.root, &rules, &options, content_callback, path_callback)?
    } else {
        rebrand_core::migrate(&cli.root, &rules, &options)?
    };

    print_report(&report);

    info!("Rebrand completed");
    Ok(())
}

fn print_report(report: &MigrationReport) {
    for entry in report.entries() {
        println!("{}", entry);
    }

    if report.is_dry_run() {
        println!("Migration dry run complete!");
    } else {
        println!("Migration complete!");
    }
    println!("  Entries visited: {}", report.entries_visited());
    println!("  Paths renamed: {}", report.paths_renamed());
    println!("  Content changes: {}", report.content_changes());
    println!("  Skipped: {} ({} conflicts)", report.skipped(), report.conflicts());
    println!("  Failed: {}", report.failed());
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact()
        )
        .with(filter)
        .init();

    Ok(())
}
