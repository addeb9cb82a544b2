use std::fs;
use std::process;

use anyhow::Result;
use clap::{ArgMatches, Command};

const BIN_NAME: &str = "rebrand";

fn main() -> Result<()> {
    let args = clap::command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("install").about("Install rebrand binary locally"))
        .subcommand(
            Command::new("run")
                .about("Build and run rebrand with arguments")
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .arg(clap::Arg::new("args")
                    .help("Arguments to pass to rebrand")
                    .action(clap::ArgAction::Append)
                    .num_args(0..))
        )
        .subcommand(
            Command::new("test")
                .about("Test Operations")
                .subcommand(Command::new("all").about("Run all tests for the entire project"))
                .subcommand(Command::new("core").about("Run tests for rebrand-core"))
                .subcommand(Command::new("bin").about("Run tests for rebrand-bin"))
                .subcommand(Command::new("integration").about("Run a CLI smoke test"))
        )
        .get_matches();

    match args.subcommand() {
        Some(("install", args)) => handle_install_command(args),
        Some(("run", args)) => handle_run_command(args),
        Some(("test", args)) => handle_test_commands(args),
        Some((command, _)) => anyhow::bail!("Unexpected command: {command}"),
        None => anyhow::bail!("Expected subcommand"),
    }
}

fn handle_install_command(_args: &ArgMatches) -> Result<()> {
    println!("Installing rebrand...");
    let status = process::Command::new("cargo")
        .args(["install", "--path", "crates/rebrand-bin"])
        .status()?;

    if status.success() {
        println!("✓ rebrand installed successfully");
    } else {
        anyhow::bail!("Failed to install rebrand");
    }

    Ok(())
}

fn handle_run_command(args: &ArgMatches) -> Result<()> {
    println!("Building and running rebrand...");

    let run_args: Vec<String> = args.get_many::<String>("args")
        .map_or(Vec::new(), |vals| vals.cloned().collect());

    let status = process::Command::new("cargo")
        .args(["run", "--bin", BIN_NAME, "--"])
        .args(&run_args)
        .status()?;

    if !status.success() {
        anyhow::bail!("Failed to run rebrand");
    }

    Ok(())
}

fn handle_test_commands(args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("all", _args)) => test_all(),
        Some(("core", _args)) => cargo(&["test", "--package", "rebrand-core"], "Core tests failed"),
        Some(("bin", _args)) => cargo(&["test", "--package", "rebrand-bin"], "Binary tests failed"),
        Some(("integration", _args)) => test_integration(),
        _ => {
            println!("Available test commands:");
            println!("  all          - Run all tests for the entire project");
            println!("  core         - Run tests for rebrand-core");
            println!("  bin          - Run tests for rebrand-bin");
            println!("  integration  - Run a CLI smoke test");
            Ok(())
        }
    }
}

fn test_all() -> Result<()> {
    println!("🧪 Running all tests for the rebrand project...\n");

    let steps: [(&str, fn() -> Result<()>); 4] = [
        ("📚 rebrand-core", || cargo(&["test", "--package", "rebrand-core"], "Core tests failed")),
        ("🔧 rebrand-bin", || cargo(&["test", "--package", "rebrand-bin"], "Binary tests failed")),
        ("📖 documentation", || cargo(&["test", "--doc", "--package", "rebrand-core"], "Documentation tests failed")),
        ("🔗 CLI smoke test", test_integration),
    ];

    let mut all_passed = true;
    for (name, step) in steps {
        println!("Running {}...", name);
        match step() {
            Ok(()) => println!("✅ {} passed", name),
            Err(e) => {
                all_passed = false;
                println!("❌ {} failed: {:?}", name, e);
            }
        }
        println!();
    }

    if all_passed {
        println!("🎉 All tests passed successfully!");
    } else {
        println!("💥 Some tests failed. Please check the output above.");
        anyhow::bail!("Test suite failed");
    }

    Ok(())
}

fn cargo(args: &[&str], failure: &str) -> Result<()> {
    let status = process::Command::new("cargo").args(args).status()?;

    if !status.success() {
        anyhow::bail!("{}", failure);
    }
    Ok(())
}

fn test_integration() -> Result<()> {
    cargo(&["build", "--bin", BIN_NAME], "Failed to build rebrand binary")?;
    cargo(&["run", "--bin", BIN_NAME, "--", "--help"], "CLI help command failed")?;
    cargo(&["run", "--bin", BIN_NAME, "--", "--version"], "CLI version command failed")?;

    // Dry run over a scratch package; nothing on disk may change.
    let scratch = std::env::temp_dir().join("rebrand-xtask-smoke");
    if scratch.exists() {
        fs::remove_dir_all(&scratch)?;
    }
    fs::create_dir_all(scratch.join("FPM"))?;
    fs::write(scratch.join("FPM").join("index.ftd"), "-- import: fpm")?;

    let scratch_arg = scratch.to_string_lossy().to_string();
    cargo(
        &["run", "--bin", BIN_NAME, "--", "--dry-run", &scratch_arg],
        "CLI dry run failed",
    )?;

    if fs::read_to_string(scratch.join("FPM").join("index.ftd"))? != "-- import: fpm" {
        anyhow::bail!("Dry run modified the scratch package");
    }

    // A failed entry is reported, not fatal: the run still exits 0.
    fs::write(scratch.join("broken.ftd"), [0xff, 0xfe, 0xfd])?;
    cargo(
        &["run", "--bin", BIN_NAME, "--", &scratch_arg],
        "CLI run with a failing entry exited non-zero",
    )?;
    if !scratch.join("FASTN").join("index.ftd").is_file() {
        anyhow::bail!("Run with a failing entry did not migrate the rest of the package");
    }

    // A missing root must exit non-zero.
    let missing_arg = scratch.join("missing").to_string_lossy().to_string();
    let status = process::Command::new("cargo")
        .args(["run", "--bin", BIN_NAME, "--", missing_arg.as_str()])
        .status()?;
    if status.success() {
        anyhow::bail!("CLI exited 0 for a missing root");
    }

    fs::remove_dir_all(&scratch)?;

    Ok(())
}
