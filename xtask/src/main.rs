//! Development tasks for prover-watch
//!
//! ```bash
//! cargo xtask build [--release]
//! cargo xtask test
//! cargo xtask lint
//! cargo xtask ci
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xshell::{cmd, Shell};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tasks for prover-watch")]
struct Cli {
    #[command(subcommand)]
    task: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Build the supervisor binary
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Run the workspace tests
    Test,
    /// Check formatting and run clippy with warnings denied
    Lint,
    /// Lint, test, then a release build
    Ci,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.task {
        Task::Build { release } => build(&sh, release),
        Task::Test => test(&sh),
        Task::Lint => lint(&sh),
        Task::Ci => {
            lint(&sh)?;
            test(&sh)?;
            build(&sh, true)
        }
    }
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new(env!("CARGO"))
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("cargo locate-project failed")?;

    let manifest = PathBuf::from(String::from_utf8(output.stdout)?.trim());
    manifest
        .parent()
        .map(PathBuf::from)
        .context("workspace manifest has no parent directory")
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    let profile: &[&str] = if release { &["--release"] } else { &[] };
    cmd!(sh, "cargo build --bin prover-watch {profile...}").run()?;
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo test --workspace").run()?;
    Ok(())
}

fn lint(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    Ok(())
}
