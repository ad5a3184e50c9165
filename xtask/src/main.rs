use anyhow::{Context, Result};
use cargo_metadata::MetadataCommand;
use clap::{Parser, Subcommand};
use std::env::consts::EXE_SUFFIX;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const BINARY: &str = "foldermark";
const VAULT_DIR: &str = ".foldermark";

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Build foldermark and copy it, with default settings, into a vault
    Install {
        /// Vault root receiving the build under .foldermark/
        #[arg(long, env = "FOLDERMARK_VAULT_PATH")]
        vault: PathBuf,
        /// Install a debug build
        #[arg(long)]
        debug: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Install { vault, debug } => install(&vault, debug)?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo nextest run failed");
    }
    Ok(())
}

fn install(vault: &Path, debug: bool) -> Result<()> {
    if !vault.is_dir() {
        anyhow::bail!("vault directory not found: {}", vault.display());
    }

    let metadata = MetadataCommand::new()
        .no_deps()
        .exec()
        .context("failed to read cargo metadata")?;

    let mut cmd = Command::new("cargo");
    cmd.arg("build").arg("-p").arg(BINARY);
    if !debug {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo build failed");
    }

    let profile = if debug { "debug" } else { "release" };
    let binary = format!("{BINARY}{EXE_SUFFIX}");
    let built = metadata
        .target_directory
        .as_std_path()
        .join(profile)
        .join(&binary);
    let dest_dir = vault.join(VAULT_DIR);
    fs::create_dir_all(dest_dir.join("bin"))
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;

    let dest = dest_dir.join("bin").join(&binary);
    fs::copy(&built, &dest)
        .with_context(|| format!("failed to copy {} to {}", built.display(), dest.display()))?;
    println!("Copied {binary} to {}", dest.display());

    let settings = dest_dir.join("settings.toml");
    if settings.exists() {
        println!("Kept existing {}", settings.display());
    } else {
        let defaults = metadata
            .workspace_root
            .as_std_path()
            .join("crates/foldermark/assets/default-settings.toml");
        fs::copy(&defaults, &settings)
            .with_context(|| format!("failed to copy default settings to {}", settings.display()))?;
        println!("Copied default settings to {}", settings.display());
    }
    Ok(())
}
