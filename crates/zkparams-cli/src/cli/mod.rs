//! CLI for zkparams.

mod commands;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zkparams_core::config::{self, ParamsConfig};
use zkparams_core::RunMode;

use commands::{run_checksum, run_completions, run_man, run_params, run_status, Target};

/// Top-level CLI for zkparams.
#[derive(Debug, Parser)]
#[command(name = "zkparams", version)]
#[command(about = "Fetch and verify zkSNARK parameter files", long_about = None)]
pub struct Cli {
    /// Parameter directory (default: `dest_dir` from config, else the per-OS location).
    #[arg(long, global = true, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Process up to N files concurrently (default: `max_parallel` from config).
    #[arg(long, short = 'j', global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// TOML manifest to use instead of the built-in Sapling table.
    #[arg(long, global = true, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Verify files that exist and download the ones that do not.
    Check,

    /// Download and verify every file, replacing whatever is on disk.
    Fetch,

    /// Verify files in place; never touches the network.
    Verify,

    /// Fetch into a fresh directory, otherwise check.
    Auto,

    /// Show the on-disk state of each file.
    Status {
        /// Hash present files to tell verified from corrupt.
        #[arg(long)]
        deep: bool,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,

        /// Fail unless the digest equals this hex string.
        #[arg(long, value_name = "HEX")]
        expect: Option<String>,
    },

    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff).
    Man,
}

impl Cli {
    /// Config file merged with command-line overrides.
    fn target(&self, mut cfg: ParamsConfig) -> Result<Target> {
        if let Some(dir) = &self.dest {
            cfg.dest_dir = Some(dir.clone());
        }
        if let Some(path) = &self.manifest {
            cfg.manifest_path = Some(path.clone());
        }
        if let Some(n) = self.jobs {
            cfg.max_parallel = n;
        }
        Ok(Target {
            manifest: cfg.load_manifest()?,
            dest_dir: cfg.resolve_dest_dir()?,
            cfg,
        })
    }
}

impl CliCommand {
    /// Returns `Ok(false)` when the command ran but something failed verification.
    pub async fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();

        match &cli.command {
            CliCommand::Check => run_params(cli.target(load_config()?)?, RunMode::Check).await,
            CliCommand::Fetch => run_params(cli.target(load_config()?)?, RunMode::Fetch).await,
            CliCommand::Verify => run_params(cli.target(load_config()?)?, RunMode::Verify).await,
            CliCommand::Auto => run_params(cli.target(load_config()?)?, RunMode::Auto).await,
            CliCommand::Status { deep } => {
                run_status(&cli.target(load_config()?)?, *deep)?;
                Ok(true)
            }
            CliCommand::Checksum { path, expect } => run_checksum(path, expect.as_deref()).await,
            CliCommand::Completions { shell } => {
                run_completions(*shell);
                Ok(true)
            }
            CliCommand::Man => {
                run_man()?;
                Ok(true)
            }
        }
    }
}

fn load_config() -> Result<ParamsConfig> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
