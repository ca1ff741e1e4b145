//! CLI command handlers, one file per command.

mod checksum;
mod completions;
mod run;
mod status;

pub use checksum::run_checksum;
pub use completions::{run_completions, run_man};
pub use run::run_params;
pub use status::run_status;

use std::path::PathBuf;
use zkparams_core::config::ParamsConfig;
use zkparams_core::Manifest;

/// What a parameter command operates on, after config and flags are merged.
#[derive(Debug)]
pub struct Target {
    pub cfg: ParamsConfig,
    pub manifest: Manifest,
    pub dest_dir: PathBuf,
}
