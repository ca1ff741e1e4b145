//! `zkparams checksum` – compute SHA-256 of a file.

use anyhow::{Context, Result};
use std::path::Path;
use zkparams_core::checksum::{self, Sha256Digest};

/// Print SHA-256 of `path`; with `expect`, report whether it matches.
pub async fn run_checksum(path: &Path, expect: Option<&str>) -> Result<bool> {
    let expected: Option<Sha256Digest> = expect
        .map(|hex| hex.parse::<Sha256Digest>().context("--expect"))
        .transpose()?;
    let digest =
        checksum::sha256_path(path).with_context(|| format!("read {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    match expected {
        Some(want) if !want.matches(&digest) => {
            eprintln!("{}: SHA-256 does not match {}", path.display(), want);
            Ok(false)
        }
        _ => Ok(true),
    }
}
