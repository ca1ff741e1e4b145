//! `zkparams status` – show the on-disk state of each file.

use anyhow::Result;
use zkparams_core::state::{self, DownloadState};
use zkparams_core::{ParamsEngine, ParamsEvent};

use super::Target;

pub fn run_status(target: &Target, deep: bool) -> Result<()> {
    println!("directory: {}", target.dest_dir.display());
    if target.manifest.is_empty() {
        println!("Manifest is empty.");
        return Ok(());
    }

    let rows: Vec<(String, String)> = if deep {
        let engine = ParamsEngine::new(target.manifest.clone(), &target.dest_dir, |_: ParamsEvent| {});
        engine
            .classify_all()
            .into_iter()
            .map(|(name, res)| {
                let state = match res {
                    Ok(DownloadState::Present) => "corrupt".to_string(),
                    Ok(s) => s.to_string(),
                    Err(e) => format!("error: {}", e),
                };
                (name, state)
            })
            .collect()
    } else {
        target
            .manifest
            .iter()
            .map(|e| {
                let s = state::classify(e, &target.dest_dir);
                (e.name().to_string(), s.to_string())
            })
            .collect()
    };

    println!("{:<28} {}", "NAME", "STATE");
    for (name, state) in rows {
        println!("{:<28} {}", name, state);
    }
    Ok(())
}
