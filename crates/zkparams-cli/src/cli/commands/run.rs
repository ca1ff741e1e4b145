//! `zkparams check|fetch|verify|auto` – run the engine over the manifest.

use anyhow::{Context, Result};
use std::io;
use zkparams_core::{Fetcher, ParamsEngine, RunMode, RunReport};

use super::Target;
use crate::cli::progress::ProgressPrinter;

/// Run `mode` to completion. Ctrl-C cancels in-flight transfers and reports
/// the remaining entries as cancelled. Returns whether every entry verified.
pub async fn run_params(target: Target, mode: RunMode) -> Result<bool> {
    let Target {
        cfg,
        manifest,
        dest_dir,
    } = target;
    println!("{} parameter file(s) in {}", manifest.len(), dest_dir.display());

    let engine = ParamsEngine::new(manifest, &dest_dir, ProgressPrinter::new(io::stdout()))
        .with_fetcher(Fetcher::new(cfg.fetch_options()))
        .with_max_parallel(cfg.max_parallel);
    let abort = engine.abort_token();

    let mut task = tokio::task::spawn_blocking(move || engine.run(mode));
    let joined = tokio::select! {
        res = &mut task => res,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted, stopping...");
            tracing::warn!("interrupted by user, aborting run");
            abort.abort();
            task.await
        }
    };
    let report = joined.context("engine task failed")??;

    print_summary(&report);
    Ok(report.is_success())
}

fn print_summary(report: &RunReport) {
    let failed: Vec<_> = report.failures().collect();
    println!(
        "{} verified ({} downloaded), {} failed",
        report.verified_count(),
        report.fetched_count(),
        failed.len()
    );
    for (name, err) in failed {
        eprintln!("  {}: {}", name, err);
    }
}
