//! Bounded worker pool over manifest entries.
//!
//! Workers pop entry indices from a shared queue and send `(index, outcome)`
//! back over a channel; outcomes are slotted back into manifest order. A
//! panicking entry is caught and reported as `WorkerPanicked` so the
//! collector always receives one outcome per entry.

use super::job::Context;
use super::report::{EntryOutcome, EntryReport};
use crate::error::ParamsError;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

pub(super) fn run_entries(ctx: Arc<Context>, max_parallel: usize) -> Vec<EntryReport> {
    let count = ctx.manifest.len();
    let workers = max_parallel.max(1).min(count);
    let mut outcomes: Vec<Option<EntryOutcome>> = (0..count).map(|_| None).collect();

    if workers <= 1 {
        for (index, slot) in outcomes.iter_mut().enumerate() {
            *slot = Some(run_one(&ctx, index));
        }
    } else {
        let work: Arc<Mutex<VecDeque<usize>>> = Arc::new(Mutex::new((0..count).collect()));
        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let work = Arc::clone(&work);
            let tx = tx.clone();
            let ctx = Arc::clone(&ctx);
            handles.push(std::thread::spawn(move || loop {
                let next = work
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(index) = next else { break };
                let _ = tx.send((index, run_one(&ctx, index)));
            }));
        }
        drop(tx);

        for (index, outcome) in rx {
            if let Some(slot) = outcomes.get_mut(index) {
                *slot = Some(outcome);
            }
        }
        for h in handles {
            if h.join().is_err() {
                tracing::error!("parameter worker thread exited abnormally");
            }
        }
    }

    ctx.manifest
        .iter()
        .zip(outcomes)
        .map(|(entry, outcome)| {
            let outcome = outcome.unwrap_or_else(|| {
                let e = ParamsError::WorkerPanicked {
                    name: entry.name().to_string(),
                };
                ctx.report_failure(entry.name(), &e);
                EntryOutcome::Failed(e)
            });
            EntryReport {
                name: entry.name().to_string(),
                outcome,
            }
        })
        .collect()
}

fn run_one(ctx: &Context, index: usize) -> EntryOutcome {
    let Some(entry) = ctx.manifest.at(index) else {
        return EntryOutcome::Failed(ParamsError::WorkerPanicked {
            name: format!("#{}", index),
        });
    };
    match panic::catch_unwind(AssertUnwindSafe(|| ctx.process(entry))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            tracing::error!(entry = entry.name(), "worker panicked: {}", msg);
            let e = ParamsError::WorkerPanicked {
                name: entry.name().to_string(),
            };
            ctx.report_failure(entry.name(), &e);
            EntryOutcome::Failed(e)
        }
    }
}
