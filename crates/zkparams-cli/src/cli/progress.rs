//! Line-oriented progress output for engine events.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use zkparams_core::{EventSink, ParamsEvent};

/// Prints one line per percentage change, plus the terminal line per entry.
pub struct ProgressPrinter<W> {
    inner: Mutex<Inner<W>>,
}

struct Inner<W> {
    out: W,
    last: HashMap<String, u8>,
}

impl<W: Write + Send> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        ProgressPrinter {
            inner: Mutex::new(Inner {
                out,
                last: HashMap::new(),
            }),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        match self.inner.into_inner() {
            Ok(inner) => inner.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }
}

impl<W: Write + Send> EventSink for ProgressPrinter<W> {
    fn emit(&self, event: ParamsEvent) {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Inner { out, last } = &mut *guard;
        let _ = match &event {
            ParamsEvent::Progress { name, percent } => {
                if last.get(name) == Some(percent) {
                    return;
                }
                last.insert(name.clone(), *percent);
                writeln!(out, "{}: {}%", name, percent)
            }
            ParamsEvent::Verified { name } => {
                last.remove(name);
                writeln!(out, "{}: ok", name)
            }
            ParamsEvent::Failed {
                name,
                kind,
                message,
            } => {
                last.remove(name);
                writeln!(out, "{}: FAILED ({}) {}", name, kind, message)
            }
        };
        let _ = out.flush();
    }
}
