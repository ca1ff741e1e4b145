//! In-memory transport and manifest helpers for unit tests.

use crate::checksum;
use crate::control::AbortToken;
use crate::error::ParamsError;
use crate::fetcher::{BodySink, FetchOptions, Fetcher, Transport};
use crate::manifest::ManifestEntry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub(crate) const BASE: &str = "https://params.test/";

/// What the transport serves for one URL.
#[derive(Clone, Default)]
pub(crate) struct Served {
    pub body: Vec<u8>,
    /// Declared `Content-Length`; `None` means chunked/unknown.
    pub declared: Option<u64>,
    /// Empty reads delivered before the body.
    pub empty_chunks: usize,
    /// Trip this token after handing over this many blocks.
    pub trip_after: Option<(usize, AbortToken)>,
    /// Sleep before every block.
    pub block_delay: Option<Duration>,
}

impl Served {
    pub fn body(body: &[u8]) -> Self {
        Served {
            body: body.to_vec(),
            declared: Some(body.len() as u64),
            ..Served::default()
        }
    }
}

/// Serves registered bodies in fixed-size blocks; anything else is a 404.
pub(crate) struct MemoryTransport {
    served: Mutex<HashMap<String, Served>>,
    requests: Mutex<Vec<String>>,
    block: usize,
}

impl MemoryTransport {
    pub fn new(block: usize) -> Self {
        MemoryTransport {
            served: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            block,
        }
    }

    pub fn serve(&self, url: &str, served: Served) {
        self.served.lock().unwrap().insert(url.to_string(), served);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MemoryTransport {
    fn get(&self, url: &Url, sink: &mut dyn BodySink) -> Result<(), ParamsError> {
        self.requests.lock().unwrap().push(url.to_string());
        let served = self.served.lock().unwrap().get(url.as_str()).cloned();
        let Some(served) = served else {
            return Err(ParamsError::HttpStatus {
                url: url.to_string(),
                code: 404,
            });
        };
        let broken = || ParamsError::Transport {
            url: url.to_string(),
            message: "write callback aborted".into(),
        };

        sink.on_headers(served.declared);
        for _ in 0..served.empty_chunks {
            if sink.on_chunk(&[]).is_break() {
                return Err(broken());
            }
        }
        for (i, block) in served.body.chunks(self.block).enumerate() {
            if let Some(d) = served.block_delay {
                std::thread::sleep(d);
            }
            if let Some((n, token)) = &served.trip_after {
                if i == *n {
                    token.abort();
                }
            }
            if sink.on_chunk(block).is_break() {
                return Err(broken());
            }
        }
        Ok(())
    }
}

/// Entry named `name` whose manifest digest is that of `expected`.
pub(crate) fn entry(name: &str, expected: &[u8]) -> ManifestEntry {
    ManifestEntry::under_base(
        name,
        checksum::sha256_hex(expected).parse().unwrap(),
        BASE,
    )
    .unwrap()
}

pub(crate) fn url_of(name: &str) -> String {
    format!("{}{}", BASE, name)
}

pub(crate) fn fetcher(transport: &Arc<MemoryTransport>) -> Fetcher {
    Fetcher::with_transport(transport.clone(), FetchOptions::default())
}
