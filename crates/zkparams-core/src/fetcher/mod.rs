//! Retrieval of one manifest entry into its `.dl` temp path.
//!
//! The fetcher opens and locks the temp file, streams the response body into
//! it block by block and reports `floor(written * 100 / total)` after every
//! block. It does not look at the content: integrity is the verifier's job,
//! and a body shorter or longer than the declared length is reported back as
//! a `FetchResult` whose counts disagree.

mod curl_transport;
mod transport;

pub use curl_transport::CurlTransport;
pub use transport::{BodySink, Transport};

use crate::control::AbortToken;
use crate::error::ParamsError;
use crate::events;
use crate::manifest::ManifestEntry;
use crate::storage::TempFileWriter;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Smallest transport buffer accepted; also the reference progress granularity.
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Network and streaming knobs. Built from `ParamsConfig::fetch_options`.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Transport receive buffer, i.e. the largest block handed to the writer.
    pub buffer_size: usize,
    pub connect_timeout: Duration,
    /// Abort if throughput stays below this many bytes/sec for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard cap on one transfer.
    pub timeout: Duration,
    /// Consecutive empty blocks tolerated before the fetch fails.
    pub max_empty_chunks: u32,
    /// Accept `http://` locators (local mirrors, tests).
    pub allow_plain_http: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            buffer_size: 16 * 1024,
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
            max_empty_chunks: 64,
            allow_plain_http: false,
        }
    }
}

/// Byte counts of a finished transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchResult {
    pub bytes_written: u64,
    /// Declared `Content-Length`, if the server sent one.
    pub total_bytes: Option<u64>,
}

impl FetchResult {
    /// True unless the server declared a length the body did not match.
    pub fn is_complete(&self) -> bool {
        self.total_bytes.map_or(true, |t| t == self.bytes_written)
    }
}

/// A finished transfer whose temp file is still locked.
#[derive(Debug)]
pub struct Download {
    pub result: FetchResult,
    writer: TempFileWriter,
}

impl Download {
    pub fn into_writer(self) -> TempFileWriter {
        self.writer
    }
}

/// Streams manifest entries to disk through a shared [`Transport`].
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    opts: FetchOptions,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").field("opts", &self.opts).finish()
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Fetcher::new(FetchOptions::default())
    }
}

impl Fetcher {
    /// Fetcher over libcurl.
    pub fn new(mut opts: FetchOptions) -> Self {
        opts.buffer_size = opts.buffer_size.max(MIN_BUFFER_SIZE);
        Fetcher {
            transport: Arc::new(CurlTransport::new(opts.clone())),
            opts,
        }
    }

    /// Fetcher over a caller-supplied transport.
    pub fn with_transport(transport: Arc<dyn Transport>, opts: FetchOptions) -> Self {
        Fetcher { transport, opts }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    /// Download `entry` into `temp_path`, overwriting whatever is there.
    ///
    /// `on_progress` receives the percentage after each block. The lock on
    /// `temp_path` is held until this returns, on every path. When `abort`
    /// trips, the transfer stops at the next block and the partial file is
    /// left in place.
    pub fn fetch(
        &self,
        entry: &ManifestEntry,
        temp_path: &Path,
        abort: &AbortToken,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<FetchResult, ParamsError> {
        self.fetch_locked(entry, temp_path, abort, on_progress)
            .map(|d| d.result)
    }

    /// Like [`Fetcher::fetch`], but a successful transfer keeps the temp file
    /// locked in the returned [`Download`] so it can be hashed and promoted
    /// before anyone else opens it.
    pub fn fetch_locked(
        &self,
        entry: &ManifestEntry,
        temp_path: &Path,
        abort: &AbortToken,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<Download, ParamsError> {
        let url = entry.locator();
        match url.scheme() {
            "https" => {}
            "http" if self.opts.allow_plain_http => {}
            _ => {
                return Err(ParamsError::UnsupportedScheme {
                    url: url.to_string(),
                })
            }
        }
        if abort.is_aborted() {
            return Err(ParamsError::Cancelled {
                name: entry.name().to_string(),
            });
        }

        tracing::info!(entry = entry.name(), "retrieving: {}", url);
        let writer = TempFileWriter::create(temp_path)?;
        tracing::info!(entry = entry.name(), "saving to: {}", temp_path.display());

        let mut sink = StreamSink {
            name: entry.name(),
            url: url.as_str(),
            writer,
            total: None,
            empty_run: 0,
            max_empty_chunks: self.opts.max_empty_chunks,
            abort,
            on_progress,
            failure: None,
        };
        let transfer = self.transport.get(url, &mut sink);
        if let Some(reason) = sink.failure.take() {
            return Err(reason);
        }
        transfer?;
        sink.finish()
    }
}

/// Glue between a transport and the locked temp file.
struct StreamSink<'a> {
    name: &'a str,
    url: &'a str,
    writer: TempFileWriter,
    total: Option<u64>,
    empty_run: u32,
    max_empty_chunks: u32,
    abort: &'a AbortToken,
    on_progress: &'a mut dyn FnMut(u8),
    /// Why we broke the transfer, if we did.
    failure: Option<ParamsError>,
}

impl BodySink for StreamSink<'_> {
    fn on_headers(&mut self, content_length: Option<u64>) {
        self.total = content_length;
        match content_length {
            Some(n) => tracing::info!(entry = self.name, "length: {} bytes", n),
            None => tracing::info!(entry = self.name, "length: unspecified"),
        }
    }

    fn on_chunk(&mut self, data: &[u8]) -> ControlFlow<()> {
        if self.abort.is_aborted() {
            self.failure = Some(ParamsError::Cancelled {
                name: self.name.to_string(),
            });
            return ControlFlow::Break(());
        }
        if data.is_empty() {
            self.empty_run += 1;
            tracing::warn!(entry = self.name, "received response that was not content data");
            if self.empty_run > self.max_empty_chunks {
                self.failure = Some(ParamsError::TooManyEmptyChunks {
                    url: self.url.to_string(),
                    count: self.empty_run,
                });
                return ControlFlow::Break(());
            }
            return ControlFlow::Continue(());
        }
        self.empty_run = 0;
        if let Err(e) = self.writer.write_chunk(data) {
            self.failure = Some(e);
            return ControlFlow::Break(());
        }
        if let Some(p) = events::percent(self.writer.written(), self.total) {
            (self.on_progress)(p);
        }
        ControlFlow::Continue(())
    }
}

impl StreamSink<'_> {
    /// Sync to disk and report the counts; the writer keeps its lock.
    fn finish(mut self) -> Result<Download, ParamsError> {
        self.writer.sync()?;
        let bytes_written = self.writer.written();
        if self.total.map_or(true, |t| t == 0) {
            // No percentages were computable mid-stream.
            (self.on_progress)(100);
        }
        match self.total {
            Some(t) => tracing::info!(
                entry = self.name,
                "'{}' saved [{}/{}]",
                self.name,
                bytes_written,
                t
            ),
            None => tracing::info!(entry = self.name, "'{}' saved [{}]", self.name, bytes_written),
        }
        Ok(Download {
            result: FetchResult {
                bytes_written,
                total_bytes: self.total,
            },
            writer: self.writer,
        })
    }
}
