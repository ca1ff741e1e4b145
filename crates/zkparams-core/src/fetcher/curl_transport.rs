//! libcurl-backed transport.
//!
//! Follows redirects; only the last hop's status line and `Content-Length`
//! count. Uses a low-speed limit instead of relying on the hard timeout so
//! large files on slow links are not killed while still making progress.

use super::transport::{BodySink, Transport};
use super::FetchOptions;
use crate::error::ParamsError;
use std::cell::Cell;
use std::ops::ControlFlow;
use std::str;
use url::Url;

/// Production transport.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    opts: FetchOptions,
}

impl CurlTransport {
    pub fn new(opts: FetchOptions) -> Self {
        CurlTransport { opts }
    }
}

impl Transport for CurlTransport {
    fn get(&self, url: &Url, sink: &mut dyn BodySink) -> Result<(), ParamsError> {
        let curl_err = |e: curl::Error| ParamsError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).map_err(curl_err)?;
        easy.get(true).map_err(curl_err)?;
        easy.follow_location(true).map_err(curl_err)?;
        easy.max_redirections(10).map_err(curl_err)?;
        easy.buffer_size(self.opts.buffer_size).map_err(curl_err)?;
        easy.connect_timeout(self.opts.connect_timeout)
            .map_err(curl_err)?;
        easy.low_speed_limit(self.opts.low_speed_limit)
            .map_err(curl_err)?;
        easy.low_speed_time(self.opts.low_speed_time)
            .map_err(curl_err)?;
        easy.timeout(self.opts.timeout).map_err(curl_err)?;

        // Reset on every status line so redirect hops do not leak into the final response.
        let status: Cell<Option<u32>> = Cell::new(None);
        let content_length: Cell<Option<u64>> = Cell::new(None);
        let announced = Cell::new(false);

        let perform_result = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(line) = str::from_utf8(data) {
                        match parse_header_line(line) {
                            HeaderLine::Status(code) => {
                                status.set(Some(code));
                                content_length.set(None);
                            }
                            HeaderLine::ContentLength(n) => content_length.set(Some(n)),
                            HeaderLine::Other => {}
                        }
                    }
                    true
                })
                .map_err(curl_err)?;
            transfer
                .write_function(|data| {
                    if !status.get().map_or(false, is_success) {
                        // Error page body; dropped.
                        return Ok(data.len());
                    }
                    if !announced.get() {
                        sink.on_headers(content_length.get());
                        announced.set(true);
                    }
                    match sink.on_chunk(data) {
                        ControlFlow::Continue(()) => Ok(data.len()),
                        // Returning fewer bytes than handed in makes curl abort with a write error.
                        ControlFlow::Break(()) => Ok(0),
                    }
                })
                .map_err(curl_err)?;
            transfer.perform()
        };
        match perform_result {
            Ok(()) => {}
            // Body ended before the declared length; the fetcher reports the byte counts.
            Err(e) if e.is_partial_file() && announced.get() => {
                tracing::warn!(url = %url, "{}", e);
            }
            Err(e) => return Err(curl_err(e)),
        }

        let code = easy.response_code().map_err(curl_err)?;
        if !is_success(code) {
            return Err(ParamsError::HttpStatus {
                url: url.to_string(),
                code,
            });
        }
        if !announced.get() {
            // Empty body: the write callback never ran.
            sink.on_headers(content_length.get());
        }
        Ok(())
    }
}

fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}

#[derive(Debug, PartialEq, Eq)]
enum HeaderLine {
    Status(u32),
    ContentLength(u64),
    Other,
}

/// Classify one raw header line as delivered by libcurl (CRLF included).
fn parse_header_line(line: &str) -> HeaderLine {
    let line = line.trim();
    if line.get(..5).map_or(false, |p| p.eq_ignore_ascii_case("http/")) {
        return line
            .split_whitespace()
            .nth(1)
            .and_then(|c| c.parse::<u32>().ok())
            .map_or(HeaderLine::Other, HeaderLine::Status);
    }
    if let Some((name, value)) = line.split_once(':') {
        if name.trim().eq_ignore_ascii_case("content-length") {
            if let Ok(n) = value.trim().parse::<u64>() {
                return HeaderLine::ContentLength(n);
            }
        }
    }
    HeaderLine::Other
}
