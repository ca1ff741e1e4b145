//! Network seam for the fetcher: one GET, body handed over block by block.

use crate::error::ParamsError;
use std::ops::ControlFlow;
use url::Url;

/// Consumer of a response body.
pub trait BodySink {
    /// Called once per successful response, before the first block, with the
    /// final response's declared `Content-Length` (if any).
    fn on_headers(&mut self, content_length: Option<u64>);

    /// Called for each block of the body. `Break` aborts the transfer; the
    /// transport then returns an error, which the sink's owner may override
    /// with its own reason.
    fn on_chunk(&mut self, data: &[u8]) -> ControlFlow<()>;
}

/// Issues a plain GET per artifact. Implementations must be shareable across
/// worker threads.
pub trait Transport: Send + Sync {
    /// GET `url`, streaming the body into `sink`.
    ///
    /// A non-2xx final status is `ParamsError::HttpStatus`; its body is not
    /// passed to the sink. Connection and protocol failures are
    /// `ParamsError::Transport`.
    fn get(&self, url: &Url, sink: &mut dyn BodySink) -> Result<(), ParamsError>;
}
