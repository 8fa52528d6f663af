//! Per-connection command loop
//!
//! One session owns one stream and one capability table. Requests are
//! processed strictly in order; nothing about a session is visible to any
//! other. The loop ends when the peer closes the stream, and every
//! descriptor the session opened is released exactly once on the way out
//! (the table owns them, so even an error path cannot leak).

use std::io::{Read, Write};

use tracing::{debug, error, warn};

use crate::dispatch;
use crate::error::Result;
use crate::handles::HandleTable;
use crate::protocol::codec::{self, DecodedRequest};
use crate::protocol::framing;
use crate::protocol::Response;

/// One client connection's state.
pub struct Session<S> {
    stream: S,
    handles: HandleTable,
}

impl<S: Read + Write> Session<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            handles: HandleTable::new(),
        }
    }

    /// Serve requests until the peer disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error when the stream tears mid-message or a known
    /// command's payload fails schema verification. Either way the session
    /// is over and its handles are closed.
    pub fn run(&mut self) -> Result<()> {
        let result = self.serve();
        self.handles.close_all();
        result
    }

    fn serve(&mut self) -> Result<()> {
        loop {
            let Some(buf) = framing::read_message(&mut self.stream)? else {
                debug!("peer disconnected");
                return Ok(());
            };

            let response = match codec::decode_request(&buf) {
                Ok(DecodedRequest::Known(request)) => {
                    dispatch::dispatch(request, &mut self.handles)
                }
                Ok(DecodedRequest::UnknownTag(tag)) => {
                    // Version skew, not an attack; answer and carry on
                    warn!("unsupported command tag {}", tag);
                    Response::Unsupported
                }
                Err(e) => {
                    // A payload that fails verification means we can no
                    // longer trust our position in the stream
                    error!("request failed verification: {}", e);
                    return Err(e);
                }
            };

            framing::write_message(&mut self.stream, &codec::encode_response(&response)?)?;
        }
    }
}
