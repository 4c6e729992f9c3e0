//! Incremental decoder for `text/event-stream` bodies.
//!
//! Only `data` fields matter to the scraping server's protocol; `event`, `id`
//! and `retry` are accepted and ignored.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::{stream::BoxStream, Stream, StreamExt};

use super::client::{ApiError, Result};

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: Option<String>,
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk, pushing the payload of every completed event into `out`.
    ///
    /// Chunks may split lines (and `\r\n` pairs) anywhere.
    pub fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<String>) -> Result<()> {
        for &byte in chunk {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }

            match byte {
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    let line = String::from_utf8(std::mem::take(&mut self.line)).map_err(|e| {
                        ApiError::InvalidResponse(format!("event stream is not UTF-8: {}", e))
                    })?;
                    if let Some(event) = self.process_line(&line) {
                        out.push_back(event);
                    }
                }
                _ => self.line.push(byte),
            }
        }
        Ok(())
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.data.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
        None
    }
}

struct EventStreamState {
    bytes: BoxStream<'static, Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    failure: Option<ApiError>,
    done: bool,
}

/// Turns a response body into the stream of its event `data` payloads.
///
/// An event left unterminated when the body ends is discarded. After the first
/// error the stream ends.
pub fn data_events<S>(bytes: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    futures::stream::unfold(
        EventStreamState {
            bytes: bytes.boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            failure: None,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Some((Ok(event), state));
                }
                if let Some(e) = state.failure.take() {
                    state.done = true;
                    return Some((Err(e), state));
                }
                if state.done {
                    return None;
                }

                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        if let Err(e) = state.decoder.feed(&chunk, &mut state.pending) {
                            state.failure = Some(e);
                        }
                    }
                    Some(Err(e)) => state.failure = Some(e),
                    None => state.done = true,
                }
            }
        },
    )
    .boxed()
}
