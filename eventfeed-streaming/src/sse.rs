//! Incremental `text/event-stream` frame parsing.
//!
//! The parser is fed decoded text in fragments of arbitrary size. It keeps
//! the trailing partial line between calls and emits an [`EventRecord`]
//! every time a blank line terminates a record.

use crate::error::{StreamError, StreamResult};
use crate::record::EventRecord;
use futures::{ready, Stream};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace};

const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;
const BOM: char = '\u{FEFF}';

/// Field values collected for the record being built.
#[derive(Debug, Default)]
struct PendingRecord {
    id: Option<String>,
    event: Option<String>,
    data_lines: Vec<String>,
    retry: Option<u64>,
}

impl PendingRecord {
    fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.event.is_none()
            && self.data_lines.is_empty()
            && self.retry.is_none()
    }

    fn take_record(&mut self) -> EventRecord {
        let pending = std::mem::take(self);
        EventRecord {
            id: pending.id,
            event: pending.event,
            data: pending.data_lines.join("\n"),
            retry: pending.retry,
        }
    }
}

/// Parser for `text/event-stream` bodies.
///
/// A parser instance carries state across fragments; start a new
/// instance for every new response body.
#[derive(Debug)]
pub struct FrameParser {
    buffer: String,
    pending: PendingRecord,
    skip_leading_lf: bool,
    seen_input: bool,
    max_buffer_size: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            pending: PendingRecord::default(),
            skip_leading_lf: false,
            seen_input: false,
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl FrameParser {
    /// Create a new frame parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum size of a single unterminated line.
    #[must_use]
    pub fn with_max_buffer_size(mut self, limit: usize) -> Self {
        self.max_buffer_size = limit;
        self
    }

    /// Feed a decoded text fragment, returning every record it completes.
    pub fn feed_str(&mut self, fragment: &str) -> StreamResult<Vec<EventRecord>> {
        let mut fragment = fragment;
        if fragment.is_empty() {
            return Ok(Vec::new());
        }
        if !self.seen_input {
            self.seen_input = true;
            fragment = fragment.strip_prefix(BOM).unwrap_or(fragment);
        }
        if self.skip_leading_lf {
            // The previous fragment ended on CR; this LF completes the CRLF.
            self.skip_leading_lf = false;
            fragment = fragment.strip_prefix('\n').unwrap_or(fragment);
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.push_str(fragment);

        let mut records = Vec::new();
        let mut start = 0;
        let bytes = buffer.as_bytes();
        while let Some(offset) = bytes[start..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
        {
            let end = start + offset;
            let next = if bytes[end] == b'\r' {
                match bytes.get(end + 1) {
                    Some(b'\n') => end + 2,
                    Some(_) => end + 1,
                    None => {
                        self.skip_leading_lf = true;
                        end + 1
                    }
                }
            } else {
                end + 1
            };

            if let Some(record) = self.process_line(&buffer[start..end]) {
                records.push(record);
            }
            start = next;
        }

        buffer.drain(..start);
        if buffer.len() > self.max_buffer_size {
            return Err(StreamError::BufferOverflow {
                limit: self.max_buffer_size,
            });
        }
        self.buffer = buffer;

        Ok(records)
    }

    /// Signal the end of the stream.
    ///
    /// An unterminated record is discarded, never emitted.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() || !self.pending.is_empty() {
            debug!(
                buffered_bytes = self.buffer.len(),
                "Discarding unterminated record at end of stream"
            );
        }
        self.buffer.clear();
        self.pending = PendingRecord::default();
        self.skip_leading_lf = false;
    }

    /// Check if a partial line or record is waiting for more input.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || !self.pending.is_empty()
    }

    fn process_line(&mut self, line: &str) -> Option<EventRecord> {
        if line.is_empty() {
            return Some(self.pending.take_record());
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => {
                let value = &line[pos + 1..];
                (&line[..pos], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "data" => self.pending.data_lines.push(value.to_string()),
            "event" => self.pending.event = Some(value.to_string()),
            "id" => {
                self.pending.id = if value.contains('\0') {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse() {
                        self.pending.retry = Some(ms);
                    }
                }
            }
            _ => trace!(field, "Ignoring unknown field"),
        }
        None
    }
}

/// Lazily parse an iterator of text fragments.
pub fn frames<I>(fragments: I) -> Frames<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Frames {
        fragments: fragments.into_iter(),
        parser: FrameParser::new(),
        ready: VecDeque::new(),
        done: false,
    }
}

/// Iterator returned by [`frames`].
#[derive(Debug)]
pub struct Frames<I> {
    fragments: I,
    parser: FrameParser,
    ready: VecDeque<EventRecord>,
    done: bool,
}

impl<I> Iterator for Frames<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = StreamResult<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            match self.fragments.next() {
                Some(fragment) => match self.parser.feed_str(fragment.as_ref()) {
                    Ok(records) => self.ready.extend(records),
                    Err(error) => {
                        self.done = true;
                        return Some(Err(error));
                    }
                },
                None => {
                    self.done = true;
                    self.parser.finish();
                }
            }
        }
    }
}

pin_project! {
    /// Stream adapter that parses records from a stream of text fragments.
    ///
    /// Upstream errors are passed through unchanged; parser errors are
    /// converted into the upstream error type and end the stream.
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        parser: FrameParser,
        ready: VecDeque<EventRecord>,
        finished: bool,
    }
}

impl<S, E> FrameStream<S>
where
    S: Stream<Item = Result<String, E>>,
{
    /// Create a new frame stream from a text stream.
    pub fn new(inner: S) -> Self {
        Self::with_parser(inner, FrameParser::new())
    }

    /// Create a new frame stream with a preconfigured parser.
    pub fn with_parser(inner: S, parser: FrameParser) -> Self {
        Self {
            inner,
            parser,
            ready: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = Result<String, E>>,
    E: From<StreamError>,
{
    type Item = Result<EventRecord, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(record) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(record)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(text)) => match this.parser.feed_str(&text) {
                    Ok(records) => this.ready.extend(records),
                    Err(error) => {
                        *this.finished = true;
                        return Poll::Ready(Some(Err(error.into())));
                    }
                },
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
                None => {
                    *this.finished = true;
                    this.parser.finish();
                }
            }
        }
    }
}
