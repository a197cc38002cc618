//! Incremental decoding of the daemon's newline-delimited JSON streams.
//!
//! The streaming endpoints emit one JSON object per line, but HTTP chunk
//! boundaries fall anywhere, so a chunk may end mid-record. The decoder keeps
//! exactly one piece of state: the trailing partial line, carried across
//! `feed` calls. Decoding is otherwise pure, and a malformed record is dropped
//! and counted rather than ending the stream.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{ConnectionsFrame, LogLine};

/// Streaming NDJSON decoder for one event type.
///
/// Records are returned in the order they occur in the byte stream, regardless
/// of how the stream was chunked.
pub struct EventDecoder<T> {
    partial: Vec<u8>,
    dropped: u64,
    _kind: PhantomData<T>,
}

/// Decoder for the `/logs` stream.
pub type LogDecoder = EventDecoder<LogLine>;

/// Decoder for the `/connections` stream.
pub type ConnectionsDecoder = EventDecoder<ConnectionsFrame>;

impl<T: DeserializeOwned> EventDecoder<T> {
    pub fn new() -> Self {
        EventDecoder {
            partial: Vec::new(),
            dropped: 0,
            _kind: PhantomData,
        }
    }

    /// Feed one raw chunk, returning every record completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<T> {
        let mut events = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];
            if let Some(event) = self.take_record() {
                events.push(event);
            }
        }
        self.partial.extend_from_slice(rest);
        events
    }

    /// Flush a final unterminated record at end of stream.
    pub fn finish(&mut self) -> Option<T> {
        if self.partial.is_empty() {
            return None;
        }
        self.take_record()
    }

    /// Number of malformed records dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Decode and clear the accumulated line. Blank lines are ignored without
    /// counting; anything else that fails to parse counts as dropped.
    fn take_record(&mut self) -> Option<T> {
        let line = std::mem::take(&mut self.partial);
        let trimmed = trim_line(&line);
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_slice(trimmed) {
            Ok(event) => Some(event),
            Err(e) => {
                self.dropped += 1;
                debug!(error = %e, "dropped malformed stream record");
                None
            }
        }
    }
}

impl<T: DeserializeOwned> Default for EventDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut s = line;
    while let [rest @ .., last] = s {
        if matches!(last, b'\r' | b' ' | b'\t') {
            s = rest;
        } else {
            break;
        }
    }
    while let [first, rest @ ..] = s {
        if matches!(first, b' ' | b'\t') {
            s = rest;
        } else {
            break;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    const STREAM: &str = concat!(
        r#"{"type":"info","payload":"first"}"#,
        "\n",
        r#"{"type":"warning","payload":"second"}"#,
        "\n",
        r#"{"type":"error","payload":"third"}"#,
        "\n",
    );

    fn decode_chunked(input: &[u8], chunk_size: usize) -> (Vec<LogLine>, u64) {
        let mut decoder = LogDecoder::new();
        let mut events = Vec::new();
        for chunk in input.chunks(chunk_size.max(1)) {
            events.extend(decoder.feed(chunk));
        }
        if let Some(tail) = decoder.finish() {
            events.push(tail);
        }
        (events, decoder.dropped())
    }

    #[test]
    fn decodes_multiple_records_from_one_chunk_in_order() {
        let (events, dropped) = decode_chunked(STREAM.as_bytes(), STREAM.len());
        assert_eq!(dropped, 0);
        assert_eq!(
            events.iter().map(|e| e.payload.as_str()).collect::<Vec<_>>(),
            ["first", "second", "third"]
        );
    }

    #[test]
    fn chunk_boundary_invariance() {
        let baseline = decode_chunked(STREAM.as_bytes(), STREAM.len()).0;
        for size in 1..STREAM.len() {
            let (events, dropped) = decode_chunked(STREAM.as_bytes(), size);
            assert_eq!(events, baseline, "chunk size {} diverged", size);
            assert_eq!(dropped, 0);
        }
    }

    #[test]
    fn partial_record_resumes_on_next_feed() {
        let mut decoder = LogDecoder::new();
        assert!(decoder.feed(br#"{"type":"info","pay"#).is_empty());
        let events = decoder.feed(b"load\":\"split\"}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, "split");
    }

    #[test]
    fn malformed_record_is_dropped_and_counted() {
        let mut decoder = LogDecoder::new();
        let input = concat!(
            r#"{"type":"info","payload":"ok"}"#,
            "\n",
            "{not json}\n",
            r#"{"type":"error","payload":"still here"}"#,
            "\n",
        );
        let events = decoder.feed(input.as_bytes());
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].level, LogLevel::Error);
        assert_eq!(decoder.dropped(), 1);
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let mut decoder = LogDecoder::new();
        let input = "\r\n{\"type\":\"info\",\"payload\":\"crlf\"}\r\n\n";
        let events = decoder.feed(input.as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, "crlf");
        assert_eq!(decoder.dropped(), 0);
    }

    #[test]
    fn finish_flushes_unterminated_tail() {
        let mut decoder = LogDecoder::new();
        assert!(decoder.feed(br#"{"type":"info","payload":"tail"}"#).is_empty());
        let tail = decoder.finish().unwrap();
        assert_eq!(tail.payload, "tail");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn connections_decoder_parses_full_frames() {
        let mut decoder = ConnectionsDecoder::new();
        let frame = r#"{"downloadTotal":10,"uploadTotal":5,"connections":[]}"#;
        let events = decoder.feed(format!("{}\n", frame).as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].download_total, 10);
    }
}
