//! Server-Sent Events (SSE) frame decoding.
//!
//! SSE format:
//! ```text
//! data: {"key": "value"}
//!
//! data: {"another": "event"}
//!
//! data: [DONE]
//! ```
//!
//! [`SseDecoder`] reassembles frames from raw byte chunks incrementally: it
//! tracks a consumed-offset cursor so already-parsed text is never re-scanned
//! and a trailing partial line is held back until its newline arrives. The
//! accumulation buffer is supplied by the caller (normally drawn from the
//! [`BufferPool`](crate::pool::BufferPool)) and handed back when the stream
//! ends.

use bytes::Bytes;

/// Once this many consumed bytes pile up in front of the cursor, shift the
/// remaining tail to the front of the buffer.
const COMPACT_THRESHOLD: usize = 16 * 1024;

/// Parse an SSE line to extract the data portion.
///
/// SSE lines are in the format: `data: <content>`
///
/// # Example
/// ```
/// use swiftlm::sse::parse_sse_line;
///
/// let line = "data: {\"key\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"key\": \"value\"}"));
///
/// let line = "invalid";
/// assert_eq!(parse_sse_line(line), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").map(|s| s.trim())
}

/// Check if an SSE data line indicates the stream is done.
///
/// Common done marker: `[DONE]`
pub fn is_done_marker(data: &str) -> bool {
    data == "[DONE]"
}

/// Incremental SSE frame decoder over a pooled byte buffer.
pub struct SseDecoder {
    buffer: Vec<u8>,
    cursor: usize,
}

impl SseDecoder {
    /// Wrap a (cleared) accumulation buffer.
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Append a raw chunk from the response body.
    pub fn push(&mut self, chunk: &Bytes) {
        if self.cursor == self.buffer.len() {
            self.buffer.clear();
            self.cursor = 0;
        } else if self.cursor > COMPACT_THRESHOLD {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Yield the payload of the next complete `data: ` line, advancing the
    /// cursor past it. Lines without the prefix are skipped. Returns `None`
    /// once only a partial (unterminated) line remains.
    pub fn next_frame(&mut self) -> Option<String> {
        while let Some(offset) = find_newline(&self.buffer[self.cursor..]) {
            let line_end = self.cursor + offset;
            let line = String::from_utf8_lossy(&self.buffer[self.cursor..line_end]);
            let payload = parse_sse_line(line.trim()).map(|data| data.to_string());
            self.cursor = line_end + 1;
            if let Some(payload) = payload {
                return Some(payload);
            }
        }
        None
    }

    /// Reclaim the accumulation buffer so it can go back to the pool.
    pub fn take_buffer(&mut self) -> Vec<u8> {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }
}

fn find_newline(haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|b| *b == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_str(decoder: &mut SseDecoder, s: &str) {
        decoder.push(&Bytes::copy_from_slice(s.as_bytes()));
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: hello"), Some("hello"));
        assert_eq!(
            parse_sse_line("data: {\"key\": \"value\"}"),
            Some("{\"key\": \"value\"}")
        );
        assert_eq!(parse_sse_line("data:   spaces  "), Some("spaces"));
        assert_eq!(parse_sse_line("invalid"), None);
        assert_eq!(parse_sse_line(""), None);
    }

    #[test]
    fn test_is_done_marker() {
        assert!(is_done_marker("[DONE]"));
        assert!(!is_done_marker(""));
        assert!(!is_done_marker("data"));
        assert!(!is_done_marker("{\"key\": \"value\"}"));
    }

    #[test]
    fn decodes_complete_frames_in_order() {
        let mut decoder = SseDecoder::new(Vec::new());
        push_str(&mut decoder, "data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");

        assert_eq!(decoder.next_frame().as_deref(), Some("{\"a\":1}"));
        assert_eq!(decoder.next_frame().as_deref(), Some("{\"b\":2}"));
        assert_eq!(decoder.next_frame(), None);
    }

    #[test]
    fn holds_back_partial_trailing_line() {
        let mut decoder = SseDecoder::new(Vec::new());
        push_str(&mut decoder, "data: {\"a\"");
        assert_eq!(decoder.next_frame(), None);

        push_str(&mut decoder, ":1}\n");
        assert_eq!(decoder.next_frame().as_deref(), Some("{\"a\":1}"));
        assert_eq!(decoder.next_frame(), None);
    }

    #[test]
    fn frame_split_across_many_chunks_emitted_once() {
        let mut decoder = SseDecoder::new(Vec::new());
        for piece in ["da", "ta: hel", "lo wor", "ld\nda"] {
            push_str(&mut decoder, piece);
        }
        assert_eq!(decoder.next_frame().as_deref(), Some("hello world"));
        assert_eq!(decoder.next_frame(), None);

        push_str(&mut decoder, "ta: again\n");
        assert_eq!(decoder.next_frame().as_deref(), Some("again"));
    }

    #[test]
    fn skips_non_data_lines() {
        let mut decoder = SseDecoder::new(Vec::new());
        push_str(&mut decoder, ": comment\nevent: ping\n\ndata: payload\n");
        assert_eq!(decoder.next_frame().as_deref(), Some("payload"));
    }

    #[test]
    fn done_marker_passes_through_for_caller() {
        let mut decoder = SseDecoder::new(Vec::new());
        push_str(&mut decoder, "data: [DONE]\n");
        let frame = decoder.next_frame().unwrap();
        assert!(is_done_marker(&frame));
    }

    #[test]
    fn take_buffer_returns_accumulator() {
        let mut decoder = SseDecoder::new(Vec::with_capacity(64));
        push_str(&mut decoder, "data: x\n");
        assert_eq!(decoder.next_frame().as_deref(), Some("x"));
        let buffer = decoder.take_buffer();
        assert!(buffer.capacity() >= 8);
    }
}
