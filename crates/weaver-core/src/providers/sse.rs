//! Line buffering for server-sent-event response bodies.
//!
//! The streaming backends all consume `text/event-stream` bodies whose
//! chunks can split lines anywhere. This buffer reassembles lines and
//! hands back only the `data:` payloads; `event:` lines, comments, and
//! blank keep-alives are dropped.

/// Accumulates raw body chunks and yields complete `data:` payloads.
///
/// Chunks are kept as bytes until a full line arrives, so a multi-byte
/// UTF-8 character split across two chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk, returning the `data:` payloads it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_data_line() {
        let mut buf = SseLineBuffer::new();
        let out = buf.push(b"data: {\"a\":1}\n");
        assert_eq!(out, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: hel").is_empty());
        let out = buf.push(b"lo\ndata: world\n");
        assert_eq!(out, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn test_crlf_lines() {
        let mut buf = SseLineBuffer::new();
        let out = buf.push(b"data: x\r\n\r\n");
        assert_eq!(out, vec!["x".to_string()]);
    }

    #[test]
    fn test_event_lines_ignored() {
        let mut buf = SseLineBuffer::new();
        let out = buf.push(b"event: content_block_delta\ndata: y\n");
        assert_eq!(out, vec!["y".to_string()]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        // "café": the é arrives split over two chunks
        assert!(buf.push(b"data: caf\xC3").is_empty());
        let out = buf.push(b"\xA9\n");
        assert_eq!(out, vec!["café".to_string()]);
    }

    #[test]
    fn test_empty_data_skipped() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data:\n: comment\n\n").is_empty());
    }
}
