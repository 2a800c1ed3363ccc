//! Incremental UTF-8 decoding and `data:` line framing
//!
//! The backend writes `data: <json>\n` frames into a chunked body with no
//! alignment guarantees: a chunk may end mid-line or mid-codepoint. The
//! decoder carries incomplete byte sequences and the framer carries the
//! incomplete trailing line, so any re-chunking of the same body produces
//! the same payload sequence.

const DATA_PREFIX: &str = "data: ";

/// Streaming UTF-8 decoder that buffers incomplete trailing sequences
/// across chunk boundaries. Invalid sequences decode as U+FFFD rather
/// than aborting the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all complete text it contains.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let bytes: Vec<u8> = if self.pending.is_empty() {
            chunk.to_vec()
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            joined
        };

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // Incomplete sequence at the chunk boundary;
                            // finish it with the next chunk.
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Splits decoded text on newlines and extracts `data: ` payloads.
///
/// The final element of each split is an incomplete remainder and stays
/// buffered (even when empty) until a later chunk completes it. Lines
/// without the `data: ` prefix (blank keep-alives, comments, other SSE
/// fields) are discarded. One framer serves exactly one stream.
#[derive(Debug, Default)]
pub struct SseFramer {
    decoder: Utf8Decoder,
    buf: String,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes, returning every payload they completed.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        self.push_text(&text)
    }

    /// Feed already-decoded text.
    pub fn push_text(&mut self, text: &str) -> Vec<String> {
        self.buf.push_str(text);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            if let Some(payload) = extract_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }
}

/// Trim the line and take the non-empty remainder of a `data: ` prefix.
fn extract_payload(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(DATA_PREFIX)?;
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "data: {\"type\": \"checkpoint\", \"checkpoint_id\": \"c1\"}\n\n\
                        data: {\"type\": \"content\", \"content\": \"héllo\"}\n\n\
                        data: {\"type\": \"end\"}\n\n";

    fn frame_all(framer: &mut SseFramer, chunks: &[&[u8]]) -> Vec<String> {
        let mut payloads = Vec::new();
        for chunk in chunks {
            payloads.extend(framer.push_bytes(chunk));
        }
        payloads
    }

    #[test]
    fn test_single_chunk() {
        let mut framer = SseFramer::new();
        let payloads = framer.push_bytes(BODY.as_bytes());
        assert_eq!(payloads.len(), 3);
        assert!(payloads[0].contains("checkpoint"));
        assert!(payloads[2].contains("end"));
    }

    #[test]
    fn test_rechunking_is_equivalent() {
        // Any chunk size, including splits mid-line and mid-UTF-8 (the
        // body contains a two-byte é), must produce the same payloads.
        let mut reference = SseFramer::new();
        let expected = reference.push_bytes(BODY.as_bytes());

        let bytes = BODY.as_bytes();
        for size in 1..=7 {
            let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
            let mut framer = SseFramer::new();
            let payloads = frame_all(&mut framer, &chunks);
            assert_eq!(payloads, expected, "chunk size {size}");
        }
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut decoder = Utf8Decoder::new();
        let bytes = "héllo".as_bytes();
        // Split inside the two-byte é.
        let mut out = decoder.decode(&bytes[..2]);
        out.push_str(&decoder.decode(&bytes[2..]));
        assert_eq!(out, "héllo");
    }

    #[test]
    fn test_invalid_utf8_replaced_not_fatal() {
        let mut decoder = Utf8Decoder::new();
        let out = decoder.decode(b"ok\xff\xfeok");
        assert_eq!(out, "ok\u{FFFD}\u{FFFD}ok");
    }

    #[test]
    fn test_incomplete_trailing_line_deferred() {
        let mut framer = SseFramer::new();
        assert!(framer.push_text("data: {\"type\": \"en").is_empty());
        let payloads = framer.push_text("d\"}\n");
        assert_eq!(payloads, vec!["{\"type\": \"end\"}".to_string()]);
    }

    #[test]
    fn test_non_data_lines_discarded() {
        let mut framer = SseFramer::new();
        let payloads =
            framer.push_text(": keep-alive\n\nevent: ping\ndata: {\"type\": \"end\"}\n");
        assert_eq!(payloads, vec!["{\"type\": \"end\"}".to_string()]);
    }

    #[test]
    fn test_empty_data_line_discarded() {
        let mut framer = SseFramer::new();
        assert!(framer.push_text("data: \n").is_empty());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let mut framer = SseFramer::new();
        let payloads = framer.push_text("  data: {\"type\": \"end\"}\r\n");
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_frames_without_blank_separator() {
        // The backend occasionally omits the blank line between frames.
        let mut framer = SseFramer::new();
        let payloads = framer.push_text("data: {\"a\": 1}\ndata: {\"b\": 2}\n");
        assert_eq!(payloads.len(), 2);
    }
}
