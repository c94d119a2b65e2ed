//! Line-oriented decoding of an OpenAI-style `text/event-stream` body.
//!
//! Upstream sends `data: {json}\n\n` per event and `data: [DONE]\n\n` at the
//! end. Network reads split that text at arbitrary byte offsets, so the
//! decoder keeps the unterminated tail of the previous read and only looks at
//! complete lines.

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of a `data: ` line, prefix stripped.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the frames completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(frame) = parse_line(&line[..line.len() - 1]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a last line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<SseFrame> {
        let line = std::mem::take(&mut self.pending);
        parse_line(&line).into_iter().collect()
    }
}

fn parse_line(line: &[u8]) -> Option<SseFrame> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    // Only whole lines get here, and '\n' never sits inside a multi-byte
    // sequence, so lossy decoding is lossless for well-formed input.
    let text = String::from_utf8_lossy(line);
    let data = text.strip_prefix(DATA_PREFIX)?;
    if data == DONE_SENTINEL {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(data.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_events_and_ignores_separators() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"a\":1}\n\nevent: ping\n: comment\ndata: [DONE]\n\n");
        assert_eq!(
            frames,
            vec![SseFrame::Data("{\"a\":1}".to_string()), SseFrame::Done]
        );
    }

    #[test]
    fn holds_partial_line_until_newline() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"choi").is_empty());
        assert_eq!(
            decoder.push(b"ces\":[]}\n"),
            vec![SseFrame::Data("{\"choices\":[]}".to_string())]
        );
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: x\r\n\r\ndata: [DONE]\r\n");
        assert_eq!(frames, vec![SseFrame::Data("x".to_string()), SseFrame::Done]);
    }

    #[test]
    fn multibyte_text_split_across_chunks() {
        let line = "data: héllo ✓\n".as_bytes();
        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        for byte in line {
            frames.extend(decoder.push(std::slice::from_ref(byte)));
        }
        assert_eq!(frames, vec![SseFrame::Data("héllo ✓".to_string())]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec![SseFrame::Data("tail".to_string())]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn prefix_must_include_the_space() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data:nospace\n").is_empty());
    }
}
