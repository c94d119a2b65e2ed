//! Folding an SSE byte stream into a growing assistant reply.

use shared::{Metadata, Reply, SseDecoder, SseFrame, StreamDelta};

/// Read-loop state for one streamed reply.
///
/// `[DONE]` is skipped rather than treated as the end: only the transport
/// closing ends a reply. Frames whose JSON does not parse are dropped.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    decoder: SseDecoder,
    content: String,
    thinking: String,
    metadata: Option<Metadata>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the visible text grew.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        let frames = self.decoder.push(chunk);
        self.apply(frames)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn thinking(&self) -> Option<&str> {
        (!self.thinking.is_empty()).then_some(self.thinking.as_str())
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Call once the byte stream has ended.
    pub fn finish(mut self) -> Reply {
        let frames = self.decoder.finish();
        self.apply(frames);
        let thinking = self.thinking().map(str::to_string);
        Reply {
            content: self.content,
            thinking,
            metadata: self.metadata,
        }
    }

    fn apply(&mut self, frames: Vec<SseFrame>) -> bool {
        let mut grew = false;
        for frame in frames {
            let data = match frame {
                SseFrame::Done => continue,
                SseFrame::Data(data) => data,
            };
            let delta = match StreamDelta::parse(&data) {
                Ok(delta) => delta,
                Err(e) => {
                    tracing::trace!(error = %e, "dropping unparseable frame");
                    continue;
                }
            };

            if let Some(text) = delta.text() {
                if let Some(content) = &text.content {
                    self.content.push_str(content);
                    grew = true;
                }
                if let Some(thinking) = &text.thinking {
                    self.thinking.push_str(thinking);
                    grew = true;
                }
            }
            // Last frame carrying statistics wins.
            if let Some(metadata) = delta.metadata() {
                self.metadata = Some(metadata.clone());
            }
        }
        grew
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo, \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"wörld ✓\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}],",
        "\"usage\":{\"total_tokens\":42},",
        "\"timings\":{\"prompt_ms\":120,\"predicted_ms\":380,\"predicted_per_second\":15.7}}\n\n",
        "data: [DONE]\n\n",
    );

    fn run(chunks: &[&[u8]]) -> Reply {
        let mut acc = StreamAccumulator::new();
        for chunk in chunks {
            acc.push(chunk);
        }
        acc.finish()
    }

    #[test]
    fn two_chunk_scenario() {
        let reply = run(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n",
        ]);
        assert_eq!(reply.content, "Hello");
        assert_eq!(reply.metadata, None);
    }

    #[test]
    fn content_is_independent_of_chunk_boundaries() {
        let bytes = STREAM.as_bytes();
        let whole = run(&[bytes]);
        assert_eq!(whole.content, "Hello, wörld ✓");

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(run(&[a, b]), whole, "split at byte {split}");
        }

        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(run(&singles), whole);

        for size in [3, 7, 16, 61] {
            let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
            assert_eq!(run(&chunks), whole, "chunk size {size}");
        }
    }

    #[test]
    fn trailing_metadata_is_formatted() {
        let reply = run(&[STREAM.as_bytes()]);
        let formatted = reply.into_message().metadata.unwrap();
        assert_eq!(
            formatted,
            "Prompt: 120ms | Generation: 380ms | Speed: 15.7 tok/s | Tokens: 42"
        );
    }

    #[test]
    fn malformed_line_is_dropped_and_reading_continues() {
        let reply = run(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            b"data: {not json\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        ]);
        assert_eq!(reply.content, "ab");
    }

    #[test]
    fn odd_statistics_do_not_drop_text() {
        let reply = run(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}],\"usage\":{\"total_tokens\":42.0}}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"!\"}}],\"timings\":{\"prompt_ms\":\"12\"}}\n",
        ]);
        assert_eq!(reply.content, "Hello!");
        assert_eq!(
            reply.metadata.unwrap().to_string(),
            "Prompt: 0ms | Generation: 0ms | Speed: 0 tok/s"
        );
    }

    #[test]
    fn done_does_not_stop_the_loop() {
        let reply = run(&[
            b"data: [DONE]\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
        ]);
        assert_eq!(reply.content, "late");
    }

    #[test]
    fn latest_metadata_replaces_earlier() {
        let reply = run(&[
            b"data: {\"timings\":{\"prompt_ms\":1,\"predicted_ms\":2,\"predicted_per_second\":3}}\n",
            b"data: {\"usage\":{\"total_tokens\":9}}\n",
        ]);
        assert_eq!(
            reply.metadata.unwrap().to_string(),
            "Prompt: 0ms | Generation: 0ms | Speed: 0 tok/s | Tokens: 9"
        );
    }

    #[test]
    fn push_reports_growth() {
        let mut acc = StreamAccumulator::new();
        assert!(!acc.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"x"));
        assert!(acc.push(b"\"}}]}\n"));
        assert!(!acc.push(b"data: {\"usage\":{\"total_tokens\":1}}\n"));
        assert_eq!(acc.content(), "x");
        assert!(acc.metadata().is_some());
    }

    #[test]
    fn reasoning_goes_to_thinking() {
        let reply = run(&[
            b"data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"hmm \"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"ok\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"42\"}}]}\n",
        ]);
        assert_eq!(reply.thinking.as_deref(), Some("hmm ok"));
        assert_eq!(reply.content, "42");
    }

    #[test]
    fn unterminated_final_line_is_kept() {
        let reply = run(&[b"data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"]);
        assert_eq!(reply.content, "end");
    }
}
