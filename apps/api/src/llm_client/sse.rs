//! Server-sent-event decoding for chat-completions streams.
//!
//! Upstream sends `data: {json}` lines terminated by `data: [DONE]`. Chunks
//! can split a line (or a UTF-8 sequence) anywhere, so bytes are buffered
//! until a full line is available.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::Deserialize;

use super::{FragmentStream, LlmError};

/// Longest SSE line accepted before the stream is treated as broken.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamChunkError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunkError {
    message: String,
}

/// Incremental SSE line decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` has been seen; later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds raw bytes, returning every fragment completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, LlmError>> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line, &mut out);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        if !self.done && self.buffer.len() > MAX_LINE_BYTES {
            out.push(Err(LlmError::Stream(format!(
                "SSE line exceeds {MAX_LINE_BYTES} bytes without a newline"
            ))));
            self.buffer.clear();
            self.done = true;
        }
        out
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<Result<String, LlmError>> {
        let mut out = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut out);
        }
        out
    }

    fn decode_line(&mut self, raw: &[u8], out: &mut Vec<Result<String, LlmError>>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
        let Some(data) = line.strip_prefix("data:") else {
            return; // comments, event names, keep-alives
        };
        let data = data.trim_start();
        if data == "[DONE]" {
            self.done = true;
            return;
        }

        // Malformed chunks are skipped rather than failing the stream.
        let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) else {
            return;
        };
        if let Some(error) = chunk.error {
            out.push(Err(LlmError::Stream(error.message)));
            return;
        }
        if let Some(content) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty())
        {
            out.push(Ok(content));
        }
    }
}

struct DecodeState {
    bytes: BoxStream<'static, Result<Bytes, LlmError>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<String, LlmError>>,
    finished: bool,
}

/// Turns a raw SSE byte stream into a fragment stream. The first error ends it.
pub fn decode_fragments(bytes: BoxStream<'static, Result<Bytes, LlmError>>) -> FragmentStream {
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.ready.pop_front() {
                if item.is_err() {
                    st.finished = true;
                    st.ready.clear();
                }
                return Some((item, st));
            }
            if st.finished || st.decoder.is_done() {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let decoded = st.decoder.push(&chunk);
                    st.ready.extend(decoded);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.finished = true;
                    let decoded = st.decoder.finish();
                    st.ready.extend(decoded);
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn ok_fragments(results: Vec<Result<String, LlmError>>) -> Vec<String> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_decodes_delta_content() {
        let mut decoder = SseDecoder::new();
        let input = format!("{}{}", delta("Hello"), delta(" world"));
        assert_eq!(ok_fragments(decoder.push(input.as_bytes())), vec!["Hello", " world"]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let input = delta("split");
        let (a, b) = input.as_bytes().split_at(12);
        assert!(decoder.push(a).is_empty());
        assert_eq!(ok_fragments(decoder.push(b)), vec!["split"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let input = delta("café");
        let bytes = input.as_bytes();
        // split inside the two-byte 'é'
        let cut = input.find('é').unwrap() + 1;
        assert!(decoder.push(&bytes[..cut]).is_empty());
        assert_eq!(ok_fragments(decoder.push(&bytes[cut..])), vec!["café"]);
    }

    #[test]
    fn test_done_stops_decoding() {
        let mut decoder = SseDecoder::new();
        let input = format!("{}data: [DONE]\n\n{}", delta("a"), delta("ignored"));
        assert_eq!(ok_fragments(decoder.push(input.as_bytes())), vec!["a"]);
        assert!(decoder.is_done());
        assert!(decoder.push(delta("later").as_bytes()).is_empty());
    }

    #[test]
    fn test_skips_comments_malformed_and_empty_deltas() {
        let mut decoder = SseDecoder::new();
        let input = format!(
            ": OPENROUTER PROCESSING\n\ndata: {{not json\n\n{}{}",
            delta(""),
            delta("kept")
        );
        assert_eq!(ok_fragments(decoder.push(input.as_bytes())), vec!["kept"]);
    }

    #[test]
    fn test_inline_error_chunk_surfaces_as_error() {
        let mut decoder = SseDecoder::new();
        let input = "data: {\"error\": {\"message\": \"quota exceeded\"}}\n\n";
        let out = decoder.push(input.as_bytes());
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Err(LlmError::Stream(m)) if m == "quota exceeded"));
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        let input = delta("tail");
        let unterminated = input.trim_end();
        assert!(decoder.push(unterminated.as_bytes()).is_empty());
        assert_eq!(ok_fragments(decoder.finish()), vec!["tail"]);
    }

    #[test]
    fn test_oversized_line_is_an_error() {
        let mut decoder = SseDecoder::new();
        let mut input = delta("before").into_bytes();
        input.extend(std::iter::repeat(b'x').take(MAX_LINE_BYTES + 1));

        let out = decoder.push(&input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_deref().unwrap(), "before");
        assert!(matches!(&out[1], Err(LlmError::Stream(m)) if m.contains("exceeds")));
        assert!(decoder.is_done());
        assert!(decoder.push(b"more\n").is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_long_line_under_cap_accumulates() {
        let mut decoder = SseDecoder::new();
        let chunk = vec![b'x'; MAX_LINE_BYTES / 2];
        assert!(decoder.push(&chunk).is_empty());
        assert!(decoder.push(&chunk).is_empty());
        assert!(!decoder.is_done());
    }

    #[tokio::test]
    async fn test_decode_fragments_ends_after_transport_error() {
        let chunks: Vec<Result<Bytes, LlmError>> = vec![
            Ok(Bytes::from(delta("one"))),
            Err(LlmError::Stream("connection reset".to_string())),
            Ok(Bytes::from(delta("never"))),
        ];
        let mut fragments = decode_fragments(stream::iter(chunks).boxed());

        assert_eq!(fragments.next().await.unwrap().unwrap(), "one");
        assert!(fragments.next().await.unwrap().is_err());
        assert!(fragments.next().await.is_none());
    }
}
