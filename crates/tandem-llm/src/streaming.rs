use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use tandem_core::error::{Result, TandemError};

/// Prefix of a data line: `data: <json>`.
pub const DATA_PREFIX: &str = "data: ";
/// Payload that marks the end of a stream.
pub const DONE_MARKER: &str = "[DONE]";
/// Default read size for [`decode_frames`].
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Incremental decoder for line-delimited `data: <json>` streams.
///
/// Bytes are buffered until a newline arrives, so a frame split across any
/// number of chunks (including mid UTF-8 sequence) decodes exactly once.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the decoder and extract frames from complete lines.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = self.buffer.drain(..=last_newline).collect();

        complete
            .split(|&b| b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// Flush the trailing unterminated line once the stream has closed.
    pub fn finish(&mut self) -> Option<Value> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Bytes held back waiting for a newline.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<Value> {
    let line = String::from_utf8_lossy(raw);
    let data = line.trim().strip_prefix(DATA_PREFIX)?;
    if data.is_empty() || data == DONE_MARKER {
        return None;
    }
    match serde_json::from_str(data) {
        Ok(frame) => Some(frame),
        Err(e) => {
            debug!(error = %e, "Skipping malformed stream frame");
            None
        }
    }
}

/// Read `reader` to the end in `chunk_size` reads and collect every frame.
///
/// Ends at the first zero-length read. A read error aborts the whole decode.
pub async fn decode_frames<R>(mut reader: R, chunk_size: usize) -> Result<Vec<Value>>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| TandemError::Stream(e.to_string()))?;
        if n == 0 {
            break;
        }
        frames.extend(decoder.feed(&chunk[..n]));
    }
    frames.extend(decoder.finish());

    debug!(frames = frames.len(), "Stream closed");
    Ok(frames)
}

/// A stream of decoded frames from raw HTTP body bytes.
///
/// A body read error is yielded once as `LlmStream` and ends the stream.
pub struct FrameStream<S> {
    inner: S,
    decoder: FrameDecoder,
    pending: VecDeque<Value>,
    closed: bool,
}

impl<S> FrameStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            closed: false,
        }
    }
}

impl<S> Stream for FrameStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<Value>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            // Return pending frames first
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if this.closed {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.decoder.feed(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "Stream body read failed");
                    this.closed = true;
                    return Poll::Ready(Some(Err(TandemError::LlmStream(e.to_string()))));
                }
                Poll::Ready(None) => {
                    this.pending.extend(this.decoder.finish());
                    this.closed = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BODY: &str = "event: updates\ndata: {\"agent\":{\"messages\":[{\"type\":\"ai\",\"content\":\"42 × 3\"}]}}\n\n: keep-alive\ndata: {\"n\":2}\r\ndata: [DONE]\n\n";

    fn decode_in_chunks(body: &[u8], size: usize) -> Vec<Value> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in body.chunks(size) {
            frames.extend(decoder.feed(chunk));
        }
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn test_decoder_basic() {
        let frames = decode_in_chunks(BODY.as_bytes(), BODY.len());
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], json!({"n": 2}));
    }

    #[test]
    fn test_decoder_chunk_boundary_invariance() {
        let expected = decode_in_chunks(BODY.as_bytes(), BODY.len());
        // Includes splits inside the multi-byte '×'
        for size in 1..BODY.len() {
            assert_eq!(decode_in_chunks(BODY.as_bytes(), size), expected, "chunk size {}", size);
        }
    }

    #[test]
    fn test_decoder_done_marker_produces_nothing() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: [DONE]\n").is_empty());
        assert!(decoder.feed(b"data: \n").is_empty());
    }

    #[test]
    fn test_decoder_skips_malformed_json() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"data: {bad json\ndata: {\"ok\":true}\n");
        assert_eq!(frames, vec![json!({"ok": true})]);
    }

    #[test]
    fn test_decoder_buffers_partial_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"x\":").is_empty());
        assert_eq!(decoder.buffered(), 11);
        assert_eq!(decoder.feed(b"1}\n"), vec![json!({"x": 1})]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_flushes_unterminated_last_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"last\":1}").is_empty());
        assert_eq!(decoder.finish(), Some(json!({"last": 1})));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn test_decode_frames_reads_to_close() {
        let frames = decode_frames(BODY.as_bytes(), 7).await.unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn test_decode_frames_empty_body() {
        let frames = decode_frames(&b""[..], DEFAULT_CHUNK_SIZE).await.unwrap();
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_frame_stream_over_byte_chunks() {
        use futures::StreamExt;

        let chunks: Vec<std::result::Result<bytes::Bytes, reqwest::Error>> = vec![
            Ok(bytes::Bytes::from_static(b"data: {\"a\"")),
            Ok(bytes::Bytes::from_static(b":1}\n\ndata: {\"b\":2}\n")),
            Ok(bytes::Bytes::from_static(b"data: [DONE]\n")),
        ];
        let frames: Vec<Value> = FrameStream::new(futures::stream::iter(chunks))
            .map(|frame| frame.unwrap())
            .collect()
            .await;
        assert_eq!(frames, vec![json!({"a": 1}), json!({"b": 2})]);
    }
}
