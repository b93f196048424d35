//! Incremental consumer for streamed research answers
//!
//! Feeds raw body chunks through a [`LineBuffer`], extracts text deltas from
//! `data:` lines and hands them to a [`StreamHandler`] in small batches.

use std::fmt::Display;

use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::handler::StreamHandler;
use crate::lines::LineBuffer;
use crate::sse::{classify, extract_delta, SseLine};

/// Deltas collected before `on_delta` fires
pub const DELTA_BATCH_SIZE: usize = 3;

enum Step {
    Continue,
    /// Line could not be parsed yet; wait for the next read
    Stalled,
    Done,
}

pub struct StreamConsumer<'h, H: StreamHandler + ?Sized> {
    lines: LineBuffer,
    handler: &'h mut H,
    batch: Vec<String>,
    surfaced: bool,
    retrying: bool,
    at_eof: bool,
    finished: bool,
}

impl<'h, H: StreamHandler + ?Sized> StreamConsumer<'h, H> {
    pub fn new(handler: &'h mut H) -> Self {
        Self {
            lines: LineBuffer::new(),
            handler,
            batch: Vec::with_capacity(DELTA_BATCH_SIZE),
            surfaced: false,
            retrying: false,
            at_eof: false,
            finished: false,
        }
    }

    /// True once `on_done` or the terminal `on_error` has fired
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Process one body chunk
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.finished {
            return;
        }
        self.lines.extend(chunk);
        self.drain_lines();
    }

    /// Input ended normally
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.at_eof = true;
        self.drain_lines();
        if self.finished {
            return;
        }
        if let Some(last) = self.lines.take_remainder() {
            self.process_line(&last);
        }
        self.complete();
    }

    /// Input failed mid-stream
    pub fn fail(&mut self, message: &str) {
        if self.finished {
            return;
        }
        self.flush();
        self.finished = true;
        self.handler.on_error(message);
        if self.surfaced {
            self.handler.on_done();
        }
    }

    fn drain_lines(&mut self) {
        while let Some(line) = self.lines.next_line() {
            match self.process_line(&line) {
                Step::Continue => {}
                Step::Stalled => {
                    self.lines.unshift(&line);
                    break;
                }
                Step::Done => {
                    self.complete();
                    return;
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) -> Step {
        let payload = match classify(line) {
            SseLine::Blank | SseLine::Comment | SseLine::Other => return Step::Continue,
            SseLine::Done => return Step::Done,
            SseLine::Data(payload) => payload,
        };

        match extract_delta(payload) {
            Ok(delta) => {
                self.retrying = false;
                if let Some(text) = delta {
                    self.push_delta(text);
                }
                Step::Continue
            }
            Err(e) if self.retrying || self.at_eof => {
                self.retrying = false;
                warn!(error = %e, line = %line, "Dropping unparseable stream line");
                Step::Continue
            }
            Err(e) => {
                debug!(error = %e, "Deferring stream line until next read");
                self.retrying = true;
                Step::Stalled
            }
        }
    }

    fn push_delta(&mut self, text: String) {
        self.batch.push(text);
        if self.batch.len() >= DELTA_BATCH_SIZE {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let text = self.batch.concat();
        self.batch.clear();
        self.surfaced = true;
        self.handler.on_delta(&text);
    }

    fn complete(&mut self) {
        self.flush();
        if !self.finished {
            self.finished = true;
            self.handler.on_done();
        }
    }
}

/// Drive `handler` from a stream of body chunks until it ends or fails
pub async fn consume_stream<S, B, E, H>(stream: S, handler: &mut H)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    H: StreamHandler + ?Sized,
{
    let mut stream = std::pin::pin!(stream);
    let mut consumer = StreamConsumer::new(handler);

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                consumer.feed(bytes.as_ref());
                if consumer.is_finished() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Research stream read failed");
                consumer.fail(&format!("Stream interrupted: {}", e));
                return;
            }
        }
    }
    consumer.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Transcript;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn data(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    fn ok_chunks(chunks: &[&str]) -> Vec<Result<Bytes, std::io::Error>> {
        chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect()
    }

    async fn run(chunks: Vec<Result<Bytes, std::io::Error>>) -> Transcript {
        let mut transcript = Transcript::default();
        consume_stream(futures::stream::iter(chunks), &mut transcript).await;
        transcript
    }

    #[tokio::test]
    async fn test_deltas_are_batched() {
        let body: String = ["Tenants ", "have ", "rights ", "too."]
            .iter()
            .map(|t| data(t))
            .collect();
        let t = run(ok_chunks(&[&body])).await;

        assert_eq!(t.deltas, vec!["Tenants have rights ", "too."]);
        assert_eq!(t.done_calls, 1);
        assert_eq!(t.error, None);
    }

    #[tokio::test]
    async fn test_split_data_line_yields_delta_once() {
        let line = data("deposit");
        let (a, b) = line.split_at(17);
        let t = run(ok_chunks(&[a, b])).await;
        assert_eq!(t.text(), "deposit");
        assert_eq!(t.deltas.len(), 1);
    }

    #[tokio::test]
    async fn test_done_marker_stops_processing() {
        let body = format!("{}data: [DONE]\n\n{}", data("before"), data("after"));
        let t = run(ok_chunks(&[&body])).await;
        assert_eq!(t.text(), "before");
        assert_eq!(t.done_calls, 1);
    }

    #[tokio::test]
    async fn test_skips_noise() {
        let body = format!(
            ": keep-alive\n\nevent: message\ndata: {}\n\ndata:{}\n{}",
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n"
        );
        let t = run(ok_chunks(&[&body])).await;
        assert_eq!(t.text(), "ok");
        assert_eq!(t.done_calls, 1);
    }

    #[tokio::test]
    async fn test_unterminated_final_line_is_processed() {
        let line = data("last words");
        let t = run(ok_chunks(&[line.trim_end()])).await;
        assert_eq!(t.text(), "last words");
        assert_eq!(t.done_calls, 1);
    }

    #[tokio::test]
    async fn test_malformed_line_retried_then_dropped() {
        let first = "data: {\"choices\":[{\"delta\":\n";
        let second = data("recovered");
        let t = run(ok_chunks(&[first, &second])).await;
        assert_eq!(t.text(), "recovered");
        assert_eq!(t.done_calls, 1);
    }

    #[tokio::test]
    async fn test_read_error_after_content() {
        let chunks = vec![
            Ok(Bytes::from(data("partial"))),
            Err(std::io::Error::other("connection reset")),
        ];
        let t = run(chunks).await;
        assert_eq!(t.text(), "partial");
        assert_eq!(t.error.as_deref(), Some("Stream interrupted: connection reset"));
        assert_eq!(t.done_calls, 1);
    }

    #[tokio::test]
    async fn test_read_error_before_content() {
        let chunks = vec![Err(std::io::Error::other("refused"))];
        let t = run(chunks).await;
        assert!(t.deltas.is_empty());
        assert!(t.error.is_some());
        assert_eq!(t.done_calls, 0);
    }

    #[test]
    fn test_done_fires_once() {
        let mut transcript = Transcript::default();
        let mut consumer = StreamConsumer::new(&mut transcript);
        consumer.feed(b"data: [DONE]\n");
        consumer.feed(data("ignored").as_bytes());
        consumer.finish();
        consumer.fail("late");
        assert_eq!(transcript.done_calls, 1);
        assert_eq!(transcript.error, None);
        assert!(transcript.deltas.is_empty());
    }

    proptest! {
        #[test]
        fn prop_chunk_boundaries_preserve_text(
            words in proptest::collection::vec("[a-zA-Zé⚖ ]{1,8}", 1..10),
            cuts in proptest::collection::vec(any::<usize>(), 0..10),
        ) {
            let body: String = words.iter().map(|w| data(w)).collect();
            let bytes = body.as_bytes();
            let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
            points.push(0);
            points.push(bytes.len());
            points.sort_unstable();

            let mut transcript = Transcript::default();
            let mut consumer = StreamConsumer::new(&mut transcript);
            for pair in points.windows(2) {
                consumer.feed(&bytes[pair[0]..pair[1]]);
            }
            consumer.finish();

            prop_assert_eq!(transcript.text(), words.concat());
            prop_assert_eq!(transcript.done_calls, 1);
        }
    }
}
