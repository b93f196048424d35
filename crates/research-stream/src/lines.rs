//! Byte-level line splitting
//!
//! Chunks are appended as raw bytes and lines are only decoded once their
//! terminating `\n` has arrived, so a UTF-8 sequence split across chunks is
//! reassembled before decoding.

use bytes::{Buf, BytesMut};

#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

fn decode(mut raw: &[u8]) -> String {
    if let [rest @ .., b'\r'] = raw {
        raw = rest;
    }
    String::from_utf8_lossy(raw).into_owned()
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf.split_to(pos);
        self.buf.advance(1);
        Some(decode(&line))
    }

    /// Put a line back in front of the buffered bytes
    pub fn unshift(&mut self, line: &str) {
        let mut restored = BytesMut::with_capacity(line.len() + 1 + self.buf.len());
        restored.extend_from_slice(line.as_bytes());
        restored.extend_from_slice(b"\n");
        restored.extend_from_slice(&self.buf);
        self.buf = restored;
    }

    /// Take whatever remains once the input has ended
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(decode(&rest))
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
