//! Line classification for OpenAI-style event streams

use serde::Deserialize;

/// Payload that ends the stream
pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    Blank,
    /// `:` keep-alive or comment
    Comment,
    Done,
    Data(&'a str),
    /// `event:`, `id:`, `retry:` or anything else
    Other,
}

pub fn classify(line: &str) -> SseLine<'_> {
    if line.trim().is_empty() {
        return SseLine::Blank;
    }
    if line.starts_with(':') {
        return SseLine::Comment;
    }
    let Some(payload) = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
    else {
        return SseLine::Other;
    };
    if payload.trim() == DONE_MARKER {
        SseLine::Done
    } else {
        SseLine::Data(payload)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Text of `choices[0].delta.content`, if the envelope carries any
pub fn extract_delta(payload: &str) -> Result<Option<String>, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(payload)?;
    Ok(envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|c| !c.is_empty()))
}
