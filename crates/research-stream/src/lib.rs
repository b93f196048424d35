//! Streaming consumer for Legal Compass AI research
//!
//! The research function answers with an OpenAI-style event stream:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Under "}}]}
//!
//! data: {"choices":[{"delta":{"content":"Florida law"}}]}
//!
//! data: [DONE]
//! ```
//!
//! [`ResearchClient::stream_legal_research`] posts the conversation and feeds
//! the body through a [`StreamConsumer`], which calls back into a
//! [`StreamHandler`] as text arrives.

pub mod client;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod lines;
pub mod sse;
pub mod types;

pub use client::{ResearchClient, RESEARCH_PATH};
pub use consumer::{consume_stream, StreamConsumer, DELTA_BATCH_SIZE};
pub use error::ResearchError;
pub use handler::{Callbacks, StreamHandler, Transcript};
pub use lines::LineBuffer;
pub use sse::{classify, extract_delta, SseLine, DONE_MARKER};
pub use types::{ConversationTurn, FileReference, ResearchRequest, Role};
