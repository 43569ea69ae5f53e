//! Semantic alignment oracle backed by a chat-completions model.
//!
//! Prompt building and the retry policy are transport-independent; the HTTP
//! client sits behind the `http` feature.

pub mod prompt;
pub mod retry;

#[cfg(feature = "http")]
pub mod http;

pub use retry::{RetryPolicy, Transient};

#[cfg(feature = "http")]
pub use http::{ChatError, ChatOracle, OracleConfig};
