//! Boundary to the external generative-language service.

use std::fmt;

/// One chat-style completion round-trip. Implementations own transport,
/// timeouts, and at most one automatic retry; the kernel only sees the
/// final text or a typed failure.
pub trait CompletionClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Request could not be sent or the response could not be read.
    Transport(String),
    /// The service answered but refused to serve (still cold, overloaded,
    /// or not configured at all).
    Unavailable(String),
    /// The service answered with an empty body.
    EmptyResponse,
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(detail) => write!(f, "completion transport error: {detail}"),
            Self::Unavailable(detail) => write!(f, "completion service unavailable: {detail}"),
            Self::EmptyResponse => write!(f, "completion service returned an empty response"),
        }
    }
}

impl std::error::Error for CompletionError {}
