use thiserror::Error;

/// Rejected locally, before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("type a message first")]
    Empty,
    #[error("wait for the current reply to finish")]
    Busy,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("proxy returned {status}: {message}")]
    Proxy { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}
