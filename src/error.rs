use thiserror::Error;

/// Errors raised by the session, auth and document layers.
///
/// Only [`Error::InvalidSession`] escapes a reconciliation pass; every other
/// remote failure is absorbed by the auth client and resolved to a deny.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid session: {0}")]
    InvalidSession(String),
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("unable to reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("session storage error: {0}")]
    Storage(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("config error: {0}")]
    Config(String),
    #[error("document error: {0}")]
    Document(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
