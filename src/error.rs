// Error types shared by the transfer client, the handle store and the
// view controller. The binary itself works with `anyhow::Result`; the
// library keeps a classified enum so callers (and tests) can tell a
// refused connection apart from a server-side rejection or a bad body.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The selected file contains no bytes.
    #[error("the selected file is empty")]
    EmptyPayload,

    /// The payload exceeds the size the service accepts.
    #[error("file is {size} bytes, the service accepts at most {max} bytes")]
    TooLarge { size: usize, max: usize },

    /// The payload's MIME type cannot be put on a multipart part.
    #[error("invalid mime type {0}")]
    InvalidMime(String),

    /// Reading the selected file or writing a handle failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("server rejected the request: {status} - {body}")]
    Rejected { status: StatusCode, body: String },

    /// The response body is not a readable image.
    #[error("could not decode response body: {0}")]
    Decode(String),

    /// The configuration file could not be read or written.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short, stable name of the failure class, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::EmptyPayload | Error::TooLarge { .. } | Error::InvalidMime(_) => "payload",
            Error::Io(_) => "io",
            Error::Network(_) => "network",
            Error::Rejected { .. } => "rejected",
            Error::Decode(_) => "decode",
            Error::Config(_) => "config",
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
