use thiserror::Error;

use super::platforms::youtube::cipher::CipherError;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("missing content length: {0}")]
    MissingContentLength(String),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("{0} not found in page")]
    PatternNotFound(&'static str),
    #[error("signature cipher error: {0}")]
    Cipher(#[from] CipherError),
    #[error("unsupported extractor")]
    UnsupportedExtractor,
    #[error("login required")]
    LoginRequired,
    #[error("no streams found")]
    NoStreamsFound,
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("cancelled")]
    Cancelled,
    #[error("other: {0}")]
    Other(String),
}

impl ExtractorError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
