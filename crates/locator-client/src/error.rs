use thiserror::Error;

/// Failures while building a client. Request-time failures are reported as
/// [`chain_locator::SourceError`] instead.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("invalid authorization header")]
    InvalidAuthHeader,
}
