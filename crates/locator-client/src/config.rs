use crate::error::ClientError;
use reqwest::{
    Client,
    header::{
        AUTHORIZATION,
        HeaderMap,
        HeaderValue,
    },
};
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoint settings shared by the RPC and indexer clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: Url,
    /// Sent as `Authorization: Bearer <token>` on every request.
    pub bearer_token: Option<String>,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: &str) -> Result<Self, ClientError> {
        let config = Self {
            url: Url::parse(url)?,
            bearer_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        match self.url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ClientError::UnsupportedScheme(other.to_string())),
        }
    }

    pub(crate) fn http_client(&self) -> Result<Client, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClientError::InvalidAuthHeader)?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Client::builder()
            .use_rustls_tls()
            .timeout(self.request_timeout)
            .default_headers(headers)
            .build()?)
    }
}
