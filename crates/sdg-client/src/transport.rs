//! HTTP transport boundary.
//!
//! The rest of the client only needs "GET a URL, give me status and
//! body"; everything transport-specific (pooling, TLS, timeouts) stays
//! behind this trait, and tests script it with an in-memory mock.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// One HTTP response, fully buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The "key not present in this dataflow" signal.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// A failed request with no usable response (DNS, connect, timeout).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

/// Minimal fetch capability.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Blocking reqwest-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Config {
                path: std::path::PathBuf::from("<http client>"),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "*/*")
            .send()
            .map_err(|e| TransportError {
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError {
            message: e.to_string(),
        })?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let ok = HttpResponse {
            status: 200,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!ok.is_not_found());

        let missing = HttpResponse {
            status: 404,
            body: String::new(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_success());

        let flaky = HttpResponse {
            status: 503,
            body: String::new(),
        };
        assert!(!flaky.is_success());
        assert!(!flaky.is_not_found());
    }
}
