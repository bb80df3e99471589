//! Client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Public SDMX endpoint of the UNICEF indicator warehouse.
pub const DEFAULT_BASE_URL: &str = "https://sdmx.data.unicef.org/ws/public/sdmxapi/rest";

/// Agency owning the dataflows.
pub const DEFAULT_AGENCY: &str = "UNICEF";

/// User agent sent with every request.
const USER_AGENT_VALUE: &str = concat!("sdg-data/", env!("CARGO_PKG_VERSION"));

/// Settings for the fetch client. Serializable so a TOML file can
/// override any subset of the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub agency: String,
    /// Dataflow version used when a reference does not name one.
    pub dataflow_version: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Total attempts per request before giving up.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    pub retry_base_delay_ms: u64,
    /// Rows requested per page.
    pub page_size: usize,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            agency: DEFAULT_AGENCY.to_string(),
            dataflow_version: "1.0".to_string(),
            timeout_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 500,
            page_size: 100_000,
            user_agent: USER_AGENT_VALUE.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from a TOML file on top of the defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ClientError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ClientError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ClientError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = delay_ms;
        self
    }

    fn validate(self, path: &Path) -> Result<Self, ClientError> {
        if self.page_size == 0 {
            return Err(ClientError::Config {
                path: path.to_path_buf(),
                message: "page_size must be at least 1".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(ClientError::Config {
                path: path.to_path_buf(),
                message: "max_retries must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}
