//! Client configuration: endpoint and per-session query defaults.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_HOST: &str = "www.syndic8.com";
pub const DEFAULT_PATH: &str = "/xmlrpc.php";
pub const DEFAULT_PORT: u16 = 80;

/// `max_results` value meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// Where the XML-RPC endpoint lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub path: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            path: DEFAULT_PATH.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    pub fn new(host: &str, path: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            path: path.to_string(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }

    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.host.trim().is_empty() {
            return Err(ApiError::Connection("endpoint host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(ApiError::Connection("endpoint port is 0".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(ApiError::Connection(format!(
                "endpoint path {:?} must start with '/'",
                self.path
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    /// Feed fields requested when an operation is not given its own list.
    pub keys: Vec<String>,
    pub max_results: i64,
    pub sort_field: String,
    /// Prefix for method names that carry no namespace of their own.
    pub namespace: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            keys: ["sitename", "siteurl", "dataurl", "description"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_results: UNLIMITED,
            sort_field: "sitename".to_string(),
            namespace: "syndic8".to_string(),
            user_agent: format!("syndic8-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `SYNDIC8_HOST`, `SYNDIC8_PATH`, `SYNDIC8_PORT`
    /// and `SYNDIC8_MAX_RESULTS` from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(host) = lookup("SYNDIC8_HOST") {
            config.endpoint.host = host;
        }
        if let Some(path) = lookup("SYNDIC8_PATH") {
            config.endpoint.path = path;
        }
        if let Some(port) = lookup("SYNDIC8_PORT") {
            config.endpoint.port = port
                .parse()
                .map_err(|_| ApiError::Connection(format!("SYNDIC8_PORT {port:?} is not a port number")))?;
        }
        if let Some(max) = lookup("SYNDIC8_MAX_RESULTS") {
            config.max_results = max
                .parse()
                .map_err(|_| ApiError::Connection(format!("SYNDIC8_MAX_RESULTS {max:?} is not an integer")))?;
        }
        Ok(config)
    }
}
