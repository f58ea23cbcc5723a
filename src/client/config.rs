//! Client configuration.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

/// Production API root.
pub const DEFAULT_SERVER_URL: &str = "https://iotile.cloud/api/v1";

/// Settings for [`CloudClient`](crate::client::CloudClient).
///
/// Deserializable so hosts can keep it in a JSON settings file; missing
/// fields take their defaults.
///
/// # Examples
///
/// ```
/// use iotile_cloud::client::ClientConfig;
///
/// let config = ClientConfig {
///     server_url: "https://staging.example.com/api/v1".to_string(),
///     token: Some("abc".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `https://iotile.cloud/api/v1`
    pub server_url: String,
    /// Per-request timeout
    pub request_timeout_ms: u64,
    /// Idle connections kept per host
    pub max_total_connections: u32,
    /// Proxy for all requests; empty for none
    pub proxy_url: String,
    /// Log each request and response status at `debug`
    pub enable_logging: bool,
    /// Sent as `Authorization: JWT <token>` when set
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_ms: 30_000,
            max_total_connections: 10,
            proxy_url: String::new(),
            enable_logging: true,
            token: None,
        }
    }
}

/// One selectable cloud server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Short name, e.g. `PRODUCTION`
    pub short_name: String,
    /// Human readable name
    pub long_name: String,
    /// API root
    pub url: String,
    /// Whether this server is selected when none is chosen
    #[serde(default)]
    pub default: bool,
}

impl ClientConfig {
    /// Default configuration pointed at the server marked `default`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::NoServer`] when no server is marked default.
    pub fn from_servers(servers: &[ServerInfo]) -> Result<Self> {
        let server = servers
            .iter()
            .find(|server| server.default)
            .ok_or(CloudError::NoServer)?;

        Ok(ClientConfig {
            server_url: server.url.clone(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_value(json!({
            "server_url": "http://localhost:8000/api/v1",
            "enable_logging": false
        }))
        .unwrap();

        assert_eq!(config.server_url, "http://localhost:8000/api/v1");
        assert!(!config.enable_logging);
        assert_eq!(config.request_timeout_ms, 30_000);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_from_servers_picks_default() {
        let servers: Vec<ServerInfo> = serde_json::from_value(json!([
            {"shortName": "STAGE", "longName": "Staging", "url": "https://stage.example.com/api/v1"},
            {"shortName": "PROD", "longName": "Production", "url": DEFAULT_SERVER_URL, "default": true}
        ]))
        .unwrap();

        let config = ClientConfig::from_servers(&servers).unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);

        let err = ClientConfig::from_servers(&servers[..1]).unwrap_err();
        assert!(matches!(err, CloudError::NoServer));
    }
}
