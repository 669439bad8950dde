//! Forecast client for the weather provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use stormwatch_models::{ForecastDocument, Location};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{GatewayError, Result};

/// Longest request timeout the gateway accepts.
const MAX_TIMEOUT_SECS: u64 = 15;

/// Most forecast days one request may ask for.
const MAX_FORECAST_DAYS: u8 = 3;

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Provider base URL (default: <https://api.weatherapi.com/v1>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Provider API key
    pub api_key: String,

    /// Request timeout in seconds (default: 10, at most 15)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

const fn default_timeout() -> u64 {
    10
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: api_key.into(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Effective request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }
}

/// Source of forecast documents.
///
/// Any `Err` means the data is currently unavailable; implementations log
/// the cause and never panic.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch a forecast of `days` days (1 to 3) for a location.
    async fn fetch(&self, location: &Location, days: u8) -> Result<ForecastDocument>;
}

/// HTTP gateway to the provider.
///
/// The connection pool is created on first use and shared by all concurrent
/// callers. Duplicate in-flight requests for one location are not merged.
#[derive(Debug)]
pub struct WeatherGateway {
    config: GatewayConfig,
    endpoint: Url,
    client: RwLock<Option<Client>>,
}

impl WeatherGateway {
    /// Create a gateway. No connection is made until the first fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not a valid URL.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let endpoint = format!("{}/forecast.json", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint).map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            config,
            endpoint,
            client: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Whether the connection pool is currently allocated.
    pub async fn is_open(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Release the connection pool.
    ///
    /// Requests already in flight keep their handle and finish normally; a
    /// later fetch allocates a fresh pool.
    pub async fn close(&self) {
        if self.client.write().await.take().is_some() {
            info!("Weather gateway connection pool released");
        }
    }

    /// Like [`ForecastSource::fetch`], collapsing every failure to `None`.
    pub async fn fetch_or_absent(&self, location: &Location, days: u8) -> Option<ForecastDocument> {
        self.fetch(location, days).await.ok()
    }

    async fn client(&self) -> Result<Client> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .timeout(self.config.timeout())
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        debug!(timeout_secs = self.config.timeout().as_secs(), "Weather gateway connection pool created");
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn request(&self, location: &Location, days: u8) -> Result<ForecastDocument> {
        let client = self.client().await?;
        let days = days.clamp(1, MAX_FORECAST_DAYS).to_string();

        let response = client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("q", location.coordinates.as_str()),
                ("days", days.as_str()),
                ("alerts", "yes"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let document = response.json::<ForecastDocument>().await?;
        Ok(document)
    }
}

#[async_trait]
impl ForecastSource for WeatherGateway {
    #[instrument(skip(self, location), fields(location = %location.name))]
    async fn fetch(&self, location: &Location, days: u8) -> Result<ForecastDocument> {
        match self.request(location, days).await {
            Ok(document) => {
                debug!(days = document.days().len(), "Forecast fetched");
                Ok(document)
            }
            Err(e) => {
                warn!(error = %e, "Forecast unavailable");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GatewayConfig::new("key");
        assert_eq!(config.base_url, "https://api.weatherapi.com/v1");
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_timeout_is_bounded() {
        let config = GatewayConfig::new("key").with_timeout_secs(120);
        assert_eq!(config.timeout(), Duration::from_secs(15));
        let config = GatewayConfig::new("key").with_timeout_secs(0);
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let gateway =
            WeatherGateway::new(GatewayConfig::new("key").with_base_url("http://localhost:9000/v1/"))
                .unwrap();
        assert_eq!(gateway.endpoint.as_str(), "http://localhost:9000/v1/forecast.json");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = WeatherGateway::new(GatewayConfig::new("key").with_base_url("not a url"));
        assert!(matches!(result, Err(GatewayError::Client(_))));
    }

    #[tokio::test]
    async fn test_pool_is_lazy_and_closable() {
        let gateway = WeatherGateway::new(GatewayConfig::new("key")).unwrap();
        assert!(!gateway.is_open().await);

        gateway.client().await.unwrap();
        assert!(gateway.is_open().await);

        gateway.close().await;
        assert!(!gateway.is_open().await);
    }
}
