use crate::domain::model::RawSourceRecord;
use crate::domain::ports::WeatherSource;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// OpenWeatherMap current weather API (`GET {endpoint}?q={city}&appid={key}`)
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl OpenWeatherClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    fn fetch_error(&self, city: &str, reason: String) -> EtlError {
        EtlError::SourceFetchError {
            source_name: city.to_string(),
            reason,
        }
    }

    /// 請求 URL 含有 API key，錯誤訊息一律去掉 URL
    fn transport_error(&self, city: &str, e: reqwest::Error) -> EtlError {
        let reason = if e.is_timeout() {
            format!("timed out after {:?}", self.timeout)
        } else {
            e.without_url().to_string()
        };
        self.fetch_error(city, reason)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self, city: &str) -> Result<RawSourceRecord> {
        tracing::debug!("Requesting current weather for {}", city);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(city, e))?;

        let status = response.status();
        tracing::debug!("API response status for {}: {}", city, status);
        if !status.is_success() {
            return Err(self.fetch_error(city, format!("HTTP status {}", status)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.transport_error(city, e))?;

        RawSourceRecord::from_json(body).map_err(|reason| self.fetch_error(city, reason))
    }
}
