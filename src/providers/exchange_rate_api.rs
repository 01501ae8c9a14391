use crate::core::quote::{ExchangeRate, ExchangeRateProvider};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// USD/INR from the exchangerate-api.com free endpoint.
pub struct ExchangeRateApiProvider {
    url: String,
    target: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etf-tracker/1.0")
            .timeout(timeout)
            .build()?;
        Ok(ExchangeRateApiProvider {
            url: url.to_string(),
            target: "INR".to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
    time_last_updated: Option<i64>,
}

#[async_trait]
impl ExchangeRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ForexFetch", skip(self))]
    async fn fetch_rate(&self) -> Result<ExchangeRate> {
        debug!("Requesting exchange rates from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency: {}", e, self.target))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency: {}",
                response.status(),
                self.target
            ));
        }

        let text = response.text().await?;
        let data: RatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", self.target, e))?;

        let rate = data
            .rates
            .get(&self.target)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| anyhow!("No rate data found for currency: {}", self.target))?;

        let updated_at = data
            .time_last_updated
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        Ok(ExchangeRate { rate, updated_at })
    }
}
