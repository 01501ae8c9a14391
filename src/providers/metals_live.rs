use crate::core::quote::{Commodity, SpotPrice, SpotPriceProvider};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// International spot prices (USD per troy ounce) from metals.live.
pub struct MetalsLiveProvider {
    base_url: String,
    client: reqwest::Client,
}

impl MetalsLiveProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etf-tracker/1.0")
            .timeout(timeout)
            .build()?;
        Ok(MetalsLiveProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    price: Option<f64>,
}

#[async_trait]
impl SpotPriceProvider for MetalsLiveProvider {
    #[instrument(name = "MetalsSpotFetch", skip(self), fields(commodity = %commodity))]
    async fn fetch_spot(&self, commodity: Commodity) -> Result<SpotPrice> {
        let url = format!("{}/v1/spot/{}", self.base_url, commodity.slug());
        debug!("Requesting spot price from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for commodity: {}", e, commodity))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for commodity: {}",
                response.status(),
                commodity
            ));
        }

        let text = response.text().await?;
        let data: SpotResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse spot response for {}: {}", commodity, e))?;

        let price = data
            .price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| anyhow!("No spot price found for commodity: {}", commodity))?;

        Ok(SpotPrice {
            commodity,
            usd_per_ounce: price,
            captured_at: Utc::now(),
        })
    }
}
