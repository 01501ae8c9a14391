use crate::core::quote::{Quote, QuoteProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// ETF quotes from the National Stock Exchange of India quote API.
///
/// The API only answers requests that carry the cookies set by the public
/// site, so the client keeps a cookie store and visits the base URL first.
pub struct NseQuoteProvider {
    base_url: String,
    client: reqwest::Client,
}

impl NseQuoteProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(NseQuoteProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn warm_up(&self) {
        // Best effort: a failure here surfaces on the quote request itself.
        if let Err(e) = self.client.get(&self.base_url).send().await {
            debug!("NSE warm-up request failed: {}", e);
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NseQuoteResponse {
    price_info: Option<PriceInfo>,
    market_dept_order_book: Option<OrderBook>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceInfo {
    last_price: Option<f64>,
    open: Option<f64>,
    close: Option<f64>,
    previous_close: Option<f64>,
    change: Option<f64>,
    p_change: Option<f64>,
    intra_day_high_low: Option<HighLow>,
}

#[derive(Debug, Deserialize)]
struct HighLow {
    max: Option<f64>,
    min: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderBook {
    total_traded_volume: Option<f64>,
    total_traded_value: Option<f64>,
    trade_info: Option<TradeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeInfo {
    total_traded_volume: Option<f64>,
    total_traded_value: Option<f64>,
}

#[async_trait]
impl QuoteProvider for NseQuoteProvider {
    #[instrument(name = "NseQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        self.warm_up().await;

        let url = format!("{}/api/quote-equity?symbol={}", self.base_url, symbol);
        debug!("Requesting quote from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: NseQuoteResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse NSE response for {symbol}"))?;

        let price_info = data
            .price_info
            .ok_or_else(|| anyhow!("No price info found for symbol: {}", symbol))?;

        let (volume, traded_value) = match data.market_dept_order_book {
            Some(book) => {
                let trade_info = book.trade_info.as_ref();
                (
                    trade_info
                        .and_then(|t| t.total_traded_volume)
                        .or(book.total_traded_volume),
                    trade_info
                        .and_then(|t| t.total_traded_value)
                        .or(book.total_traded_value),
                )
            }
            None => (None, None),
        };

        let (high, low) = price_info
            .intra_day_high_low
            .as_ref()
            .map_or((None, None), |hl| (hl.max, hl.min));

        let quote = Quote {
            symbol: symbol.to_string(),
            last_price: price_info.last_price,
            open: price_info.open,
            high,
            low,
            previous_close: price_info.previous_close.or(price_info.close),
            change: price_info.change,
            percent_change: price_info.p_change,
            volume,
            traded_value,
            captured_at: Utc::now(),
        };
        debug!(ltp = ?quote.last_price, "Received NSE quote");
        Ok(quote)
    }
}
