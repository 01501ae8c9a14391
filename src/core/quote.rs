//! Market data types and the provider abstractions that produce them

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A precious metal tracked by one of the ETFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commodity {
    Gold,
    Silver,
}

impl Commodity {
    pub fn all() -> [Commodity; 2] {
        [Commodity::Gold, Commodity::Silver]
    }

    /// Lowercase identifier used in provider URLs.
    pub fn slug(&self) -> &'static str {
        match self {
            Commodity::Gold => "gold",
            Commodity::Silver => "silver",
        }
    }
}

impl Display for Commodity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Commodity::Gold => "Gold",
                Commodity::Silver => "Silver",
            }
        )
    }
}

impl FromStr for Commodity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gold" | "xau" => Ok(Commodity::Gold),
            "silver" | "xag" => Ok(Commodity::Silver),
            _ => Err(anyhow::anyhow!("Invalid commodity: {}", s)),
        }
    }
}

/// A single market snapshot of an exchange traded instrument.
///
/// Price fields are optional because upstream payloads are frequently
/// incomplete; the validator decides whether a quote is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
    pub volume: Option<f64>,
    pub traded_value: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

/// International spot price of a commodity, in USD per troy ounce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotPrice {
    pub commodity: Commodity,
    pub usd_per_ounce: f64,
    pub captured_at: DateTime<Utc>,
}

/// Domestic currency value of one USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub rate: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;
}

#[async_trait]
pub trait SpotPriceProvider: Send + Sync {
    async fn fetch_spot(&self, commodity: Commodity) -> Result<SpotPrice>;
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn fetch_rate(&self) -> Result<ExchangeRate>;
}
