//! Drives a single scheduled run: fetch, validate, reconcile, deliver.
//!
//! Steps run strictly in sequence (quotes, then spots, then FX). Each fetch
//! step is isolated: it returns its value and at most one error, and the run
//! folds those into the report's error list. A failing source never stops
//! the remaining steps, and the report is always delivered.

use crate::core::config::{AppConfig, Instrument};
use crate::core::market::MarketHours;
use crate::core::notify::Notifier;
use crate::core::quote::{
    Commodity, ExchangeRate, ExchangeRateProvider, Quote, QuoteProvider, SpotPrice,
    SpotPriceProvider,
};
use crate::core::report::{MarketData, Report, RunError, build_report};
use crate::core::retry::{RetryPolicy, with_retry};
use crate::core::validate;
use crate::message;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{error, info, warn};

pub const FOREX_SOURCE: &str = "Forex";
pub const DELIVERY_SOURCE: &str = "Telegram";

/// Market data collaborators used by a run.
pub struct Sources<'a> {
    pub quotes: &'a dyn QuoteProvider,
    pub spots: &'a dyn SpotPriceProvider,
    pub exchange_rate: &'a dyn ExchangeRateProvider,
}

/// Output of one isolated fetch step.
#[derive(Debug)]
pub struct StepResult<T> {
    pub value: Option<T>,
    pub error: Option<RunError>,
}

impl<T> StepResult<T> {
    fn ok(value: T) -> Self {
        StepResult {
            value: Some(value),
            error: None,
        }
    }

    fn failed(error: RunError) -> Self {
        StepResult {
            value: None,
            error: Some(error),
        }
    }

    /// Moves the error, if any, into `errors` and returns the value.
    pub fn fold_into(self, errors: &mut Vec<RunError>) -> Option<T> {
        if let Some(err) = self.error {
            errors.push(err);
        }
        self.value
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub delivered: bool,
    /// `None` when the run had no errors to summarise.
    pub error_summary_delivered: Option<bool>,
    /// Errors from the report plus any delivery failure.
    pub errors: Vec<RunError>,
}

pub async fn fetch_quote_step(
    provider: &dyn QuoteProvider,
    instrument: &Instrument,
    policy: &RetryPolicy,
) -> StepResult<Quote> {
    let symbol = instrument.symbol.as_str();
    let fetched = with_retry(|| provider.fetch_quote(symbol), policy, symbol).await;
    let quote = match fetched {
        Ok(quote) => quote,
        Err(e) => return StepResult::failed(RunError::new(symbol, format!("{e:#}"), Utc::now())),
    };

    match validate::check(Some(&quote), instrument) {
        Ok(()) => StepResult::ok(quote),
        Err(reason) => {
            warn!(symbol, "Rejected quote: {}", reason);
            StepResult::failed(RunError::new(
                symbol,
                format!("Validation failed: {reason}"),
                Utc::now(),
            ))
        }
    }
}

pub async fn fetch_spot_step(
    provider: &dyn SpotPriceProvider,
    commodity: Commodity,
    policy: &RetryPolicy,
) -> StepResult<SpotPrice> {
    let label = format!("{commodity} spot");
    let fetched = with_retry(|| provider.fetch_spot(commodity), policy, &label).await;
    match fetched {
        Ok(spot) => StepResult::ok(spot),
        Err(e) => StepResult::failed(RunError::new(label, format!("{e:#}"), Utc::now())),
    }
}

pub async fn fetch_rate_step(
    provider: &dyn ExchangeRateProvider,
    policy: &RetryPolicy,
) -> StepResult<ExchangeRate> {
    match with_retry(|| provider.fetch_rate(), policy, FOREX_SOURCE).await {
        Ok(rate) => StepResult::ok(rate),
        Err(e) => StepResult::failed(RunError::new(FOREX_SOURCE, format!("{e:#}"), Utc::now())),
    }
}

/// Runs every fetch step in order. `on_step` is called once per finished step.
pub async fn collect(
    config: &AppConfig,
    sources: &Sources<'_>,
    policy: &RetryPolicy,
    on_step: &(dyn Fn(&str) + Sync),
) -> (MarketData, Vec<RunError>) {
    let mut errors = Vec::new();
    let mut data = MarketData::default();

    info!("Fetching quotes");
    for instrument in &config.instruments {
        let quote = fetch_quote_step(sources.quotes, instrument, policy)
            .await
            .fold_into(&mut errors);
        data.quotes.insert(instrument.symbol.clone(), quote);
        on_step(instrument.symbol.as_str());
    }

    info!("Fetching spot prices");
    let commodities: BTreeSet<Commodity> =
        config.instruments.iter().map(|i| i.commodity).collect();
    for commodity in commodities {
        let spot = fetch_spot_step(sources.spots, commodity, policy)
            .await
            .fold_into(&mut errors);
        data.spots.insert(commodity, spot);
        on_step(commodity.slug());
    }

    info!("Fetching exchange rate");
    data.exchange_rate = fetch_rate_step(sources.exchange_rate, policy)
        .await
        .fold_into(&mut errors);
    on_step(FOREX_SOURCE);

    (data, errors)
}

/// Number of `on_step` notifications `collect` emits for `config`.
pub fn step_count(config: &AppConfig) -> usize {
    let commodities: BTreeSet<Commodity> =
        config.instruments.iter().map(|i| i.commodity).collect();
    config.instruments.len() + commodities.len() + 1
}

/// Fetches and reconciles without delivering anything.
pub async fn build(
    config: &AppConfig,
    hours: &MarketHours,
    sources: &Sources<'_>,
    now: DateTime<Utc>,
    on_step: &(dyn Fn(&str) + Sync),
) -> Report {
    let policy = RetryPolicy::from(&config.retry);
    let (data, errors) = collect(config, sources, &policy, on_step).await;
    let report = build_report(
        &config.instruments,
        config.troy_ounce_grams,
        data,
        hours.is_open(now),
        errors,
        now,
    );
    info!(
        market_open = report.market_open,
        errors = report.errors.len(),
        "Report built"
    );
    report
}

/// Executes one full run and delivers its messages through `notifier`.
///
/// Only configuration errors are returned; source and delivery failures are
/// recorded in the outcome.
pub async fn run_once(
    config: &AppConfig,
    sources: &Sources<'_>,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    config.validate()?;
    let hours = MarketHours::try_from(&config.market)?;
    let report = build(config, &hours, sources, now, &|_: &str| {}).await;
    let mut errors = report.errors.clone();

    let text = message::render_report(&report, &hours);
    let delivered = match notifier.send(&text).await {
        Ok(()) => {
            info!("Report delivered");
            true
        }
        Err(e) => {
            warn!("Failed to deliver report: {:#}", e);
            errors.push(RunError::new(DELIVERY_SOURCE, format!("{e:#}"), Utc::now()));
            false
        }
    };

    let error_summary_delivered = if errors.is_empty() {
        None
    } else {
        let summary = message::render_error_summary(&errors, &hours, now);
        match notifier.send(&summary).await {
            Ok(()) => {
                info!(errors = errors.len(), "Error summary delivered");
                Some(true)
            }
            Err(e) => {
                error!("Failed to deliver error summary: {:#}", e);
                Some(false)
            }
        }
    };

    Ok(RunOutcome {
        report,
        delivered,
        error_summary_delivered,
        errors,
    })
}
