//! Reconciles fetched market data into a single report for one run.
use crate::core::config::Instrument;
use crate::core::nav::{compute_nav_with, compute_premium_discount};
use crate::core::quote::{Commodity, ExchangeRate, Quote, SpotPrice};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use tracing::debug;

/// A failure recorded during a run, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct RunError {
    /// Which source failed, e.g. an instrument symbol, "Gold spot" or "Forex".
    pub source: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl RunError {
    pub fn new(source: impl Into<String>, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        RunError {
            source: source.into(),
            message: message.into(),
            at,
        }
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Everything the fetch steps produced. Missing values are `None`.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    pub quotes: HashMap<String, Option<Quote>>,
    pub spots: BTreeMap<Commodity, Option<SpotPrice>>,
    pub exchange_rate: Option<ExchangeRate>,
}

/// Report section for one tracked ETF.
#[derive(Debug, Clone)]
pub struct InstrumentReport {
    pub instrument: Instrument,
    pub quote: Option<Quote>,
    pub nav: Option<f64>,
    pub premium_discount: Option<f64>,
}

impl InstrumentReport {
    pub fn is_available(&self) -> bool {
        self.quote.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub market_open: bool,
    pub instruments: Vec<InstrumentReport>,
    pub spots: BTreeMap<Commodity, Option<SpotPrice>>,
    pub exchange_rate: Option<ExchangeRate>,
    /// Symbol of the best performing instrument today.
    pub winner: Option<String>,
    pub errors: Vec<RunError>,
}

impl Report {
    pub fn spot(&self, commodity: Commodity) -> Option<&SpotPrice> {
        self.spots.get(&commodity).and_then(|s| s.as_ref())
    }

    pub fn section(&self, symbol: &str) -> Option<&InstrumentReport> {
        self.instruments
            .iter()
            .find(|s| s.instrument.symbol == symbol)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Combines the run's data into a report. Never fails: each instrument is
/// reconciled on its own and every derived value is `None` unless all of its
/// inputs are present.
pub fn build_report(
    instruments: &[Instrument],
    troy_ounce_grams: f64,
    data: MarketData,
    market_open: bool,
    errors: Vec<RunError>,
    generated_at: DateTime<Utc>,
) -> Report {
    let MarketData {
        mut quotes,
        spots,
        exchange_rate,
    } = data;
    let fx_rate = exchange_rate.as_ref().map(|fx| fx.rate);

    let sections: Vec<InstrumentReport> = instruments
        .iter()
        .map(|instrument| {
            let quote = quotes.remove(&instrument.symbol).flatten();
            let spot = spots
                .get(&instrument.commodity)
                .and_then(|s| s.as_ref())
                .map(|s| s.usd_per_ounce);
            let nav = compute_nav_with(spot, fx_rate, instrument.units_per_share, troy_ounce_grams);
            let premium_discount = quote
                .as_ref()
                .and_then(|q| compute_premium_discount(q.last_price, nav));
            debug!(
                symbol = %instrument.symbol,
                available = quote.is_some(),
                ?nav,
                ?premium_discount,
                "Reconciled instrument"
            );
            InstrumentReport {
                instrument: instrument.clone(),
                quote,
                nav,
                premium_discount,
            }
        })
        .collect();

    let winner = determine_winner(&sections);

    Report {
        generated_at,
        market_open,
        instruments: sections,
        spots,
        exchange_rate,
        winner,
        errors,
    }
}

/// The instrument whose percent change is strictly greater than every other.
///
/// No winner is declared on a tie, when fewer than two instruments are
/// tracked, or when any instrument lacks a percent change.
pub fn determine_winner(sections: &[InstrumentReport]) -> Option<String> {
    if sections.len() < 2 {
        return None;
    }
    let mut changes = Vec::with_capacity(sections.len());
    for section in sections {
        let change = section.quote.as_ref()?.percent_change?;
        changes.push((section.instrument.symbol.as_str(), change));
    }
    let (best_symbol, best) = changes
        .iter()
        .copied()
        .fold(None, |acc: Option<(&str, f64)>, (symbol, change)| match acc {
            Some((_, c)) if c >= change => acc,
            _ => Some((symbol, change)),
        })?;
    let tied = changes
        .iter()
        .filter(|(_, change)| *change == best)
        .count()
        > 1;
    (!tied).then(|| best_symbol.to_string())
}

/// Formats traded volume and value using Indian magnitude suffixes.
pub fn format_number(value: Option<f64>) -> String {
    let num = match value {
        Some(v) if v.is_finite() => v,
        _ => return "N/A".to_string(),
    };
    if num >= 10_000_000.0 {
        format!("{:.2}Cr", num / 10_000_000.0)
    } else if num >= 100_000.0 {
        format!("{:.2}L", num / 100_000.0)
    } else if num >= 1_000.0 {
        format!("{:.2}K", num / 1_000.0)
    } else {
        format!("{num:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AppConfig, DEFAULT_TROY_OUNCE_GRAMS};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 6, 0, 0).unwrap()
    }

    fn quote(symbol: &str, ltp: f64, pchange: Option<f64>) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            last_price: Some(ltp),
            open: Some(ltp),
            high: Some(ltp),
            low: Some(ltp),
            previous_close: Some(ltp),
            change: Some(0.0),
            percent_change: pchange,
            volume: Some(250_000.0),
            traded_value: Some(1.5e9),
            captured_at: now(),
        }
    }

    fn spot(commodity: Commodity, price: f64) -> Option<SpotPrice> {
        Some(SpotPrice {
            commodity,
            usd_per_ounce: price,
            captured_at: now(),
        })
    }

    fn full_data() -> MarketData {
        let mut data = MarketData::default();
        data.quotes.insert(
            "TATAGOLD".to_string(),
            Some(quote("TATAGOLD", 6050.0, Some(0.8))),
        );
        data.quotes.insert(
            "TATSILV".to_string(),
            Some(quote("TATSILV", 80.0, Some(1.2))),
        );
        data.spots.insert(Commodity::Gold, spot(Commodity::Gold, 2000.0));
        data.spots
            .insert(Commodity::Silver, spot(Commodity::Silver, 25.0));
        data.exchange_rate = Some(ExchangeRate {
            rate: 83.0,
            updated_at: None,
        });
        data
    }

    fn build(data: MarketData, errors: Vec<RunError>) -> Report {
        let config = AppConfig::default();
        build_report(
            &config.instruments,
            DEFAULT_TROY_OUNCE_GRAMS,
            data,
            true,
            errors,
            now(),
        )
    }

    #[test]
    fn test_full_report() {
        let report = build(full_data(), vec![]);

        let gold = report.section("TATAGOLD").unwrap();
        assert!(gold.is_available());
        assert!((gold.nav.unwrap() - 5337.02).abs() < 0.01);
        assert!((gold.premium_discount.unwrap() - 13.36).abs() < 0.01);

        let silver = report.section("TATSILV").unwrap();
        assert!((silver.nav.unwrap() - 66.71).abs() < 0.01);
        assert!((silver.premium_discount.unwrap() - 19.92).abs() < 0.01);

        assert_eq!(report.winner.as_deref(), Some("TATSILV"));
        assert!(report.market_open);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_missing_fx_leaves_quotes_and_drops_navs() {
        let mut data = full_data();
        data.exchange_rate = None;
        let errors = vec![RunError::new("Forex", "timed out", now())];
        let report = build(data, errors);

        for section in &report.instruments {
            assert!(section.is_available());
            assert!(section.nav.is_none());
            assert!(section.premium_discount.is_none());
        }
        assert_eq!(
            report.section("TATAGOLD").unwrap().quote.as_ref().unwrap().volume,
            Some(250_000.0)
        );
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "Forex");
    }

    #[test]
    fn test_missing_quote_does_not_block_other_instrument() {
        let mut data = full_data();
        data.quotes.insert("TATAGOLD".to_string(), None);
        let report = build(data, vec![]);

        let gold = report.section("TATAGOLD").unwrap();
        assert!(!gold.is_available());
        assert!(gold.premium_discount.is_none());
        // NAV only depends on spot and FX
        assert!(gold.nav.is_some());

        let silver = report.section("TATSILV").unwrap();
        assert!(silver.is_available());
        assert!(silver.premium_discount.is_some());
        assert!(report.winner.is_none());
    }

    #[test]
    fn test_missing_spot_drops_only_that_nav() {
        let mut data = full_data();
        data.spots.insert(Commodity::Silver, None);
        let report = build(data, vec![]);

        assert!(report.section("TATAGOLD").unwrap().nav.is_some());
        assert!(report.section("TATSILV").unwrap().nav.is_none());
        assert!(report.spot(Commodity::Silver).is_none());
        assert!(report.spot(Commodity::Gold).is_some());
    }

    #[test]
    fn test_empty_data_builds_unavailable_report() {
        let report = build(MarketData::default(), vec![]);
        assert_eq!(report.instruments.len(), 2);
        assert!(report.instruments.iter().all(|s| !s.is_available()));
        assert!(report.instruments.iter().all(|s| s.nav.is_none()));
        assert!(report.exchange_rate.is_none());
        assert!(report.winner.is_none());
    }

    #[test]
    fn test_winner_tie_declares_none() {
        let mut data = full_data();
        data.quotes.insert(
            "TATAGOLD".to_string(),
            Some(quote("TATAGOLD", 6050.0, Some(1.2))),
        );
        assert!(build(data, vec![]).winner.is_none());
    }

    #[test]
    fn test_winner_requires_percent_change() {
        let mut data = full_data();
        data.quotes
            .insert("TATSILV".to_string(), Some(quote("TATSILV", 80.0, None)));
        assert!(build(data, vec![]).winner.is_none());
    }

    #[test]
    fn test_winner_handles_negative_changes() {
        let mut data = full_data();
        data.quotes.insert(
            "TATAGOLD".to_string(),
            Some(quote("TATAGOLD", 6050.0, Some(-0.4))),
        );
        data.quotes.insert(
            "TATSILV".to_string(),
            Some(quote("TATSILV", 80.0, Some(-1.5))),
        );
        assert_eq!(build(data, vec![]).winner.as_deref(), Some("TATAGOLD"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Some(123_456_789.0)), "12.35Cr");
        assert_eq!(format_number(Some(10_000_000.0)), "1.00Cr");
        assert_eq!(format_number(Some(250_000.0)), "2.50L");
        assert_eq!(format_number(Some(100_000.0)), "1.00L");
        assert_eq!(format_number(Some(1_500.0)), "1.50K");
        assert_eq!(format_number(Some(999.0)), "999");
        assert_eq!(format_number(Some(0.0)), "0");
    }

    #[test]
    fn test_format_number_not_available() {
        assert_eq!(format_number(None), "N/A");
        assert_eq!(format_number(Some(f64::NAN)), "N/A");
        assert_eq!(format_number(Some(f64::INFINITY)), "N/A");
    }
}
