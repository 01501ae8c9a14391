use crate::core::config::MarketConfig;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Regular trading session of the domestic exchange. No holiday calendar.
#[derive(Debug, Clone)]
pub struct MarketHours {
    pub timezone: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub weekend: Vec<Weekday>,
}

impl TryFrom<&MarketConfig> for MarketHours {
    type Error = anyhow::Error;

    fn try_from(config: &MarketConfig) -> Result<Self> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|e| anyhow!("Invalid market timezone '{}': {}", config.timezone, e))?;
        let open = parse_time(&config.open).context("Invalid market open time")?;
        let close = parse_time(&config.close).context("Invalid market close time")?;
        if open > close {
            return Err(anyhow!(
                "Market open time {} is after close time {}",
                config.open,
                config.close
            ));
        }
        Ok(MarketHours {
            timezone,
            open,
            close,
            weekend: config.weekend.clone(),
        })
    }
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Expected HH:MM, got '{value}'"))
}

impl MarketHours {
    /// True when `now` falls on a trading day within the session.
    ///
    /// Comparison is at minute resolution and inclusive at both ends, so the
    /// whole of the closing minute counts as open.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.timezone);
        if self.weekend.contains(&local.weekday()) {
            return false;
        }
        let minute = match NaiveTime::from_hms_opt(local.hour(), local.minute(), 0) {
            Some(t) => t,
            None => return false,
        };
        self.open <= minute && minute <= self.close
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        self.timezone.from_utc_datetime(&now.naive_utc())
    }
}
