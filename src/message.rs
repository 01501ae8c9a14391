//! Telegram Markdown rendering of a run's report and error summary.
use crate::core::market::MarketHours;
use crate::core::nav::round2;
use crate::core::quote::Commodity;
use crate::core::report::{InstrumentReport, Report, RunError, format_number};
use chrono::{DateTime, Utc};

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━";
const UNAVAILABLE: &str = "⚠️ Data unavailable";

/// Backslash-escapes the characters that open an entity in Telegram's
/// legacy Markdown. Applied to every piece of text not written here.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn price(value: Option<f64>) -> String {
    value.map_or("N/A".to_string(), |v| format!("₹{v:.2}"))
}

fn plain(value: Option<f64>) -> String {
    value.map_or("N/A".to_string(), |v| format!("{v:.2}"))
}

fn commodity_icon(commodity: Commodity) -> &'static str {
    match commodity {
        Commodity::Gold => "💛",
        Commodity::Silver => "⚪",
    }
}

fn render_section(out: &mut String, section: &InstrumentReport) {
    let instrument = &section.instrument;
    let icon = instrument.icon.as_deref().unwrap_or("📌");
    out.push_str(&format!(
        "{icon} *{} ({})*\n",
        escape_markdown(&instrument.name.to_uppercase()),
        escape_markdown(&instrument.symbol)
    ));

    let Some(quote) = section.quote.as_ref() else {
        out.push_str(&format!("{UNAVAILABLE}\n"));
        return;
    };

    out.push_str(&format!("💰 LTP: {}\n", price(quote.last_price)));
    out.push_str(&format!("📊 Open: {}\n", price(quote.open)));
    out.push_str(&format!("📈 High: {}\n", price(quote.high)));
    out.push_str(&format!("📉 Low: {}\n", price(quote.low)));
    out.push_str(&format!(
        "🔄 Change: {} ({}%)\n",
        plain(quote.change),
        plain(quote.percent_change)
    ));
    out.push_str(&format!("📦 Volume: {}\n", format_number(quote.volume)));
    out.push_str(&format!(
        "💵 Value: ₹{}\n",
        format_number(quote.traded_value)
    ));

    if let Some(nav) = section.nav {
        out.push_str(&format!("🎯 iNAV: ₹{:.2}\n", round2(nav)));
    }
    if let Some(pd) = section.premium_discount {
        let label = if pd >= 0.0 { "Premium" } else { "Discount" };
        out.push_str(&format!("📊 {label}: {pd:.2}%\n"));
    }
}

/// Renders the primary run message. Sections whose data is missing are
/// rendered as unavailable instead of being dropped.
pub fn render_report(report: &Report, hours: &MarketHours) -> String {
    let local = hours.local_time(report.generated_at);
    let status = if report.market_open {
        "🟢 OPEN"
    } else {
        "🔴 CLOSED"
    };

    let mut out = String::new();
    out.push_str("📊 *ETF TRACKER UPDATE*\n");
    out.push_str(&format!("⏰ {}\n", local.format("%d-%b-%Y %I:%M %p %Z")));
    out.push_str(&format!("📈 Market Status: {status}\n"));

    for section in &report.instruments {
        out.push_str(&format!("\n{SEPARATOR}\n\n"));
        render_section(&mut out, section);
    }

    out.push_str(&format!("\n{SEPARATOR}\n\n"));
    out.push_str("🌍 *INTERNATIONAL PRICES*\n");
    let mut any_spot = false;
    for (commodity, spot) in &report.spots {
        if let Some(spot) = spot {
            any_spot = true;
            out.push_str(&format!(
                "{} {commodity}: ${:.2}/oz\n",
                commodity_icon(*commodity),
                spot.usd_per_ounce
            ));
        }
    }
    if !any_spot {
        out.push_str(&format!("{UNAVAILABLE}\n"));
    }

    out.push_str("\n💵 *FOREX*\n");
    match &report.exchange_rate {
        Some(fx) => out.push_str(&format!("USD/INR: ₹{:.2}\n", fx.rate)),
        None => out.push_str(&format!("{UNAVAILABLE}\n")),
    }

    out.push_str(&format!("\n{SEPARATOR}\n\n"));
    out.push_str("📌 *KEY METRICS*\n");
    let winner = report
        .winner
        .as_deref()
        .and_then(|symbol| report.section(symbol));
    match winner {
        Some(section) => {
            let icon = section.instrument.icon.as_deref().unwrap_or("🏆");
            out.push_str(&format!(
                "🏆 Today's Winner: {icon} {}\n",
                section.instrument.commodity
            ));
        }
        None => out.push_str("🏆 Today's Winner: None\n"),
    }
    if report.has_errors() {
        out.push_str(&format!(
            "⚠️ {} source(s) failed, see error summary\n",
            report.errors.len()
        ));
    }

    out.push_str("\n_Automated update_");
    out
}

/// Renders the supplementary message listing each error of the run.
///
/// Error text often carries raw upstream bodies (JSON with `_` keys), so
/// sources and messages are escaped before they reach Markdown.
pub fn render_error_summary(errors: &[RunError], hours: &MarketHours, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("🚨 *ETF TRACKER ERRORS*\n");
    out.push_str(&format!(
        "⏰ {}\n",
        hours.local_time(now).format("%d-%b-%Y %I:%M %p %Z")
    ));
    out.push_str(&format!("{} error(s) during this run:\n\n", errors.len()));
    for err in errors {
        out.push_str(&format!(
            "• [{}] {}: {}\n",
            hours.local_time(err.at).format("%H:%M:%S"),
            escape_markdown(&err.source),
            escape_markdown(&err.message)
        ));
    }
    out.trim_end().to_string()
}
