use super::ui;
use crate::core::config::AppConfig;
use crate::core::market::MarketHours;
use crate::core::quote::Commodity;
use crate::providers::telegram::TelegramNotifier;
use crate::tracker::Sources;
use anyhow::{Result, bail};
use chrono::Utc;

struct CheckResult {
    name: String,
    outcome: Result<String>,
}

fn print_result(result: &CheckResult) {
    match &result.outcome {
        Ok(detail) => println!(
            "  {} {} {}",
            ui::style_text("✔", ui::StyleType::Good),
            result.name,
            ui::style_text(detail, ui::StyleType::Subtle)
        ),
        Err(e) => println!(
            "  {} {} {}",
            ui::style_text("✘", ui::StyleType::Error),
            result.name,
            ui::style_text(&format!("{e:#}"), ui::StyleType::Error)
        ),
    }
}

/// Verifies credentials and that every upstream answers once, without
/// retries and without sending a message.
pub async fn run(
    config: &AppConfig,
    sources: &Sources<'_>,
    notifier: &TelegramNotifier,
) -> Result<()> {
    let mut results = Vec::new();

    results.push(CheckResult {
        name: "Market hours".to_string(),
        outcome: MarketHours::try_from(&config.market).map(|hours| {
            let state = if hours.is_open(Utc::now()) {
                "open"
            } else {
                "closed"
            };
            format!("{} ({state})", hours.timezone)
        }),
    });

    results.push(CheckResult {
        name: "Telegram".to_string(),
        outcome: notifier.get_me().await.map(|name| format!("@{name}")),
    });

    for instrument in &config.instruments {
        let outcome = sources
            .quotes
            .fetch_quote(&instrument.symbol)
            .await
            .map(|q| format!("LTP {:?}", q.last_price));
        results.push(CheckResult {
            name: format!("Quote {}", instrument.symbol),
            outcome,
        });
    }

    for commodity in Commodity::all() {
        if config.instrument(commodity).is_none() {
            continue;
        }
        let outcome = sources
            .spots
            .fetch_spot(commodity)
            .await
            .map(|s| format!("${:.2}/oz", s.usd_per_ounce));
        results.push(CheckResult {
            name: format!("{commodity} spot"),
            outcome,
        });
    }

    results.push(CheckResult {
        name: "Forex".to_string(),
        outcome: sources
            .exchange_rate
            .fetch_rate()
            .await
            .map(|fx| format!("USD/INR {:.2}", fx.rate)),
    });

    println!("{}", ui::style_text("Checks", ui::StyleType::Title));
    for result in &results {
        print_result(result);
    }

    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
    if failed > 0 {
        bail!("{} of {} checks failed", failed, results.len());
    }
    Ok(())
}
