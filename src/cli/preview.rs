use super::ui;
use crate::core::config::AppConfig;
use crate::core::market::MarketHours;
use crate::core::nav::round2;
use crate::core::quote::Commodity;
use crate::core::report::{Report, format_number};
use crate::message;
use crate::tracker::{self, Sources};
use anyhow::Result;
use chrono::Utc;
use comfy_table::Cell;

/// Renders the report as a terminal table.
pub fn display_as_table(report: &Report) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ETF"),
        ui::header_cell("LTP"),
        ui::header_cell("Change"),
        ui::header_cell("Volume"),
        ui::header_cell("Value"),
        ui::header_cell("iNAV"),
        ui::header_cell("Prem/Disc"),
    ]);

    for section in &report.instruments {
        let name = Cell::new(format!(
            "{} ({})",
            section.instrument.name, section.instrument.symbol
        ));
        let nav = ui::format_optional_cell(section.nav, |v| format!("{:.2}", round2(v)));
        match &section.quote {
            Some(quote) => table.add_row(vec![
                name,
                ui::format_optional_cell(quote.last_price, |v| format!("{v:.2}")),
                ui::change_cell(quote.percent_change),
                Cell::new(format_number(quote.volume)),
                Cell::new(format_number(quote.traded_value)),
                nav,
                ui::change_cell(section.premium_discount),
            ]),
            None => table.add_row(vec![
                name,
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                nav,
                ui::na_cell(true),
            ]),
        };
    }

    let mut output = format!(
        "{}\n\n",
        ui::style_text("ETF Tracker", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());

    let status = if report.market_open {
        ui::style_text("OPEN", ui::StyleType::Good)
    } else {
        ui::style_text("CLOSED", ui::StyleType::Subtle)
    };
    output.push_str(&format!(
        "\n\n{} {}",
        ui::style_text("Market:", ui::StyleType::Label),
        status
    ));

    for commodity in Commodity::all() {
        if let Some(spot) = report.spot(commodity) {
            output.push_str(&format!(
                "\n{} ${:.2}/oz",
                ui::style_text(&format!("{commodity} spot:"), ui::StyleType::Label),
                spot.usd_per_ounce
            ));
        }
    }
    let fx = report
        .exchange_rate
        .as_ref()
        .map_or("N/A".to_string(), |fx| format!("{:.2}", fx.rate));
    output.push_str(&format!(
        "\n{} {}",
        ui::style_text("USD/INR:", ui::StyleType::Label),
        fx
    ));
    output.push_str(&format!(
        "\n{} {}",
        ui::style_text("Winner:", ui::StyleType::Label),
        report.winner.as_deref().unwrap_or("None")
    ));

    for err in &report.errors {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(&err.to_string(), ui::StyleType::Error)
        ));
    }
    output
}

/// Fetches and reconciles like a scheduled run, printing instead of delivering.
pub async fn run(config: &AppConfig, sources: &Sources<'_>, show_message: bool) -> Result<()> {
    config.validate()?;
    let hours = MarketHours::try_from(&config.market)?;

    let pb = ui::new_progress_bar(tracker::step_count(config) as u64);
    let report = tracker::build(config, &hours, sources, Utc::now(), &|step: &str| {
        pb.set_message(step.to_string());
        pb.inc(1);
    })
    .await;
    pb.finish_and_clear();

    println!("{}", display_as_table(&report));

    if show_message {
        println!("\n{}", message::render_report(&report, &hours));
        if report.has_errors() {
            println!(
                "\n{}",
                message::render_error_summary(&report.errors, &hours, report.generated_at)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::Quote;
    use crate::core::report::{MarketData, RunError, build_report};

    #[test]
    fn test_display_marks_unavailable_and_errors() {
        let config = AppConfig::default();
        let mut data = MarketData::default();
        data.quotes.insert(
            "TATSILV".to_string(),
            Some(Quote {
                symbol: "TATSILV".to_string(),
                last_price: Some(80.0),
                open: Some(79.0),
                high: Some(81.0),
                low: Some(78.5),
                previous_close: Some(79.2),
                change: Some(0.8),
                percent_change: Some(1.01),
                volume: Some(2_500.0),
                traded_value: Some(200_000.0),
                captured_at: Utc::now(),
            }),
        );
        let errors = vec![RunError::new("TATAGOLD", "HTTP error: 503", Utc::now())];
        let report = build_report(
            &config.instruments,
            config.troy_ounce_grams,
            data,
            false,
            errors,
            Utc::now(),
        );

        let output = display_as_table(&report);
        assert!(output.contains("TATSILV"));
        assert!(output.contains("80.00"));
        assert!(output.contains("2.50K"));
        assert!(output.contains("2.00L"));
        assert!(output.contains("N/A"));
        assert!(output.contains("TATAGOLD: HTTP error: 503"));
    }
}
