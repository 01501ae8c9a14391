pub mod cli;
pub mod core;
pub mod message;
pub mod providers;
pub mod tracker;

use crate::core::config::AppConfig;
use crate::providers::{
    exchange_rate_api::ExchangeRateApiProvider, metals_live::MetalsLiveProvider,
    nse::NseQuoteProvider, telegram::TelegramNotifier,
};
use crate::tracker::Sources;
use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Run,
    Preview { show_message: bool },
    Check,
}

/// The concrete HTTP collaborators built from configuration.
pub struct Collaborators {
    pub quotes: NseQuoteProvider,
    pub spots: MetalsLiveProvider,
    pub exchange_rate: ExchangeRateApiProvider,
    pub notifier: TelegramNotifier,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        Ok(Collaborators {
            quotes: NseQuoteProvider::new(&config.providers.nse.base_url, timeout)?,
            spots: MetalsLiveProvider::new(&config.providers.metals.base_url, timeout)?,
            exchange_rate: ExchangeRateApiProvider::new(&config.providers.forex.url, timeout)?,
            notifier: TelegramNotifier::new(&config.telegram, timeout)?,
        })
    }

    pub fn sources(&self) -> Sources<'_> {
        Sources {
            quotes: &self.quotes,
            spots: &self.spots,
            exchange_rate: &self.exchange_rate,
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ETF Tracker starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        instruments = config.instruments.len(),
        timezone = %config.market.timezone,
        "Loaded config"
    );

    let collaborators = Collaborators::from_config(&config)?;

    match command {
        AppCommand::Run => {
            let outcome = tracker::run_once(
                &config,
                &collaborators.sources(),
                &collaborators.notifier,
                Utc::now(),
            )
            .await?;
            if outcome.delivered {
                info!(errors = outcome.errors.len(), "ETF Tracker completed");
            } else {
                warn!(
                    errors = outcome.errors.len(),
                    "ETF Tracker completed without delivering the report"
                );
            }
            Ok(())
        }
        AppCommand::Preview { show_message } => {
            cli::preview::run(&config, &collaborators.sources(), show_message).await
        }
        AppCommand::Check => {
            cli::check::run(&config, &collaborators.sources(), &collaborators.notifier).await
        }
    }
}
