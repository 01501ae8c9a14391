use crate::core::quote::Commodity;
use anyhow::{Context, Result, bail};
use chrono::Weekday;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Open interval of prices considered plausible for an instrument.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct PlausibilityBand {
    pub min: f64,
    pub max: f64,
}

impl PlausibilityBand {
    /// Both bounds are exclusive.
    pub fn contains(&self, price: f64) -> bool {
        price > self.min && price < self.max
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub commodity: Commodity,
    /// Grams of the underlying commodity represented by one ETF unit.
    #[serde(default = "default_units_per_share")]
    pub units_per_share: f64,
    pub band: PlausibilityBand,
    #[serde(default)]
    pub icon: Option<String>,
}

fn default_units_per_share() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MarketConfig {
    pub timezone: String,
    pub open: String,
    pub close: String,
    pub weekend: Vec<Weekday>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            timezone: "Asia/Kolkata".to_string(),
            open: "09:15".to_string(),
            close: "15:30".to_string(),
            weekend: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_factor: u32,
    /// Unit of the exponential backoff, in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            backoff_factor: 2,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NseProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetalsProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ForexProviderConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub nse: NseProviderConfig,
    pub metals: MetalsProviderConfig,
    pub forex: ForexProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            nse: NseProviderConfig {
                base_url: "https://www.nseindia.com".to_string(),
            },
            metals: MetalsProviderConfig {
                base_url: "https://api.metals.live".to_string(),
            },
            forex: ForexProviderConfig {
                url: "https://api.exchangerate-api.com/v4/latest/USD".to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        TelegramConfig {
            base_url: default_telegram_base_url(),
            bot_token: None,
            chat_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_instruments")]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_troy_ounce_grams")]
    pub troy_ounce_grams: f64,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_troy_ounce_grams() -> f64 {
    DEFAULT_TROY_OUNCE_GRAMS
}

fn default_instruments() -> Vec<Instrument> {
    vec![
        Instrument {
            symbol: "TATAGOLD".to_string(),
            name: "Tata Gold ETF".to_string(),
            commodity: Commodity::Gold,
            units_per_share: 1.0,
            band: PlausibilityBand {
                min: 3000.0,
                max: 10000.0,
            },
            icon: Some("🥇".to_string()),
        },
        Instrument {
            symbol: "TATSILV".to_string(),
            name: "Tata Silver ETF".to_string(),
            commodity: Commodity::Silver,
            units_per_share: 1.0,
            band: PlausibilityBand {
                min: 40.0,
                max: 200.0,
            },
            icon: Some("🥈".to_string()),
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            instruments: default_instruments(),
            market: MarketConfig::default(),
            retry: RetryConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            troy_ounce_grams: default_troy_ounce_grams(),
            providers: ProvidersConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "etf-tracker", "etf-tracker")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Telegram credentials are secrets and usually come from the scheduler's
    /// environment rather than the config file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
        );
    }

    fn apply_overrides(&mut self, bot_token: Option<String>, chat_id: Option<String>) {
        if let Some(token) = bot_token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat) = chat_id.filter(|c| !c.trim().is_empty()) {
            self.telegram.chat_id = Some(chat);
        }
    }

    /// Rejects instrument settings that would make every quote implausible
    /// or every NAV meaningless.
    pub fn validate(&self) -> Result<()> {
        for instrument in &self.instruments {
            let band = instrument.band;
            if band.min.is_nan() || band.max.is_nan() || band.min >= band.max {
                bail!(
                    "Invalid price band for {}: min {} must be below max {}",
                    instrument.symbol,
                    band.min,
                    band.max
                );
            }
            if instrument.units_per_share.is_nan() || instrument.units_per_share <= 0.0 {
                bail!(
                    "Invalid units_per_share for {}: {} must be positive",
                    instrument.symbol,
                    instrument.units_per_share
                );
            }
        }
        if self.troy_ounce_grams.is_nan() || self.troy_ounce_grams <= 0.0 {
            bail!(
                "Invalid troy_ounce_grams: {} must be positive",
                self.troy_ounce_grams
            );
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn instrument(&self, commodity: Commodity) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.commodity == commodity)
    }
}
