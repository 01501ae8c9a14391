//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod market;
pub mod nav;
pub mod notify;
pub mod quote;
pub mod report;
pub mod retry;
pub mod validate;

// Re-export main types for cleaner imports
pub use notify::Notifier;
pub use quote::{
    Commodity, ExchangeRate, ExchangeRateProvider, Quote, QuoteProvider, SpotPrice,
    SpotPriceProvider,
};
pub use report::{Report, RunError};
