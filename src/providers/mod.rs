pub mod exchange_rate_api;
pub mod metals_live;
pub mod nse;
pub mod telegram;
