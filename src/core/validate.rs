//! Plausibility checks applied to quotes before they are trusted.
//!
//! Providers occasionally serve stale caches, decimal-shifted prices or the
//! payload of a different instrument. Validation runs directly after a fetch
//! so such values never reach the NAV comparison.

use crate::core::config::Instrument;
use crate::core::quote::Quote;
use std::fmt::Display;
use tracing::{debug, warn};

/// Why a quote was not accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Missing,
    SymbolMismatch { expected: String, actual: String },
    NoLastPrice,
    MissingField(&'static str),
    OutOfBand { price: f64, min: f64, max: f64 },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Missing => write!(f, "no quote received"),
            Rejection::SymbolMismatch { expected, actual } => {
                write!(f, "expected quote for {expected}, got {actual}")
            }
            Rejection::NoLastPrice => write!(f, "last traded price is missing or zero"),
            Rejection::MissingField(field) => write!(f, "required field '{field}' is missing"),
            Rejection::OutOfBand { price, min, max } => {
                write!(f, "last traded price {price} outside plausible range ({min}, {max})")
            }
        }
    }
}

/// Returns the reason `quote` is unusable for `instrument`, if any.
pub fn check(quote: Option<&Quote>, instrument: &Instrument) -> Result<(), Rejection> {
    let quote = quote.ok_or(Rejection::Missing)?;

    if !quote.symbol.eq_ignore_ascii_case(&instrument.symbol) {
        return Err(Rejection::SymbolMismatch {
            expected: instrument.symbol.clone(),
            actual: quote.symbol.clone(),
        });
    }

    let price = match quote.last_price {
        Some(p) if p != 0.0 && p.is_finite() => p,
        _ => return Err(Rejection::NoLastPrice),
    };

    for (field, value) in [
        ("open", quote.open),
        ("high", quote.high),
        ("low", quote.low),
    ] {
        if value.is_none() {
            return Err(Rejection::MissingField(field));
        }
    }

    if !instrument.band.contains(price) {
        return Err(Rejection::OutOfBand {
            price,
            min: instrument.band.min,
            max: instrument.band.max,
        });
    }

    Ok(())
}

pub fn validate(quote: Option<&Quote>, instrument: &Instrument) -> bool {
    match check(quote, instrument) {
        Ok(()) => {
            debug!(symbol = %instrument.symbol, "Quote passed validation");
            true
        }
        Err(reason) => {
            warn!(symbol = %instrument.symbol, "Rejected quote: {}", reason);
            false
        }
    }
}
