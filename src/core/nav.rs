//! Indicative NAV and premium/discount calculations.
//!
//! All functions are total: missing or degenerate inputs produce `None`
//! instead of an error.

pub use crate::core::config::DEFAULT_TROY_OUNCE_GRAMS as TROY_OUNCE_GRAMS;

/// Fair value of one ETF unit in the domestic currency.
///
/// `spot` is USD per troy ounce, `fx_rate` is domestic currency per USD and
/// `units_per_share` is grams of metal held per ETF unit.
pub fn compute_nav(spot: Option<f64>, fx_rate: Option<f64>, units_per_share: f64) -> Option<f64> {
    compute_nav_with(spot, fx_rate, units_per_share, TROY_OUNCE_GRAMS)
}

pub fn compute_nav_with(
    spot: Option<f64>,
    fx_rate: Option<f64>,
    units_per_share: f64,
    troy_ounce_grams: f64,
) -> Option<f64> {
    let spot = spot.filter(|s| s.is_finite() && *s > 0.0)?;
    let fx_rate = fx_rate.filter(|r| r.is_finite() && *r > 0.0)?;
    if !(troy_ounce_grams.is_finite() && troy_ounce_grams > 0.0) {
        return None;
    }
    let per_gram = spot / troy_ounce_grams * fx_rate;
    let nav = per_gram * units_per_share;
    nav.is_finite().then_some(nav)
}

/// Percentage by which `last_price` trades above (positive) or below
/// (negative) `nav`.
pub fn compute_premium_discount(last_price: Option<f64>, nav: Option<f64>) -> Option<f64> {
    let nav = nav.filter(|n| *n != 0.0 && n.is_finite())?;
    let last_price = last_price.filter(|p| p.is_finite())?;
    Some((last_price - nav) / nav * 100.0)
}

/// Rounds to two decimals for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gold_nav() {
        let nav = compute_nav(Some(2000.0), Some(83.0), 1.0).unwrap();
        assert!((nav - 5337.02).abs() < 0.01);
        assert_eq!(round2(nav), 5337.02);
    }

    #[test]
    fn test_silver_nav() {
        let nav = compute_nav(Some(25.0), Some(83.0), 1.0).unwrap();
        assert_eq!(round2(nav), 66.71);
    }

    #[test]
    fn test_nav_keeps_full_precision() {
        let nav = compute_nav(Some(25.0), Some(83.0), 1.0).unwrap();
        assert!((nav - 25.0 / 31.1035 * 83.0).abs() < 1e-9);
        assert_ne!(nav, round2(nav));
    }

    #[test]
    fn test_nav_scales_with_units_per_share() {
        let one = compute_nav(Some(2000.0), Some(83.0), 1.0).unwrap();
        let hundredth = compute_nav(Some(2000.0), Some(83.0), 0.01).unwrap();
        assert!((hundredth * 100.0 - one).abs() < 1e-9);
    }

    #[test]
    fn test_nav_is_monotonic_in_each_input() {
        let base = compute_nav(Some(2000.0), Some(83.0), 1.0).unwrap();
        assert!(compute_nav(Some(2000.5), Some(83.0), 1.0).unwrap() > base);
        assert!(compute_nav(Some(2000.0), Some(83.1), 1.0).unwrap() > base);
        assert!(compute_nav(Some(2000.0), Some(83.0), 1.5).unwrap() > base);
    }

    #[test]
    fn test_nav_is_deterministic() {
        assert_eq!(
            compute_nav(Some(1987.65), Some(82.91), 1.0),
            compute_nav(Some(1987.65), Some(82.91), 1.0)
        );
    }

    #[test]
    fn test_nav_absent_inputs() {
        assert_eq!(compute_nav(None, Some(83.0), 1.0), None);
        assert_eq!(compute_nav(Some(2000.0), None, 1.0), None);
        assert_eq!(compute_nav(None, None, 1.0), None);
        assert_eq!(compute_nav(Some(0.0), Some(83.0), 1.0), None);
        assert_eq!(compute_nav(Some(f64::NAN), Some(83.0), 1.0), None);
        assert_eq!(compute_nav_with(Some(2000.0), Some(83.0), 1.0, 0.0), None);
    }

    #[test]
    fn test_premium_discount() {
        let nav = compute_nav(Some(2000.0), Some(83.0), 1.0);
        let premium = compute_premium_discount(Some(6050.0), nav).unwrap();
        assert!((premium - 13.36).abs() < 0.01);

        let discount = compute_premium_discount(Some(90.0), Some(100.0)).unwrap();
        assert!((discount + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_premium_discount_guards_zero_and_absent_nav() {
        assert_eq!(compute_premium_discount(Some(6050.0), Some(0.0)), None);
        assert_eq!(compute_premium_discount(Some(6050.0), None), None);
        assert_eq!(compute_premium_discount(None, Some(5337.0)), None);
    }
}
