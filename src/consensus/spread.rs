/// Tightest spread ever applied; also used when nothing qualifies for the sample.
pub const MIN_SPREAD: f64 = 0.25;
/// Ceiling for discounted loans
pub const MAX_SPREAD_DISCOUNTED: f64 = 5.0;
/// Ceiling once the midpoint trades near par
pub const MAX_SPREAD_NEAR_PAR: f64 = 3.0;
pub const NEAR_PAR_PRICE: f64 = 80.0;
/// Fixed spread when every quote in a group is stale
pub const STALE_FALLBACK_SPREAD: f64 = 2.0;
/// Quotes above this weight (or from a top-ranked dealer) shape the spread
pub const SPREAD_SAMPLE_WEIGHT: f64 = 0.6;

/// Population standard deviation of `sample` measured around `midpoint`
/// rather than around the sample mean.
pub fn dispersion_about(sample: &[f64], midpoint: f64) -> Option<f64> {
    if sample.is_empty() {
        return None;
    }
    let sum_sq: f64 = sample.iter().map(|bid| (bid - midpoint).powi(2)).sum();
    Some((sum_sq / sample.len() as f64).sqrt())
}

/// Floor at `MIN_SPREAD`; cap at 5.0 below par-ish prices and 3.0 at or above 80.
pub fn clamp_spread(std_dev: f64, midpoint: f64) -> f64 {
    let std_dev = std_dev.max(MIN_SPREAD);
    if std_dev > MAX_SPREAD_DISCOUNTED {
        if midpoint < NEAR_PAR_PRICE {
            MAX_SPREAD_DISCOUNTED
        } else {
            MAX_SPREAD_NEAR_PAR
        }
    } else if std_dev > MAX_SPREAD_NEAR_PAR && midpoint >= NEAR_PAR_PRICE {
        MAX_SPREAD_NEAR_PAR
    } else {
        std_dev
    }
}

pub fn robust_spread(sample: &[f64], midpoint: f64) -> f64 {
    match dispersion_about(sample, midpoint) {
        Some(std_dev) => clamp_spread(std_dev, midpoint),
        None => MIN_SPREAD,
    }
}
