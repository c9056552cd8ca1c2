use chrono::NaiveDate;
use crate::config::FactorConfig;
use crate::staleness::prior_day::PriorDayState;
use crate::types::quote::{QuoteRecord, RawQuote};

/// Rolls yesterday's staleness counters forward onto today's quotes.
pub struct StalenessTracker {
    stale_threshold_days: f64,
    today: NaiveDate,
}

impl StalenessTracker {
    pub fn new(factors: &FactorConfig, today: NaiveDate) -> Self {
        StalenessTracker {
            stale_threshold_days: factors.stale_threshold_days,
            today,
        }
    }

    /// Apply counters to the whole snapshot. Each quote is handled on its own,
    /// so input order does not matter.
    pub fn track(&self, quotes: Vec<RawQuote>, prior: &PriorDayState) -> Vec<QuoteRecord> {
        quotes.into_iter()
            .map(|quote| self.track_one(quote, prior))
            .collect()
    }

    pub fn track_one(&self, quote: RawQuote, prior: &PriorDayState) -> QuoteRecord {
        let counters = quote.key()
            .and_then(|key| prior.get(&key).copied())
            .unwrap_or_default();

        // One more day has passed since the persisted snapshot
        let unchanged_for = counters.unchanged_for.map(|days| days.saturating_add(1));
        let mut days_stale = counters.days_stale.map(|days| days.saturating_add(1));

        // A same-day update always resets staleness
        if quote.quote_timestamp.is_some_and(|ts| ts.date() == self.today) {
            days_stale = Some(0);
        }

        QuoteRecord {
            is_included: self.is_included(days_stale),
            instrument_id: quote.instrument_id,
            kind: quote.kind,
            bid: quote.bid,
            offer: quote.offer,
            quote_timestamp: quote.quote_timestamp,
            unchanged_for,
            days_stale,
        }
    }

    /// Quotes without any history are never excluded.
    pub fn is_included(&self, days_stale: Option<u32>) -> bool {
        match days_stale {
            Some(days) => f64::from(days) <= self.stale_threshold_days,
            None => true,
        }
    }
}
