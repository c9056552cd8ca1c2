use serde::{Deserialize, Serialize};
use crate::types::ids::InstrumentId;
use crate::types::quote::QuoteRecord;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteWeights {
    pub dealer: f64,
    pub recency: f64,
    pub stale: f64,
    /// Product of the three components, kept at full precision
    pub final_weight: f64,
}

impl QuoteWeights {
    pub fn from_components(dealer: f64, recency: f64, stale: f64) -> Self {
        QuoteWeights {
            dealer,
            recency,
            stale,
            final_weight: dealer * recency * stale,
        }
    }

    pub fn unit() -> Self {
        QuoteWeights::from_components(1.0, 1.0, 1.0)
    }
}

/// A tracked quote with its weights. Only `is_selected` changes after construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightedQuote {
    pub record: QuoteRecord,
    /// Offer used for pricing; color quotes quote a single price so this equals the bid
    pub offer: f64,
    /// Continuity after the missing-value and consistency rules
    pub unchanged_for: u32,
    /// Staleness after the missing-value rule
    pub days_stale: u32,
    pub weights: QuoteWeights,
    pub is_selected: bool,
}

impl WeightedQuote {
    pub fn instrument_id(&self) -> &InstrumentId {
        &self.record.instrument_id
    }

    pub fn bid(&self) -> f64 {
        self.record.bid
    }

    pub fn final_weight(&self) -> f64 {
        self.weights.final_weight
    }

    pub fn dealer_weight(&self) -> f64 {
        self.weights.dealer
    }

    pub fn is_included(&self) -> bool {
        self.record.is_included
    }

    pub fn is_color(&self) -> bool {
        self.record.is_color()
    }
}
