use serde::{Deserialize, Serialize};
use crate::types::ids::{DealerId, InstrumentId, QuoteKey};
use crate::types::timestamp::QuoteTimestamp;

/// Who stands behind a quote. Resolved once at ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteKind {
    /// Firm two-sided quote from a named dealer
    Firm { dealer_id: DealerId },
    /// Dealer-less indicative price
    Color,
}

/// A quote as it arrives from the feed, before any counters are attached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawQuote {
    pub instrument_id: InstrumentId,
    pub kind: QuoteKind,
    pub bid: f64,
    pub offer: f64,
    pub quote_timestamp: Option<QuoteTimestamp>,
}

impl RawQuote {
    pub fn firm(
        instrument_id: impl Into<String>,
        dealer_id: impl Into<String>,
        bid: f64,
        offer: f64,
        quote_timestamp: Option<QuoteTimestamp>,
    ) -> Self {
        RawQuote {
            instrument_id: InstrumentId::new(instrument_id),
            kind: QuoteKind::Firm { dealer_id: DealerId::new(dealer_id) },
            bid,
            offer,
            quote_timestamp,
        }
    }

    pub fn color(instrument_id: impl Into<String>, bid: f64, quote_timestamp: Option<QuoteTimestamp>) -> Self {
        RawQuote {
            instrument_id: InstrumentId::new(instrument_id),
            kind: QuoteKind::Color,
            bid,
            offer: bid,
            quote_timestamp,
        }
    }

    /// Color quotes have no dealer and therefore no persisted counters.
    pub fn key(&self) -> Option<QuoteKey> {
        match &self.kind {
            QuoteKind::Firm { dealer_id } => Some(QuoteKey::new(&self.instrument_id, dealer_id)),
            QuoteKind::Color => None,
        }
    }
}

/// One day's quote with staleness counters applied.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub instrument_id: InstrumentId,
    pub kind: QuoteKind,
    pub bid: f64,
    pub offer: f64,
    pub quote_timestamp: Option<QuoteTimestamp>,
    /// Days the bid has been unchanged. `None` when no history exists.
    pub unchanged_for: Option<u32>,
    /// Days since the quote was last refreshed. `None` when no history exists.
    pub days_stale: Option<u32>,
    pub is_included: bool,
}

impl QuoteRecord {
    pub fn is_color(&self) -> bool {
        matches!(self.kind, QuoteKind::Color)
    }

    pub fn dealer_id(&self) -> Option<&DealerId> {
        match &self.kind {
            QuoteKind::Firm { dealer_id } => Some(dealer_id),
            QuoteKind::Color => None,
        }
    }

    pub fn key(&self) -> Option<QuoteKey> {
        self.dealer_id().map(|dealer| QuoteKey::new(&self.instrument_id, dealer))
    }
}
