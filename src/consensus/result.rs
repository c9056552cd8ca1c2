use serde::{Deserialize, Serialize};
use crate::types::ids::InstrumentId;
use crate::weighting::weighted_quote::WeightedQuote;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidpointSource {
    SingleQuote,
    /// Mean of the group's color quotes
    Color { count: usize },
    HighestWeight,
    StaleAnchor,
    BestStale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPath {
    Singleton,
    /// Deviation filter around the midpoint; `depth_rescued` when the
    /// inclusion requirement had to be dropped to find depth
    Robust { depth_rescued: bool },
    /// Deviation filter matched nothing; the best-weighted quote stands in
    EmptySelectionFallback,
    /// All quotes stale, anchored on the freshest-looking one
    StaleAnchored,
    /// All quotes stale and too few to filter
    BestStale,
}

impl SelectionPath {
    pub fn label(&self) -> &'static str {
        match self {
            SelectionPath::Singleton => "singleton",
            SelectionPath::Robust { depth_rescued: false } => "robust",
            SelectionPath::Robust { depth_rescued: true } => "robust_depth_rescue",
            SelectionPath::EmptySelectionFallback => "empty_selection_fallback",
            SelectionPath::StaleAnchored => "stale_anchored",
            SelectionPath::BestStale => "best_stale",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub instrument_id: InstrumentId,
    pub calculated_bid: f64,
    pub calculated_offer: f64,
    pub std_dev_used: f64,
    pub midpoint: f64,
    pub midpoint_source: MidpointSource,
    pub path: SelectionPath,
    pub quotes: Vec<WeightedQuote>,
}

impl ConsensusResult {
    pub fn selected(&self) -> impl Iterator<Item = &WeightedQuote> {
        self.quotes.iter().filter(|q| q.is_selected)
    }

    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }

    pub fn included_count(&self) -> usize {
        self.quotes.iter().filter(|q| q.is_included()).count()
    }
}
