use crate::consensus::result::{ConsensusResult, MidpointSource};

pub struct ConsensusExplainer;

impl ConsensusExplainer {
    /// Explain how an instrument's consensus price was reached
    pub fn explain(result: &ConsensusResult) -> String {
        let midpoint_reason = match result.midpoint_source {
            MidpointSource::SingleQuote => "only quote".to_string(),
            MidpointSource::Color { count } => format!("mean of {} color quote(s)", count),
            MidpointSource::HighestWeight => "bid of highest-weighted included quote".to_string(),
            MidpointSource::StaleAnchor => "bid of stale quote with shortest continuity".to_string(),
            MidpointSource::BestStale => "bid of highest-weighted stale quote".to_string(),
        };

        format!(
            "Consensus for {}: bid={:.3}, offer={:.3} via {}\n\
             Midpoint: {:.3} ({})\n\
             Std dev used: {}\n\
             Quotes: {} total, {} included, {} selected",
            result.instrument_id,
            result.calculated_bid,
            result.calculated_offer,
            result.path.label(),
            result.midpoint,
            midpoint_reason,
            result.std_dev_used,
            result.quotes.len(),
            result.included_count(),
            result.selected_count(),
        )
    }
}
