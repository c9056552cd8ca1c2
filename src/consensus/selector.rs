use tracing::{debug, warn};
use crate::config::FactorConfig;
use crate::consensus::result::{ConsensusResult, MidpointSource, SelectionPath};
use crate::consensus::spread::{self, MIN_SPREAD, SPREAD_SAMPLE_WEIGHT, STALE_FALLBACK_SPREAD};
use crate::error::{Error, Result};
use crate::types::ids::InstrumentId;
use crate::weighting::weighted_quote::WeightedQuote;

/// Below this many selected quotes a minimum-spread selection is widened.
pub const MIN_SELECTION_DEPTH: usize = 3;

/// Running aggregates gathered in one pass over an instrument's quotes.
#[derive(Debug, Default)]
struct GroupScan {
    /// (weight, bid) of the heaviest included quote; first seen wins ties.
    /// Set exactly when the group has an included quote.
    weight_pick: Option<(f64, f64)>,
    color_sum: f64,
    color_count: usize,
    spread_sample: Vec<f64>,
    /// (index, weight) of the heaviest quote regardless of inclusion
    heaviest: Option<(usize, f64)>,
}

impl GroupScan {
    fn over(quotes: &[WeightedQuote]) -> Self {
        quotes.iter()
            .enumerate()
            .fold(GroupScan::default(), |mut scan, (idx, quote)| {
                scan.observe(idx, quote);
                scan
            })
    }

    fn observe(&mut self, idx: usize, quote: &WeightedQuote) {
        let weight = quote.final_weight();

        if quote.is_color() {
            self.color_sum += quote.bid();
            self.color_count += 1;
        }

        if quote.is_included() {
            if self.weight_pick.is_none_or(|(best, _)| weight > best) {
                self.weight_pick = Some((weight, quote.bid()));
            }
            if weight > SPREAD_SAMPLE_WEIGHT || quote.dealer_weight() == 1.0 {
                self.spread_sample.push(quote.bid());
            }
        }

        if self.heaviest.is_none_or(|(_, best)| weight > best) {
            self.heaviest = Some((idx, weight));
        }
    }

    fn color_midpoint(&self) -> Option<f64> {
        (self.color_count > 0).then(|| self.color_sum / self.color_count as f64)
    }
}

/// Picks the quotes that make up an instrument's consensus price.
pub struct ConsensusSelector {
    factors: FactorConfig,
}

impl ConsensusSelector {
    pub fn new(factors: FactorConfig) -> Self {
        ConsensusSelector { factors }
    }

    /// Run selection for one instrument. The group is consumed and handed back,
    /// with `is_selected` set, inside the result.
    pub fn select(&self, instrument_id: &InstrumentId, quotes: Vec<WeightedQuote>) -> Result<ConsensusResult> {
        match quotes.len() {
            0 => return Err(Error::EmptyInstrumentGroup(instrument_id.clone())),
            1 => return Ok(Self::singleton(instrument_id, quotes)),
            _ => {}
        }

        let scan = GroupScan::over(&quotes);

        let result = match scan.weight_pick {
            Some((_, weight_bid)) => self.robust(instrument_id, quotes, &scan, weight_bid),
            None if quotes.len() > 2 => self.stale_anchored(instrument_id, quotes),
            None => {
                let (heaviest, _) = scan.heaviest
                    .ok_or_else(|| Error::EmptyInstrumentGroup(instrument_id.clone()))?;
                Self::best_stale(instrument_id, quotes, heaviest)
            }
        };

        debug!(
            instrument = %instrument_id,
            path = result.path.label(),
            midpoint = result.midpoint,
            std_dev = result.std_dev_used,
            "Selected consensus"
        );
        Ok(result)
    }

    fn singleton(instrument_id: &InstrumentId, mut quotes: Vec<WeightedQuote>) -> ConsensusResult {
        quotes[0].is_selected = true;
        let bid = quotes[0].record.bid;
        let offer = quotes[0].record.offer;

        ConsensusResult {
            instrument_id: instrument_id.clone(),
            calculated_bid: bid,
            calculated_offer: offer,
            std_dev_used: 0.0,
            midpoint: bid,
            midpoint_source: MidpointSource::SingleQuote,
            path: SelectionPath::Singleton,
            quotes,
        }
    }

    fn robust(
        &self,
        instrument_id: &InstrumentId,
        mut quotes: Vec<WeightedQuote>,
        scan: &GroupScan,
        weight_bid: f64,
    ) -> ConsensusResult {
        // Color overrides whatever the firm quotes would have picked
        let (midpoint, midpoint_source) = match scan.color_midpoint() {
            Some(color) => (color, MidpointSource::Color { count: scan.color_count }),
            None => (weight_bid, MidpointSource::HighestWeight),
        };

        let std_dev = spread::robust_spread(&scan.spread_sample, midpoint);
        let tolerance = self.factors.std_dev_tolerance;

        let mut selected = mark_selected(&mut quotes, |q| {
            q.is_included() && within(q, midpoint, std_dev * tolerance)
        });

        let mut depth_rescued = false;
        if selected < MIN_SELECTION_DEPTH && std_dev == MIN_SPREAD {
            // Too tight to find depth: let excluded quotes back in. Whatever
            // this finds is accepted, even if still short.
            selected = mark_selected(&mut quotes, |q| within(q, midpoint, MIN_SPREAD * tolerance));
            depth_rescued = true;
        }

        if selected == 0 {
            warn!(
                instrument = %instrument_id,
                midpoint,
                std_dev,
                "No quote within bound of midpoint, using heaviest quote"
            );
            let heaviest = scan.heaviest.map(|(idx, _)| idx).unwrap_or(0);
            select_only(&mut quotes, heaviest);
            let (calculated_bid, calculated_offer) = selected_means(&quotes);
            return ConsensusResult {
                instrument_id: instrument_id.clone(),
                calculated_bid,
                calculated_offer,
                std_dev_used: std_dev,
                midpoint,
                midpoint_source,
                path: SelectionPath::EmptySelectionFallback,
                quotes,
            };
        }

        let (calculated_bid, calculated_offer) = selected_means(&quotes);
        ConsensusResult {
            instrument_id: instrument_id.clone(),
            calculated_bid,
            calculated_offer,
            std_dev_used: std_dev,
            midpoint,
            midpoint_source,
            path: SelectionPath::Robust { depth_rescued },
            quotes,
        }
    }

    /// Every quote is stale and there are enough of them to filter: anchor on
    /// the shortest continuity and keep whatever sits within a fixed spread.
    fn stale_anchored(&self, instrument_id: &InstrumentId, mut quotes: Vec<WeightedQuote>) -> ConsensusResult {
        // Shortest continuity; on a tie the higher bid anchors
        let midpoint = quotes.iter()
            .min_by(|a, b| {
                a.unchanged_for.cmp(&b.unchanged_for)
                    .then_with(|| b.bid().total_cmp(&a.bid()))
            })
            .map(|anchor| anchor.bid())
            .unwrap_or_default();

        let bound = STALE_FALLBACK_SPREAD * self.factors.std_dev_tolerance;
        mark_selected(&mut quotes, |q| within(q, midpoint, bound));
        let (calculated_bid, calculated_offer) = selected_means(&quotes);

        ConsensusResult {
            instrument_id: instrument_id.clone(),
            calculated_bid,
            calculated_offer,
            std_dev_used: STALE_FALLBACK_SPREAD,
            midpoint,
            midpoint_source: MidpointSource::StaleAnchor,
            path: SelectionPath::StaleAnchored,
            quotes,
        }
    }

    fn best_stale(instrument_id: &InstrumentId, mut quotes: Vec<WeightedQuote>, heaviest: usize) -> ConsensusResult {
        select_only(&mut quotes, heaviest);
        let best = &quotes[heaviest];
        let (bid, offer) = (best.bid(), best.offer);

        ConsensusResult {
            instrument_id: instrument_id.clone(),
            calculated_bid: bid,
            calculated_offer: offer,
            std_dev_used: 0.0,
            midpoint: bid,
            midpoint_source: MidpointSource::BestStale,
            path: SelectionPath::BestStale,
            quotes,
        }
    }
}

fn within(quote: &WeightedQuote, midpoint: f64, bound: f64) -> bool {
    (quote.bid() - midpoint).abs() <= bound
}

/// Overwrite every quote's selection flag; returns how many are selected.
fn mark_selected<F>(quotes: &mut [WeightedQuote], predicate: F) -> usize
where
    F: Fn(&WeightedQuote) -> bool,
{
    let mut count = 0;
    for quote in quotes.iter_mut() {
        quote.is_selected = predicate(quote);
        if quote.is_selected {
            count += 1;
        }
    }
    count
}

fn select_only(quotes: &mut [WeightedQuote], chosen: usize) {
    for (idx, quote) in quotes.iter_mut().enumerate() {
        quote.is_selected = idx == chosen;
    }
}

fn selected_means(quotes: &[WeightedQuote]) -> (f64, f64) {
    let (bid_sum, offer_sum, count) = quotes.iter()
        .filter(|q| q.is_selected)
        .fold((0.0, 0.0, 0usize), |(bids, offers, n), q| (bids + q.bid(), offers + q.offer, n + 1));

    if count == 0 {
        return (f64::NAN, f64::NAN);
    }
    (bid_sum / count as f64, offer_sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::DealerId;
    use crate::types::quote::{QuoteKind, QuoteRecord};
    use crate::weighting::weighted_quote::QuoteWeights;

    fn quote(dealer: Option<&str>, bid: f64, offer: f64, dealer_weight: f64, final_weight: f64, included: bool) -> WeightedQuote {
        let kind = match dealer {
            Some(dealer) => QuoteKind::Firm { dealer_id: DealerId::from(dealer) },
            None => QuoteKind::Color,
        };
        WeightedQuote {
            record: QuoteRecord {
                instrument_id: InstrumentId::from("LX1"),
                kind,
                bid,
                offer,
                quote_timestamp: None,
                unchanged_for: Some(1),
                days_stale: Some(1),
                is_included: included,
            },
            offer,
            unchanged_for: 1,
            days_stale: 1,
            weights: QuoteWeights {
                dealer: dealer_weight,
                recency: 1.0,
                stale: 1.0,
                final_weight,
            },
            is_selected: false,
        }
    }

    fn firm(dealer: &str, bid: f64, final_weight: f64, included: bool) -> WeightedQuote {
        quote(Some(dealer), bid, bid + 1.0, 0.9, final_weight, included)
    }

    fn stale_with_continuity(dealer: &str, bid: f64, unchanged_for: u32) -> WeightedQuote {
        let mut q = firm(dealer, bid, 0.3, false);
        q.unchanged_for = unchanged_for;
        q
    }

    fn selector() -> ConsensusSelector {
        ConsensusSelector::new(FactorConfig::default())
    }

    fn lin() -> InstrumentId {
        InstrumentId::from("LX1")
    }

    #[test]
    fn empty_group_is_error() {
        assert!(matches!(selector().select(&lin(), vec![]), Err(Error::EmptyInstrumentGroup(_))));
    }

    #[test]
    fn singleton_passes_through() {
        let result = selector().select(&lin(), vec![firm("GS", 97.125, 0.1, false)]).unwrap();
        assert_eq!(result.calculated_bid, 97.125);
        assert_eq!(result.calculated_offer, 98.125);
        assert_eq!(result.std_dev_used, 0.0);
        assert_eq!(result.path, SelectionPath::Singleton);
        assert!(result.quotes[0].is_selected);
    }

    #[test]
    fn three_quote_example_keeps_only_the_heaviest() {
        // Spread sample {98.0, 98.5} around 98.0 gives sqrt(0.125), so the
        // bound is ~0.4525 and 98.5 falls outside it.
        let quotes = vec![
            firm("GS", 98.0, 0.9, true),
            firm("MS", 98.5, 0.85, true),
            firm("JPM", 99.0, 0.2, true),
        ];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.midpoint, 98.0);
        assert_eq!(result.midpoint_source, MidpointSource::HighestWeight);
        assert!((result.std_dev_used - 0.125_f64.sqrt()).abs() < 1e-12);
        assert_eq!(result.path, SelectionPath::Robust { depth_rescued: false });
        assert_eq!(result.selected_count(), 1);
        assert_eq!(result.calculated_bid, 98.0);
        assert_eq!(result.calculated_offer, 99.0);
    }

    #[test]
    fn tight_pair_averages_both() {
        let quotes = vec![
            firm("GS", 98.0, 0.9, true),
            firm("MS", 98.3, 0.85, true),
            firm("JPM", 99.0, 0.2, true),
        ];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.std_dev_used, MIN_SPREAD);
        assert!((result.calculated_bid - 98.15).abs() < 1e-9);
        assert_eq!(result.selected_count(), 2);
    }

    #[test]
    fn depth_rescue_readmits_excluded_quotes() {
        let quotes = vec![
            firm("GS", 98.0, 0.9, true),
            firm("MS", 98.3, 0.85, true),
            firm("BARC", 98.1, 0.5, false),
            firm("JPM", 99.0, 0.2, true),
        ];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.path, SelectionPath::Robust { depth_rescued: true });
        assert_eq!(result.selected_count(), 3);
        assert!((result.calculated_bid - (98.0 + 98.3 + 98.1) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn depth_rescue_accepts_short_selection() {
        let quotes = vec![
            firm("GS", 90.0, 0.9, true),
            firm("MS", 95.0, 0.3, true),
        ];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.path, SelectionPath::Robust { depth_rescued: true });
        assert_eq!(result.selected_count(), 1);
        assert_eq!(result.calculated_bid, 90.0);
    }

    #[test]
    fn color_mean_overrides_weighted_midpoint() {
        let quotes = vec![
            quote(None, 94.0, 94.0, 1.0, 1.0, true),
            firm("GS", 97.0, 0.95, true),
            quote(None, 96.0, 96.0, 1.0, 1.0, true),
            quote(None, 98.0, 98.0, 1.0, 1.0, true),
        ];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.midpoint, 96.0);
        assert_eq!(result.midpoint_source, MidpointSource::Color { count: 3 });
    }

    #[test]
    fn all_stale_anchors_on_shortest_continuity() {
        let quotes = vec![
            stale_with_continuity("GS", 92.0, 5),
            stale_with_continuity("MS", 95.0, 2),
            stale_with_continuity("JPM", 99.0, 8),
        ];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.midpoint, 95.0);
        assert_eq!(result.std_dev_used, STALE_FALLBACK_SPREAD);
        assert_eq!(result.path, SelectionPath::StaleAnchored);
        // bound 2.56 keeps only the anchor
        assert_eq!(result.selected_count(), 1);
        assert_eq!(result.calculated_bid, 95.0);
    }

    #[test]
    fn all_stale_pair_uses_heaviest() {
        let mut heavy = firm("GS", 91.0, 0.4, false);
        heavy.offer = 92.5;
        let quotes = vec![firm("MS", 95.0, 0.3, false), heavy];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.path, SelectionPath::BestStale);
        assert_eq!(result.calculated_bid, 91.0);
        assert_eq!(result.calculated_offer, 92.5);
        assert_eq!(result.std_dev_used, 0.0);
        assert!(result.quotes[1].is_selected);
        assert!(!result.quotes[0].is_selected);
    }

    #[test]
    fn color_far_from_firm_quotes_falls_back() {
        let quotes = vec![
            quote(None, 80.0, 80.0, 1.0, 1.0, true),
            quote(None, 100.0, 100.0, 1.0, 1.0, true),
            firm("GS", 70.0, 0.2, true),
        ];
        // Midpoint 90 with spread capped at 3.0; nothing lies within 3.84
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.path, SelectionPath::EmptySelectionFallback);
        assert_eq!(result.selected_count(), 1);
        assert_eq!(result.calculated_bid, 80.0);
    }

    #[test]
    fn first_heaviest_wins_ties() {
        let quotes = vec![
            firm("GS", 97.0, 0.8, true),
            firm("MS", 99.0, 0.8, true),
        ];
        let result = selector().select(&lin(), quotes).unwrap();
        assert_eq!(result.midpoint, 97.0);
    }

    #[test]
    fn weight_pick_ignores_heavier_excluded_quotes() {
        let quotes = vec![
            firm("GS", 90.0, 0.9, false),
            firm("MS", 95.0, 0.3, true),
        ];
        let result = selector().select(&lin(), quotes).unwrap();

        assert_eq!(result.midpoint, 95.0);
        assert_eq!(result.midpoint_source, MidpointSource::HighestWeight);
        assert_eq!(result.path, SelectionPath::Robust { depth_rescued: true });
        assert_eq!(result.calculated_bid, 95.0);
    }
}
