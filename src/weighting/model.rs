use chrono::{NaiveDateTime, Timelike};
use crate::config::FactorConfig;
use crate::staleness::prior_day::effective_counters;
use crate::types::ids::DealerId;
use crate::types::quote::QuoteRecord;
use crate::weighting::hierarchy::DealerHierarchy;
use crate::weighting::weighted_quote::{QuoteWeights, WeightedQuote};

pub const UNRANKED_DEALER_WEIGHT: f64 = 0.75;
pub const RANK_STEP: f64 = 0.05;
/// Recency for quotes that cannot be placed within today's session
pub const UNTIMED_RECENCY_WEIGHT: f64 = 0.25;
/// Recency once continuity reaches `CONTINUITY_CUTOFF_MULTIPLE` decay horizons
pub const CONTINUITY_FLOOR_RECENCY_WEIGHT: f64 = 0.2;
pub const CONTINUITY_CUTOFF_MULTIPLE: f64 = 8.0;
pub const DECAY_MULTIPLE: f64 = 3.0;
/// Roughly the length of a trading session in minutes
pub const SESSION_MINUTES: f64 = 400.0;

/// `1 - (rank - 1) * 0.05`; no floor, so very low ranks go negative.
pub fn dealer_weight_for_rank(rank: Option<u32>) -> f64 {
    match rank {
        Some(rank) => 1.0 - (f64::from(rank) - 1.0) * RANK_STEP,
        None => UNRANKED_DEALER_WEIGHT,
    }
}

pub fn stale_weight(days_stale: u32, stale_threshold_days: f64) -> f64 {
    let horizon = DECAY_MULTIPLE * stale_threshold_days;
    horizon / (f64::from(days_stale) + horizon)
}

pub fn day_decay_recency_weight(unchanged_for: u32, time_decay_days: f64) -> f64 {
    let unchanged = f64::from(unchanged_for);
    if unchanged >= CONTINUITY_CUTOFF_MULTIPLE * time_decay_days {
        return CONTINUITY_FLOOR_RECENCY_WEIGHT;
    }
    let horizon = DECAY_MULTIPLE * time_decay_days;
    horizon / (unchanged + horizon)
}

/// Maps a tracked quote to its dealer, recency and staleness weights.
pub struct WeightModel<'a> {
    hierarchy: &'a DealerHierarchy,
    factors: FactorConfig,
    now: NaiveDateTime,
}

impl<'a> WeightModel<'a> {
    pub fn new(hierarchy: &'a DealerHierarchy, factors: FactorConfig, now: NaiveDateTime) -> Self {
        WeightModel { hierarchy, factors, now }
    }

    pub fn weigh(&self, record: QuoteRecord) -> WeightedQuote {
        let (unchanged_for, days_stale) = effective_counters(record.unchanged_for, record.days_stale);

        let (weights, offer) = match record.dealer_id() {
            None => (QuoteWeights::unit(), record.bid),
            Some(dealer_id) => {
                let weights = QuoteWeights::from_components(
                    self.dealer_weight(dealer_id),
                    self.recency_weight(&record, unchanged_for, days_stale),
                    stale_weight(days_stale, self.factors.stale_threshold_days),
                );
                (weights, record.offer)
            }
        };

        WeightedQuote {
            record,
            offer,
            unchanged_for,
            days_stale,
            weights,
            is_selected: false,
        }
    }

    pub fn weigh_all(&self, records: Vec<QuoteRecord>) -> Vec<WeightedQuote> {
        records.into_iter().map(|record| self.weigh(record)).collect()
    }

    pub fn dealer_weight(&self, dealer_id: &DealerId) -> f64 {
        dealer_weight_for_rank(self.hierarchy.rank(dealer_id))
    }

    pub fn recency_weight(&self, record: &QuoteRecord, unchanged_for: u32, days_stale: u32) -> f64 {
        if self.factors.is_intraday() {
            self.intraday_recency_weight(record, days_stale)
        } else {
            day_decay_recency_weight(unchanged_for, self.factors.time_decay_days)
        }
    }

    fn intraday_recency_weight(&self, record: &QuoteRecord, days_stale: u32) -> f64 {
        let quoted_at = match record.quote_timestamp.and_then(|ts| ts.time_of_day()) {
            Some(ts) if days_stale == 0 && ts.date() == self.now.date() => ts,
            _ => return UNTIMED_RECENCY_WEIGHT,
        };

        let diff_minutes = 60 * (i64::from(self.now.hour()) - i64::from(quoted_at.hour()))
            + (i64::from(self.now.minute()) - i64::from(quoted_at.minute()));
        // Quotes stamped ahead of the run clock count as fresh
        let diff_minutes = diff_minutes.max(0) as f64;

        let horizon = self.factors.time_decay_days * SESSION_MINUTES;
        horizon / (diff_minutes + horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::types::ids::InstrumentId;
    use crate::types::quote::QuoteKind;
    use crate::types::timestamp::QuoteTimestamp;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(16, 0, 0).unwrap()
    }

    fn firm(dealer: &str, unchanged_for: Option<u32>, days_stale: Option<u32>) -> QuoteRecord {
        QuoteRecord {
            instrument_id: InstrumentId::from("LX1"),
            kind: QuoteKind::Firm { dealer_id: DealerId::from(dealer) },
            bid: 98.0,
            offer: 99.0,
            quote_timestamp: None,
            unchanged_for,
            days_stale,
            is_included: true,
        }
    }

    fn hierarchy() -> DealerHierarchy {
        [(DealerId::from("GS"), 1), (DealerId::from("MS"), 3)].into_iter().collect()
    }

    #[test]
    fn dealer_weight_by_rank() {
        assert_eq!(dealer_weight_for_rank(Some(1)), 1.0);
        assert!((dealer_weight_for_rank(Some(2)) - 0.95).abs() < 1e-12);
        assert_eq!(dealer_weight_for_rank(None), UNRANKED_DEALER_WEIGHT);
        assert!(dealer_weight_for_rank(Some(40)) < 0.0);
    }

    #[test]
    fn color_quote_has_unit_weights_and_flat_offer() {
        let h = hierarchy();
        let model = WeightModel::new(&h, FactorConfig::default(), now());
        let mut record = firm("GS", Some(3), Some(3));
        record.kind = QuoteKind::Color;

        let weighted = model.weigh(record);
        assert_eq!(weighted.weights, QuoteWeights::unit());
        assert_eq!(weighted.offer, weighted.bid());
    }

    #[test]
    fn missing_counters_count_as_one_day() {
        let h = hierarchy();
        let model = WeightModel::new(&h, FactorConfig::default(), now());
        let weighted = model.weigh(firm("GS", None, None));

        assert_eq!(weighted.days_stale, 1);
        assert_eq!(weighted.unchanged_for, 1);
        // 90 / 91 for both the day decay and the stale weight
        let expected = 90.0 / 91.0;
        assert!((weighted.weights.recency - expected).abs() < 1e-12);
        assert!((weighted.weights.stale - 30.0 / 31.0).abs() < 1e-12);
        assert!((weighted.final_weight() - expected * 30.0 / 31.0).abs() < 1e-12);
    }

    #[test]
    fn continuity_is_clamped_up_to_staleness() {
        let h = hierarchy();
        let model = WeightModel::new(&h, FactorConfig::default(), now());
        let weighted = model.weigh(firm("MS", Some(2), Some(6)));

        assert_eq!(weighted.unchanged_for, 6);
        assert!((weighted.weights.dealer - 0.9).abs() < 1e-12);
        assert!((weighted.weights.recency - 90.0 / 96.0).abs() < 1e-12);
    }

    #[test]
    fn long_continuity_hits_recency_floor() {
        assert_eq!(day_decay_recency_weight(240, 30.0), CONTINUITY_FLOOR_RECENCY_WEIGHT);
        assert!(day_decay_recency_weight(239, 30.0) > CONTINUITY_FLOOR_RECENCY_WEIGHT);
    }

    #[test]
    fn intraday_recency_uses_minutes_since_quote() {
        let h = hierarchy();
        let factors = FactorConfig { time_decay_days: 0.5, ..FactorConfig::default() };
        let model = WeightModel::new(&h, factors, now());

        let mut record = firm("GS", Some(0), Some(0));
        record.quote_timestamp = now().date().and_hms_opt(14, 20, 0).map(QuoteTimestamp::At);
        let weighted = model.weigh(record);

        // 100 minutes elapsed, horizon 0.5 * 400 = 200
        assert!((weighted.weights.recency - 200.0 / 300.0).abs() < 1e-12);
    }

    #[test]
    fn intraday_recency_defaults_when_not_today() {
        let h = hierarchy();
        let factors = FactorConfig { time_decay_days: 0.5, ..FactorConfig::default() };
        let model = WeightModel::new(&h, factors, now());

        let untimed = model.weigh(firm("GS", Some(0), Some(0)));
        assert_eq!(untimed.weights.recency, UNTIMED_RECENCY_WEIGHT);

        let mut old = firm("GS", Some(2), Some(2));
        old.quote_timestamp = NaiveDate::from_ymd_opt(2026, 10, 14).and_then(|d| d.and_hms_opt(15, 0, 0)).map(QuoteTimestamp::At);
        assert_eq!(model.weigh(old).weights.recency, UNTIMED_RECENCY_WEIGHT);
    }

    #[test]
    fn intraday_quote_ahead_of_clock_counts_as_fresh() {
        let h = hierarchy();
        let factors = FactorConfig { time_decay_days: 0.5, ..FactorConfig::default() };
        let model = WeightModel::new(&h, factors, now());

        let mut record = firm("GS", Some(0), Some(0));
        record.quote_timestamp = now().date().and_hms_opt(17, 30, 0).map(QuoteTimestamp::At);

        assert_eq!(model.weigh(record).weights.recency, 1.0);
    }

    #[test]
    fn intraday_recency_defaults_for_date_only_stamp() {
        let h = hierarchy();
        let factors = FactorConfig { time_decay_days: 0.5, ..FactorConfig::default() };
        let model = WeightModel::new(&h, factors, now());

        let mut record = firm("GS", Some(0), Some(0));
        record.quote_timestamp = Some(QuoteTimestamp::Day(now().date()));

        assert_eq!(model.weigh(record).weights.recency, UNTIMED_RECENCY_WEIGHT);
    }
}
