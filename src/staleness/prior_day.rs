use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::types::ids::QuoteKey;

/// Counter value assumed when no history exists
pub const MISSING_COUNTER: u32 = 1;

/// `(unchanged_for, days_stale)` after the missing-value rule. Continuity
/// reported shorter than staleness is raised to it.
pub fn effective_counters(unchanged_for: Option<u32>, days_stale: Option<u32>) -> (u32, u32) {
    let days_stale = days_stale.unwrap_or(MISSING_COUNTER);
    let unchanged_for = unchanged_for.unwrap_or(MISSING_COUNTER).max(days_stale);
    (unchanged_for, days_stale)
}

/// Yesterday's persisted counters for one instrument/dealer pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorCounters {
    pub unchanged_for: Option<u32>,
    pub days_stale: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct PriorDayState {
    counters: HashMap<QuoteKey, PriorCounters>,
}

impl PriorDayState {
    pub fn new() -> Self {
        PriorDayState {
            counters: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: QuoteKey, counters: PriorCounters) {
        self.counters.insert(key, counters);
    }

    pub fn get(&self, key: &QuoteKey) -> Option<&PriorCounters> {
        self.counters.get(key)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl FromIterator<(QuoteKey, PriorCounters)> for PriorDayState {
    fn from_iter<I: IntoIterator<Item = (QuoteKey, PriorCounters)>>(iter: I) -> Self {
        PriorDayState {
            counters: iter.into_iter().collect(),
        }
    }
}
