use std::collections::HashMap;
use crate::types::ids::DealerId;

/// Dealer reputation ranking, 1 being the most trusted. Unranked dealers are absent.
#[derive(Clone, Debug, Default)]
pub struct DealerHierarchy {
    ranks: HashMap<DealerId, u32>,
}

impl DealerHierarchy {
    pub fn new() -> Self {
        DealerHierarchy {
            ranks: HashMap::new(),
        }
    }

    pub fn insert(&mut self, dealer_id: DealerId, rank: u32) {
        self.ranks.insert(dealer_id, rank);
    }

    pub fn rank(&self, dealer_id: &DealerId) -> Option<u32> {
        self.ranks.get(dealer_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl FromIterator<(DealerId, u32)> for DealerHierarchy {
    fn from_iter<I: IntoIterator<Item = (DealerId, u32)>>(iter: I) -> Self {
        DealerHierarchy {
            ranks: iter.into_iter().collect(),
        }
    }
}
