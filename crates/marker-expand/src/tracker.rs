//! Bookkeeping for marker occurrences that have already been claimed,
//! keyed by parent node identity and child index. A claimed index is
//! never re-examined by a later scan of the same parent, which keeps
//! re-entrant passes from double-expanding or colliding on ranges.

use doc_tree::NodeId;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default)]
pub struct ConsumedRegions {
    consumed: FxHashMap<NodeId, FxHashSet<usize>>,
}

impl ConsumedRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, parent: NodeId, index: usize) -> bool {
        self.consumed
            .get(&parent)
            .is_some_and(|indices| indices.contains(&index))
    }

    pub fn consume(&mut self, parent: NodeId, index: usize) {
        self.consumed.entry(parent).or_default().insert(index);
    }

    pub fn consume_range(&mut self, parent: NodeId, indices: std::ops::RangeInclusive<usize>) {
        let set = self.consumed.entry(parent).or_default();
        for index in indices {
            set.insert(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumption_is_per_parent() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        let mut tracker = ConsumedRegions::new();
        tracker.consume(a, 2);
        tracker.consume_range(b, 0..=1);

        assert!(tracker.is_consumed(a, 2));
        assert!(!tracker.is_consumed(a, 0));
        assert!(tracker.is_consumed(b, 0));
        assert!(tracker.is_consumed(b, 1));
        assert!(!tracker.is_consumed(b, 2));
    }
}
