//! Per-region history of completed operators

use crate::coordinator::split::SplitOperator;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Append-only log of operators, keyed by region id.
pub trait OperatorHistory: Send + Sync {
    fn add(&self, region_id: u64, op: Arc<SplitOperator>);

    /// Operators recorded for `region_id`, oldest first.
    fn get(&self, region_id: u64) -> Vec<Arc<SplitOperator>>;
}

/// Bounded in-memory history.
///
/// Appends are serialized, so operators for one region stay in arrival
/// order. Each region keeps at most `capacity` entries.
#[derive(Debug)]
pub struct HistoryLog {
    capacity: usize,
    entries: Mutex<HashMap<u64, VecDeque<Arc<SplitOperator>>>>,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of regions with at least one recorded operator
    pub fn regions(&self) -> usize {
        self.entries.lock().len()
    }
}

impl OperatorHistory for HistoryLog {
    fn add(&self, region_id: u64, op: Arc<SplitOperator>) {
        let mut entries = self.entries.lock();
        let ops = entries.entry(region_id).or_default();
        if ops.len() == self.capacity {
            ops.pop_front();
        }
        ops.push_back(op);
    }

    fn get(&self, region_id: u64) -> Vec<Arc<SplitOperator>> {
        self.entries
            .lock()
            .get(&region_id)
            .map(|ops| ops.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::region::{Region, RegionEpoch};
    use crate::coordinator::split::origin_region;

    fn split_op(origin_id: u64, right_id: u64, at: &str) -> Arc<SplitOperator> {
        let left = Region::new(
            origin_id,
            b"".to_vec(),
            at.as_bytes().to_vec(),
            RegionEpoch::new(2, 1),
            vec![],
        );
        let right = Region::new(
            right_id,
            at.as_bytes().to_vec(),
            Vec::new(),
            RegionEpoch::new(2, 1),
            vec![],
        );
        Arc::new(SplitOperator::new(origin_region(&left, &right), left, right))
    }

    #[test]
    fn test_history_keeps_order_per_region() {
        let log = HistoryLog::new(8);
        log.add(1, split_op(1, 10, "m"));
        log.add(2, split_op(2, 20, "x"));
        log.add(1, split_op(1, 11, "f"));

        let ops = log.get(1);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].right.id, 10);
        assert_eq!(ops[1].right.id, 11);
        assert_eq!(log.get(2).len(), 1);
        assert!(log.get(3).is_empty());
        assert_eq!(log.regions(), 2);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let log = HistoryLog::new(2);
        for right in 10..13 {
            log.add(1, split_op(1, right, "m"));
        }

        let ids: Vec<u64> = log.get(1).iter().map(|op| op.right.id).collect();
        assert_eq!(ids, vec![11, 12]);
    }

    #[test]
    fn test_history_concurrent_appends() {
        let log = Arc::new(HistoryLog::new(1000));
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.add(t % 2, split_op(t % 2, t * 100 + i, "m"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.get(0).len(), 100);
        assert_eq!(log.get(1).len(), 100);
    }
}
