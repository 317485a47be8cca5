//! Session counters.

use super::FailureKind;
use crate::mapper::Category;

/// Monotonic counters describing what a session has done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Successful device acquisitions, including ones discarded as stale.
    pub acquisitions: u64,
    /// Device releases performed by the session.
    pub releases: u64,
    /// Frames captured.
    pub captures: u64,
    /// Classification requests issued.
    pub submissions: u64,
    /// Completions discarded because `stop()` ran first.
    pub stale_discarded: u64,
    results: [u64; 5],
    failures: [u64; 3],
}

impl SessionStats {
    /// Results recorded for a category.
    pub fn results(&self, category: Category) -> u64 {
        self.results[category.index()]
    }

    /// Total results recorded.
    pub fn total_results(&self) -> u64 {
        self.results.iter().sum()
    }

    /// Failures recorded for a kind.
    pub fn failures(&self, kind: FailureKind) -> u64 {
        self.failures[kind.index()]
    }

    pub(crate) fn record_result(&mut self, category: Category) {
        self.results[category.index()] += 1;
    }

    pub(crate) fn record_failure(&mut self, kind: FailureKind) {
        self.failures[kind.index()] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = SessionStats::default();
        stats.record_result(Category::Red);
        stats.record_result(Category::Red);
        stats.record_result(Category::Unknown);
        stats.record_failure(FailureKind::Network);

        assert_eq!(stats.results(Category::Red), 2);
        assert_eq!(stats.results(Category::Normal), 0);
        assert_eq!(stats.total_results(), 3);
        assert_eq!(stats.failures(FailureKind::Network), 1);
        assert_eq!(stats.failures(FailureKind::InvalidResponse), 0);
    }
}
