// Run statistics for idox
// Concurrent-safe histograms of status codes and error kinds

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Live counters shared by every dispatch task.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    codes: DashMap<u16, u64>,
    errors: DashMap<String, u64>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_code(&self, status: u16) {
        *self.codes.entry(status).or_insert(0) += 1;
    }

    pub fn record_error(&self, kind: &str) {
        *self.errors.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Copy the counters into key-sorted maps.
    pub fn snapshot(&self) -> RunStatistics {
        RunStatistics {
            seen_codes: self.codes.iter().map(|e| (*e.key(), *e.value())).collect(),
            seen_errors: self.errors.iter().map(|e| (e.key().clone(), *e.value())).collect(),
        }
    }
}

/// Final tallies of a run, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub seen_codes: BTreeMap<u16, u64>,
    pub seen_errors: BTreeMap<String, u64>,
}

impl RunStatistics {
    pub fn total_responses(&self) -> u64 {
        self.seen_codes.values().sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.seen_errors.values().sum()
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_responses() + self.total_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let recorder = Arc::new(StatsRecorder::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        recorder.record_code(if i % 2 == 0 { 200 } else { 404 });
                        recorder.record_error("Timeout");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = recorder.snapshot();
        assert_eq!(stats.seen_codes[&200], 2000);
        assert_eq!(stats.seen_codes[&404], 2000);
        assert_eq!(stats.seen_errors["Timeout"], 4000);
        assert_eq!(stats.total_attempts(), 8000);
    }
}
