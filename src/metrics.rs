use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity since start-up.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_analyzed: AtomicU64,
    classifications_stored: AtomicU64,
    acquisition_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document that went through the full analysis pipeline.
    pub fn record_analysis(&self) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a row written to the results table.
    pub fn record_stored(&self) {
        self.classifications_stored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a URL or PDF that yielded no text.
    pub fn record_acquisition_failure(&self) {
        self.acquisition_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            classifications_stored: self.classifications_stored.load(Ordering::Relaxed),
            acquisition_failures: self.acquisition_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents analyzed end to end.
    pub documents_analyzed: u64,
    /// Rows written to the results table.
    pub classifications_stored: u64,
    /// Sources that produced no text.
    pub acquisition_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let metrics = PipelineMetrics::new();
        metrics.record_analysis();
        metrics.record_stored();
        metrics.record_stored();
        metrics.record_acquisition_failure();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                documents_analyzed: 1,
                classifications_stored: 2,
                acquisition_failures: 1,
            }
        );
    }

    #[test]
    fn fresh_metrics_are_zero() {
        let snapshot = PipelineMetrics::new().snapshot();
        assert_eq!(snapshot.documents_analyzed, 0);
        assert_eq!(snapshot.classifications_stored, 0);
        assert_eq!(snapshot.acquisition_failures, 0);
    }
}
