//! Windowed statistics counter.
//!
//! Records one entry per request, classified by either `operation_type` or `operation_context`,
//! and reports both a cumulative ("overall") and a "last window" aggregate. Every collection call
//! resets the windowed array and advances the last-collection timestamp (P6).

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::context::ContextType;
use crate::options::GENERAL_OPERATIONS;
use crate::wire::ChannelStatsRaw;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticMetric {
    Counter,
    Throughput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticClassifier {
    OperationType,
    OperationContext,
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_micros() as u64
}

struct Inner {
    overall: Vec<u64>,
    windowed: Vec<u64>,
    start_time_us: u64,
    last_collection_time_us: u64,
}

pub struct ChannelStatistics {
    metric: StatisticMetric,
    classifier: StatisticClassifier,
    inner: Mutex<Inner>,
}

impl ChannelStatistics {
    pub fn new(metric: StatisticMetric, classifier: StatisticClassifier) -> Self {
        ChannelStatistics::with_context_type(metric, classifier, ContextType::General)
    }

    pub fn with_context_type(
        metric: StatisticMetric,
        classifier: StatisticClassifier,
        _context_type: ContextType,
    ) -> Self {
        let now = now_us();
        ChannelStatistics {
            metric,
            classifier,
            inner: Mutex::new(Inner {
                overall: vec![0; GENERAL_OPERATIONS],
                windowed: vec![0; GENERAL_OPERATIONS],
                start_time_us: now,
                last_collection_time_us: now,
            }),
        }
    }

    pub fn metric(&self) -> StatisticMetric {
        self.metric
    }

    fn index_for(&self, operation_type: u32, operation_context: u32) -> usize {
        let raw = match self.classifier {
            StatisticClassifier::OperationType => operation_type,
            StatisticClassifier::OperationContext => operation_context,
        };
        (raw as usize) % GENERAL_OPERATIONS
    }

    /// Records `counter_value` (already normalized by the caller: `total_operations *
    /// max(operation_size, 1-when-counter-metric)`) against the classified slot.
    pub fn update_statistic_entry(
        &self,
        operation_type: u32,
        operation_context: u32,
        counter_value: u64,
    ) {
        let index = self.index_for(operation_type, operation_context);
        let mut inner = self.inner.lock().expect("channel statistics lock poisoned");
        inner.overall[index] += counter_value;
        inner.windowed[index] += counter_value;
    }

    fn metric_value(&self, sum: u64, elapsed_us: u64) -> f64 {
        match self.metric {
            StatisticMetric::Counter => sum as f64,
            StatisticMetric::Throughput => {
                if elapsed_us == 0 {
                    0.0
                } else {
                    sum as f64 / (elapsed_us as f64 / 1_000_000.0)
                }
            }
        }
    }

    /// Aggregate overall + windowed collection. Resets the windowed array (P6).
    pub fn collect(&self, out: &mut ChannelStatsRaw) {
        let now = now_us();
        let mut inner = self.inner.lock().expect("channel statistics lock poisoned");

        let overall_sum: u64 = inner.overall.iter().sum();
        let windowed_sum: u64 = inner.windowed.iter().sum();

        let overall_elapsed = now.saturating_sub(inner.start_time_us);
        let windowed_elapsed = now.saturating_sub(inner.last_collection_time_us);

        out.overall = self.metric_value(overall_sum, overall_elapsed);
        out.windowed = self.metric_value(windowed_sum, windowed_elapsed);

        inner.windowed.iter_mut().for_each(|slot| *slot = 0);
        inner.last_collection_time_us = now;
    }

    /// Collect a single windowed entry by classifier index. Still resets the whole windowed
    /// array, matching the source's "every collection resets the window" contract.
    pub fn collect_single_entry(&self, out: &mut ChannelStatsRaw, operation: usize) {
        let now = now_us();
        let mut inner = self.inner.lock().expect("channel statistics lock poisoned");

        let index = operation % GENERAL_OPERATIONS;
        let overall_elapsed = now.saturating_sub(inner.start_time_us);
        let windowed_elapsed = now.saturating_sub(inner.last_collection_time_us);

        out.overall = self.metric_value(inner.overall[index], overall_elapsed);
        out.windowed = self.metric_value(inner.windowed[index], windowed_elapsed);

        inner.windowed.iter_mut().for_each(|slot| *slot = 0);
        inner.last_collection_time_us = now;
    }

    /// Returns every windowed entry, converted to the active metric, then resets the window.
    pub fn collect_detailed_windowed_entries(&self, out: &mut Vec<f64>) {
        let now = now_us();
        let mut inner = self.inner.lock().expect("channel statistics lock poisoned");

        let windowed_elapsed = now.saturating_sub(inner.last_collection_time_us);
        out.clear();
        out.extend(
            inner
                .windowed
                .iter()
                .map(|&value| self.metric_value(value, windowed_elapsed)),
        );

        inner.windowed.iter_mut().for_each(|slot| *slot = 0);
        inner.last_collection_time_us = now;
    }

    /// Terminates statistics collection, returning a debug summary (mirrors the destructor-time
    /// `terminate()` call of the source, used only for a final log line).
    pub fn terminate(&self) -> String {
        let inner = self.inner.lock().expect("channel statistics lock poisoned");
        let overall_sum: u64 = inner.overall.iter().sum();
        format!("overall={}", overall_sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn counter_metric_accumulates() {
        let stats = ChannelStatistics::new(StatisticMetric::Counter, StatisticClassifier::OperationType);
        stats.update_statistic_entry(1, 0, 10);
        stats.update_statistic_entry(1, 0, 5);

        let mut raw = ChannelStatsRaw::default();
        stats.collect(&mut raw);
        assert_eq!(raw.overall, 15.0);
        assert_eq!(raw.windowed, 15.0);
    }

    #[test]
    fn window_resets_after_collect() {
        let stats = ChannelStatistics::new(StatisticMetric::Counter, StatisticClassifier::OperationType);
        stats.update_statistic_entry(1, 0, 10);

        let mut raw = ChannelStatsRaw::default();
        stats.collect(&mut raw);
        assert_eq!(raw.windowed, 10.0);

        stats.collect(&mut raw);
        assert_eq!(raw.windowed, 0.0);
    }

    #[test]
    fn throughput_metric_uses_elapsed_time() {
        let stats = ChannelStatistics::new(StatisticMetric::Throughput, StatisticClassifier::OperationType);
        stats.update_statistic_entry(1, 0, 4096 * 1000);
        sleep(Duration::from_millis(50));

        let mut raw = ChannelStatsRaw::default();
        stats.collect(&mut raw);
        assert!(raw.overall > 0.0);
    }
}
