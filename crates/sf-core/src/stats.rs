//! Compliance failure counters.

use indexmap::IndexMap;

use crate::text::to_kebab_case;

/// Synthetic counter summing every recorded failure.
pub const TOTAL_STATISTIC: &str = "Total";

/// Receives counter values for display (status labels in a settings pane).
pub trait StatisticsSink {
    fn set_statistic(&mut self, label_id: &str, value: u64);
}

/// Per-filter failure counters plus a running total.
#[derive(Debug, Clone)]
pub struct StatisticsRecorder {
    selector_prefix: String,
    statistics: IndexMap<String, u64>,
}

impl StatisticsRecorder {
    pub fn new(selector_prefix: impl Into<String>) -> Self {
        let mut statistics = IndexMap::new();
        statistics.insert(TOTAL_STATISTIC.to_string(), 0);
        Self {
            selector_prefix: selector_prefix.into(),
            statistics,
        }
    }

    /// Count `value` failures against `statistic_type` when `passed` is false.
    pub fn record(&mut self, statistic_type: &str, passed: bool, value: u64) {
        if passed {
            return;
        }
        *self.statistics.entry(statistic_type.to_string()).or_insert(0) += value;
        if statistic_type != TOTAL_STATISTIC {
            *self.statistics.entry(TOTAL_STATISTIC.to_string()).or_insert(0) += value;
        }
    }

    /// Zero every counter; known counters stay listed.
    pub fn reset(&mut self) {
        for value in self.statistics.values_mut() {
            *value = 0;
        }
    }

    pub fn get(&self, statistic_type: &str) -> u64 {
        self.statistics.get(statistic_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.get(TOTAL_STATISTIC)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.statistics.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Label id a statistic is rendered under.
    pub fn label_id(&self, statistic_type: &str) -> String {
        format!("{}{}-stat", self.selector_prefix, to_kebab_case(statistic_type))
    }

    pub fn update_ui<S: StatisticsSink + ?Sized>(&self, sink: &mut S) {
        for (statistic_type, value) in &self.statistics {
            sink.set_statistic(&self.label_id(statistic_type), *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Labels(HashMap<String, u64>);

    impl StatisticsSink for Labels {
        fn set_statistic(&mut self, label_id: &str, value: u64) {
            self.0.insert(label_id.to_string(), value);
        }
    }

    #[test]
    fn test_record_counts_failures_only() {
        let mut stats = StatisticsRecorder::new("sf-");
        stats.record("Duration", true, 1);
        stats.record("Duration", false, 1);
        stats.record("Rating", false, 1);
        stats.record("Duration", false, 1);

        assert_eq!(stats.get("Duration"), 2);
        assert_eq!(stats.get("Rating"), 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut stats = StatisticsRecorder::new("sf-");
        stats.record("Duration", false, 4);
        stats.record("Tag Blacklist", false, 1);
        stats.reset();

        assert!(stats.iter().all(|(_, value)| value == 0));
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_update_ui_label_ids() {
        let mut stats = StatisticsRecorder::new("sf-");
        stats.record("Tag Blacklist", false, 1);
        let mut labels = Labels::default();
        stats.update_ui(&mut labels);

        assert_eq!(labels.0.get("sf-tag-blacklist-stat"), Some(&1));
        assert_eq!(labels.0.get("sf-total-stat"), Some(&1));
    }
}
