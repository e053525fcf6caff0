use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use pagemetrics_traceevents::{FrameId, Micros, NavigationId, TraceEvent};
use serde::{Deserialize, Serialize};

use crate::meta::NavigationRecord;
use crate::scoring::{self, ScoreClassification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricName {
    /// First contentful paint.
    FCP,
    /// First paint.
    FP,
    /// Load event.
    L,
    /// Largest contentful paint.
    LCP,
    /// DOMContentLoaded.
    DCL,
    /// Time to interactive.
    TTI,
    /// Total blocking time.
    TBT,
}

impl MetricName {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::FCP => "FCP",
            MetricName::FP => "FP",
            MetricName::L => "L",
            MetricName::LCP => "LCP",
            MetricName::DCL => "DCL",
            MetricName::TTI => "TTI",
            MetricName::TBT => "TBT",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scored metric for one navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricScore {
    pub metric_name: MetricName,
    /// Human readable timing, e.g. `1.80 s` or `120 ms`.
    pub score: String,
    pub timing: Micros,
    pub classification: ScoreClassification,
    pub event: Option<TraceEvent>,
    pub navigation: Option<NavigationRecord>,
    /// Set when the value was derived rather than reported by the trace.
    pub estimated: bool,
}

impl MetricScore {
    /// Scores `timing` (elapsed since navigation start) for the given metric.
    pub fn new(
        metric_name: MetricName,
        timing: Micros,
        event: Option<TraceEvent>,
        navigation: Option<NavigationRecord>,
    ) -> Self {
        let classification = match metric_name {
            MetricName::FCP => scoring::score_classification_for_first_contentful_paint(timing),
            MetricName::LCP => scoring::score_classification_for_largest_contentful_paint(timing),
            MetricName::TTI => scoring::score_classification_for_time_to_interactive(timing),
            MetricName::TBT => scoring::score_classification_for_total_blocking_time(timing),
            MetricName::DCL => scoring::score_classification_for_dom_content_loaded(timing),
            MetricName::FP | MetricName::L => ScoreClassification::Unclassified,
        };
        let score = match metric_name {
            MetricName::TBT => scoring::format_micros_as_millis(timing),
            _ => scoring::format_micros_as_seconds(timing),
        };
        MetricScore {
            metric_name,
            score,
            timing,
            classification,
            event,
            navigation,
            estimated: false,
        }
    }

    pub fn estimated(mut self) -> Self {
        self.estimated = true;
        self
    }
}

/// The metrics of one navigation, in the order they were last written.
///
/// Writing a metric that already exists moves it to the end, so iteration
/// reflects when each value was finalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NavigationMetrics {
    scores: IndexMap<MetricName, MetricScore>,
}

impl NavigationMetrics {
    /// Replaces any existing score for the metric and appends the new one.
    pub fn upsert(&mut self, score: MetricScore) {
        self.scores.shift_remove(&score.metric_name);
        self.scores.insert(score.metric_name, score);
    }

    pub fn get(&self, name: MetricName) -> Option<&MetricScore> {
        self.scores.get(&name)
    }

    pub fn contains(&self, name: MetricName) -> bool {
        self.scores.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricScore> {
        self.scores.values()
    }

    pub fn names(&self) -> impl Iterator<Item = MetricName> + '_ {
        self.scores.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Frame id → navigation id → metrics.
pub type MetricTable = HashMap<FrameId, HashMap<NavigationId, NavigationMetrics>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn score(name: MetricName, timing: i64) -> MetricScore {
        MetricScore::new(name, Micros(timing), None, None)
    }

    #[test]
    fn test_new_scores_and_formats() {
        let fcp = score(MetricName::FCP, 1_800_000);
        assert_eq!(fcp.score, "1.80 s");
        assert_eq!(fcp.classification, ScoreClassification::Good);
        assert!(!fcp.estimated);

        let tbt = score(MetricName::TBT, 650_000).estimated();
        assert_eq!(tbt.score, "650 ms");
        assert_eq!(tbt.classification, ScoreClassification::Bad);
        assert!(tbt.estimated);

        let load = score(MetricName::L, 10_000_000);
        assert_eq!(load.classification, ScoreClassification::Unclassified);
        assert_eq!(score(MetricName::DCL, 1).classification, ScoreClassification::Unclassified);
    }

    #[test]
    fn test_upsert_moves_to_end() {
        let mut m = NavigationMetrics::default();
        m.upsert(score(MetricName::LCP, 1));
        m.upsert(score(MetricName::FCP, 2));
        m.upsert(score(MetricName::LCP, 3));

        assert_eq!(m.len(), 2);
        assert_eq!(
            m.names().collect::<Vec<_>>(),
            vec![MetricName::FCP, MetricName::LCP]
        );
        assert_eq!(m.get(MetricName::LCP).unwrap().timing, Micros(3));
    }

    #[test]
    fn test_contains() {
        let mut m = NavigationMetrics::default();
        assert!(m.is_empty());
        m.upsert(score(MetricName::TBT, 1));
        assert!(m.contains(MetricName::TBT));
        assert!(!m.contains(MetricName::TTI));
    }
}
