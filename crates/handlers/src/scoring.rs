//! Qualitative scoring of page-load timings.
//!
//! Each function maps the time elapsed since navigation start onto a
//! [`ScoreClassification`] using fixed thresholds. Thresholds are inclusive:
//! a timing exactly on a boundary gets the better classification.

use pagemetrics_traceevents::Micros;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreClassification {
    Good,
    Ok,
    Bad,
    Unclassified,
}

/// Upper bounds (inclusive) for the good and ok buckets.
struct Thresholds {
    good: Micros,
    ok: Micros,
}

impl Thresholds {
    fn classify(&self, timing: Micros) -> ScoreClassification {
        if timing <= self.good {
            ScoreClassification::Good
        } else if timing <= self.ok {
            ScoreClassification::Ok
        } else {
            ScoreClassification::Bad
        }
    }
}

const FCP_THRESHOLDS: Thresholds = Thresholds {
    good: Micros::from_millis(1_800),
    ok: Micros::from_millis(3_000),
};

const TTI_THRESHOLDS: Thresholds = Thresholds {
    good: Micros::from_millis(3_800),
    ok: Micros::from_millis(7_300),
};

const LCP_THRESHOLDS: Thresholds = Thresholds {
    good: Micros::from_millis(2_500),
    ok: Micros::from_millis(4_000),
};

const TBT_THRESHOLDS: Thresholds = Thresholds {
    good: Micros::from_millis(200),
    ok: Micros::from_millis(600),
};

pub fn score_classification_for_first_contentful_paint(timing: Micros) -> ScoreClassification {
    FCP_THRESHOLDS.classify(timing)
}

pub fn score_classification_for_time_to_interactive(timing: Micros) -> ScoreClassification {
    TTI_THRESHOLDS.classify(timing)
}

pub fn score_classification_for_largest_contentful_paint(timing: Micros) -> ScoreClassification {
    LCP_THRESHOLDS.classify(timing)
}

pub fn score_classification_for_total_blocking_time(timing: Micros) -> ScoreClassification {
    TBT_THRESHOLDS.classify(timing)
}

/// DOMContentLoaded has no qualitative scale.
pub fn score_classification_for_dom_content_loaded(_timing: Micros) -> ScoreClassification {
    ScoreClassification::Unclassified
}

/// Formats a timing as seconds with two decimals, e.g. `1.80 s`.
pub fn format_micros_as_seconds(timing: Micros) -> String {
    format!("{:.2} s", timing.as_secs_f64())
}

/// Formats a timing as whole milliseconds, e.g. `120 ms`.
pub fn format_micros_as_millis(timing: Micros) -> String {
    format!("{:.0} ms", timing.as_millis_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ScoreClassification::*;

    type Scorer = fn(Micros) -> ScoreClassification;

    fn check_boundaries(scorer: Scorer, good: Micros, ok: Micros) {
        assert_eq!(scorer(Micros::ZERO), Good);
        assert_eq!(scorer(good), Good);
        assert_eq!(scorer(good + Micros(1)), Ok);
        assert_eq!(scorer(ok), Ok);
        assert_eq!(scorer(ok + Micros(1)), Bad);
    }

    #[test]
    fn test_fcp_boundaries() {
        check_boundaries(
            score_classification_for_first_contentful_paint,
            Micros(1_800_000),
            Micros(3_000_000),
        );
    }

    #[test]
    fn test_tti_boundaries() {
        check_boundaries(
            score_classification_for_time_to_interactive,
            Micros(3_800_000),
            Micros(7_300_000),
        );
    }

    #[test]
    fn test_lcp_boundaries() {
        check_boundaries(
            score_classification_for_largest_contentful_paint,
            Micros(2_500_000),
            Micros(4_000_000),
        );
    }

    #[test]
    fn test_tbt_boundaries() {
        check_boundaries(
            score_classification_for_total_blocking_time,
            Micros(200_000),
            Micros(600_000),
        );
    }

    #[test]
    fn test_dcl_is_unclassified() {
        assert_eq!(
            score_classification_for_dom_content_loaded(Micros(1)),
            Unclassified
        );
        assert_eq!(
            score_classification_for_dom_content_loaded(Micros::from_secs(100)),
            Unclassified
        );
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_micros_as_seconds(Micros(1_800_000)), "1.80 s");
        assert_eq!(format_micros_as_seconds(Micros(1_234_567)), "1.23 s");
        assert_eq!(format_micros_as_millis(Micros(120_000)), "120 ms");
        assert_eq!(format_micros_as_millis(Micros(150_400)), "150 ms");
    }

    #[test]
    fn test_classification_is_monotonic() {
        fn rank(c: ScoreClassification) -> u8 {
            match c {
                Good => 0,
                Ok => 1,
                Bad => 2,
                Unclassified => u8::MAX,
            }
        }

        fn test(a: u32, b: u32) -> bool {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorers: [Scorer; 4] = [
                score_classification_for_first_contentful_paint,
                score_classification_for_time_to_interactive,
                score_classification_for_largest_contentful_paint,
                score_classification_for_total_blocking_time,
            ];
            scorers
                .iter()
                .all(|s| rank(s(Micros(lo as i64))) <= rank(s(Micros(hi as i64))))
        }
        quickcheck::quickcheck(test as fn(u32, u32) -> bool)
    }
}
