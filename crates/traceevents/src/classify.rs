//! Classification of trace events into page-load milestones.

use crate::types::{EventData, TraceEvent};

/// The duration-less milestone kinds drawn as timeline markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    DomContentLoaded,
    Load,
    FirstPaint,
    FirstContentfulPaint,
    LargestContentfulPaintCandidate,
}

/// The page-load event kinds: every marker kind plus interactivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageLoadKind {
    Marker(MarkerKind),
    InteractiveTime,
}

impl PageLoadKind {
    pub fn is_marker(self) -> bool {
        matches!(self, PageLoadKind::Marker(_))
    }
}

/// Classifies an event, returning `None` for anything that is not a page-load event.
///
/// The match has no wildcard arm, so a new [`EventData`] variant must be
/// classified here before the crate compiles.
pub fn classify(event: &TraceEvent) -> Option<PageLoadKind> {
    use MarkerKind::*;

    let kind = match &event.data {
        EventData::MarkDomContent(_) => PageLoadKind::Marker(DomContentLoaded),
        EventData::MarkLoad(_) => PageLoadKind::Marker(Load),
        EventData::FirstPaint(_) => PageLoadKind::Marker(FirstPaint),
        EventData::FirstContentfulPaint(_) => PageLoadKind::Marker(FirstContentfulPaint),
        EventData::LargestContentfulPaintCandidate(_) => {
            PageLoadKind::Marker(LargestContentfulPaintCandidate)
        }
        EventData::InteractiveTime(_) => PageLoadKind::InteractiveTime,

        // Layout shifts feed the cumulative layout shift computation, not page-load timings.
        EventData::LayoutShift(_) => return None,

        EventData::TracingStartedInBrowser(_)
        | EventData::NavigationStart(_)
        | EventData::FrameCommittedInBrowser(_)
        | EventData::ThreadName(_)
        | EventData::Complete(_)
        | EventData::Instant(_)
        | EventData::Other(_) => return None,
    };
    Some(kind)
}

/// Reports whether the event is one of the duration-less milestone kinds.
pub fn is_marker_event(event: &TraceEvent) -> bool {
    classify(event).is_some_and(PageLoadKind::is_marker)
}

/// Reports whether the event is a page-load event (a marker or interactive time).
pub fn is_page_load_event(event: &TraceEvent) -> bool {
    classify(event).is_some()
}
