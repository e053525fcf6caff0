use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

// === Error types ===

/// A required identifier was absent from an event payload.
///
/// The producing instrumentation always emits these fields, so hitting this
/// error means the trace violates its producer contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{event} event at {ts} is missing required field `{field}`")]
pub struct MissingField {
    pub event: &'static str,
    pub field: &'static str,
    pub ts: Micros,
}

// === Basic types ===

/// A microsecond quantity.
///
/// Trace timestamps are monotonic microseconds within a process, and
/// durations share the same unit, so both are represented by this type.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Micros(pub i64);

impl Micros {
    pub const ZERO: Micros = Micros(0);

    pub const fn from_millis(ms: i64) -> Self {
        Micros(ms * 1_000)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Micros(secs * 1_000_000)
    }

    /// Converts a fractional millisecond value, rounding to the nearest microsecond.
    pub fn from_millis_f64(ms: f64) -> Self {
        Micros((ms * 1_000.0).round() as i64)
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_sub(rhs.0).max(0))
    }
}

/// Arithmetic saturates at the `i64` bounds.
impl Add for Micros {
    type Output = Micros;

    fn add(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Micros {
    fn add_assign(&mut self, rhs: Micros) {
        *self = *self + rhs;
    }
}

impl Sub for Micros {
    type Output = Micros;

    fn sub(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}µs", self.0)
    }
}

pub type ProcessId = u32;
pub type ThreadId = u32;

/// Identifies a frame (the main document or an iframe) across processes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub String);

impl From<&str> for FrameId {
    fn from(s: &str) -> Self {
        FrameId(s.to_string())
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a single navigation within a frame.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationId(pub String);

impl From<&str> for NavigationId {
    fn from(s: &str) -> Self {
        NavigationId(s.to_string())
    }
}

impl fmt::Display for NavigationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// === Top-level event type ===

/// A single trace event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub ts: Micros,
    pub pid: ProcessId,
    pub tid: ThreadId,
    /// Frame identifier when the producer attached it to the event itself
    /// rather than to the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameId>,
    pub data: EventData,
}

impl TraceEvent {
    pub fn new(ts: Micros, pid: ProcessId, tid: ThreadId, data: EventData) -> Self {
        TraceEvent {
            ts,
            pid,
            tid,
            frame: None,
            data,
        }
    }

    pub fn with_frame(mut self, frame: impl Into<FrameId>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    /// The event's frame: the directly attached one, else the one nested in the payload.
    pub fn frame_id(&self) -> Option<&FrameId> {
        self.frame.as_ref().or_else(|| self.data.frame())
    }

    /// The frame id, failing for events whose producer guarantees one.
    pub fn require_frame_id(&self) -> Result<&FrameId, MissingField> {
        self.frame_id().ok_or_else(|| self.missing("frame"))
    }

    /// The navigation id embedded in the payload, if the kind carries one.
    pub fn navigation_id(&self) -> Option<&NavigationId> {
        match &self.data {
            EventData::FirstPaint(m)
            | EventData::FirstContentfulPaint(m)
            | EventData::MarkDomContent(m)
            | EventData::MarkLoad(m) => m.navigation_id.as_ref(),
            EventData::LargestContentfulPaintCandidate(c) => c.navigation_id.as_ref(),
            EventData::InteractiveTime(i) => i.navigation_id.as_ref(),
            EventData::NavigationStart(n) => n.navigation_id.as_ref(),
            _ => None,
        }
    }

    pub fn require_navigation_id(&self) -> Result<&NavigationId, MissingField> {
        self.navigation_id()
            .ok_or_else(|| self.missing("navigationId"))
    }

    /// Duration of duration-bearing events; `None` for instantaneous ones.
    pub fn duration(&self) -> Option<Micros> {
        match &self.data {
            EventData::Complete(c) => Some(c.dur),
            _ => None,
        }
    }

    /// End timestamp; equal to `ts` for instantaneous events. Saturates instead of overflowing.
    pub fn end(&self) -> Micros {
        self.ts + self.duration().unwrap_or(Micros::ZERO)
    }

    pub fn name(&self) -> &str {
        self.data.name()
    }

    fn missing(&self, field: &'static str) -> MissingField {
        MissingField {
            event: self.data.name_static(),
            field,
            ts: self.ts,
        }
    }

    /// The LCP candidate index, for LCP candidate events.
    pub fn candidate_index(&self) -> Option<u32> {
        match &self.data {
            EventData::LargestContentfulPaintCandidate(c) => c.candidate_index,
            _ => None,
        }
    }

    pub fn require_candidate_index(&self) -> Result<u32, MissingField> {
        self.candidate_index()
            .ok_or_else(|| self.missing("candidateIndex"))
    }

    /// Total blocking time reported by an interactive-time event.
    pub fn total_blocking_time(&self) -> Option<Micros> {
        match &self.data {
            EventData::InteractiveTime(i) => {
                Some(Micros::from_millis_f64(i.total_blocking_time_ms))
            }
            _ => None,
        }
    }
}

/// The kind-specific payload of a trace event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum EventData {
    // --- Page-load milestones ---
    #[serde(rename = "MarkDOMContent")]
    MarkDomContent(MarkerData),
    MarkLoad(MarkerData),
    #[serde(rename = "firstPaint")]
    FirstPaint(MarkerData),
    #[serde(rename = "firstContentfulPaint")]
    FirstContentfulPaint(MarkerData),
    #[serde(rename = "largestContentfulPaint::Candidate")]
    LargestContentfulPaintCandidate(LcpCandidateData),
    InteractiveTime(InteractiveTimeData),
    LayoutShift(LayoutShiftData),

    // --- Browser and navigation bookkeeping ---
    TracingStartedInBrowser(TracingStartedData),
    #[serde(rename = "navigationStart")]
    NavigationStart(NavigationStartData),
    FrameCommittedInBrowser(FrameCommittedData),

    // --- Thread activity ---
    #[serde(rename = "thread_name")]
    ThreadName(ThreadNameData),
    Complete(CompleteData),
    Instant(InstantData),

    /// Any event kind this crate does not model.
    Other(OtherData),
}

impl EventData {
    fn frame(&self) -> Option<&FrameId> {
        match self {
            EventData::MarkDomContent(m)
            | EventData::MarkLoad(m)
            | EventData::FirstPaint(m)
            | EventData::FirstContentfulPaint(m) => m.frame.as_ref(),
            EventData::LargestContentfulPaintCandidate(c) => c.frame.as_ref(),
            EventData::InteractiveTime(i) => i.frame.as_ref(),
            EventData::LayoutShift(l) => l.frame.as_ref(),
            EventData::FrameCommittedInBrowser(f) => Some(&f.frame),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EventData::Complete(c) => &c.name,
            EventData::Instant(i) => &i.name,
            EventData::Other(o) => &o.name,
            _ => self.name_static(),
        }
    }

    fn name_static(&self) -> &'static str {
        match self {
            EventData::MarkDomContent(_) => "MarkDOMContent",
            EventData::MarkLoad(_) => "MarkLoad",
            EventData::FirstPaint(_) => "firstPaint",
            EventData::FirstContentfulPaint(_) => "firstContentfulPaint",
            EventData::LargestContentfulPaintCandidate(_) => "largestContentfulPaint::Candidate",
            EventData::InteractiveTime(_) => "InteractiveTime",
            EventData::LayoutShift(_) => "LayoutShift",
            EventData::TracingStartedInBrowser(_) => "TracingStartedInBrowser",
            EventData::NavigationStart(_) => "navigationStart",
            EventData::FrameCommittedInBrowser(_) => "FrameCommittedInBrowser",
            EventData::ThreadName(_) => "thread_name",
            EventData::Complete(_) => "Complete",
            EventData::Instant(_) => "Instant",
            EventData::Other(_) => "Other",
        }
    }
}

// === Page-load payloads ===

/// Payload shared by the simple milestone events (DCL, load, FP, FCP).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerData {
    #[serde(default)]
    pub frame: Option<FrameId>,
    #[serde(default)]
    pub navigation_id: Option<NavigationId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LcpCandidateData {
    #[serde(default)]
    pub frame: Option<FrameId>,
    #[serde(default)]
    pub navigation_id: Option<NavigationId>,
    /// Monotonically increasing per navigation; later candidates supersede earlier ones.
    #[serde(default)]
    pub candidate_index: Option<u32>,
    /// Painted area; carried for consumers outside the metrics handlers.
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveTimeData {
    #[serde(default)]
    pub frame: Option<FrameId>,
    #[serde(default)]
    pub navigation_id: Option<NavigationId>,
    pub total_blocking_time_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShiftData {
    #[serde(default)]
    pub frame: Option<FrameId>,
    pub score: f64,
    #[serde(default)]
    pub had_recent_input: bool,
}

// === Browser payloads ===

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracingStartedData {
    pub frames: Vec<FrameInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub frame: FrameId,
    #[serde(default)]
    pub url: String,
    pub process_id: ProcessId,
    #[serde(default)]
    pub parent: Option<FrameId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationStartData {
    #[serde(default)]
    pub navigation_id: Option<NavigationId>,
    #[serde(default)]
    pub document_loader_url: String,
    /// Carried for consumers outside the metrics handlers.
    #[serde(default)]
    pub is_loading_main_frame: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameCommittedData {
    pub frame: FrameId,
    pub process_id: ProcessId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub parent: Option<FrameId>,
}

// === Thread payloads ===

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadNameData {
    pub name: String,
}

/// A duration-bearing event such as a scheduler task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteData {
    pub name: String,
    pub dur: Micros,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstantData {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherData {
    pub name: String,
}
