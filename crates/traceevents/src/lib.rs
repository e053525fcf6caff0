//! Trace event model for page-load analysis.
//!
//! This crate defines the typed trace events consumed by
//! `pagemetrics-handlers`, together with the classifier that decides which
//! events are page-load milestones.
//!
//! # Event shape
//!
//! Every event carries a common header followed by a kind-specific payload:
//!
//! | Field   | Meaning                                             |
//! |---------|-----------------------------------------------------|
//! | `ts`    | Timestamp in microseconds, monotonic per process    |
//! | `pid`   | Owning process                                      |
//! | `tid`   | Owning thread                                       |
//! | `frame` | Frame id, when attached directly to the event       |
//! | `data`  | Kind-specific payload ([`EventData`])               |
//!
//! # Usage
//!
//! ```
//! use pagemetrics_traceevents::{classify, EventData, MarkerData, Micros, TraceEvent};
//!
//! let event = TraceEvent::new(
//!     Micros(1_000),
//!     1,
//!     1,
//!     EventData::FirstContentfulPaint(MarkerData::default()),
//! );
//! assert!(classify(&event).is_some());
//! ```

mod classify;
pub mod types;

pub use classify::{classify, is_marker_event, is_page_load_event, MarkerKind, PageLoadKind};
pub use types::*;
