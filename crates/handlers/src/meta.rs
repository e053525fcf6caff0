//! Frame, navigation and process bookkeeping for a trace.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use pagemetrics_traceevents::{EventData, FrameId, Micros, NavigationId, ProcessId, TraceEvent};
use serde::Serialize;

use crate::config::Config;
use crate::error::HandlerError;
use crate::handler::{DependencyData, Handler, HandlerData, META};

/// One navigation of one frame. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRecord {
    pub navigation_id: NavigationId,
    pub frame: FrameId,
    pub start: Micros,
    pub url: String,
    pub pid: ProcessId,
}

/// An inclusive `[min, max]` time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub min: Micros,
    pub max: Micros,
}

impl TimeWindow {
    pub fn contains(&self, ts: Micros) -> bool {
        self.min <= ts && ts <= self.max
    }
}

/// The period during which a process rendered a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessWindow {
    pub frame: FrameId,
    pub pid: ProcessId,
    pub url: String,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    pub trace_bounds: TimeWindow,
    pub main_frame_id: Option<FrameId>,
    /// Not read by the metrics handlers; published for downstream consumers.
    pub browser_process_id: Option<ProcessId>,
    /// Navigations of each frame, ordered by start time.
    pub navigations_by_frame_id: HashMap<FrameId, IndexMap<NavigationId, NavigationRecord>>,
    pub navigations_by_navigation_id: HashMap<NavigationId, NavigationRecord>,
    pub renderer_processes_by_frame: HashMap<FrameId, HashMap<ProcessId, Vec<ProcessWindow>>>,
}

impl MetaData {
    /// The latest navigation of `frame` that started at or before `ts`.
    pub fn navigation_for_frame_at(
        &self,
        frame: &FrameId,
        ts: Micros,
    ) -> Option<&NavigationRecord> {
        self.navigations_by_frame_id
            .get(frame)?
            .values()
            .rev()
            .find(|nav| nav.start <= ts)
    }

    /// Whether `pid` was rendering `frame` at `ts`.
    pub fn process_active_at(&self, frame: &FrameId, pid: ProcessId, ts: Micros) -> bool {
        self.renderer_processes_by_frame
            .get(frame)
            .and_then(|by_pid| by_pid.get(&pid))
            .is_some_and(|windows| windows.iter().any(|w| w.window.contains(ts)))
    }
}

/// Builds [`MetaData`] from browser bookkeeping events.
pub struct MetaHandler {
    discard_empty_url_navigations: bool,
    bounds: Option<TimeWindow>,
    events: Vec<TraceEvent>,
    data: Option<Arc<MetaData>>,
}

impl MetaHandler {
    pub fn new(config: &Config) -> Self {
        MetaHandler {
            discard_empty_url_navigations: config.discard_empty_url_navigations,
            bounds: None,
            events: Vec::new(),
            data: None,
        }
    }

    /// The finalized data, if [`finalize`](Handler::finalize) has run.
    pub fn data(&self) -> Option<&Arc<MetaData>> {
        self.data.as_ref()
    }

    fn build(&self) -> MetaData {
        let mut events: Vec<&TraceEvent> = self.events.iter().collect();
        events.sort_by_key(|e| e.ts);

        let trace_bounds = self.bounds.unwrap_or_default();
        let mut data = MetaData {
            trace_bounds,
            ..Default::default()
        };
        let mut windows = OpenWindows::default();

        for event in events {
            match &event.data {
                EventData::TracingStartedInBrowser(started) => {
                    data.browser_process_id = Some(event.pid);
                    for info in &started.frames {
                        if info.parent.is_none() && data.main_frame_id.is_none() {
                            data.main_frame_id = Some(info.frame.clone());
                        }
                        windows.open(&info.frame, info.process_id, &info.url, event.ts);
                    }
                }
                EventData::FrameCommittedInBrowser(committed) => {
                    windows.open(&committed.frame, committed.process_id, &committed.url, event.ts);
                }
                EventData::NavigationStart(nav) => {
                    let (Some(navigation_id), Some(frame)) =
                        (nav.navigation_id.as_ref(), event.frame_id())
                    else {
                        log::trace!("skipping navigationStart at {} without ids", event.ts);
                        continue;
                    };
                    if nav.document_loader_url.is_empty() && self.discard_empty_url_navigations {
                        log::trace!("discarding navigation {} with empty url", navigation_id);
                        continue;
                    }
                    let record = NavigationRecord {
                        navigation_id: navigation_id.clone(),
                        frame: frame.clone(),
                        start: event.ts,
                        url: nav.document_loader_url.clone(),
                        pid: event.pid,
                    };
                    data.navigations_by_frame_id
                        .entry(frame.clone())
                        .or_default()
                        .insert(navigation_id.clone(), record.clone());
                    data.navigations_by_navigation_id
                        .insert(navigation_id.clone(), record);
                }
                _ => {}
            }
        }

        for window in windows.close(trace_bounds.max) {
            data.renderer_processes_by_frame
                .entry(window.frame.clone())
                .or_default()
                .entry(window.pid)
                .or_default()
                .push(window);
        }

        data
    }
}

/// Process windows under construction; `None` marks a window still open.
#[derive(Default)]
struct OpenWindows {
    windows: Vec<(ProcessWindow, Option<Micros>)>,
}

impl OpenWindows {
    /// Opens a window for `pid` on `frame`, closing the frame's windows in other processes.
    fn open(&mut self, frame: &FrameId, pid: ProcessId, url: &str, ts: Micros) {
        let mut already_open = false;
        let open = self
            .windows
            .iter_mut()
            .filter(|(w, end)| &w.frame == frame && end.is_none());
        for (w, end) in open {
            if w.pid == pid {
                already_open = true;
                if !url.is_empty() {
                    w.url = url.to_string();
                }
            } else {
                *end = Some(ts);
            }
        }
        if !already_open {
            self.windows.push((
                ProcessWindow {
                    frame: frame.clone(),
                    pid,
                    url: url.to_string(),
                    window: TimeWindow { min: ts, max: ts },
                },
                None,
            ));
        }
    }

    fn close(self, trace_end: Micros) -> impl Iterator<Item = ProcessWindow> {
        self.windows.into_iter().map(move |(mut w, end)| {
            w.window.max = end.unwrap_or(trace_end).max(w.window.min);
            w
        })
    }
}

impl Handler for MetaHandler {
    fn name(&self) -> &'static str {
        META
    }

    fn reset(&mut self) {
        self.bounds = None;
        self.events.clear();
        self.data = None;
    }

    fn handle_event(&mut self, event: &TraceEvent) {
        let end = event.end();
        let bounds = self.bounds.get_or_insert(TimeWindow {
            min: event.ts,
            max: end,
        });
        bounds.min = bounds.min.min(event.ts);
        bounds.max = bounds.max.max(end);

        if matches!(
            event.data,
            EventData::TracingStartedInBrowser(_)
                | EventData::NavigationStart(_)
                | EventData::FrameCommittedInBrowser(_)
        ) {
            self.events.push(event.clone());
        }
    }

    fn finalize(&mut self, _deps: &DependencyData) -> Result<(), HandlerError> {
        if self.data.is_some() {
            return Err(HandlerError::AlreadyFinalized(META));
        }
        let data = self.build();
        log::debug!(
            "meta: {} navigations across {} frames",
            data.navigations_by_navigation_id.len(),
            data.navigations_by_frame_id.len()
        );
        self.data = Some(Arc::new(data));
        Ok(())
    }

    fn output(&self) -> Option<HandlerData> {
        self.data.clone().map(HandlerData::Meta)
    }
}
