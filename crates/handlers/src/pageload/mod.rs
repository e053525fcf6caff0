//! Page-load metrics: FCP, FP, DCL, load, LCP, TTI and TBT per navigation.
//!
//! Page-load events are buffered while streaming. Finalizing attributes each
//! one to a navigation (via [`MetaData`]), keeps only the winning LCP
//! candidate per navigation, estimates TBT from main-thread tasks when the
//! trace never reported it, and collects the main frame's milestones as a
//! time-ordered marker list.

mod metrics;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use pagemetrics_traceevents::{
    classify, is_page_load_event, FrameId, MarkerKind, Micros, NavigationId, PageLoadKind,
    TraceEvent,
};
use serde::Serialize;

pub use metrics::{MetricName, MetricScore, MetricTable, NavigationMetrics};

use crate::config::Config;
use crate::error::HandlerError;
use crate::handler::{DependencyData, Handler, HandlerData, META, PAGE_LOAD_METRICS, RENDERER};
use crate::meta::{MetaData, NavigationRecord};
use crate::renderer::RendererData;

/// Tasks longer than this block the main thread for the excess.
pub const LONG_TASK_THRESHOLD: Micros = Micros::from_millis(50);

/// A read-only snapshot of the finalized metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLoadMetricsData {
    pub metric_scores_by_frame_id: MetricTable,
    /// Main-frame milestones, ascending by timestamp.
    pub all_marker_events: Vec<TraceEvent>,
    pub main_frame_id: Option<FrameId>,
}

impl PageLoadMetricsData {
    pub fn scores(&self, frame: &FrameId, navigation: &NavigationId) -> Option<&NavigationMetrics> {
        self.metric_scores_by_frame_id.get(frame)?.get(navigation)
    }

    /// Timestamp of the earliest FCP recorded for the main frame.
    pub fn first_fcp_timestamp(&self) -> Option<Micros> {
        let frame = self.main_frame_id.as_ref()?;
        self.metric_scores_by_frame_id
            .get(frame)?
            .values()
            .filter_map(|metrics| metrics.get(MetricName::FCP)?.event.as_ref())
            .map(|event| event.ts)
            .min()
    }
}

type NavigationKey = (FrameId, NavigationId);

pub struct PageLoadMetricsHandler {
    main_thread_name: String,
    run_task_name: String,

    page_load_events: Vec<TraceEvent>,
    metric_scores_by_frame_id: MetricTable,
    selected_lcp_candidates: HashMap<NavigationKey, TraceEvent>,
    all_marker_events: Vec<TraceEvent>,
    main_frame_id: Option<FrameId>,
    finalized: bool,
}

impl PageLoadMetricsHandler {
    pub fn new(config: &Config) -> Self {
        PageLoadMetricsHandler {
            main_thread_name: config.main_thread_name.clone(),
            run_task_name: config.run_task_name.clone(),
            page_load_events: Vec::new(),
            metric_scores_by_frame_id: MetricTable::new(),
            selected_lcp_candidates: HashMap::new(),
            all_marker_events: Vec::new(),
            main_frame_id: None,
            finalized: false,
        }
    }

    /// A deep copy of the current metrics, safe to hand out.
    pub fn data(&self) -> PageLoadMetricsData {
        PageLoadMetricsData {
            metric_scores_by_frame_id: self.metric_scores_by_frame_id.clone(),
            all_marker_events: self.all_marker_events.clone(),
            main_frame_id: self.main_frame_id.clone(),
        }
    }

    /// The LCP candidate currently selected for each navigation.
    pub fn selected_lcp_candidates(&self) -> impl Iterator<Item = &TraceEvent> {
        self.selected_lcp_candidates.values()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl Handler for PageLoadMetricsHandler {
    fn name(&self) -> &'static str {
        PAGE_LOAD_METRICS
    }

    fn deps(&self) -> &'static [&'static str] {
        &[META, RENDERER]
    }

    fn reset(&mut self) {
        self.page_load_events.clear();
        self.metric_scores_by_frame_id.clear();
        self.selected_lcp_candidates.clear();
        self.all_marker_events.clear();
        self.main_frame_id = None;
        self.finalized = false;
    }

    fn handle_event(&mut self, event: &TraceEvent) {
        if is_page_load_event(event) {
            self.page_load_events.push(event.clone());
        }
    }

    fn finalize(&mut self, deps: &DependencyData) -> Result<(), HandlerError> {
        if self.finalized {
            return Err(HandlerError::AlreadyFinalized(PAGE_LOAD_METRICS));
        }
        let meta = deps.meta()?;
        let renderer = deps.renderer()?;

        let mut events = self.page_load_events.clone();
        events.sort_by_key(|e| e.ts);

        // Everything is computed into the pass and committed only on success.
        let mut pass = FinalizePass {
            meta,
            renderer,
            main_thread_name: &self.main_thread_name,
            run_task_name: &self.run_task_name,
            events: &events,
            table: MetricTable::new(),
            selected: HashMap::new(),
        };
        for index in 0..events.len() {
            pass.process(index)?;
        }
        pass.estimate_total_blocking_time()?;
        let markers = pass.marker_events();

        let FinalizePass { table, selected, .. } = pass;
        log::debug!(
            "page load metrics: {} events, {} frames, {} markers",
            events.len(),
            table.len(),
            markers.len()
        );

        self.metric_scores_by_frame_id = table;
        self.selected_lcp_candidates = selected
            .into_iter()
            .map(|(key, candidate)| (key, events[candidate.event_index].clone()))
            .collect();
        self.all_marker_events = markers;
        self.main_frame_id = meta.main_frame_id.clone();
        self.page_load_events = events;
        self.finalized = true;
        Ok(())
    }

    fn output(&self) -> Option<HandlerData> {
        self.finalized
            .then(|| HandlerData::PageLoadMetrics(Arc::new(self.data())))
    }
}

#[derive(Clone, Copy)]
struct SelectedCandidate {
    event_index: usize,
    candidate_index: u32,
}

/// Working state of a single finalize.
struct FinalizePass<'a> {
    meta: &'a MetaData,
    renderer: &'a RendererData,
    main_thread_name: &'a str,
    run_task_name: &'a str,
    /// Buffered events, sorted by timestamp.
    events: &'a [TraceEvent],
    table: MetricTable,
    selected: HashMap<NavigationKey, SelectedCandidate>,
}

impl<'a> FinalizePass<'a> {
    fn process(&mut self, index: usize) -> Result<(), HandlerError> {
        let events = self.events;
        let event = &events[index];
        let Some(kind) = classify(event) else {
            return Ok(());
        };
        if kind == PageLoadKind::Marker(MarkerKind::LargestContentfulPaintCandidate) {
            // Checked before navigation lookup so a bad candidate fails even when dropped.
            event.require_candidate_index()?;
        }

        let Some(navigation) = self.navigation_for(kind, event)? else {
            log::trace!("dropping {} at {}: no navigation", event.name(), event.ts);
            return Ok(());
        };
        let frame = event.frame_id().unwrap_or(&navigation.frame);
        if !self.meta.process_active_at(frame, event.pid, event.ts) {
            log::trace!(
                "dropping {} at {}: process {} not active for frame {}",
                event.name(),
                event.ts,
                event.pid,
                frame
            );
            return Ok(());
        }

        let key = (frame.clone(), navigation.navigation_id.clone());
        let elapsed = event.ts - navigation.start;
        let score =
            |name| MetricScore::new(name, elapsed, Some(event.clone()), Some(navigation.clone()));

        match kind {
            PageLoadKind::Marker(MarkerKind::FirstContentfulPaint) => {
                self.store(&key, score(MetricName::FCP));
            }
            PageLoadKind::Marker(MarkerKind::FirstPaint) => {
                self.store(&key, score(MetricName::FP));
            }
            PageLoadKind::Marker(MarkerKind::DomContentLoaded) => {
                self.store(&key, score(MetricName::DCL));
            }
            PageLoadKind::Marker(MarkerKind::Load) => {
                self.store(&key, score(MetricName::L));
            }
            PageLoadKind::Marker(MarkerKind::LargestContentfulPaintCandidate) => {
                let candidate_index = event.require_candidate_index()?;
                let supersedes = self
                    .selected
                    .get(&key)
                    .map_or(true, |current| candidate_index > current.candidate_index);
                if !supersedes {
                    return Ok(());
                }
                self.selected.insert(
                    key.clone(),
                    SelectedCandidate {
                        event_index: index,
                        candidate_index,
                    },
                );
                self.store(&key, score(MetricName::LCP));
            }
            PageLoadKind::InteractiveTime => {
                let tbt = event.total_blocking_time().ok_or_else(|| {
                    HandlerError::InternalConsistency(format!(
                        "{} classified as interactive time",
                        event.name()
                    ))
                })?;
                self.store(&key, score(MetricName::TTI));
                self.store(
                    &key,
                    MetricScore::new(
                        MetricName::TBT,
                        tbt,
                        Some(event.clone()),
                        Some(navigation.clone()),
                    ),
                );
            }
        }
        Ok(())
    }

    /// Resolves the navigation an event belongs to; `None` means the event is dropped.
    fn navigation_for(
        &self,
        kind: PageLoadKind,
        event: &TraceEvent,
    ) -> Result<Option<&'a NavigationRecord>, HandlerError> {
        let meta = self.meta;
        let navigation = match kind {
            PageLoadKind::Marker(
                MarkerKind::FirstContentfulPaint
                | MarkerKind::LargestContentfulPaintCandidate
                | MarkerKind::FirstPaint,
            ) => {
                let id = event.require_navigation_id()?;
                meta.navigations_by_navigation_id.get(id)
            }
            PageLoadKind::Marker(MarkerKind::DomContentLoaded | MarkerKind::Load) => {
                let frame = event.require_frame_id()?;
                meta.navigation_for_frame_at(frame, event.ts)
            }
            PageLoadKind::InteractiveTime => event
                .frame_id()
                .and_then(|frame| meta.navigation_for_frame_at(frame, event.ts)),
        };
        Ok(navigation)
    }

    fn store(&mut self, (frame, navigation): &NavigationKey, score: MetricScore) {
        self.table
            .entry(frame.clone())
            .or_default()
            .entry(navigation.clone())
            .or_default()
            .upsert(score);
    }

    /// Fills in TBT for navigations that reached FCP but never reported interactivity.
    fn estimate_total_blocking_time(&mut self) -> Result<(), HandlerError> {
        let mut estimates = Vec::new();
        for (frame, navigations) in &self.table {
            for (navigation_id, metrics) in navigations {
                if metrics.contains(MetricName::TBT) {
                    continue;
                }
                let Some(fcp) = metrics.get(MetricName::FCP) else {
                    continue;
                };
                let fcp_event = fcp.event.as_ref().ok_or_else(|| {
                    HandlerError::InternalConsistency(format!(
                        "FCP for navigation {} has no source event",
                        navigation_id
                    ))
                })?;
                let blocking = self.blocking_time_after(fcp_event)?;
                let score =
                    MetricScore::new(MetricName::TBT, blocking, None, fcp.navigation.clone())
                        .estimated();
                estimates.push(((frame.clone(), navigation_id.clone()), score));
            }
        }
        for (key, score) in estimates {
            self.store(&key, score);
        }
        Ok(())
    }

    /// Sums the long-task excess of top-level main-thread tasks from FCP onwards.
    fn blocking_time_after(&self, fcp_event: &TraceEvent) -> Result<Micros, HandlerError> {
        let pid = fcp_event.pid;
        let process = self.renderer.processes.get(&pid).ok_or_else(|| {
            HandlerError::InternalConsistency(format!("no renderer data for process {}", pid))
        })?;
        let thread = process.thread_named(self.main_thread_name).ok_or_else(|| {
            HandlerError::InternalConsistency(format!(
                "process {} has no {} thread",
                pid, self.main_thread_name
            ))
        })?;

        let fcp = fcp_event.ts;
        let mut total = Micros::ZERO;
        for &root in &thread.tree.roots {
            let node = thread.tree.node(root).ok_or_else(|| {
                HandlerError::InternalConsistency(format!("missing tree node {}", root))
            })?;
            let task = thread.events.get(node.event_index).ok_or_else(|| {
                HandlerError::InternalConsistency(format!(
                    "tree node {} points at missing event {}",
                    root, node.event_index
                ))
            })?;
            if task.name() != self.run_task_name {
                continue;
            }
            if task.duration().is_none() {
                continue;
            }
            let end = task.end();
            if end < fcp {
                continue;
            }
            let clipped = end - task.ts.max(fcp);
            total += clipped.saturating_sub(LONG_TASK_THRESHOLD);
        }
        Ok(total)
    }

    /// Main-frame milestones: every marker except LCP candidates that lost to a later one.
    fn marker_events(&self) -> Vec<TraceEvent> {
        let Some(main_frame) = self.meta.main_frame_id.as_ref() else {
            return Vec::new();
        };
        let selected: HashSet<usize> = self.selected.values().map(|c| c.event_index).collect();

        let mut markers: Vec<TraceEvent> = self
            .events
            .iter()
            .enumerate()
            .filter(|(index, event)| match classify(event) {
                Some(PageLoadKind::Marker(MarkerKind::LargestContentfulPaintCandidate)) => {
                    selected.contains(index)
                }
                Some(PageLoadKind::Marker(_)) => true,
                Some(PageLoadKind::InteractiveTime) | None => false,
            })
            .map(|(_, event)| event)
            .filter(|event| event.frame_id() == Some(main_frame))
            .cloned()
            .collect();
        markers.sort_by_key(|e| e.ts);
        markers
    }
}
