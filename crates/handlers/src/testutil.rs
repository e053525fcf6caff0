//! Event builders shared by the unit tests.

use pagemetrics_traceevents::{
    CompleteData, EventData, FrameCommittedData, FrameInfo, InstantData, InteractiveTimeData,
    LcpCandidateData, MarkerData, Micros, NavigationStartData, ProcessId, ThreadId,
    ThreadNameData, TraceEvent, TracingStartedData,
};

pub const BROWSER_PID: ProcessId = 1;
pub const RENDERER_PID: ProcessId = 10;
pub const OTHER_PID: ProcessId = 20;
pub const MAIN_TID: ThreadId = 100;
pub const BROWSER_TID: ThreadId = 1;

pub fn tracing_started(ts: i64, frames: &[(&str, ProcessId, Option<&str>)]) -> TraceEvent {
    let frames = frames
        .iter()
        .map(|&(frame, process_id, parent)| FrameInfo {
            frame: frame.into(),
            url: String::new(),
            process_id,
            parent: parent.map(Into::into),
        })
        .collect();
    TraceEvent::new(
        Micros(ts),
        BROWSER_PID,
        BROWSER_TID,
        EventData::TracingStartedInBrowser(TracingStartedData { frames }),
    )
}

pub fn navigation_start(ts: i64, frame: &str, navigation: &str, url: &str) -> TraceEvent {
    TraceEvent::new(
        Micros(ts),
        RENDERER_PID,
        MAIN_TID,
        EventData::NavigationStart(NavigationStartData {
            navigation_id: Some(navigation.into()),
            document_loader_url: url.to_string(),
            is_loading_main_frame: true,
        }),
    )
    .with_frame(frame)
}

pub fn frame_committed(ts: i64, frame: &str, pid: ProcessId) -> TraceEvent {
    TraceEvent::new(
        Micros(ts),
        BROWSER_PID,
        BROWSER_TID,
        EventData::FrameCommittedInBrowser(FrameCommittedData {
            frame: frame.into(),
            process_id: pid,
            url: String::new(),
            parent: None,
        }),
    )
}

pub fn thread_name(pid: ProcessId, tid: ThreadId, name: &str) -> TraceEvent {
    TraceEvent::new(
        Micros::ZERO,
        pid,
        tid,
        EventData::ThreadName(ThreadNameData {
            name: name.to_string(),
        }),
    )
}

pub fn complete(pid: ProcessId, tid: ThreadId, ts: i64, dur: i64, name: &str) -> TraceEvent {
    TraceEvent::new(
        Micros(ts),
        pid,
        tid,
        EventData::Complete(CompleteData {
            name: name.to_string(),
            dur: Micros(dur),
        }),
    )
}

pub fn instant(pid: ProcessId, tid: ThreadId, ts: i64, name: &str) -> TraceEvent {
    TraceEvent::new(
        Micros(ts),
        pid,
        tid,
        EventData::Instant(InstantData {
            name: name.to_string(),
        }),
    )
}

/// A top-level scheduler task on the renderer main thread.
pub fn run_task(ts: i64, dur: i64) -> TraceEvent {
    complete(RENDERER_PID, MAIN_TID, ts, dur, "RunTask")
}

fn marker(frame: &str, navigation: &str) -> MarkerData {
    MarkerData {
        frame: Some(frame.into()),
        navigation_id: Some(navigation.into()),
    }
}

fn renderer_event(ts: i64, data: EventData) -> TraceEvent {
    TraceEvent::new(Micros(ts), RENDERER_PID, MAIN_TID, data)
}

pub fn fcp(ts: i64, frame: &str, navigation: &str) -> TraceEvent {
    renderer_event(ts, EventData::FirstContentfulPaint(marker(frame, navigation)))
}

pub fn fp(ts: i64, frame: &str, navigation: &str) -> TraceEvent {
    renderer_event(ts, EventData::FirstPaint(marker(frame, navigation)))
}

pub fn dcl(ts: i64, frame: &str) -> TraceEvent {
    renderer_event(
        ts,
        EventData::MarkDomContent(MarkerData {
            frame: Some(frame.into()),
            navigation_id: None,
        }),
    )
}

pub fn load(ts: i64, frame: &str) -> TraceEvent {
    renderer_event(
        ts,
        EventData::MarkLoad(MarkerData {
            frame: Some(frame.into()),
            navigation_id: None,
        }),
    )
}

pub fn lcp(ts: i64, frame: &str, navigation: &str, candidate_index: u32) -> TraceEvent {
    renderer_event(
        ts,
        EventData::LargestContentfulPaintCandidate(LcpCandidateData {
            frame: Some(frame.into()),
            navigation_id: Some(navigation.into()),
            candidate_index: Some(candidate_index),
            size: None,
        }),
    )
}

pub fn interactive_time(ts: i64, frame: &str, navigation: &str, tbt_ms: f64) -> TraceEvent {
    renderer_event(
        ts,
        EventData::InteractiveTime(InteractiveTimeData {
            frame: Some(frame.into()),
            navigation_id: Some(navigation.into()),
            total_blocking_time_ms: tbt_ms,
        }),
    )
}
