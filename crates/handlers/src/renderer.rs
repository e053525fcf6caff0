//! Per-process, per-thread activity and call trees.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use pagemetrics_traceevents::{EventData, Micros, ProcessId, ThreadId, TraceEvent};
use serde::Serialize;

use crate::error::HandlerError;
use crate::handler::{DependencyData, Handler, HandlerData, META, RENDERER};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,
    /// Index into the owning thread's event list.
    pub event_index: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub depth: usize,
}

/// Events of one thread nested by time containment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallTree {
    /// Top-level nodes, in start order.
    pub roots: Vec<NodeId>,
    pub nodes: Vec<TreeNode>,
}

impl CallTree {
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Builds the tree for events sorted by start ascending, longest first on ties.
    ///
    /// An event is a child of the innermost open duration event whose
    /// interval contains its start.
    fn build(events: &[TraceEvent]) -> CallTree {
        let mut tree = CallTree::default();
        let mut open: Vec<(NodeId, Micros)> = Vec::new();

        for (event_index, event) in events.iter().enumerate() {
            while open.last().is_some_and(|&(_, end)| event.ts >= end) {
                open.pop();
            }

            let id = tree.nodes.len();
            let parent = open.last().map(|&(parent, _)| parent);
            let depth = open.len();
            tree.nodes.push(TreeNode {
                id,
                event_index,
                parent,
                children: Vec::new(),
                depth,
            });
            match parent {
                Some(p) => tree.nodes[p].children.push(id),
                None => tree.roots.push(id),
            }

            if event.duration().is_some_and(|d| d > Micros::ZERO) {
                open.push((id, event.end()));
            }
        }
        tree
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RendererThread {
    pub tid: ThreadId,
    pub name: Option<String>,
    /// Sorted by start ascending, longest first on ties.
    pub events: Vec<TraceEvent>,
    pub tree: CallTree,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererProcess {
    pub pid: ProcessId,
    /// Whether the process rendered the main frame at some point of the trace.
    /// Not read by the metrics handlers; published for downstream consumers.
    pub is_on_main_frame: bool,
    pub threads: HashMap<ThreadId, RendererThread>,
}

impl RendererProcess {
    /// The thread with the given name; the lowest thread id wins if several match.
    pub fn thread_named(&self, name: &str) -> Option<&RendererThread> {
        self.threads
            .values()
            .filter(|t| t.name.as_deref() == Some(name))
            .min_by_key(|t| t.tid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RendererData {
    pub processes: HashMap<ProcessId, RendererProcess>,
}

#[derive(Default)]
struct ThreadBuffer {
    name: Option<String>,
    events: Vec<TraceEvent>,
}

/// Collects thread activity and builds a call tree per thread.
#[derive(Default)]
pub struct RendererHandler {
    threads: HashMap<(ProcessId, ThreadId), ThreadBuffer>,
    data: Option<Arc<RendererData>>,
}

impl RendererHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&Arc<RendererData>> {
        self.data.as_ref()
    }
}

impl Handler for RendererHandler {
    fn name(&self) -> &'static str {
        RENDERER
    }

    fn deps(&self) -> &'static [&'static str] {
        &[META]
    }

    fn reset(&mut self) {
        self.threads.clear();
        self.data = None;
    }

    fn handle_event(&mut self, event: &TraceEvent) {
        match &event.data {
            EventData::ThreadName(t) => {
                self.threads.entry((event.pid, event.tid)).or_default().name = Some(t.name.clone());
            }
            EventData::Complete(_) | EventData::Instant(_) => {
                self.threads
                    .entry((event.pid, event.tid))
                    .or_default()
                    .events
                    .push(event.clone());
            }
            _ => {}
        }
    }

    fn finalize(&mut self, deps: &DependencyData) -> Result<(), HandlerError> {
        if self.data.is_some() {
            return Err(HandlerError::AlreadyFinalized(RENDERER));
        }
        let meta = deps.meta()?;

        let main_frame_pids: HashSet<ProcessId> = meta
            .main_frame_id
            .as_ref()
            .and_then(|frame| meta.renderer_processes_by_frame.get(frame))
            .map(|by_pid| by_pid.keys().copied().collect())
            .unwrap_or_default();

        let mut data = RendererData::default();
        for (&(pid, tid), buf) in &self.threads {
            let mut events = buf.events.clone();
            events.sort_by(|a, b| {
                a.ts.cmp(&b.ts).then_with(|| {
                    let da = a.duration().unwrap_or(Micros::ZERO);
                    let db = b.duration().unwrap_or(Micros::ZERO);
                    db.cmp(&da)
                })
            });
            let tree = CallTree::build(&events);

            let process = data.processes.entry(pid).or_insert_with(|| RendererProcess {
                pid,
                is_on_main_frame: main_frame_pids.contains(&pid),
                threads: HashMap::new(),
            });
            process.threads.insert(
                tid,
                RendererThread {
                    tid,
                    name: buf.name.clone(),
                    events,
                    tree,
                },
            );
        }

        log::debug!(
            "renderer: {} processes, {} threads",
            data.processes.len(),
            self.threads.len()
        );
        self.data = Some(Arc::new(data));
        Ok(())
    }

    fn output(&self) -> Option<HandlerData> {
        self.data.clone().map(HandlerData::Renderer)
    }
}
