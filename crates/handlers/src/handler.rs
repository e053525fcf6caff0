use std::collections::HashMap;
use std::sync::Arc;

use pagemetrics_traceevents::TraceEvent;

use crate::error::HandlerError;
use crate::meta::MetaData;
use crate::pageload::PageLoadMetricsData;
use crate::renderer::RendererData;

pub const META: &str = "Meta";
pub const RENDERER: &str = "Renderer";
pub const PAGE_LOAD_METRICS: &str = "PageLoadMetrics";

/// A stage of the analysis pipeline.
///
/// A handler sees every event once during streaming, then finalizes exactly
/// once, after all of its [dependencies](Handler::deps) have finalized.
/// Dependencies are only ever observed through the read-only snapshots in
/// [`DependencyData`].
pub trait Handler {
    fn name(&self) -> &'static str;

    /// Names of the handlers whose finalized data this handler reads.
    fn deps(&self) -> &'static [&'static str] {
        &[]
    }

    /// Clears all accumulated state.
    fn reset(&mut self);

    /// Streaming phase. Must not fail.
    fn handle_event(&mut self, event: &TraceEvent);

    fn finalize(&mut self, deps: &DependencyData) -> Result<(), HandlerError>;

    /// The finalized snapshot, or `None` for handlers that publish nothing.
    fn output(&self) -> Option<HandlerData>;
}

/// A finalized, immutable handler snapshot.
#[derive(Debug, Clone)]
pub enum HandlerData {
    Meta(Arc<MetaData>),
    Renderer(Arc<RendererData>),
    PageLoadMetrics(Arc<PageLoadMetricsData>),
}

/// Snapshots of finalized handlers, keyed by handler name.
#[derive(Debug, Clone, Default)]
pub struct DependencyData {
    by_name: HashMap<&'static str, HandlerData>,
}

impl DependencyData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, data: HandlerData) {
        self.by_name.insert(name, data);
    }

    pub fn get(&self, name: &str) -> Option<&HandlerData> {
        self.by_name.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
    }

    pub fn meta(&self) -> Result<&Arc<MetaData>, HandlerError> {
        match self.by_name.get(META) {
            Some(HandlerData::Meta(data)) => Ok(data),
            _ => Err(HandlerError::MissingDependency(META)),
        }
    }

    pub fn renderer(&self) -> Result<&Arc<RendererData>, HandlerError> {
        match self.by_name.get(RENDERER) {
            Some(HandlerData::Renderer(data)) => Ok(data),
            _ => Err(HandlerError::MissingDependency(RENDERER)),
        }
    }

    pub fn page_load_metrics(&self) -> Result<&Arc<PageLoadMetricsData>, HandlerError> {
        match self.by_name.get(PAGE_LOAD_METRICS) {
            Some(HandlerData::PageLoadMetrics(data)) => Ok(data),
            _ => Err(HandlerError::MissingDependency(PAGE_LOAD_METRICS)),
        }
    }
}
