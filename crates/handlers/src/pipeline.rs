//! Drives a set of handlers through streaming and finalization.

use std::sync::Arc;

use pagemetrics_traceevents::TraceEvent;

use crate::config::Config;
use crate::error::{HandlerError, PipelineError};
use crate::graph::DependencyGraph;
use crate::handler::{DependencyData, Handler};
use crate::meta::{MetaData, MetaHandler};
use crate::pageload::{PageLoadMetricsData, PageLoadMetricsHandler};
use crate::renderer::{RendererData, RendererHandler};

/// Owns a set of handlers, kept in dependency order.
///
/// Events are fed to every handler in that order, then [`finalize`](Self::finalize)
/// finalizes each handler once its dependencies have published their
/// snapshots.
///
/// # Example
///
/// ```
/// use pagemetrics_handlers::{Config, Pipeline};
///
/// let mut pipeline = Pipeline::new(&Config::default()).unwrap();
/// pipeline.parse(std::iter::empty()).unwrap();
/// assert!(pipeline.page_load_metrics().unwrap().metric_scores_by_frame_id.is_empty());
/// ```
pub struct Pipeline {
    graph: DependencyGraph,
    handlers: Vec<Box<dyn Handler>>,
    outputs: DependencyData,
    finalized: bool,
}

impl Pipeline {
    /// A pipeline with the built-in Meta, Renderer and PageLoadMetrics handlers.
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        Self::with_handlers(vec![
            Box::new(MetaHandler::new(config)),
            Box::new(RendererHandler::new()),
            Box::new(PageLoadMetricsHandler::new(config)),
        ])
    }

    /// A pipeline over a custom handler set. Registration order breaks ties
    /// between handlers that do not depend on each other.
    pub fn with_handlers(mut handlers: Vec<Box<dyn Handler>>) -> Result<Self, PipelineError> {
        let graph = DependencyGraph::new(handlers.iter().map(|h| (h.name(), h.deps())))?;
        handlers.sort_by_key(|h| graph.position(h.name()));
        log::debug!("pipeline order: {}", graph.order().join(" -> "));

        Ok(Pipeline {
            graph,
            handlers,
            outputs: DependencyData::new(),
            finalized: false,
        })
    }

    /// Handler names in processing order.
    pub fn order(&self) -> &[&'static str] {
        self.graph.order()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn handle_event(&mut self, event: &TraceEvent) -> Result<(), PipelineError> {
        if self.finalized {
            return Err(PipelineError::AlreadyFinalized);
        }
        for handler in &mut self.handlers {
            handler.handle_event(event);
        }
        Ok(())
    }

    pub fn handle_events<'a, I>(&mut self, events: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = &'a TraceEvent>,
    {
        for event in events {
            self.handle_event(event)?;
        }
        Ok(())
    }

    /// Finalizes every handler in dependency order.
    ///
    /// A pipeline finalizes at most once per [`reset`](Self::reset), whether
    /// or not the attempt succeeds. On failure no snapshots are published.
    pub fn finalize(&mut self) -> Result<(), PipelineError> {
        if self.finalized {
            return Err(PipelineError::AlreadyFinalized);
        }
        self.finalized = true;
        self.outputs.clear();

        for handler in &mut self.handlers {
            let mut deps = DependencyData::new();
            for &dep in handler.deps() {
                if let Some(data) = self.outputs.get(dep) {
                    deps.insert(dep, data.clone());
                }
            }

            let name = handler.name();
            if let Err(source) = handler.finalize(&deps) {
                log::debug!("handler {} failed to finalize: {}", name, source);
                self.outputs.clear();
                return Err(PipelineError::Handler {
                    handler: name,
                    source,
                });
            }
            if let Some(output) = handler.output() {
                self.outputs.insert(name, output);
            }
        }
        Ok(())
    }

    /// Resets every handler and discards published snapshots.
    pub fn reset(&mut self) {
        for handler in &mut self.handlers {
            handler.reset();
        }
        self.outputs.clear();
        self.finalized = false;
    }

    /// Runs a whole trace: reset, feed every event, finalize.
    pub fn parse<'a, I>(&mut self, events: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = &'a TraceEvent>,
    {
        self.reset();
        self.handle_events(events)?;
        self.finalize()
    }

    /// Snapshots published by the last successful finalize.
    pub fn outputs(&self) -> &DependencyData {
        &self.outputs
    }

    pub fn meta(&self) -> Result<&Arc<MetaData>, HandlerError> {
        self.outputs.meta()
    }

    pub fn renderer(&self) -> Result<&Arc<RendererData>, HandlerError> {
        self.outputs.renderer()
    }

    pub fn page_load_metrics(&self) -> Result<&Arc<PageLoadMetricsData>, HandlerError> {
        self.outputs.page_load_metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistrationError;
    use crate::handler::HandlerData;
    use crate::testutil::*;
    use assert_matches::assert_matches;

    /// Publishes nothing and optionally fails.
    struct StubHandler {
        name: &'static str,
        deps: &'static [&'static str],
        fail: bool,
    }

    impl StubHandler {
        fn new(name: &'static str, deps: &'static [&'static str]) -> Self {
            StubHandler {
                name,
                deps,
                fail: false,
            }
        }
    }

    impl Handler for StubHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn deps(&self) -> &'static [&'static str] {
            self.deps
        }

        fn reset(&mut self) {}

        fn handle_event(&mut self, _event: &TraceEvent) {}

        fn finalize(&mut self, deps: &DependencyData) -> Result<(), HandlerError> {
            for dep in self.deps {
                if deps.get(dep).is_none() {
                    return Err(HandlerError::MissingDependency(*dep));
                }
            }
            if self.fail {
                return Err(HandlerError::InternalConsistency("stub failure".to_string()));
            }
            Ok(())
        }

        fn output(&self) -> Option<HandlerData> {
            None
        }
    }

    #[test]
    fn test_builtin_order() {
        let pipeline = Pipeline::new(&Config::default()).unwrap();
        assert_eq!(pipeline.order(), &["Meta", "Renderer", "PageLoadMetrics"]);
    }

    #[test]
    fn test_handlers_sorted_by_dependencies() {
        let pipeline = Pipeline::with_handlers(vec![
            Box::new(StubHandler::new("Late", &["Meta"])),
            Box::new(MetaHandler::new(&Config::default())),
        ])
        .unwrap();
        assert_eq!(pipeline.order(), &["Meta", "Late"]);
        let names: Vec<_> = pipeline.handlers.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["Meta", "Late"]);
    }

    #[test]
    fn test_cycle_rejected_at_registration() {
        let err = Pipeline::with_handlers(vec![
            Box::new(StubHandler::new("A", &["B"])),
            Box::new(StubHandler::new("B", &["A"])),
        ])
        .err()
        .unwrap();
        assert_matches!(
            err,
            PipelineError::Registration(RegistrationError::DependencyCycle(_))
        );
    }

    #[test]
    fn test_feed_after_finalize_rejected() {
        let mut pipeline = Pipeline::new(&Config::default()).unwrap();
        pipeline.finalize().unwrap();
        assert_matches!(
            pipeline.handle_event(&run_task(0, 10)),
            Err(PipelineError::AlreadyFinalized)
        );
        assert_matches!(pipeline.finalize(), Err(PipelineError::AlreadyFinalized));

        pipeline.reset();
        assert!(!pipeline.is_finalized());
        assert!(pipeline.meta().is_err());
        pipeline.handle_event(&run_task(0, 10)).unwrap();
        pipeline.finalize().unwrap();
        assert!(pipeline.meta().is_ok());
    }

    #[test]
    fn test_handler_failure_is_wrapped() {
        let mut failing = StubHandler::new("Failing", &["Meta"]);
        failing.fail = true;
        let mut pipeline = Pipeline::with_handlers(vec![
            Box::new(MetaHandler::new(&Config::default())),
            Box::new(failing),
        ])
        .unwrap();

        let err = pipeline.parse(&[run_task(0, 10)]).unwrap_err();
        assert_matches!(
            err,
            PipelineError::Handler {
                handler: "Failing",
                source: HandlerError::InternalConsistency(_)
            }
        );
        assert!(pipeline.outputs().is_empty());
        assert!(pipeline.meta().is_err());
    }

    #[test]
    fn test_parse_resets_between_runs() {
        let mut pipeline = Pipeline::new(&Config::default()).unwrap();
        let first = [
            tracing_started(0, &[("F1", RENDERER_PID, None)]),
            thread_name(RENDERER_PID, MAIN_TID, "CrRendererMain"),
            navigation_start(100, "F1", "N1", "https://a.test"),
            fcp(1_000, "F1", "N1"),
        ];
        pipeline.parse(&first).unwrap();
        assert_eq!(
            pipeline.page_load_metrics().unwrap().metric_scores_by_frame_id.len(),
            1
        );

        pipeline.parse(&[run_task(0, 10)]).unwrap();
        assert!(pipeline
            .page_load_metrics()
            .unwrap()
            .metric_scores_by_frame_id
            .is_empty());
        assert!(pipeline.meta().unwrap().main_frame_id.is_none());
    }
}
