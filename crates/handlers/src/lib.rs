//! Page-load performance metrics from browser traces.
//!
//! Trace events (see `pagemetrics-traceevents`) are streamed through a set of
//! [`Handler`]s. Each handler finalizes once, after the handlers it depends
//! on, and publishes an immutable snapshot:
//!
//! - [`MetaHandler`] indexes frames, navigations and renderer process windows.
//! - [`RendererHandler`] builds per-thread call trees.
//! - [`PageLoadMetricsHandler`] scores FCP, FP, DCL, load, LCP, TTI and TBT
//!   per navigation.
//!
//! # Usage
//!
//! ```
//! use pagemetrics_handlers::{Config, Pipeline};
//! use pagemetrics_traceevents::TraceEvent;
//!
//! let config = Config::from_env().unwrap();
//! let mut pipeline = Pipeline::new(&config).unwrap();
//! let events: Vec<TraceEvent> = Vec::new();
//! pipeline.parse(&events).unwrap();
//! let metrics = pipeline.page_load_metrics().unwrap();
//! assert!(metrics.all_marker_events.is_empty());
//! ```

mod config;
mod error;
mod graph;
mod handler;
mod meta;
mod pageload;
mod pipeline;
mod renderer;
pub mod scoring;

#[cfg(test)]
mod testutil;

pub use config::{Config, CONFIG_ENV_VAR};
pub use error::{ConfigError, HandlerError, PipelineError, RegistrationError};
pub use graph::DependencyGraph;
pub use handler::{DependencyData, Handler, HandlerData, META, PAGE_LOAD_METRICS, RENDERER};
pub use meta::{MetaData, MetaHandler, NavigationRecord, ProcessWindow, TimeWindow};
pub use pageload::{
    MetricName, MetricScore, MetricTable, NavigationMetrics, PageLoadMetricsData,
    PageLoadMetricsHandler, LONG_TASK_THRESHOLD,
};
pub use pipeline::Pipeline;
pub use renderer::{
    CallTree, NodeId, RendererData, RendererHandler, RendererProcess, RendererThread, TreeNode,
};
pub use scoring::ScoreClassification;
