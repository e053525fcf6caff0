use pagemetrics_traceevents::MissingField;
use thiserror::Error;

/// Errors raised by a handler's finalize phase.
///
/// Every variant is fatal: the finalize pass is aborted and the handler keeps
/// the state it had before the attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// An event is missing an identifier its producer always emits.
    #[error("data integrity: {0}")]
    DataIntegrity(#[from] MissingField),

    /// A structure that is guaranteed to exist (main thread, tree node, ...) was absent.
    #[error("internal consistency: {0}")]
    InternalConsistency(String),

    /// The handler's declared dependency had not been finalized.
    #[error("dependency {0} has not been finalized")]
    MissingDependency(&'static str),

    #[error("handler {0} was already finalized; reset it before finalizing again")]
    AlreadyFinalized(&'static str),
}

/// Errors raised while registering handlers with a pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("handler {0} registered more than once")]
    DuplicateHandler(&'static str),

    #[error("handler {handler} depends on unregistered handler {dependency}")]
    UnknownDependency {
        handler: &'static str,
        dependency: &'static str,
    },

    #[error("dependency cycle between handlers: {}", .0.join(", "))]
    DependencyCycle(Vec<&'static str>),
}

/// Errors raised by the [`Pipeline`](crate::Pipeline) driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("handler {handler} failed to finalize: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: HandlerError,
    },

    #[error("pipeline was already finalized; reset it before reuse")]
    AlreadyFinalized,
}

/// Errors raised while loading [`Config`](crate::Config).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to read {var}: {source}")]
    Env {
        var: &'static str,
        #[source]
        source: std::env::VarError,
    },
}
