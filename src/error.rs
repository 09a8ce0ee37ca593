// Typed errors for the replay engine
//
// Configuration problems (bad velocity, bad patterns, unknown transform
// discriminators) and double-starts surface synchronously from constructors
// or `Runner::run`. Entry-level problems (unsupported verbs, executor
// failures) are logged by the runner, which then advances to the next entry.

use thiserror::Error;

/// Errors the replay engine distinguishes.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Velocity must be a positive, finite scalar.
    #[error("velocity must be positive, got {0}")]
    InvalidVelocity(f64),

    /// A transform pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A transform configuration carried a discriminator we don't know.
    #[error("unknown transform type {0:?}")]
    UnknownTransformType(String),

    /// `run()` was called on a runner that is already in the registry.
    #[error("runner is already running, maybe you meant to resume() it?")]
    AlreadyRunning,

    /// An entry's method is not one of GET/POST/PUT/DELETE/HEAD/PATCH.
    #[error("unsupported HTTP verb {0:?}")]
    UnknownVerb(String),
}
