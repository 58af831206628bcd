//! Structured error types for store and update operations.
//!
//! The update engine only ever treats one class of failure as recoverable:
//! connectivity loss while talking to a publisher. That classification lives
//! in [`UpdateError::is_transient`] so the retry/swallow policy is a single
//! named predicate rather than a scattered list of caught types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    /// DNS resolution, connect, or timeout failure while fetching.
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The feed's circuit breaker is open after repeated failures or a ban.
    #[error("feed blocked: circuit breaker tripped, cooling down")]
    CircuitBreakerTripped,

    /// Non-success HTTP status from a publisher.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The publisher's document no longer parses as expected.
    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    /// Store-layer failure (filesystem, directory layout).
    #[error("store error: {0}")]
    Store(String),

    /// Parquet read/write failure.
    #[error("parquet I/O error: {0}")]
    Parquet(String),

    /// Rows rejected before write (schema width / column type mismatch).
    #[error("validation error: {0}")]
    Validation(String),

    /// No registered updater owns the named source.
    #[error("unknown source: '{0}'")]
    UnknownSource(String),

    /// Bad or unreadable application config.
    #[error("config error: {0}")]
    Config(String),
}

impl UpdateError {
    /// Whether this failure is a transient connectivity problem.
    ///
    /// Composite updaters swallow (and log) exactly these so one unreachable
    /// publisher does not abort the rest of the batch. Everything else is a
    /// programming or data error and must surface.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpdateError::NetworkUnreachable(_) | UpdateError::CircuitBreakerTripped
        )
    }
}
