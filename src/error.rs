/* Aggregate error for the entrypoint surfaces: wraps pool, coordinator and
 * driver failures for callers that need a single error type. */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Pool error: {0}")]
    Pool(#[from] crate::pool::PoolError),

    #[error("Coordinator error: {0}")]
    Coordinator(#[from] crate::coordinator::CoordinatorError),

    #[error("Driver error: {0}")]
    Driver(#[from] crate::driver::DriverError),

    #[error("System error: {0}")]
    System(#[from] std::io::Error),

    #[error("Malformed enumerator event: {0}")]
    EnumeratorEvent(#[from] serde_json::Error),
}
