//! Pluggable observer for lookup failures
//!
//! The registry notifies the handler and then returns the error anyway; a
//! handler observes failures, it cannot recover from them.

use remap_types::MappingError;
use tracing::warn;

/// Observer notified of mapping lookup failures.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: &MappingError);
}

/// Default handler: logs the error at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorHandler;

impl ErrorHandler for TracingErrorHandler {
    fn handle(&self, error: &MappingError) {
        warn!(error = %error, "Mapping error");
    }
}
