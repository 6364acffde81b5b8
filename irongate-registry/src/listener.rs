//! Caller-supplied notification of lifecycle outcomes.

use crate::error::RegistryError;

/// Receives the outcome of every pooled lifecycle operation.
///
/// `subject` is the service identity (`environment/name`) or the
/// environment name the operation acted on.
pub trait ServiceListener: Send + Sync {
    /// An operation succeeded.
    fn on_info_processing(&self, _subject: &str, _message: &str) {}

    /// An operation failed. The same error is returned through the task handle.
    fn on_error_processing(&self, _subject: &str, _error: &RegistryError) {}
}
