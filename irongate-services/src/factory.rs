//! Factory with every built-in service type and handler.

use crate::client::{NTG_CLIENT, NtgClientService};
use crate::handler::{COLLECTING_HANDLER, CollectingHandler, LOGGING_HANDLER, LoggingHandler};
use crate::server::{NTG_SERVER, NtgServerService};
use irongate_registry::{Service, ServiceFactory};
use std::sync::Arc;

/// Returns a factory knowing [`NTG_CLIENT`], [`NTG_SERVER`] and the built-in
/// handlers. Callers may chain further registrations onto it.
#[must_use]
pub fn default_factory() -> ServiceFactory {
    ServiceFactory::new()
        .with_service_type(NTG_CLIENT, |descriptor, handler| {
            Ok(Arc::new(NtgClientService::new(descriptor, handler)?) as Arc<dyn Service>)
        })
        .with_service_type(NTG_SERVER, |descriptor, handler| {
            Ok(Arc::new(NtgServerService::new(descriptor, handler)?) as Arc<dyn Service>)
        })
        .with_handler(LOGGING_HANDLER, || Arc::new(LoggingHandler))
        .with_handler(COLLECTING_HANDLER, || Arc::new(CollectingHandler::new()))
}
