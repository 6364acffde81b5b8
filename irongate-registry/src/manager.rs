//! The connection manager: a concurrent registry of named services.
//!
//! The registry map sits behind one `tokio::sync::RwLock`. Reads share it;
//! every mutation holds the write lock across validation, store I/O and the
//! map change, so mutations are totally ordered and readers never observe a
//! partial change. Lifecycle calls into a service (`init`, `start`,
//! `dispose`) run under the runtime's own operation lock instead, after the
//! registry lookup, so a slow logon does not stall readers. Their outcome
//! is journaled under the write lock again, and only while the runtime is
//! still registered.
//!
//! Every mutation runs on the bounded [`WorkerPool`] and returns a
//! [`TaskHandle`]; the outcome also goes to the optional [`ServiceListener`].

use crate::descriptor::{DEFAULT_ENVIRONMENT, ServiceDescriptor, ServiceIdentity};
use crate::error::{RegistryError, Result};
use crate::events::{EventLevel, EventListener, EventSink, ServiceEvent};
use crate::listener::ServiceListener;
use crate::pool::{TaskHandle, WorkerPool};
use crate::runtime::ServiceRuntime;
use crate::service::{ServiceContext, ServiceFactory, ServiceStatus};
use crate::store::{InMemoryServiceStore, ServiceStore};
use crate::usage::UsageLock;
use crate::variables::{InMemoryVariableSetStore, VariableSetStore, resolve_settings};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;

/// Default number of concurrently running lifecycle tasks.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Default wait for in-flight tasks during [`ConnectionManager::dispose_manager`].
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default bound on disposing one service during shutdown.
pub const DEFAULT_DISPOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Manager tuning.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Worker pool size.
    pub pool_size: usize,
    /// Wait for in-flight tasks on shutdown.
    pub shutdown_grace: Duration,
    /// Bound on disposing one service on shutdown.
    pub dispose_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            dispose_timeout: DEFAULT_DISPOSE_TIMEOUT,
        }
    }
}

/// Builder for [`ConnectionManager`].
pub struct ConnectionManagerBuilder {
    config: ManagerConfig,
    factory: ServiceFactory,
    store: Arc<dyn ServiceStore>,
    variables: Arc<dyn VariableSetStore>,
    listener: Option<Arc<dyn ServiceListener>>,
    events: EventSink,
    environments: Vec<String>,
}

impl ConnectionManagerBuilder {
    /// Creates a builder with in-memory stores.
    #[must_use]
    pub fn new(factory: ServiceFactory) -> Self {
        Self {
            config: ManagerConfig::default(),
            factory,
            store: Arc::new(InMemoryServiceStore::new()),
            variables: Arc::new(InMemoryVariableSetStore::new()),
            listener: None,
            events: EventSink::new(),
            environments: Vec::new(),
        }
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Sets the per-service dispose bound used on shutdown.
    #[must_use]
    pub fn dispose_timeout(mut self, timeout: Duration) -> Self {
        self.config.dispose_timeout = timeout;
        self
    }

    /// Sets the descriptor store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ServiceStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets the variable set store.
    #[must_use]
    pub fn variable_sets(mut self, variables: Arc<dyn VariableSetStore>) -> Self {
        self.variables = variables;
        self
    }

    /// Sets the lifecycle listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn ServiceListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Adds an event listener.
    #[must_use]
    pub fn event_listener(self, listener: Arc<dyn EventListener>) -> Self {
        self.events.subscribe(listener);
        self
    }

    /// Declares an environment in addition to `default`.
    #[must_use]
    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environments.push(name.into());
        self
    }

    /// Builds the manager and loads the stored descriptors.
    ///
    /// # Errors
    /// Returns a store error, or a factory error for a stored descriptor
    /// whose type or handler is not registered.
    pub fn build(self) -> Result<ConnectionManager> {
        let mut registry = Registry::default();
        registry.environments.insert(DEFAULT_ENVIRONMENT.to_string());
        registry.environments.extend(self.environments);

        for descriptor in self.store.list_service_descriptors()? {
            let identity = descriptor.identity();
            if registry.services.contains_key(&identity) {
                return Err(RegistryError::ServiceAlreadyExists { identity });
            }
            let service = self.factory.create(&descriptor)?;
            registry.environments.insert(descriptor.environment.clone());
            registry
                .services
                .insert(identity, Arc::new(ServiceRuntime::new(descriptor, service)));
        }
        tracing::info!(
            services = registry.services.len(),
            environments = registry.environments.len(),
            pool_size = self.config.pool_size,
            "connection manager ready"
        );

        Ok(ConnectionManager {
            inner: Arc::new(ManagerInner {
                pool: WorkerPool::new(self.config.pool_size),
                config: self.config,
                registry: RwLock::new(registry),
                usage: UsageLock::new(),
                factory: self.factory,
                store: self.store,
                variables: self.variables,
                events: self.events,
                listener: self.listener,
            }),
        })
    }
}

#[derive(Default)]
struct Registry {
    services: HashMap<ServiceIdentity, Arc<ServiceRuntime>>,
    environments: BTreeSet<String>,
}

impl Registry {
    fn runtime(&self, identity: &ServiceIdentity) -> Result<Arc<ServiceRuntime>> {
        self.services
            .get(identity)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(identity))
    }

    fn members(&self, environment: &str) -> Vec<Arc<ServiceRuntime>> {
        let mut members: Vec<_> = self
            .services
            .values()
            .filter(|r| r.identity().environment == environment)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.identity().cmp(b.identity()));
        members
    }

    fn members_sorted(&self) -> Vec<Arc<ServiceRuntime>> {
        let mut all: Vec<_> = self.services.values().cloned().collect();
        all.sort_by(|a, b| a.identity().cmp(b.identity()));
        all
    }
}

/// Concurrent registry of named services.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ManagerConfig,
    registry: RwLock<Registry>,
    pool: WorkerPool,
    usage: UsageLock,
    factory: ServiceFactory,
    store: Arc<dyn ServiceStore>,
    variables: Arc<dyn VariableSetStore>,
    events: EventSink,
    listener: Option<Arc<dyn ServiceListener>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.inner.config)
            .field("pool", &self.inner.pool)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Starts a builder.
    #[must_use]
    pub fn builder(factory: ServiceFactory) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new(factory)
    }

    /// Manager tuning.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Event fan-out shared with every service.
    #[must_use]
    pub fn events(&self) -> &EventSink {
        &self.inner.events
    }

    /// Returns the runtime registered under `identity`.
    pub async fn get_service(&self, identity: &ServiceIdentity) -> Option<Arc<ServiceRuntime>> {
        self.inner.registry.read().await.services.get(identity).cloned()
    }

    /// Sorted service names of `environment`.
    pub async fn get_service_names(&self, environment: &str) -> Vec<String> {
        let registry = self.inner.registry.read().await;
        let mut names: Vec<String> = registry
            .services
            .keys()
            .filter(|id| id.environment == environment)
            .map(|id| id.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Sorted identities of all started services.
    pub async fn get_started_services(&self) -> Vec<ServiceIdentity> {
        let registry = self.inner.registry.read().await;
        let mut started: Vec<ServiceIdentity> = registry
            .services
            .values()
            .filter(|r| r.status().is_started())
            .map(|r| r.identity().clone())
            .collect();
        started.sort();
        started
    }

    /// Descriptor of the service registered under `identity`.
    pub async fn get_service_description(
        &self,
        identity: &ServiceIdentity,
    ) -> Option<ServiceDescriptor> {
        self.inner
            .registry
            .read()
            .await
            .services
            .get(identity)
            .map(|r| r.descriptor().clone())
    }

    /// Status of the service registered under `identity`.
    pub async fn service_status(&self, identity: &ServiceIdentity) -> Option<ServiceStatus> {
        self.get_service(identity).await.map(|r| r.status())
    }

    /// Sorted environment names.
    pub async fn get_environments(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .await
            .environments
            .iter()
            .cloned()
            .collect()
    }

    /// Registers a new service and persists its descriptor.
    pub fn add_service(&self, descriptor: ServiceDescriptor) -> TaskHandle<()> {
        let manager = self.clone();
        self.submit("add", descriptor.identity().to_string(), async move {
            let mut registry = manager.inner.registry.write().await;
            manager.insert_locked(&mut registry, descriptor)
        })
    }

    /// Registers a copy of `source` under `target`.
    pub fn copy_service(&self, source: ServiceIdentity, target: ServiceIdentity) -> TaskHandle<()> {
        let manager = self.clone();
        self.submit("copy", target.to_string(), async move {
            let mut registry = manager.inner.registry.write().await;
            let descriptor = registry
                .runtime(&source)?
                .descriptor()
                .with_identity(&target);
            manager.insert_locked(&mut registry, descriptor)
        })
    }

    /// Replaces the descriptor of a service that is not running.
    ///
    /// The service is rebuilt from the new descriptor; an initialized
    /// predecessor is disposed.
    pub fn update_service(&self, descriptor: ServiceDescriptor) -> TaskHandle<()> {
        let manager = self.clone();
        self.submit("update", descriptor.identity().to_string(), async move {
            manager.replace_service(descriptor).await
        })
    }

    /// Unregisters a service, disposing it first if needed.
    pub fn remove_service(&self, identity: ServiceIdentity) -> TaskHandle<()> {
        let manager = self.clone();
        self.submit("remove", identity.to_string(), async move {
            manager.delete_service(identity).await
        })
    }

    /// Initializes a service from its resolved settings.
    pub fn init_service(&self, identity: ServiceIdentity) -> TaskHandle<()> {
        let manager = self.clone();
        self.submit("init", identity.to_string(), async move {
            manager.run_init(identity).await
        })
    }

    /// Starts an initialized service.
    pub fn start_service(&self, identity: ServiceIdentity) -> TaskHandle<()> {
        let manager = self.clone();
        self.submit("start", identity.to_string(), async move {
            manager.run_start(identity).await
        })
    }

    /// Disposes a service. Disposing a disposed service succeeds.
    pub fn dispose_service(&self, identity: ServiceIdentity) -> TaskHandle<()> {
        let manager = self.clone();
        self.submit("dispose", identity.to_string(), async move {
            manager.run_dispose(identity).await
        })
    }

    /// Declares a new, empty environment.
    pub fn add_environment(&self, name: impl Into<String>) -> TaskHandle<()> {
        let name = name.into();
        let manager = self.clone();
        self.submit("add environment", name.clone(), async move {
            let mut registry = manager.inner.registry.write().await;
            if !registry.environments.insert(name.clone()) {
                return Err(RegistryError::EnvironmentAlreadyExists { name });
            }
            Ok(())
        })
    }

    /// Removes an environment and every service in it.
    ///
    /// Fails without change if any of its services is running.
    pub fn remove_environment(&self, name: impl Into<String>) -> TaskHandle<()> {
        let name = name.into();
        let manager = self.clone();
        self.submit("remove environment", name.clone(), async move {
            manager.drop_environment(name).await
        })
    }

    /// Renames an environment, moving its services.
    ///
    /// Fails without change if any of its services is running, or if the
    /// store rejects one of the moves.
    pub fn rename_environment(&self, from: impl Into<String>, to: impl Into<String>) -> TaskHandle<()> {
        let (from, to) = (from.into(), to.into());
        let manager = self.clone();
        self.submit("rename environment", from.clone(), async move {
            manager.move_environment(from, to).await
        })
    }

    /// Blocks the calling thread until every name in `names` is free, then
    /// marks them all used.
    ///
    /// Call from a plain thread (or `spawn_blocking`), not from an async task.
    ///
    /// # Errors
    /// Returns [`RegistryError::Cancelled`] if `cancel` fires first.
    pub fn set_service_used<S: AsRef<str>>(&self, names: &[S], cancel: &CancellationToken) -> Result<()> {
        self.inner.usage.acquire(names, cancel)
    }

    /// Frees `names` and wakes blocked callers.
    pub fn set_service_not_used<S: AsRef<str>>(&self, names: &[S]) {
        self.inner.usage.release(names);
    }

    /// Returns true if `name` is marked used.
    #[must_use]
    pub fn is_service_used(&self, name: &str) -> bool {
        self.inner.usage.is_used(name)
    }

    /// Shuts the manager down. Never fails.
    ///
    /// Stops accepting work, waits up to the grace period for in-flight
    /// tasks, then disposes every service, each bounded by the dispose
    /// timeout. Overruns are logged and disposal continues.
    pub async fn dispose_manager(&self) {
        let config = &self.inner.config;
        tracing::info!("disposing connection manager");
        self.inner.pool.close();
        if tokio::time::timeout(config.shutdown_grace, self.inner.pool.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                in_flight = self.inner.pool.in_flight(),
                grace = ?config.shutdown_grace,
                "lifecycle tasks still running after grace period, forcing disposal"
            );
        }

        let runtimes = self.inner.registry.read().await.members_sorted();
        for runtime in runtimes {
            let identity = runtime.identity().clone();
            if matches!(runtime.status(), ServiceStatus::Created | ServiceStatus::Disposed) {
                continue;
            }
            let orderly = async {
                let _operation = runtime.lock_operation().await;
                runtime.service().dispose().await;
            };
            if tokio::time::timeout(config.dispose_timeout, orderly).await.is_err() {
                tracing::warn!(%identity, "service busy at shutdown, disposing without its operation lock");
                if tokio::time::timeout(config.dispose_timeout, runtime.service().dispose())
                    .await
                    .is_err()
                {
                    tracing::error!(%identity, "service did not dispose in time, abandoning it");
                    continue;
                }
            }
            self.finish(&runtime, EventLevel::Info, "service disposed at shutdown").await;
        }
        tracing::info!("connection manager disposed");
    }

    fn submit<T, F>(&self, operation: &'static str, subject: String, task: F) -> TaskHandle<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if self.inner.pool.is_closed() {
            let err = RegistryError::ShuttingDown;
            self.report(operation, &subject, Err(&err));
            return TaskHandle::ready(Err(err));
        }
        let manager = self.clone();
        self.inner.pool.submit(async move {
            let result = task.await;
            manager.report(operation, &subject, result.as_ref().map(|_| ()));
            result
        })
    }

    fn report(&self, operation: &str, subject: &str, outcome: std::result::Result<(), &RegistryError>) {
        match outcome {
            Ok(()) => {
                tracing::info!(operation, subject, "lifecycle operation completed");
                if let Some(listener) = &self.inner.listener {
                    listener.on_info_processing(subject, &format!("{operation} completed"));
                }
            }
            Err(err) => {
                tracing::error!(operation, subject, error = %err, "lifecycle operation failed");
                if let Some(listener) = &self.inner.listener {
                    listener.on_error_processing(subject, err);
                }
            }
        }
    }

    /// Journals and publishes an event.
    fn record(&self, identity: &ServiceIdentity, level: EventLevel, status: Option<ServiceStatus>, message: &str) {
        let event = ServiceEvent::new(identity.clone(), level, status, message);
        if let Err(err) = self.inner.store.append_service_event(&event) {
            tracing::warn!(%identity, error = %err, "failed to journal service event");
        }
        self.inner.events.publish(&event);
    }

    /// Records the outcome of a lifecycle call and tells the handler.
    ///
    /// The event is journaled under the registry write lock and dropped if
    /// the runtime left the registry meanwhile, so the journal never shows
    /// a lifecycle step after the service's removal.
    async fn finish(&self, runtime: &ServiceRuntime, level: EventLevel, message: &str) {
        let status = runtime.status();
        runtime.handler().on_status(runtime.identity(), status);
        let _registry = self.inner.registry.write().await;
        if runtime.is_removed() {
            tracing::debug!(identity = %runtime.identity(), message, "service removed, event not journaled");
            return;
        }
        self.record(runtime.identity(), level, Some(status), message);
    }

    fn insert_locked(&self, registry: &mut Registry, descriptor: ServiceDescriptor) -> Result<()> {
        let identity = descriptor.identity();
        if registry.services.contains_key(&identity) {
            return Err(RegistryError::ServiceAlreadyExists { identity });
        }
        let service = self.inner.factory.create(&descriptor)?;
        self.inner.store.add_service_descriptor(&descriptor)?;
        registry.environments.insert(descriptor.environment.clone());
        registry
            .services
            .insert(identity.clone(), Arc::new(ServiceRuntime::new(descriptor, service)));
        self.record(&identity, EventLevel::Info, Some(ServiceStatus::Created), "service added");
        Ok(())
    }

    async fn replace_service(&self, descriptor: ServiceDescriptor) -> Result<()> {
        let identity = descriptor.identity();
        let mut registry = self.inner.registry.write().await;
        let current = registry.runtime(&identity)?;
        let guard = lock_idle(&current, "update")?;

        let service = self.inner.factory.create(&descriptor)?;
        self.inner
            .store
            .update_service_descriptor(&identity, &descriptor)?;
        current.mark_removed();
        registry
            .services
            .insert(identity.clone(), Arc::new(ServiceRuntime::new(descriptor, service)));
        self.record(&identity, EventLevel::Info, Some(ServiceStatus::Created), "service updated");
        drop(registry);

        if !matches!(current.status(), ServiceStatus::Created | ServiceStatus::Disposed) {
            current.service().dispose().await;
        }
        drop(guard);
        Ok(())
    }

    async fn delete_service(&self, identity: ServiceIdentity) -> Result<()> {
        let mut registry = self.inner.registry.write().await;
        let runtime = registry.runtime(&identity)?;
        self.inner.store.remove_service_descriptor(&identity)?;
        registry.services.remove(&identity);
        runtime.mark_removed();
        self.record(&identity, EventLevel::Info, None, "service removed");
        drop(registry);

        dispose_removed(&runtime).await;
        Ok(())
    }

    /// Looks the runtime up under the write lock, then waits for its
    /// operation lock outside of it.
    async fn acquire(&self, identity: &ServiceIdentity) -> Result<(Arc<ServiceRuntime>, OwnedMutexGuard<()>)> {
        let runtime = self.inner.registry.write().await.runtime(identity)?;
        let guard = runtime.lock_operation().await;
        if runtime.is_removed() {
            return Err(RegistryError::not_found(identity));
        }
        Ok((runtime, guard))
    }

    async fn run_init(&self, identity: ServiceIdentity) -> Result<()> {
        let (runtime, _operation) = self.acquire(&identity).await?;
        let status = runtime.status();
        if !status.can_init() && !runtime.requires_init() {
            return Err(RegistryError::invalid_state(&identity, status, "init"));
        }

        let descriptor = runtime.descriptor();
        let variables = match &descriptor.variable_set {
            Some(name) => Some(
                self.inner
                    .variables
                    .variable_set(name)
                    .ok_or_else(|| RegistryError::VariableSetNotFound { name: name.clone() })?,
            ),
            None => None,
        };
        let settings = resolve_settings(&descriptor.settings, variables.as_ref())?;
        let context = ServiceContext::new(identity.clone(), settings, self.inner.events.clone());

        match runtime.service().init(context).await {
            Ok(()) => {
                runtime.mark_initialized();
                self.finish(&runtime, EventLevel::Info, "service initialized").await;
                Ok(())
            }
            Err(err) => {
                let err = RegistryError::service(&identity, err);
                self.finish(&runtime, EventLevel::Error, &err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn run_start(&self, identity: ServiceIdentity) -> Result<()> {
        let (runtime, _operation) = self.acquire(&identity).await?;
        let status = runtime.status();
        if status != ServiceStatus::Initialized {
            return Err(RegistryError::invalid_state(&identity, status, "start"));
        }
        if runtime.requires_init() {
            return Err(RegistryError::InitRequired {
                identity,
                operation: "start",
            });
        }
        match runtime.service().start().await {
            Ok(()) => {
                self.finish(&runtime, EventLevel::Info, "service started").await;
                Ok(())
            }
            Err(err) => {
                let err = RegistryError::service(&identity, err);
                self.finish(&runtime, EventLevel::Error, &err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn run_dispose(&self, identity: ServiceIdentity) -> Result<()> {
        let (runtime, _operation) = self.acquire(&identity).await?;
        if runtime.status() == ServiceStatus::Disposed {
            return Ok(());
        }
        runtime.service().dispose().await;
        self.finish(&runtime, EventLevel::Info, "service disposed").await;
        Ok(())
    }

    async fn drop_environment(&self, name: String) -> Result<()> {
        if name == DEFAULT_ENVIRONMENT {
            return Err(RegistryError::DefaultEnvironment { operation: "remove" });
        }
        let mut registry = self.inner.registry.write().await;
        if !registry.environments.contains(&name) {
            return Err(RegistryError::EnvironmentNotFound { name });
        }
        let members = registry.members(&name);
        let guards = lock_environment(&name, &members)?;

        let mut removed: Vec<&ServiceDescriptor> = Vec::new();
        for runtime in &members {
            if let Err(err) = self.inner.store.remove_service_descriptor(runtime.identity()) {
                for descriptor in removed {
                    if let Err(undo) = self.inner.store.add_service_descriptor(descriptor) {
                        tracing::error!(identity = %descriptor.identity(), error = %undo, "failed to restore descriptor");
                    }
                }
                return Err(err.into());
            }
            removed.push(runtime.descriptor());
        }

        for runtime in &members {
            registry.services.remove(runtime.identity());
            runtime.mark_removed();
            self.record(runtime.identity(), EventLevel::Info, None, "service removed with its environment");
        }
        registry.environments.remove(&name);
        drop(registry);
        drop(guards);

        for runtime in &members {
            dispose_removed(runtime).await;
        }
        Ok(())
    }

    async fn move_environment(&self, from: String, to: String) -> Result<()> {
        if from == DEFAULT_ENVIRONMENT || to == DEFAULT_ENVIRONMENT {
            return Err(RegistryError::DefaultEnvironment { operation: "rename" });
        }
        let mut registry = self.inner.registry.write().await;
        if !registry.environments.contains(&from) {
            return Err(RegistryError::EnvironmentNotFound { name: from });
        }
        if registry.environments.contains(&to) {
            return Err(RegistryError::EnvironmentAlreadyExists { name: to });
        }
        let members = registry.members(&from);
        let _guards = lock_environment(&from, &members)?;

        let mut moved: Vec<(&Arc<ServiceRuntime>, ServiceDescriptor)> = Vec::new();
        for runtime in &members {
            let target = ServiceIdentity::new(to.clone(), runtime.identity().name.clone());
            let descriptor = runtime.descriptor().with_identity(&target);
            if let Err(err) = self
                .inner
                .store
                .update_service_descriptor(runtime.identity(), &descriptor)
            {
                for (original, applied) in moved.iter().rev() {
                    if let Err(undo) = self
                        .inner
                        .store
                        .update_service_descriptor(&applied.identity(), original.descriptor())
                    {
                        tracing::error!(identity = %original.identity(), error = %undo, "failed to roll back rename");
                    }
                }
                return Err(err.into());
            }
            moved.push((runtime, descriptor));
        }

        for (runtime, descriptor) in moved {
            registry.services.remove(runtime.identity());
            runtime.mark_removed();
            let next = Arc::new(runtime.moved(descriptor));
            self.record(next.identity(), EventLevel::Info, Some(next.status()), "service moved");
            registry.services.insert(next.identity().clone(), next);
        }
        registry.environments.remove(&from);
        registry.environments.insert(to);
        Ok(())
    }
}

/// Takes the operation lock of a runtime that must be idle and not running.
fn lock_idle(runtime: &ServiceRuntime, operation: &'static str) -> Result<OwnedMutexGuard<()>> {
    let guard = runtime.try_lock_operation();
    let status = runtime.status();
    match guard {
        Some(guard) if !status.is_running() => Ok(guard),
        _ => Err(RegistryError::invalid_state(runtime.identity(), status, operation)),
    }
}

/// Locks every member of an environment, failing if any is busy or running.
fn lock_environment(name: &str, members: &[Arc<ServiceRuntime>]) -> Result<Vec<OwnedMutexGuard<()>>> {
    let mut guards = Vec::with_capacity(members.len());
    let mut in_use = Vec::new();
    for runtime in members {
        match runtime.try_lock_operation() {
            Some(guard) if !runtime.status().is_running() => guards.push(guard),
            _ => in_use.push(runtime.identity().name.clone()),
        }
    }
    if in_use.is_empty() {
        Ok(guards)
    } else {
        Err(RegistryError::EnvironmentInUse {
            name: name.to_string(),
            services: in_use,
        })
    }
}

async fn dispose_removed(runtime: &ServiceRuntime) {
    let _operation = runtime.lock_operation().await;
    if !matches!(runtime.status(), ServiceStatus::Created | ServiceStatus::Disposed) {
        runtime.service().dispose().await;
    }
}
