use std::any::type_name;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;

use crate::defer::defer;
use crate::trace::{Trace, TraceKind, TraceTotals};
use crate::{
    Argument, Arguments, Constructible, Constructor, Descriptor, Graph, Instance,
    InstantiationError, ServiceCollection, ServiceEntry, ServiceId, ServiceIdentifier,
    ServicesAccessor, SyncDescriptor,
};

/// Identifier every resolver answers with a handle to itself.
///
/// A child resolver answers with the child, so a constructible that depends on
/// it creates further instances in the scope it was created from. The handle
/// does not keep the resolver alive.
pub static INSTANTIATION_SERVICE: ServiceIdentifier<InstantiationHandle> =
    ServiceIdentifier::new("instantiationService");

/// Number of work items one resolution pass may process before it is
/// considered cyclic.
pub const DEFAULT_CYCLE_LIMIT: usize = 1000;

/// Resolver behavior switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstantiationOptions {
    /// Fail when a required constructor dependency is not registered.
    pub strict: bool,
    /// Report creation and invocation trees through `tracing`.
    pub trace: bool,
    /// Circuit breaker for the closure discovery of one resolution pass.
    pub cycle_limit: usize,
}

impl Default for InstantiationOptions {
    fn default() -> Self {
        Self {
            strict: false,
            trace: false,
            cycle_limit: DEFAULT_CYCLE_LIMIT,
        }
    }
}

/// State shared by a resolver and all of its descendants.
struct Shared {
    /// Serializes resolution passes; holds the services being constructed.
    materializing: ReentrantMutex<RefCell<Vec<ServiceId>>>,
    totals: Arc<TraceTotals>,
}

struct Inner {
    services: ServiceCollection,
    options: InstantiationOptions,
    parent: Option<InstantiationService>,
    shared: Arc<Shared>,
}

/// Work item of one resolution pass.
#[derive(Clone)]
struct Pending {
    id: ServiceId,
    descriptor: Descriptor,
    trace: Trace,
}

/// Builds instances, supplying their declared dependencies.
///
/// Services registered as descriptors are materialized on first use and
/// written back to the collection that owns them, so each descriptor is
/// constructed at most once across a resolver and all of its children.
///
/// # Examples
///
/// ```rust
/// use instill::{
///     Arguments, Constructible, Dependencies, InstantiationService, ServiceCollection,
///     ServiceIdentifier, StdError, SyncDescriptor,
/// };
/// use std::sync::{Arc, Weak};
///
/// struct Config {
///     url: String,
/// }
///
/// struct Database {
///     config: Arc<Config>,
/// }
///
/// static CONFIG: ServiceIdentifier<Arc<Config>> = ServiceIdentifier::new("config");
/// static DATABASE: ServiceIdentifier<Arc<Database>> = ServiceIdentifier::new("database");
///
/// impl Constructible for Database {
///     type Handle = Arc<Self>;
///
///     fn dependencies() -> Dependencies {
///         Dependencies::new().parameter(&CONFIG, 0)
///     }
///
///     fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
///         Ok(Arc::new(Self { config: args.require(0)? }))
///     }
/// }
///
/// let services = ServiceCollection::new()
///     .with_instance(&CONFIG, Arc::new(Config { url: "sqlite::memory:".into() }))
///     .with_descriptor(&DATABASE, SyncDescriptor::new::<Database>());
/// let service = InstantiationService::new(services);
///
/// let database = service
///     .invoke_function(|accessor| accessor.get(&DATABASE))
///     .unwrap();
/// assert_eq!(database.config.url, "sqlite::memory:");
/// ```
#[derive(Clone)]
pub struct InstantiationService {
    inner: Arc<Inner>,
}

impl InstantiationService {
    pub fn new(services: ServiceCollection) -> Self {
        Self::with_options(services, InstantiationOptions::default())
    }

    pub fn with_options(services: ServiceCollection, options: InstantiationOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                services,
                options,
                parent: None,
                shared: Arc::new(Shared {
                    materializing: ReentrantMutex::new(RefCell::new(Vec::new())),
                    totals: Arc::default(),
                }),
            }),
        }
    }

    /// Creates a resolver whose lookups fall back to this one.
    ///
    /// Entries of `services` shadow the entries of this resolver. Descriptors
    /// owned by this resolver are still materialized here.
    pub fn create_child(&self, services: ServiceCollection) -> InstantiationService {
        Self {
            inner: Arc::new(Inner {
                services,
                options: self.inner.options,
                parent: Some(self.clone()),
                shared: self.inner.shared.clone(),
            }),
        }
    }

    /// Collection owned by this resolver.
    pub fn services(&self) -> &ServiceCollection {
        &self.inner.services
    }

    pub fn options(&self) -> InstantiationOptions {
        self.inner.options
    }

    pub fn parent(&self) -> Option<&InstantiationService> {
        self.inner.parent.as_ref()
    }

    /// Returns a handle that refers to this resolver without owning it.
    pub fn handle(&self) -> InstantiationHandle {
        InstantiationHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Constructs a new `C`, injecting its dependencies after `args`.
    ///
    /// The result is not cached; every call constructs again.
    pub fn create_instance<C>(&self, args: Vec<Argument>) -> Result<C::Handle, InstantiationError>
    where
        C: Constructible,
    {
        self.create_instance_from(&SyncDescriptor::<C::Handle>::new::<C>(), args)
    }

    /// Constructs from `descriptor`, appending `args` to its fixed arguments.
    pub fn create_instance_from<H>(
        &self,
        descriptor: &SyncDescriptor<H>,
        args: Vec<Argument>,
    ) -> Result<H, InstantiationError>
    where
        H: Clone + Send + Sync + 'static,
    {
        let ctor = descriptor.ctor();
        let trace = self.trace(TraceKind::Creation, ctor.name());
        let _trace = defer(|| trace.stop());
        let _lock = self.inner.shared.materializing.lock();
        let mut arguments = descriptor.static_arguments().to_vec();
        arguments.extend(args);
        let instance = self.create(ctor, arguments, None, &trace)?;
        instance
            .downcast()
            .ok_or_else(|| InstantiationError::IllegalState(format!("{} did not produce a {}", ctor.name(), type_name::<H>())))
    }

    /// Calls `f` with an accessor that is valid for the duration of the call.
    ///
    /// Whatever `f` returns is returned unchanged, errors included.
    pub fn invoke_function<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ServicesAccessor) -> R,
    {
        let function = type_name::<F>();
        let trace = self.trace(TraceKind::Invocation, function);
        let accessor = ServicesAccessor::new(self.clone(), trace.clone(), function);
        let _done = defer(|| {
            accessor.expire();
            trace.stop();
        });
        f(&accessor)
    }

    fn trace(&self, kind: TraceKind, name: &str) -> Trace {
        if self.inner.options.trace {
            Trace::start(kind, name, self.inner.shared.totals.clone())
        } else {
            Trace::none()
        }
    }

    fn create(
        &self,
        ctor: &Constructor,
        args: Vec<Argument>,
        deferred: Option<ServiceId>,
        trace: &Trace,
    ) -> Result<Instance, InstantiationError> {
        let dependencies = ctor.dependencies();
        let mut services = Vec::with_capacity(dependencies.constructor().len());
        for dependency in dependencies.constructor() {
            let service = self.get_or_create_service_instance(dependency.id, trace)?;
            if service.is_none() && self.inner.options.strict && !dependency.optional {
                return Err(InstantiationError::UnknownRequiredService {
                    dependent: ctor.name().to_string(),
                    service: dependency.id,
                });
            }
            services.push(service);
        }

        let first = dependencies
            .constructor()
            .first()
            .map_or(args.len(), |v| v.index);
        let mut values: Vec<_> = args.into_iter().map(Some).collect();
        if values.len() != first {
            tracing::warn!(
                "[createInstance] First service dependency of {} at position {} conflicts with {} static arguments",
                ctor.name(),
                first + 1,
                values.len(),
            );
            values.resize(first, None);
        }
        values.extend(services);

        let mut properties = BTreeMap::new();
        for dependency in dependencies.properties() {
            let service = self.get_or_create_service_instance(dependency.id, trace)?;
            if service.is_none() && self.inner.options.strict && !dependency.optional {
                return Err(InstantiationError::UnknownRequiredService {
                    dependent: ctor.name().to_string(),
                    service: dependency.id,
                });
            }
            properties.insert(dependency.key, service);
        }

        let args = Arguments::from_parts(ctor.name(), values, properties);
        ctor.construct(args, deferred)
            .map_err(|source| InstantiationError::Construction {
                constructor: ctor.name(),
                source,
            })
    }

    fn set_service_instance(&self, id: ServiceId, instance: Instance) -> Result<(), InstantiationError> {
        if let Some(ServiceEntry::Descriptor(_)) = self.inner.services.get(id) {
            self.inner.services.set(id, instance);
            Ok(())
        } else if let Some(parent) = &self.inner.parent {
            parent.set_service_instance(id, instance)
        } else {
            Err(InstantiationError::IllegalState(format!(
                "setting UNKNOWN service instance {id}"
            )))
        }
    }

    fn get_service_instance_or_descriptor(&self, id: ServiceId) -> Option<ServiceEntry> {
        if let Some(entry) = self.inner.services.get(id) {
            return Some(entry);
        }
        if id == INSTANTIATION_SERVICE.id() {
            return Some(ServiceEntry::Instance(Instance::new(self.handle())));
        }
        self.inner
            .parent
            .as_ref()
            .and_then(|v| v.get_service_instance_or_descriptor(id))
    }

    pub(crate) fn get_or_create_service_instance(
        &self,
        id: ServiceId,
        trace: &Trace,
    ) -> Result<Option<Instance>, InstantiationError> {
        match self.get_service_instance_or_descriptor(id) {
            Some(ServiceEntry::Descriptor(descriptor)) => self
                .create_and_cache_service_instance(id, descriptor, trace.branch(id, true))
                .map(Some),
            Some(ServiceEntry::Instance(instance)) => {
                trace.branch(id, false);
                Ok(Some(instance))
            }
            None => Ok(None),
        }
    }

    fn create_and_cache_service_instance(
        &self,
        id: ServiceId,
        descriptor: Descriptor,
        trace: Trace,
    ) -> Result<Instance, InstantiationError> {
        let _lock = self.inner.shared.materializing.lock();
        let mut graph = Graph::new(|v: &Pending| v.id);
        let mut expanded = HashSet::new();
        let mut stack = vec![Pending {
            id,
            descriptor,
            trace,
        }];
        let mut count = 0;
        while let Some(item) = stack.pop() {
            graph.lookup_or_insert_node(item.clone());

            count += 1;
            if count > self.inner.options.cycle_limit {
                return Err(cyclic_dependency(&graph));
            }
            if !expanded.insert(item.id) {
                continue;
            }

            for (dependency, optional) in item.descriptor.ctor().dependencies().services() {
                let entry = self.get_service_instance_or_descriptor(dependency);
                if entry.is_none() && !optional {
                    tracing::warn!(
                        "[createInstance] {} depends on {dependency} which is NOT registered",
                        item.id,
                    );
                }
                if let Some(ServiceEntry::Descriptor(descriptor)) = entry {
                    let next = Pending {
                        id: dependency,
                        descriptor,
                        trace: item.trace.branch(dependency, true),
                    };
                    graph.insert_edge(item.clone(), next.clone());
                    stack.push(next);
                }
            }
        }

        loop {
            let roots: Vec<Pending> = graph.roots().into_iter().cloned().collect();
            if roots.is_empty() {
                if !graph.is_empty() {
                    return Err(cyclic_dependency(&graph));
                }
                break;
            }
            for root in roots {
                // A constructor may have materialized this root through its own accessor.
                if let Some(ServiceEntry::Descriptor(_)) = self.get_service_instance_or_descriptor(root.id) {
                    let instance = self.create_service_instance_with_owner(&root)?;
                    self.set_service_instance(root.id, instance)?;
                }
                graph.remove_node(&root);
            }
        }

        match self.get_service_instance_or_descriptor(id) {
            Some(ServiceEntry::Instance(instance)) => Ok(instance),
            _ => Err(InstantiationError::IllegalState(format!(
                "service {id} was not materialized"
            ))),
        }
    }

    fn create_service_instance_with_owner(&self, item: &Pending) -> Result<Instance, InstantiationError> {
        if let Some(ServiceEntry::Descriptor(_)) = self.inner.services.get(item.id) {
            self.create_service_instance(item)
        } else if let Some(parent) = &self.inner.parent {
            parent.create_service_instance_with_owner(item)
        } else {
            Err(InstantiationError::IllegalState(format!(
                "creating UNKNOWN service instance {}",
                item.descriptor.ctor().name()
            )))
        }
    }

    fn create_service_instance(&self, item: &Pending) -> Result<Instance, InstantiationError> {
        let materializing = self.inner.shared.materializing.lock();
        {
            let mut stack = materializing.borrow_mut();
            if let Some(pos) = stack.iter().position(|v| *v == item.id) {
                let mut cycle: Vec<String> = stack[pos..].iter().map(ToString::to_string).collect();
                cycle.push(item.id.to_string());
                return Err(InstantiationError::CyclicDependency {
                    cycle: Some(cycle.join(" -> ")),
                    graph: String::new(),
                });
            }
            stack.push(item.id);
        }
        let _pop = defer(|| {
            materializing.borrow_mut().retain(|v| *v != item.id);
        });

        let descriptor = &item.descriptor;
        tracing::trace!(
            service = %item.id,
            constructor = descriptor.ctor().name(),
            deferred = descriptor.supports_delayed_instantiation(),
            "Materializing service",
        );
        self.create(
            descriptor.ctor(),
            descriptor.static_arguments().to_vec(),
            descriptor.supports_delayed_instantiation().then_some(item.id),
            &item.trace,
        )
    }
}

/// Non-owning reference to a resolver, injected for [`INSTANTIATION_SERVICE`].
///
/// Services materialized by a resolver are stored in its collection, so they
/// hold it through this handle instead of an [`InstantiationService`].
#[derive(Clone)]
pub struct InstantiationHandle {
    inner: Weak<Inner>,
}

impl InstantiationHandle {
    /// Returns the resolver, or `None` once it has been dropped.
    pub fn upgrade(&self) -> Option<InstantiationService> {
        self.inner.upgrade().map(|inner| InstantiationService { inner })
    }

    /// Same as [`InstantiationService::create_instance`] on the referenced resolver.
    pub fn create_instance<C>(&self, args: Vec<Argument>) -> Result<C::Handle, InstantiationError>
    where
        C: Constructible,
    {
        self.service()?.create_instance::<C>(args)
    }

    /// Same as [`InstantiationService::create_instance_from`] on the referenced resolver.
    pub fn create_instance_from<H>(
        &self,
        descriptor: &SyncDescriptor<H>,
        args: Vec<Argument>,
    ) -> Result<H, InstantiationError>
    where
        H: Clone + Send + Sync + 'static,
    {
        self.service()?.create_instance_from(descriptor, args)
    }

    fn service(&self) -> Result<InstantiationService, InstantiationError> {
        self.upgrade()
            .ok_or_else(|| InstantiationError::IllegalState("instantiation service was dropped".to_string()))
    }
}

impl fmt::Debug for InstantiationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiationHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for InstantiationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiationService")
            .field("services", &self.inner.services)
            .field("options", &self.inner.options)
            .field("parent", &self.inner.parent.is_some())
            .finish()
    }
}

fn cyclic_dependency<F>(graph: &Graph<Pending, ServiceId, F>) -> InstantiationError
where
    F: Fn(&Pending) -> ServiceId,
{
    let cycle = graph.find_cycle().map(|keys| {
        keys.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    });
    InstantiationError::CyclicDependency {
        cycle,
        graph: graph.to_string(),
    }
}

pub(crate) fn downcast_service<H>(id: ServiceId, instance: &Instance) -> Result<H, InstantiationError>
where
    H: Clone + 'static,
{
    instance
        .downcast()
        .ok_or(InstantiationError::TypeMismatch {
            service: id,
            expected: type_name::<H>(),
        })
}
