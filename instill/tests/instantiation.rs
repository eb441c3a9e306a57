use instill::{
    Arguments, Constructible, DeferredService, Dependencies, INSTANTIATION_SERVICE, Instance,
    InstantiationError, InstantiationHandle, InstantiationOptions, InstantiationService,
    InstantiationType, ServiceCollection, ServiceIdentifier, SingletonRegistry, StdError,
    SyncDescriptor, args,
};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct Service1 {
    value: u32,
}

struct Service2 {
    value: u32,
}

static SVC1: ServiceIdentifier<Arc<Service1>> = ServiceIdentifier::new("service1");
static SVC2: ServiceIdentifier<Arc<Service2>> = ServiceIdentifier::new("service2");

static SERVICE2_CREATED: AtomicUsize = AtomicUsize::new(0);

impl Constructible for Service2 {
    type Handle = Arc<Self>;

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        SERVICE2_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Self { value: 2 }))
    }
}

struct Consumer1 {
    service: Arc<Service1>,
}

impl Constructible for Consumer1 {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&SVC1, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self {
            service: args.require(0)?,
        }))
    }
}

#[test]
fn test_injects_only_declared_services() {
    let services = ServiceCollection::new()
        .with_instance(&SVC1, Arc::new(Service1 { value: 1 }))
        .with_descriptor(&SVC2, SyncDescriptor::new::<Service2>());
    let service = InstantiationService::new(services.clone());

    let consumer = service.create_instance::<Consumer1>(args![]).unwrap();
    assert_eq!(consumer.service.value, 1);
    assert_eq!(SERVICE2_CREATED.load(Ordering::SeqCst), 0);
    assert!(services.get(SVC2.id()).unwrap().as_descriptor().is_some());

    let svc2 = service
        .invoke_function(|accessor| accessor.get(&SVC2))
        .unwrap();
    assert_eq!(svc2.value, 2);
}

struct Counted;

static COUNTED: ServiceIdentifier<Arc<Counted>> = ServiceIdentifier::new("counted");
static COUNTED_CREATED: AtomicUsize = AtomicUsize::new(0);

impl Constructible for Counted {
    type Handle = Arc<Self>;

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        COUNTED_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Self))
    }
}

struct CountedUser {
    counted: Arc<Counted>,
}

impl Constructible for CountedUser {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&COUNTED, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self {
            counted: args.require(0)?,
        }))
    }
}

#[test]
fn test_descriptor_constructed_once() {
    let services =
        ServiceCollection::new().with_descriptor(&COUNTED, SyncDescriptor::new::<Counted>());
    let service = InstantiationService::new(services.clone());

    let first = service.create_instance::<CountedUser>(args![]).unwrap();
    let second = service.create_instance::<CountedUser>(args![]).unwrap();
    let direct = service
        .invoke_function(|accessor| accessor.get(&COUNTED))
        .unwrap();

    assert_eq!(COUNTED_CREATED.load(Ordering::SeqCst), 1);
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.counted, &second.counted));
    assert!(Arc::ptr_eq(&first.counted, &direct));
    assert!(services.get(COUNTED.id()).unwrap().as_instance().is_some());
}

#[derive(Debug)]
struct Storage;

#[derive(Debug)]
struct Repository {
    storage: Arc<Storage>,
}

static STORAGE: ServiceIdentifier<Arc<Storage>> = ServiceIdentifier::new("storage");
static REPOSITORY: ServiceIdentifier<Arc<Repository>> = ServiceIdentifier::new("repository");

impl Constructible for Storage {
    type Handle = Arc<Self>;

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self))
    }
}

impl Constructible for Repository {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&STORAGE, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self {
            storage: args.require(0)?,
        }))
    }
}

#[test]
fn test_dependencies_materialized_before_dependents() {
    let services = ServiceCollection::new()
        .with_descriptor(&REPOSITORY, SyncDescriptor::new::<Repository>())
        .with_descriptor(&STORAGE, SyncDescriptor::new::<Storage>());
    let service = InstantiationService::new(services.clone());

    let repository = service
        .invoke_function(|accessor| accessor.get(&REPOSITORY))
        .unwrap();
    let storage = services.get_instance(&STORAGE).unwrap().unwrap();
    assert!(Arc::ptr_eq(&repository.storage, &storage));
}

#[derive(Debug)]
struct CycleA;
struct CycleB;

static CYCLE_A: ServiceIdentifier<Arc<CycleA>> = ServiceIdentifier::new("cycleA");
static CYCLE_B: ServiceIdentifier<Arc<CycleB>> = ServiceIdentifier::new("cycleB");
static CYCLE_CREATED: AtomicUsize = AtomicUsize::new(0);

impl Constructible for CycleA {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&CYCLE_B, 0)
    }

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        CYCLE_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Self))
    }
}

impl Constructible for CycleB {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&CYCLE_A, 0)
    }

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        CYCLE_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Self))
    }
}

#[test]
fn test_cyclic_dependency() {
    let services = ServiceCollection::new()
        .with_descriptor(&CYCLE_A, SyncDescriptor::new::<CycleA>())
        .with_descriptor(&CYCLE_B, SyncDescriptor::new::<CycleB>())
        .with_descriptor(&STORAGE, SyncDescriptor::new::<Storage>());
    let service = InstantiationService::new(services.clone());

    let err = service
        .invoke_function(|accessor| accessor.get(&CYCLE_A))
        .unwrap_err();
    match &err {
        InstantiationError::CyclicDependency { cycle, graph } => {
            let cycle = cycle.as_deref().unwrap();
            assert!(cycle.contains("cycleA"));
            assert!(cycle.contains("cycleB"));
            assert!(graph.contains("cycleA"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("cyclic dependency between services"));
    assert_eq!(CYCLE_CREATED.load(Ordering::SeqCst), 0);
    assert!(services.get(CYCLE_A.id()).unwrap().as_descriptor().is_some());
    assert!(services.get(CYCLE_B.id()).unwrap().as_descriptor().is_some());

    // The resolver stays usable.
    assert!(
        service
            .invoke_function(|accessor| accessor.get(&STORAGE))
            .is_ok()
    );
}

#[test]
fn test_cycle_limit() {
    let services = ServiceCollection::new()
        .with_descriptor(&REPOSITORY, SyncDescriptor::new::<Repository>())
        .with_descriptor(&STORAGE, SyncDescriptor::new::<Storage>());
    let options = InstantiationOptions {
        cycle_limit: 1,
        ..Default::default()
    };
    let service = InstantiationService::with_options(services, options);

    let err = service
        .invoke_function(|accessor| accessor.get(&REPOSITORY))
        .unwrap_err();
    assert!(matches!(
        err,
        InstantiationError::CyclicDependency { cycle: None, .. }
    ));
}

#[test]
fn test_child_shares_parent_instance() {
    let services = ServiceCollection::new().with_descriptor(&STORAGE, SyncDescriptor::new::<Storage>());
    let parent = InstantiationService::new(services.clone());
    let from_parent = parent
        .invoke_function(|accessor| accessor.get(&STORAGE))
        .unwrap();

    let child = parent.create_child(ServiceCollection::new());
    let from_child = child
        .invoke_function(|accessor| accessor.get(&STORAGE))
        .unwrap();
    assert!(Arc::ptr_eq(&from_parent, &from_child));
}

#[test]
fn test_child_materializes_into_parent() {
    let services = ServiceCollection::new().with_descriptor(&STORAGE, SyncDescriptor::new::<Storage>());
    let parent = InstantiationService::new(services.clone());
    let child = parent.create_child(ServiceCollection::new());

    let from_child = child
        .invoke_function(|accessor| accessor.get(&STORAGE))
        .unwrap();
    assert!(child.services().is_empty());
    assert!(services.get(STORAGE.id()).unwrap().as_instance().is_some());

    let from_parent = parent
        .invoke_function(|accessor| accessor.get(&STORAGE))
        .unwrap();
    assert!(Arc::ptr_eq(&from_parent, &from_child));
}

#[test]
fn test_child_shadows_parent() {
    let parent_storage = Arc::new(Storage);
    let child_storage = Arc::new(Storage);
    let parent = InstantiationService::new(
        ServiceCollection::new().with_instance(&STORAGE, parent_storage.clone()),
    );
    let child =
        parent.create_child(ServiceCollection::new().with_instance(&STORAGE, child_storage.clone()));

    let repository = child.create_instance::<Repository>(args![]).unwrap();
    assert!(Arc::ptr_eq(&repository.storage, &child_storage));
    let repository = parent.create_instance::<Repository>(args![]).unwrap();
    assert!(Arc::ptr_eq(&repository.storage, &parent_storage));
}

#[derive(Debug)]
struct Missing;

static MISSING: ServiceIdentifier<Arc<Missing>> = ServiceIdentifier::new("missing");

#[derive(Debug)]
struct NeedsMissing {
    missing: Option<Arc<Missing>>,
}

impl Constructible for NeedsMissing {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&MISSING, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self {
            missing: args.optional(0)?,
        }))
    }
}

struct MaybeMissing {
    missing: Option<Arc<Missing>>,
}

impl Constructible for MaybeMissing {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().optional_parameter(&MISSING, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self {
            missing: args.optional(0)?,
        }))
    }
}

#[test]
fn test_missing_dependency_non_strict() {
    let service = InstantiationService::new(ServiceCollection::new());
    let instance = service.create_instance::<NeedsMissing>(args![]).unwrap();
    assert!(instance.missing.is_none());
}

#[test]
fn test_missing_dependency_strict() {
    let options = InstantiationOptions {
        strict: true,
        ..Default::default()
    };
    let service = InstantiationService::with_options(ServiceCollection::new(), options);

    let err = service.create_instance::<NeedsMissing>(args![]).unwrap_err();
    match &err {
        InstantiationError::UnknownRequiredService { dependent, service } => {
            assert!(dependent.ends_with("NeedsMissing"));
            assert_eq!(*service, MISSING.id());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().ends_with("depends on UNKNOWN service missing"));

    let instance = service.create_instance::<MaybeMissing>(args![]).unwrap();
    assert!(instance.missing.is_none());
}

#[test]
fn test_accessor_expired() {
    let service = InstantiationService::new(
        ServiceCollection::new().with_instance(&SVC1, Arc::new(Service1 { value: 1 })),
    );
    let mut stored = None;
    service.invoke_function(|accessor| {
        assert!(accessor.get(&SVC1).is_ok());
        stored = Some(accessor.clone());
    });

    let accessor = stored.unwrap();
    assert!(matches!(
        accessor.get(&SVC1),
        Err(InstantiationError::AccessorExpired)
    ));
    assert!(matches!(
        accessor.get_optional(&SVC1),
        Err(InstantiationError::AccessorExpired)
    ));
}

#[test]
fn test_invoke_function_returns_result() {
    let service = InstantiationService::new(
        ServiceCollection::new().with_instance(&SVC1, Arc::new(Service1 { value: 7 })),
    );

    let value = service.invoke_function(|accessor| accessor.get(&SVC1).map(|v| v.value * 2));
    assert_eq!(value.unwrap(), 14);

    let missing = service.invoke_function(|accessor| accessor.get(&MISSING));
    assert!(matches!(
        missing,
        Err(InstantiationError::UnknownRequiredService { .. })
    ));
    let optional = service
        .invoke_function(|accessor| accessor.get_optional(&MISSING))
        .unwrap();
    assert!(optional.is_none());
}

#[test]
fn test_services_registered_after_creation() {
    let service = InstantiationService::new(ServiceCollection::new());
    assert!(
        service
            .invoke_function(|accessor| accessor.get_optional(&SVC1))
            .unwrap()
            .is_none()
    );

    service
        .services()
        .set_instance(&SVC1, Arc::new(Service1 { value: 3 }));
    let consumer = service.create_instance::<Consumer1>(args![]).unwrap();
    assert_eq!(consumer.service.value, 3);
}

#[test]
fn test_type_mismatch() {
    let services = ServiceCollection::new();
    services.set(SVC1.id(), Instance::new(42u32));
    let service = InstantiationService::new(services);

    let err = service
        .invoke_function(|accessor| accessor.get(&SVC1))
        .unwrap_err();
    assert!(matches!(
        err,
        InstantiationError::TypeMismatch { service, .. } if service == SVC1.id()
    ));
}

static FAILING: ServiceIdentifier<Arc<Failing>> = ServiceIdentifier::new("failing");

#[derive(Debug)]
struct Failing;

impl Constructible for Failing {
    type Handle = Arc<Self>;

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        Err("disk is full".into())
    }
}

#[test]
fn test_construction_error() {
    let services = ServiceCollection::new().with_descriptor(&FAILING, SyncDescriptor::new::<Failing>());
    let service = InstantiationService::new(services.clone());

    let err = service
        .invoke_function(|accessor| accessor.get(&FAILING))
        .unwrap_err();
    match &err {
        InstantiationError::Construction { constructor, source } => {
            assert!(constructor.ends_with("Failing"));
            assert_eq!(source.to_string(), "disk is full");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(services.get(FAILING.id()).unwrap().as_descriptor().is_some());
}

struct Greeting {
    text: String,
}

impl Constructible for Greeting {
    type Handle = Arc<Self>;

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        let greeting: String = args.require(0)?;
        let name: String = args.require(1)?;
        Ok(Arc::new(Self {
            text: format!("{greeting}, {name}"),
        }))
    }
}

#[test]
fn test_create_instance_from_descriptor() {
    let service = InstantiationService::new(ServiceCollection::new());
    let descriptor = SyncDescriptor::with_arguments::<Greeting>(args!["Hello".to_string()]);

    let greeting = service
        .create_instance_from(&descriptor, args!["world".to_string()])
        .unwrap();
    assert_eq!(greeting.text, "Hello, world");

    let bound = descriptor.bind(args!["there".to_string()]);
    assert_eq!(descriptor.static_arguments().len(), 1);
    let greeting = service.create_instance_from(&bound, args![]).unwrap();
    assert_eq!(greeting.text, "Hello, there");
}

/// Declares its service at position 2, after two fixed arguments.
struct Positioned {
    first: Option<String>,
    second: Option<String>,
    service: Arc<Service1>,
}

impl Constructible for Positioned {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&SVC1, 2)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        assert_eq!(args.len(), 3);
        Ok(Arc::new(Self {
            first: args.optional(0)?,
            second: args.optional(1)?,
            service: args.require(2)?,
        }))
    }
}

#[test]
fn test_fixed_arguments_reconciled() {
    let service = InstantiationService::new(
        ServiceCollection::new().with_instance(&SVC1, Arc::new(Service1 { value: 1 })),
    );

    let padded = service
        .create_instance::<Positioned>(args!["a".to_string()])
        .unwrap();
    assert_eq!(padded.first.as_deref(), Some("a"));
    assert_eq!(padded.second, None);
    assert_eq!(padded.service.value, 1);

    let truncated = service
        .create_instance::<Positioned>(args!["a".to_string(), "b".to_string(), "c".to_string()])
        .unwrap();
    assert_eq!(truncated.second.as_deref(), Some("b"));
    assert_eq!(truncated.service.value, 1);
}

trait Index: Send + Sync {
    fn lookup(&self, term: &str) -> usize;
}

struct Indexer;

impl Index for Indexer {
    fn lookup(&self, term: &str) -> usize {
        term.len()
    }
}

impl Index for DeferredService<Arc<dyn Index>> {
    fn lookup(&self, term: &str) -> usize {
        self.get().lookup(term)
    }
}

static INDEX: ServiceIdentifier<Arc<dyn Index>> = ServiceIdentifier::new("index");
static INDEXER_CREATED: AtomicUsize = AtomicUsize::new(0);

impl Constructible for Indexer {
    type Handle = Arc<dyn Index>;

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        INDEXER_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Indexer))
    }

    fn deferred(service: DeferredService<Self::Handle>) -> Option<Self::Handle> {
        Some(Arc::new(service))
    }
}

struct Search {
    index: Arc<dyn Index>,
}

impl Constructible for Search {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&INDEX, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self {
            index: args.require(0)?,
        }))
    }
}

#[test]
fn test_deferred_construction() {
    let services = ServiceCollection::new()
        .with_descriptor(&INDEX, SyncDescriptor::new::<Indexer>().delayed());
    let service = InstantiationService::new(services);

    let search = service.create_instance::<Search>(args![]).unwrap();
    assert_eq!(INDEXER_CREATED.load(Ordering::SeqCst), 0);

    assert_eq!(search.index.lookup("rust"), 4);
    assert_eq!(search.index.lookup("instill"), 7);
    assert_eq!(INDEXER_CREATED.load(Ordering::SeqCst), 1);

    let again = service.create_instance::<Search>(args![]).unwrap();
    assert!(Arc::ptr_eq(&search.index, &again.index));
}

struct Eager;

static EAGER: ServiceIdentifier<Arc<Eager>> = ServiceIdentifier::new("eager");
static EAGER_CREATED: AtomicUsize = AtomicUsize::new(0);

impl Constructible for Eager {
    type Handle = Arc<Self>;

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        EAGER_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Self))
    }
}

#[test]
fn test_deferred_falls_back_to_eager() {
    let services =
        ServiceCollection::new().with_descriptor(&EAGER, SyncDescriptor::new::<Eager>().delayed());
    let service = InstantiationService::new(services);

    service
        .invoke_function(|accessor| accessor.get(&EAGER))
        .unwrap();
    assert_eq!(EAGER_CREATED.load(Ordering::SeqCst), 1);
}

struct Factory {
    service: InstantiationHandle,
}

impl Constructible for Factory {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&INSTANTIATION_SERVICE, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self {
            service: args.require(0)?,
        }))
    }
}

#[test]
fn test_instantiation_service_resolves_itself() {
    let parent = InstantiationService::new(
        ServiceCollection::new().with_instance(&SVC1, Arc::new(Service1 { value: 1 })),
    );
    let child = parent.create_child(
        ServiceCollection::new().with_instance(&SVC1, Arc::new(Service1 { value: 2 })),
    );

    let resolved = child
        .invoke_function(|accessor| accessor.get(&INSTANTIATION_SERVICE))
        .unwrap();
    assert!(resolved.upgrade().unwrap().parent().is_some());

    let factory = child.create_instance::<Factory>(args![]).unwrap();
    let consumer = factory
        .service
        .create_instance::<Consumer1>(args![])
        .unwrap();
    assert_eq!(consumer.service.value, 2);
}

#[derive(Debug)]
struct Reentrant;

static REENTRANT: ServiceIdentifier<Arc<Reentrant>> = ServiceIdentifier::new("reentrant");

impl Constructible for Reentrant {
    type Handle = Arc<Self>;

    fn dependencies() -> Dependencies {
        Dependencies::new().parameter(&INSTANTIATION_SERVICE, 0)
    }

    fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
        let handle: InstantiationHandle = args.require(0)?;
        let service = handle.upgrade().ok_or("resolver dropped")?;
        service.invoke_function(|accessor| accessor.get(&STORAGE))?;
        service.invoke_function(|accessor| accessor.get(&REENTRANT))
            .map_err(Into::into)
    }
}

#[test]
fn test_reentrant_self_resolution() {
    let services = ServiceCollection::new()
        .with_descriptor(&REENTRANT, SyncDescriptor::new::<Reentrant>())
        .with_descriptor(&STORAGE, SyncDescriptor::new::<Storage>());
    let service = InstantiationService::new(services.clone());

    let err = service
        .invoke_function(|accessor| accessor.get(&REENTRANT))
        .unwrap_err();
    match &err {
        InstantiationError::Construction { source, .. } => {
            assert!(source.to_string().contains("reentrant -> reentrant"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(services.get(STORAGE.id()).unwrap().as_instance().is_some());
    assert!(services.get(REENTRANT.id()).unwrap().as_descriptor().is_some());
}

struct Tracked;

static TRACKED: ServiceIdentifier<Arc<Tracked>> = ServiceIdentifier::new("tracked");
static FACTORY: ServiceIdentifier<Arc<Factory>> = ServiceIdentifier::new("factory");
static TRACKED_DROPPED: AtomicUsize = AtomicUsize::new(0);

impl Constructible for Tracked {
    type Handle = Arc<Self>;

    fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
        Ok(Arc::new(Self))
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_DROPPED.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_resolver_dropped_with_self_dependent_services() {
    let factory = {
        let services = ServiceCollection::new()
            .with_descriptor(&TRACKED, SyncDescriptor::new::<Tracked>())
            .with_descriptor(&FACTORY, SyncDescriptor::new::<Factory>());
        let service = InstantiationService::new(services);
        service
            .invoke_function(|accessor| accessor.get(&TRACKED))
            .unwrap();
        service
            .invoke_function(|accessor| accessor.get(&FACTORY))
            .unwrap()
    };

    assert_eq!(TRACKED_DROPPED.load(Ordering::SeqCst), 1);
    assert!(factory.service.upgrade().is_none());
    assert!(matches!(
        factory.service.create_instance::<Storage>(args![]),
        Err(InstantiationError::IllegalState(_))
    ));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_tracing_enabled() {
    let services = ServiceCollection::new()
        .with_descriptor(&REPOSITORY, SyncDescriptor::new::<Repository>())
        .with_descriptor(&STORAGE, SyncDescriptor::new::<Storage>());
    let options = InstantiationOptions {
        trace: true,
        ..Default::default()
    };
    let service = InstantiationService::with_options(services, options);

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let (repository, again) = tracing::subscriber::with_default(subscriber, || {
        let repository = service
            .invoke_function(|accessor| accessor.get(&REPOSITORY))
            .unwrap();
        let again = service.create_instance::<Repository>(args![]).unwrap();
        (repository, again)
    });
    assert!(Arc::ptr_eq(&repository.storage, &again.storage));

    let output = String::from_utf8(logs.0.lock().clone()).unwrap();
    assert!(output.contains("instill::trace"));
    assert!(output.contains("CALL "));
    assert!(output.contains("\tCREATES -> repository"));
    assert!(output.contains("\t\tCREATES -> storage"));
    assert!(output.contains("DONE, took "));
}

#[test]
fn test_singleton_registry() {
    let mut registry = SingletonRegistry::new();
    registry
        .register_singleton::<Storage>(&STORAGE, InstantiationType::Eager)
        .register_singleton::<Repository>(&REPOSITORY, InstantiationType::Delayed);
    assert_eq!(registry.contributions().len(), 2);

    let services = registry.into_collection();
    let repository = services.get(REPOSITORY.id()).unwrap();
    assert!(
        repository
            .as_descriptor()
            .unwrap()
            .supports_delayed_instantiation()
    );

    let service = InstantiationService::new(services);
    assert!(
        service
            .invoke_function(|accessor| accessor.get(&REPOSITORY))
            .is_ok()
    );
}
