use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    Argument, Arguments, Constructible, DeferredService, Dependencies, Instance, ServiceId, StdError,
};

type ConstructFn = fn(Arguments) -> Result<Instance, StdError>;
type ConstructDeferredFn = fn(Arguments, ServiceId) -> Result<Instance, StdError>;

/// Erased construction recipe for one constructible type.
#[derive(Clone, Copy)]
pub struct Constructor {
    name: &'static str,
    dependencies: fn() -> Dependencies,
    construct: ConstructFn,
    construct_deferred: ConstructDeferredFn,
}

impl Constructor {
    pub fn of<C>() -> Self
    where
        C: Constructible,
    {
        Self {
            name: type_name::<C>(),
            dependencies: C::dependencies,
            construct: construct_eager::<C>,
            construct_deferred: construct_deferred::<C>,
        }
    }

    /// Type name of the constructible.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn dependencies(&self) -> Dependencies {
        (self.dependencies)()
    }

    /// Constructs eagerly, or as a deferred handle for `deferred` when given.
    pub(crate) fn construct(&self, args: Arguments, deferred: Option<ServiceId>) -> Result<Instance, StdError> {
        match deferred {
            Some(service) => (self.construct_deferred)(args, service),
            None => (self.construct)(args),
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.name)
    }
}

fn construct_eager<C>(args: Arguments) -> Result<Instance, StdError>
where
    C: Constructible,
{
    C::construct(args).map(Instance::new)
}

fn construct_deferred<C>(args: Arguments, id: ServiceId) -> Result<Instance, StdError>
where
    C: Constructible,
{
    let service = DeferredService::new(id, type_name::<C>(), {
        let args = args.clone();
        move || C::construct(args)
    });
    match C::deferred(service) {
        Some(handle) => Ok(Instance::new(handle)),
        None => {
            tracing::debug!(
                service = %id,
                constructor = type_name::<C>(),
                "Handle cannot defer construction, constructing eagerly",
            );
            construct_eager::<C>(args)
        }
    }
}

#[derive(Clone)]
struct DescriptorInner {
    ctor: Constructor,
    static_arguments: Vec<Argument>,
    supports_delayed_instantiation: bool,
}

/// Deferred construction recipe stored in a service collection.
///
/// Cloning a descriptor is cheap and the clone refers to the same recipe.
#[derive(Clone)]
pub struct Descriptor {
    inner: Arc<DescriptorInner>,
}

impl Descriptor {
    pub fn new(
        ctor: Constructor,
        static_arguments: Vec<Argument>,
        supports_delayed_instantiation: bool,
    ) -> Self {
        Self {
            inner: Arc::new(DescriptorInner {
                ctor,
                static_arguments,
                supports_delayed_instantiation,
            }),
        }
    }

    pub fn ctor(&self) -> &Constructor {
        &self.inner.ctor
    }

    pub fn static_arguments(&self) -> &[Argument] {
        &self.inner.static_arguments
    }

    pub fn supports_delayed_instantiation(&self) -> bool {
        self.inner.supports_delayed_instantiation
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("ctor", &self.inner.ctor)
            .field("static_arguments", &self.inner.static_arguments)
            .field(
                "supports_delayed_instantiation",
                &self.inner.supports_delayed_instantiation,
            )
            .finish()
    }
}

/// Descriptor of a constructible whose handle type is `H`.
///
/// # Examples
///
/// ```rust
/// use instill::{Arguments, Constructible, StdError, SyncDescriptor, args};
/// use std::sync::Arc;
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl Constructible for Greeter {
///     type Handle = Arc<Self>;
///
///     fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
///         Ok(Arc::new(Self { greeting: args.require(0)? }))
///     }
/// }
///
/// let descriptor = SyncDescriptor::with_arguments::<Greeter>(args!["hello".to_string()]);
/// assert_eq!(descriptor.static_argument::<String>(0).as_deref(), Some("hello"));
/// assert!(!descriptor.supports_delayed_instantiation());
/// ```
pub struct SyncDescriptor<H> {
    descriptor: Descriptor,
    _marker: PhantomData<fn() -> H>,
}

impl<H> SyncDescriptor<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new<C>() -> Self
    where
        C: Constructible<Handle = H>,
    {
        Self::with_arguments::<C>(Vec::new())
    }

    /// Creates a descriptor with fixed arguments placed before the injected services.
    pub fn with_arguments<C>(static_arguments: Vec<Argument>) -> Self
    where
        C: Constructible<Handle = H>,
    {
        Self {
            descriptor: Descriptor::new(Constructor::of::<C>(), static_arguments, false),
            _marker: PhantomData,
        }
    }

    /// Allows the resolver to hand out a deferred handle for this service.
    pub fn delayed(mut self) -> Self {
        Arc::make_mut(&mut self.descriptor.inner).supports_delayed_instantiation = true;
        self
    }

    /// Returns a new descriptor with `more` appended to the fixed arguments.
    pub fn bind(&self, more: Vec<Argument>) -> Self {
        let mut inner = DescriptorInner::clone(&self.descriptor.inner);
        inner.static_arguments.extend(more);
        Self {
            descriptor: Descriptor {
                inner: Arc::new(inner),
            },
            _marker: PhantomData,
        }
    }

    pub fn ctor(&self) -> &Constructor {
        self.descriptor.ctor()
    }

    pub fn static_arguments(&self) -> &[Argument] {
        self.descriptor.static_arguments()
    }

    pub fn static_argument<T>(&self, index: usize) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.descriptor.static_arguments().get(index)?.downcast()
    }

    pub fn supports_delayed_instantiation(&self) -> bool {
        self.descriptor.supports_delayed_instantiation()
    }

    /// Returns the untyped descriptor.
    pub fn erase(&self) -> Descriptor {
        self.descriptor.clone()
    }
}

impl<H> Clone for SyncDescriptor<H> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            _marker: PhantomData,
        }
    }
}

impl<H> fmt::Debug for SyncDescriptor<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SyncDescriptor")
            .field(&self.descriptor)
            .finish()
    }
}

impl<H> From<SyncDescriptor<H>> for Descriptor {
    fn from(value: SyncDescriptor<H>) -> Self {
        value.descriptor
    }
}
