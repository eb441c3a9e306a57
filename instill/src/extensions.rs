use crate::{Constructible, Descriptor, ServiceCollection, ServiceId, ServiceIdentifier, SyncDescriptor};

/// When a registered singleton is constructed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InstantiationType {
    /// Constructed as soon as it is first injected.
    #[default]
    Eager,
    /// Injected as a deferred handle when the handle type supports it.
    Delayed,
}

/// A singleton registered for some contract.
#[derive(Clone, Debug)]
pub struct ServiceContribution {
    pub id: ServiceId,
    pub descriptor: Descriptor,
}

/// List of default service implementations, assembled at startup.
///
/// Modules register their singletons here and the list is then turned into
/// the collection of a root resolver.
///
/// # Examples
///
/// ```rust
/// use instill::{
///     Arguments, Constructible, InstantiationService, InstantiationType, ServiceIdentifier,
///     SingletonRegistry, StdError,
/// };
/// use std::sync::Arc;
///
/// struct Clock;
///
/// impl Constructible for Clock {
///     type Handle = Arc<Self>;
///
///     fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
///         Ok(Arc::new(Self))
///     }
/// }
///
/// static CLOCK: ServiceIdentifier<Arc<Clock>> = ServiceIdentifier::new("clock");
///
/// let mut registry = SingletonRegistry::new();
/// registry.register_singleton::<Clock>(&CLOCK, InstantiationType::Eager);
///
/// let service = InstantiationService::new(registry.into_collection());
/// assert!(service.invoke_function(|accessor| accessor.get(&CLOCK)).is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SingletonRegistry {
    contributions: Vec<ServiceContribution>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `C` as the implementation of `id`.
    ///
    /// A later registration for the same identifier replaces the earlier one
    /// when the registry is applied to a collection.
    pub fn register_singleton<C>(
        &mut self,
        id: &'static ServiceIdentifier<C::Handle>,
        instantiation: InstantiationType,
    ) -> &mut Self
    where
        C: Constructible,
    {
        let mut descriptor = SyncDescriptor::new::<C>();
        if instantiation == InstantiationType::Delayed {
            descriptor = descriptor.delayed();
        }
        self.contributions.push(ServiceContribution {
            id: id.id(),
            descriptor: descriptor.erase(),
        });
        self
    }

    pub fn contributions(&self) -> &[ServiceContribution] {
        &self.contributions
    }

    /// Adds every registered singleton to `services`.
    pub fn populate(&self, services: &ServiceCollection) {
        for contribution in &self.contributions {
            if let Some(previous) = services.set(contribution.id, contribution.descriptor.clone()) {
                tracing::debug!(
                    service = %contribution.id,
                    ?previous,
                    "Replacing registered service",
                );
            }
        }
    }

    pub fn into_collection(self) -> ServiceCollection {
        let services = ServiceCollection::new();
        self.populate(&services);
        services
    }
}
