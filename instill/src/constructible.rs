use std::collections::BTreeMap;
use std::fmt;

use crate::{DeferredService, Dependencies, Instance, StdError};

/// Trait for types the resolver can construct.
///
/// A constructible declares the services it needs through [`dependencies`] and
/// receives them, after its fixed arguments, in [`construct`]. What consumers
/// get back is the [`Handle`], usually `Arc<Self>` or `Arc<dyn Contract>`.
///
/// Most types derive this trait with `#[derive(Injectable)]` or with the
/// `#[injectable]` attribute; implementing it by hand is just as valid.
///
/// # Examples
///
/// ```rust
/// use instill::{Arguments, Constructible, Dependencies, ServiceIdentifier, StdError};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// struct Scheduler {
///     name: String,
///     clock: Arc<Clock>,
/// }
///
/// static CLOCK: ServiceIdentifier<Arc<Clock>> = ServiceIdentifier::new("clock");
///
/// impl Constructible for Scheduler {
///     type Handle = Arc<Self>;
///
///     fn dependencies() -> Dependencies {
///         Dependencies::new().parameter(&CLOCK, 1)
///     }
///
///     fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
///         Ok(Arc::new(Self {
///             name: args.require(0)?,
///             clock: args.require(1)?,
///         }))
///     }
/// }
/// ```
///
/// [`dependencies`]: Constructible::dependencies
/// [`construct`]: Constructible::construct
/// [`Handle`]: Constructible::Handle
pub trait Constructible: Send + Sync + 'static {
    /// The value consumers of this service receive.
    type Handle: Clone + Send + Sync + 'static;

    /// Declares the services injected into [`construct`](Self::construct).
    fn dependencies() -> Dependencies {
        Dependencies::new()
    }

    /// Builds the service from its fixed arguments and injected services.
    fn construct(args: Arguments) -> Result<Self::Handle, StdError>;

    /// Wraps a not yet constructed service into a handle.
    ///
    /// Called instead of [`construct`](Self::construct) when the descriptor
    /// allows delayed instantiation. Returning `None` means the handle type
    /// cannot stand in for an unconstructed service, and the resolver falls
    /// back to eager construction.
    fn deferred(service: DeferredService<Self::Handle>) -> Option<Self::Handle> {
        let _ = service;
        None
    }
}

/// Values handed to [`Constructible::construct`].
///
/// Positional values are the fixed arguments followed by the injected
/// services; positions may be empty when an optional service is missing or
/// when fixed arguments had to be padded. Property values are keyed by the
/// name they were declared with.
#[derive(Clone, Default)]
pub struct Arguments {
    constructor: &'static str,
    values: Vec<Option<Instance>>,
    properties: BTreeMap<&'static str, Option<Instance>>,
}

impl Arguments {
    /// Creates an empty argument list for the named constructor.
    pub fn new(constructor: &'static str) -> Self {
        Self {
            constructor,
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: Option<Instance>) -> Self {
        self.values.push(value);
        self
    }

    pub fn with_property(mut self, key: &'static str, value: Option<Instance>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub(crate) fn from_parts(
        constructor: &'static str,
        values: Vec<Option<Instance>>,
        properties: BTreeMap<&'static str, Option<Instance>>,
    ) -> Self {
        Self {
            constructor,
            values,
            properties,
        }
    }

    /// Returns the value at `index` if present and of type `T`.
    pub fn get<T>(&self, index: usize) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.values.get(index)?.as_ref()?.downcast()
    }

    /// Returns the value at `index`, failing if it is missing or not a `T`.
    pub fn require<T>(&self, index: usize) -> Result<T, StdError>
    where
        T: Clone + 'static,
    {
        self.optional(index)?
            .ok_or_else(|| format!("{}: missing argument at position {index}", self.constructor).into())
    }

    /// Returns the value at `index`, or `None` when the position is empty.
    ///
    /// Unlike [`get`](Self::get), a value of the wrong type is an error.
    pub fn optional<T>(&self, index: usize) -> Result<Option<T>, StdError>
    where
        T: Clone + 'static,
    {
        match self.values.get(index) {
            Some(Some(value)) => self.cast(value, || format!("argument at position {index}")),
            _ => Ok(None),
        }
    }

    pub fn property<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.properties.get(key)?.as_ref()?.downcast()
    }

    pub fn require_property<T>(&self, key: &str) -> Result<T, StdError>
    where
        T: Clone + 'static,
    {
        self.optional_property(key)?
            .ok_or_else(|| format!("{}: missing property {key}", self.constructor).into())
    }

    pub fn optional_property<T>(&self, key: &str) -> Result<Option<T>, StdError>
    where
        T: Clone + 'static,
    {
        match self.properties.get(key) {
            Some(Some(value)) => self.cast(value, || format!("property {key}")),
            _ => Ok(None),
        }
    }

    fn cast<T>(&self, value: &Instance, what: impl FnOnce() -> String) -> Result<Option<T>, StdError>
    where
        T: Clone + 'static,
    {
        match value.downcast() {
            Some(v) => Ok(Some(v)),
            None => Err(format!(
                "{}: {} is a {}, expected {}",
                self.constructor,
                what(),
                value.type_name(),
                std::any::type_name::<T>(),
            )
            .into()),
        }
    }

    /// Number of positional values, empty positions included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name of the type being constructed.
    pub fn constructor(&self) -> &'static str {
        self.constructor
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("constructor", &self.constructor)
            .field("values", &self.values)
            .field("properties", &self.properties)
            .finish()
    }
}
