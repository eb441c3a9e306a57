//! Deferred values and deferred service handles.
//!
//! A [`DeferredValue`] runs its producer at most once, on first access, and
//! shares the result with every later access. A [`DeferredService`] applies
//! this to service construction: the resolver hands one to
//! [`Constructible::deferred`](crate::Constructible::deferred), and a handle
//! type that forwards its capabilities through it postpones the constructor
//! call until the service is actually used.
//!
//! A failing constructor is only observed on first use. The forwarding impl
//! decides how to surface it: [`DeferredService::get`] panics with the service
//! name, [`DeferredService::try_get`] returns the error.
//!
//! # Examples
//!
//! ```rust
//! use instill::{
//!     Arguments, Constructible, DeferredService, InstantiationService, ServiceCollection,
//!     ServiceIdentifier, StdError, SyncDescriptor,
//! };
//! use std::sync::Arc;
//!
//! trait Index: Send + Sync {
//!     fn lookup(&self, key: &str) -> Option<usize>;
//! }
//!
//! struct FullIndex;
//!
//! impl Index for FullIndex {
//!     fn lookup(&self, key: &str) -> Option<usize> {
//!         Some(key.len())
//!     }
//! }
//!
//! impl Index for DeferredService<Arc<dyn Index>> {
//!     fn lookup(&self, key: &str) -> Option<usize> {
//!         self.try_get().ok()?.lookup(key)
//!     }
//! }
//!
//! impl Constructible for FullIndex {
//!     type Handle = Arc<dyn Index>;
//!
//!     fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
//!         Ok(Arc::new(FullIndex))
//!     }
//!
//!     fn deferred(service: DeferredService<Self::Handle>) -> Option<Self::Handle> {
//!         Some(Arc::new(service))
//!     }
//! }
//!
//! static INDEX: ServiceIdentifier<Arc<dyn Index>> = ServiceIdentifier::new("index");
//!
//! let services = ServiceCollection::new()
//!     .with_descriptor(&INDEX, SyncDescriptor::new::<FullIndex>().delayed());
//! let service = InstantiationService::new(services);
//! let index = service
//!     .invoke_function(|accessor| accessor.get(&INDEX))
//!     .unwrap();
//! assert_eq!(index.lookup("four"), Some(4));
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::{ServiceId, StdError};

type Producer<T> = Box<dyn FnOnce() -> T + Send>;

/// A value computed at most once, on first access.
pub struct DeferredValue<T> {
    cell: Lazy<T, Producer<T>>,
}

impl<T> DeferredValue<T> {
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            cell: Lazy::new(Box::new(producer)),
        }
    }

    /// Returns the value, running the producer if this is the first access.
    pub fn get(&self) -> &T {
        Lazy::force(&self.cell)
    }

    /// Returns `true` once the producer has run.
    pub fn is_materialized(&self) -> bool {
        Lazy::get(&self.cell).is_some()
    }
}

impl<T> fmt::Debug for DeferredValue<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Lazy::get(&self.cell) {
            Some(v) => f.debug_tuple("DeferredValue").field(v).finish(),
            None => f.write_str("DeferredValue(<pending>)"),
        }
    }
}

/// A service whose constructor has not run yet.
///
/// Clones share the same underlying value.
pub struct DeferredService<H> {
    value: Arc<DeferredValue<Result<H, StdError>>>,
    service: ServiceId,
    constructor: &'static str,
}

impl<H> DeferredService<H> {
    pub(crate) fn new<F>(service: ServiceId, constructor: &'static str, producer: F) -> Self
    where
        F: FnOnce() -> Result<H, StdError> + Send + 'static,
    {
        Self {
            value: Arc::new(DeferredValue::new(move || {
                tracing::debug!(%service, constructor, "Materializing deferred service");
                producer()
            })),
            service,
            constructor,
        }
    }

    /// Returns the service, constructing it on first access.
    ///
    /// # Panics
    ///
    /// Panics if the constructor failed. Use [`try_get`](Self::try_get) to
    /// observe the error instead.
    pub fn get(&self) -> &H {
        match self.try_get() {
            Ok(v) => v,
            Err(err) => panic!(
                "Deferred construction of service {} ({}) failed: {err}",
                self.service, self.constructor,
            ),
        }
    }

    pub fn try_get(&self) -> Result<&H, &StdError> {
        self.value.get().as_ref()
    }

    pub fn is_materialized(&self) -> bool {
        self.value.is_materialized()
    }

    /// Identifier the service was registered under.
    pub fn service(&self) -> ServiceId {
        self.service
    }

    pub fn constructor(&self) -> &'static str {
        self.constructor
    }
}

impl<H> Clone for DeferredService<H> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            service: self.service,
            constructor: self.constructor,
        }
    }
}

impl<H> fmt::Debug for DeferredService<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredService")
            .field("service", &self.service)
            .field("constructor", &self.constructor)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
