use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Descriptor, Instance, InstantiationError, ServiceId, ServiceIdentifier, SyncDescriptor};

/// Value registered for a service identifier.
#[derive(Clone, Debug)]
pub enum ServiceEntry {
    /// A materialized service.
    Instance(Instance),
    /// A recipe that has not been materialized yet.
    Descriptor(Descriptor),
}

impl ServiceEntry {
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(v) => Some(v),
            Self::Descriptor(_) => None,
        }
    }

    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match self {
            Self::Instance(_) => None,
            Self::Descriptor(v) => Some(v),
        }
    }
}

impl From<Instance> for ServiceEntry {
    fn from(value: Instance) -> Self {
        Self::Instance(value)
    }
}

impl From<Descriptor> for ServiceEntry {
    fn from(value: Descriptor) -> Self {
        Self::Descriptor(value)
    }
}

/// Ordered registry of services.
///
/// A collection is a shared handle: clones refer to the same entries, so a
/// collection handed to a resolver can still be populated afterwards.
/// Entries are kept sorted by identifier label.
///
/// # Examples
///
/// ```rust
/// use instill::{ServiceCollection, ServiceIdentifier};
///
/// static PORT: ServiceIdentifier<u16> = ServiceIdentifier::new("port");
///
/// let services = ServiceCollection::new().with_instance(&PORT, 8080);
/// assert!(services.has(PORT.id()));
/// assert_eq!(services.get_instance(&PORT).unwrap(), Some(8080));
/// ```
#[derive(Clone, Default)]
pub struct ServiceCollection {
    entries: Arc<RwLock<Vec<(ServiceId, ServiceEntry)>>>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `id`, returning the previous one.
    pub fn set(&self, id: ServiceId, entry: impl Into<ServiceEntry>) -> Option<ServiceEntry> {
        let entry = entry.into();
        let mut entries = self.entries.write();
        match entries.binary_search_by(|(k, _)| k.cmp(&id)) {
            Ok(pos) => Some(std::mem::replace(&mut entries[pos].1, entry)),
            Err(pos) => {
                entries.insert(pos, (id, entry));
                None
            }
        }
    }

    pub fn get(&self, id: ServiceId) -> Option<ServiceEntry> {
        let entries = self.entries.read();
        entries
            .binary_search_by(|(k, _)| k.cmp(&id))
            .ok()
            .map(|pos| entries[pos].1.clone())
    }

    pub fn has(&self, id: ServiceId) -> bool {
        let entries = self.entries.read();
        entries.binary_search_by(|(k, _)| k.cmp(&id)).is_ok()
    }

    /// Visits every entry in label order.
    ///
    /// The visitor sees a snapshot, so it may modify this collection.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(ServiceId, &ServiceEntry),
    {
        let snapshot = self.entries.read().clone();
        for (id, entry) in &snapshot {
            visitor(*id, entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn set_instance<H>(&self, id: &'static ServiceIdentifier<H>, instance: H) -> Option<ServiceEntry>
    where
        H: Send + Sync + 'static,
    {
        self.set(id.id(), Instance::new(instance))
    }

    pub fn set_descriptor<H>(
        &self,
        id: &'static ServiceIdentifier<H>,
        descriptor: SyncDescriptor<H>,
    ) -> Option<ServiceEntry> {
        self.set(id.id(), Descriptor::from(descriptor))
    }

    /// Returns the materialized instance for `id`, if there is one.
    ///
    /// Entries that are still descriptors yield `Ok(None)`.
    pub fn get_instance<H>(&self, id: &'static ServiceIdentifier<H>) -> Result<Option<H>, InstantiationError>
    where
        H: Clone + 'static,
    {
        match self.get(id.id()) {
            Some(ServiceEntry::Instance(instance)) => match instance.downcast() {
                Some(v) => Ok(Some(v)),
                None => Err(InstantiationError::TypeMismatch {
                    service: id.id(),
                    expected: std::any::type_name::<H>(),
                }),
            },
            _ => Ok(None),
        }
    }

    pub fn with_instance<H>(self, id: &'static ServiceIdentifier<H>, instance: H) -> Self
    where
        H: Send + Sync + 'static,
    {
        self.set_instance(id, instance);
        self
    }

    pub fn with_descriptor<H>(self, id: &'static ServiceIdentifier<H>, descriptor: SyncDescriptor<H>) -> Self {
        self.set_descriptor(id, descriptor);
        self
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}
