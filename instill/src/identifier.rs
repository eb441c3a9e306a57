use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Identifies a service contract whose handle type is `H`.
///
/// Identifiers are meant to be declared once per contract as a `static`. Two
/// identifiers are equal only when they are the same static, even if their
/// labels match; the label is used for diagnostics and ordering.
///
/// # Examples
///
/// ```rust
/// use instill::ServiceIdentifier;
/// use std::sync::Arc;
///
/// trait Storage: Send + Sync {}
///
/// static STORAGE: ServiceIdentifier<Arc<dyn Storage>> = ServiceIdentifier::new("storage");
///
/// assert_eq!(STORAGE.id().label(), "storage");
/// ```
pub struct ServiceIdentifier<H> {
    label: &'static str,
    _marker: PhantomData<fn() -> H>,
}

impl<H> ServiceIdentifier<H> {
    /// Creates an identifier with the given diagnostic label.
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            _marker: PhantomData,
        }
    }

    /// Creates an identifier at runtime.
    ///
    /// The identifier is leaked, so this should be called once per contract.
    pub fn leak(label: impl Into<String>) -> &'static Self {
        let label: &'static str = Box::leak(label.into().into_boxed_str());
        Box::leak(Box::new(Self::new(label)))
    }

    /// Returns the untyped view of this identifier.
    pub fn id(&'static self) -> ServiceId {
        ServiceId {
            label: self.label,
            key: self as *const Self as *const () as usize,
        }
    }

    /// Returns the diagnostic label.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<H> fmt::Debug for ServiceIdentifier<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceIdentifier")
            .field(&self.label)
            .finish()
    }
}

/// Untyped service identifier.
///
/// Equality and hashing use the identity of the originating
/// [`ServiceIdentifier`]. Ordering is by label first, so collections keyed by
/// `ServiceId` enumerate in label order.
#[derive(Clone, Copy)]
pub struct ServiceId {
    label: &'static str,
    key: usize,
}

impl ServiceId {
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ServiceId {}

impl Hash for ServiceId {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.key.hash(state);
    }
}

impl PartialOrd for ServiceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label
            .cmp(other.label)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({})", self.label)
    }
}
