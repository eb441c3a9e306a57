use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// A type-erased shared value.
///
/// Materialized services are stored as instances, and so are the fixed
/// arguments of a descriptor. Cloning an instance shares the underlying value.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// A fixed constructor argument.
pub type Argument = Instance;

impl Instance {
    pub fn new<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Returns a clone of the value if it is a `T`.
    pub fn downcast<T>(&self) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.downcast_ref().cloned()
    }

    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        self.value.downcast_ref()
    }

    pub fn is<T>(&self) -> bool
    where
        T: 'static,
    {
        self.value.is::<T>()
    }

    /// Returns `true` if both instances share the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_name)
    }
}

/// Builds a list of fixed constructor arguments.
///
/// ```rust
/// use instill::args;
///
/// let args = args![true, "name".to_string()];
/// assert_eq!(args.len(), 2);
/// assert_eq!(args[0].downcast::<bool>(), Some(true));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Argument>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Argument::new($value)),+]
    };
}
