use crate::{ServiceId, ServiceIdentifier};

/// A service consumed through a constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructorDependency {
    pub id: ServiceId,
    /// Position of the parameter in the constructor argument list.
    pub index: usize,
    pub optional: bool,
}

/// A service consumed through a named property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDependency {
    pub id: ServiceId,
    pub key: &'static str,
    pub optional: bool,
}

/// Declares the services a constructible type needs.
///
/// This is the static registration table of a type: the resolver only ever
/// queries it, it never inspects how the table was produced.
///
/// # Examples
///
/// ```rust
/// use instill::{Dependencies, ServiceIdentifier};
/// use std::sync::Arc;
///
/// struct Storage;
/// struct Clock;
///
/// static STORAGE: ServiceIdentifier<Arc<Storage>> = ServiceIdentifier::new("storage");
/// static CLOCK: ServiceIdentifier<Arc<Clock>> = ServiceIdentifier::new("clock");
///
/// // One fixed argument at position 0, then the injected services.
/// let deps = Dependencies::new()
///     .parameter(&STORAGE, 1)
///     .optional_parameter(&CLOCK, 2);
///
/// assert_eq!(deps.constructor().len(), 2);
/// assert_eq!(deps.constructor()[0].index, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    constructor: Vec<ConstructorDependency>,
    properties: Vec<PropertyDependency>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required service at constructor parameter `index`.
    pub fn parameter<H>(self, id: &'static ServiceIdentifier<H>, index: usize) -> Self {
        self.with_parameter(id.id(), index, false)
    }

    /// Adds an optional service at constructor parameter `index`.
    pub fn optional_parameter<H>(self, id: &'static ServiceIdentifier<H>, index: usize) -> Self {
        self.with_parameter(id.id(), index, true)
    }

    /// Adds a required service assigned to the property `key`.
    pub fn property<H>(self, id: &'static ServiceIdentifier<H>, key: &'static str) -> Self {
        self.with_property(id.id(), key, false)
    }

    /// Adds an optional service assigned to the property `key`.
    pub fn optional_property<H>(self, id: &'static ServiceIdentifier<H>, key: &'static str) -> Self {
        self.with_property(id.id(), key, true)
    }

    pub fn with_parameter(mut self, id: ServiceId, index: usize, optional: bool) -> Self {
        let dependency = ConstructorDependency {
            id,
            index,
            optional,
        };
        let position = self.constructor.partition_point(|v| v.index <= index);
        self.constructor.insert(position, dependency);
        self
    }

    pub fn with_property(mut self, id: ServiceId, key: &'static str, optional: bool) -> Self {
        self.properties.push(PropertyDependency { id, key, optional });
        self
    }

    /// Merges another dependencies set into this one.
    pub fn merge(mut self, other: Dependencies) -> Self {
        for dependency in other.constructor {
            self = self.with_parameter(dependency.id, dependency.index, dependency.optional);
        }
        self.properties.extend(other.properties);
        self
    }

    /// Constructor dependencies, sorted by parameter index.
    pub fn constructor(&self) -> &[ConstructorDependency] {
        &self.constructor
    }

    pub fn properties(&self) -> &[PropertyDependency] {
        &self.properties
    }

    /// Every service this set refers to, constructor dependencies first.
    pub fn services(&self) -> impl Iterator<Item = (ServiceId, bool)> + '_ {
        self.constructor
            .iter()
            .map(|v| (v.id, v.optional))
            .chain(self.properties.iter().map(|v| (v.id, v.optional)))
    }

    pub fn is_empty(&self) -> bool {
        self.constructor.is_empty() && self.properties.is_empty()
    }
}
