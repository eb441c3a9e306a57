//! # instill
//!
//! A dependency resolution and instantiation engine. Services are registered
//! under typed identifiers, either as ready instances or as descriptors that
//! say how to construct them. The resolver materializes descriptors on demand,
//! supplying each constructor with the services it declares, and rejects
//! cyclic registrations before any constructor runs.
//!
//! ## Core Concepts
//!
//! - **ServiceIdentifier**: a typed token naming a service contract
//! - **Constructible**: a type the resolver knows how to build, with its declared dependencies
//! - **SyncDescriptor**: a not yet materialized recipe (constructible + fixed arguments)
//! - **ServiceCollection**: the registry mapping identifiers to instances or descriptors
//! - **InstantiationService**: the resolver; supports child scopes sharing their ancestors' services
//! - **ServicesAccessor**: scoped access to services during `invoke_function`
//!
//! ## Basic Usage
//!
//! ```rust
//! use instill::{
//!     Arguments, Constructible, Dependencies, InstantiationService, ServiceCollection,
//!     ServiceIdentifier, StdError, SyncDescriptor, args,
//! };
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: &str) -> String {
//!         format!("Hello, {name}!")
//!     }
//! }
//!
//! impl Constructible for English {
//!     type Handle = Arc<dyn Greeter>;
//!
//!     fn construct(_args: Arguments) -> Result<Self::Handle, StdError> {
//!         Ok(Arc::new(English))
//!     }
//! }
//!
//! static GREETER: ServiceIdentifier<Arc<dyn Greeter>> = ServiceIdentifier::new("greeter");
//!
//! struct Welcome {
//!     name: String,
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! impl Constructible for Welcome {
//!     type Handle = Arc<Self>;
//!
//!     fn dependencies() -> Dependencies {
//!         Dependencies::new().parameter(&GREETER, 1)
//!     }
//!
//!     fn construct(args: Arguments) -> Result<Self::Handle, StdError> {
//!         Ok(Arc::new(Self {
//!             name: args.require(0)?,
//!             greeter: args.require(1)?,
//!         }))
//!     }
//! }
//!
//! let services = ServiceCollection::new()
//!     .with_descriptor(&GREETER, SyncDescriptor::new::<English>());
//! let service = InstantiationService::new(services);
//!
//! let welcome = service
//!     .create_instance::<Welcome>(args!["world".to_string()])
//!     .unwrap();
//! assert_eq!(welcome.greeter.greet(&welcome.name), "Hello, world!");
//! ```
//!
//! ## Using Macros
//!
//! With the `macros` feature enabled, the declaration table is generated:
//!
//! ```rust
//! use instill::{Injectable, InstantiationService, ServiceCollection, ServiceIdentifier, args};
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! static CLOCK: ServiceIdentifier<Arc<Clock>> = ServiceIdentifier::new("clock");
//!
//! #[derive(Injectable)]
//! struct Scheduler {
//!     name: String,
//!     #[inject(CLOCK)]
//!     clock: Arc<Clock>,
//! }
//!
//! let services = ServiceCollection::new().with_instance(&CLOCK, Arc::new(Clock));
//! let service = InstantiationService::new(services);
//! let scheduler = service
//!     .create_instance::<Scheduler>(args!["nightly".to_string()])
//!     .unwrap();
//! assert_eq!(scheduler.name, "nightly");
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables `#[derive(Injectable)]` and `#[injectable]`

mod accessor;
mod collection;
mod constructible;
mod defer;
mod deferred;
mod dependencies;
mod descriptor;
mod error;
mod extensions;
mod graph;
mod identifier;
mod instance;
mod instantiation;
mod trace;

pub use accessor::*;
pub use collection::*;
pub use constructible::*;
pub use deferred::*;
pub use dependencies::*;
pub use descriptor::*;
pub use error::*;
pub use extensions::*;
pub use graph::*;
pub use identifier::*;
pub use instance::*;
pub use instantiation::{
    DEFAULT_CYCLE_LIMIT, INSTANTIATION_SERVICE, InstantiationHandle, InstantiationOptions,
    InstantiationService,
};

#[cfg(feature = "macros")]
pub use instill_macros::*;
