use thiserror::Error;

use crate::ServiceId;

/// Type alias for boxed errors that can be sent across threads.
///
/// Constructors report their own failures with this type; the engine wraps
/// them into [`InstantiationError::Construction`].
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving or constructing services.
///
/// Every variant aborts only the operation that raised it. The resolver and its
/// service collection stay usable afterwards.
#[derive(Debug, Error)]
pub enum InstantiationError {
    /// The dependency closure of a service could not be drained.
    ///
    /// `cycle` names one offending path when the graph contains a concrete
    /// cycle; `graph` renders every node that was still pending.
    #[error("cyclic dependency between services{}\n{graph}", cycle_suffix(cycle))]
    CyclicDependency {
        cycle: Option<String>,
        graph: String,
    },
    /// A required dependency has no entry anywhere up the resolver chain.
    #[error("{dependent} depends on UNKNOWN service {service}")]
    UnknownRequiredService {
        dependent: String,
        service: ServiceId,
    },
    /// A services accessor was used after its invocation returned.
    #[error("service accessor is only valid during the invocation of its target method")]
    AccessorExpired,
    /// The resolver tree reached an inconsistent state.
    #[error("illegal state: {0}")]
    IllegalState(String),
    /// A registered value does not have the handle type its identifier declares.
    #[error("service {service} is not a {expected}")]
    TypeMismatch {
        service: ServiceId,
        expected: &'static str,
    },
    /// A constructor returned an error.
    #[error("cannot construct {constructor}: {source}")]
    Construction {
        constructor: &'static str,
        #[source]
        source: StdError,
    },
}

fn cycle_suffix(cycle: &Option<String>) -> String {
    match cycle {
        Some(cycle) => format!(": {cycle}"),
        None => String::new(),
    }
}
