use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::instantiation::downcast_service;
use crate::trace::Trace;
use crate::{InstantiationError, InstantiationService, ServiceIdentifier};

/// Scoped access to services, handed to [`InstantiationService::invoke_function`].
///
/// An accessor is only valid while the function it was handed to runs. Clones
/// share that validity, so keeping one around does not extend it.
#[derive(Clone)]
pub struct ServicesAccessor {
    service: InstantiationService,
    trace: Trace,
    function: &'static str,
    done: Arc<AtomicBool>,
}

impl ServicesAccessor {
    pub(crate) fn new(service: InstantiationService, trace: Trace, function: &'static str) -> Self {
        Self {
            service,
            trace,
            function,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn expire(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Returns the service registered for `id`, materializing it if needed.
    pub fn get<H>(&self, id: &'static ServiceIdentifier<H>) -> Result<H, InstantiationError>
    where
        H: Clone + 'static,
    {
        self.get_optional(id)?
            .ok_or_else(|| InstantiationError::UnknownRequiredService {
                dependent: self.function.to_string(),
                service: id.id(),
            })
    }

    /// Like [`get`](Self::get), but a missing service yields `Ok(None)`.
    pub fn get_optional<H>(&self, id: &'static ServiceIdentifier<H>) -> Result<Option<H>, InstantiationError>
    where
        H: Clone + 'static,
    {
        if self.done.load(Ordering::Acquire) {
            return Err(InstantiationError::AccessorExpired);
        }
        let id = id.id();
        match self.service.get_or_create_service_instance(id, &self.trace)? {
            Some(instance) => downcast_service(id, &instance).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for ServicesAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicesAccessor")
            .field("function", &self.function)
            .field("done", &self.done.load(Ordering::Acquire))
            .finish()
    }
}
