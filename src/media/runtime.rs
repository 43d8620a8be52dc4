//! Explicit media runtime handle.
//!
//! Created once by the entry point and cloned into whatever builds
//! pipelines.  It carries the element [`Registry`] and the tokio handle that
//! network elements run their I/O on.  After [`MediaRuntime::shutdown`] no
//! new plan can be built and no new run can start.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use super::description::PipelineDescription;
use super::error::ConstructionError;
use super::plan::Plan;
use super::registry::Registry;

struct Inner {
    handle: Handle,
    registry: Arc<Registry>,
    closed: AtomicBool,
}

/// Cheap-to-clone runtime handle.
///
/// ```rust,no_run
/// use pipeplay::media::{MediaRuntime, Registry};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let media = MediaRuntime::new(rt.handle().clone(), Registry::with_defaults());
/// // … build and run pipelines …
/// media.shutdown();
/// ```
#[derive(Clone)]
pub struct MediaRuntime {
    inner: Arc<Inner>,
}

impl MediaRuntime {
    pub fn new(handle: Handle, registry: Registry) -> Self {
        Self {
            inner: Arc::new(Inner {
                handle,
                registry: Arc::new(registry),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Runtime with the bundled elements.
    pub fn with_defaults(handle: Handle) -> Self {
        Self::new(handle, Registry::with_defaults())
    }

    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Refuse further builds and starts.  Runs already in progress are left
    /// to their owners.
    pub fn shutdown(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            log::debug!("media: runtime shut down");
        }
    }

    /// Validate a description against this runtime's registry.
    pub fn plan(&self, description: &PipelineDescription) -> Result<Plan, ConstructionError> {
        if self.is_closed() {
            return Err(ConstructionError::RuntimeClosed);
        }
        Plan::build(&self.inner.registry, description)
    }
}

impl std::fmt::Debug for MediaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaRuntime")
            .field("registry", &self.inner.registry)
            .field("closed", &self.is_closed())
            .finish()
    }
}
