use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use tracing::debug;

use crate::error::Error;

static GLOBAL: LazyLock<Arc<InstanceRegistry>> = LazyLock::new(InstanceRegistry::new);

/// Tracks which single-instance clients are live.
///
/// The process-wide registry is [`InstanceRegistry::global`]; tests and
/// embedders that need isolated clients can create their own.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    live: Mutex<HashSet<&'static str>>,
}

impl InstanceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Register a live instance of `kind`. Fails with
    /// [`Error::DuplicateInstance`] while another one holds its guard.
    pub fn acquire(self: &Arc<Self>, kind: &'static str) -> Result<InstanceGuard, Error> {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        if !live.insert(kind) {
            return Err(Error::DuplicateInstance { backend: kind });
        }
        debug!(kind, "instance registered");
        Ok(InstanceGuard {
            registry: Arc::clone(self),
            kind,
        })
    }

    pub fn is_live(&self, kind: &str) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(kind)
    }
}

/// Registration of one live instance; released on drop.
#[derive(Debug)]
pub struct InstanceGuard {
    registry: Arc<InstanceRegistry>,
    kind: &'static str,
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.registry
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.kind);
        debug!(kind = self.kind, "instance released");
    }
}
