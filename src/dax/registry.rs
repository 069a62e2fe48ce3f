//! Name → source registries with one-way seal latches.
//!
//! A [`DaxSrcRegistry`] is an ordinary value; the process-wide registry used
//! by [`DaxBase::new`](super::DaxBase::new) is a singleton over the same
//! type, intended for long-lived sources registered once during a
//! non-concurrent startup phase.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::debug;

use super::DaxSrc;

/// A name → [`DaxSrc`] mapping behind a one-way seal.
///
/// Names are opaque, case-sensitive keys, unique within one registry. Adding
/// while unsealed inserts-or-overwrites; adding once sealed is a no-op.
#[derive(Default)]
pub struct DaxSrcRegistry {
    srcs: Mutex<HashMap<String, Arc<dyn DaxSrc>>>,
    sealed: AtomicBool,
}

impl DaxSrcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `src` under `name`. Overwrites an unsealed existing entry;
    /// silently ignored once the registry is sealed.
    pub fn add(&self, name: impl Into<String>, src: impl DaxSrc + 'static) {
        self.add_shared(name.into(), Arc::new(src));
    }

    pub(crate) fn add_shared(&self, name: String, src: Arc<dyn DaxSrc>) {
        if self.is_sealed() {
            return;
        }
        self.lock_srcs().insert(name, src);
    }

    /// Seals the registry. Idempotent and permanent; there is no production
    /// unseal.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            debug!("dax source registry sealed");
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn DaxSrc>> {
        self.lock_srcs().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_srcs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_srcs().is_empty()
    }

    fn lock_srcs(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn DaxSrc>>> {
        self.srcs.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Reversing a seal is a test-only affordance, never part of the contract.
    #[cfg(test)]
    pub(crate) fn unseal_for_test(&self) {
        self.sealed.store(false, Ordering::Release);
    }
}

static GLOBAL_DAX_SRCS: OnceLock<Arc<DaxSrcRegistry>> = OnceLock::new();

/// The process-wide source registry.
pub fn global_dax_src_registry() -> Arc<DaxSrcRegistry> {
    GLOBAL_DAX_SRCS
        .get_or_init(|| Arc::new(DaxSrcRegistry::new()))
        .clone()
}

/// Registers a source in the process-wide registry.
pub fn add_global_dax_src(name: impl Into<String>, src: impl DaxSrc + 'static) {
    global_dax_src_registry().add(name, src);
}

/// Seals the process-wide registry. Idempotent and permanent.
pub fn seal_global_dax_srcs() {
    global_dax_src_registry().seal();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dax::DaxConn;
    use crate::error::DaxError;

    #[derive(Debug)]
    struct NullDaxSrc;

    struct NullDaxConn;

    impl DaxConn for NullDaxConn {
        fn commit(&mut self) -> Result<(), DaxError> {
            Ok(())
        }

        fn rollback(&mut self) {}

        fn close(&mut self) {}

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    impl DaxSrc for NullDaxSrc {
        fn create_dax_conn(&self) -> Result<Box<dyn DaxConn>, DaxError> {
            Ok(Box::new(NullDaxConn))
        }
    }

    #[test]
    fn add_inserts_and_overwrites_while_unsealed() {
        let registry = DaxSrcRegistry::new();
        assert!(registry.is_empty());

        registry.add("foo", NullDaxSrc);
        registry.add("bar", NullDaxSrc);
        assert_eq!(registry.len(), 2);

        registry.add("foo", NullDaxSrc);
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("foo").is_some());
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn names_are_case_sensitive() {
        let registry = DaxSrcRegistry::new();
        registry.add("Foo", NullDaxSrc);
        assert!(registry.lookup("Foo").is_some());
        assert!(registry.lookup("foo").is_none());
    }

    #[test]
    fn adding_after_seal_never_changes_size() {
        let registry = DaxSrcRegistry::new();
        registry.add("foo", NullDaxSrc);

        registry.seal();
        registry.seal(); // idempotent
        assert!(registry.is_sealed());

        registry.add("bar", NullDaxSrc);
        assert_eq!(registry.len(), 1);

        registry.unseal_for_test();
        registry.add("bar", NullDaxSrc);
        assert_eq!(registry.len(), 2);
    }
}
