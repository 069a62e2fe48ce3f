//! The per-transaction coordinator.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use super::registry::{global_dax_src_registry, DaxSrcRegistry};
use super::{DaxConn, DaxReason, DaxSrc};
use crate::error::DaxError;

/// The "resolve a connection by name" capability.
///
/// [`DaxBase`] implements it; [`TypedDax`](super::TypedDax) wraps anything
/// that does.
pub trait Dax {
    fn dax_conn(&mut self, name: &str) -> Result<&mut dyn DaxConn, DaxError>;
}

impl<T: Dax + ?Sized> Dax for &mut T {
    fn dax_conn(&mut self, name: &str) -> Result<&mut dyn DaxConn, DaxError> {
        (**self).dax_conn(name)
    }
}

/// Transaction-scoped owner of a local source registry and a lazily grown
/// connection cache.
///
/// One `DaxBase` per transaction, used by one owner at a time; the `&mut
/// self` operations make that structural. Lifecycle: construct, add local
/// sources, [`begin`](DaxBase::begin) (seals the global and local
/// registries), resolve connections on demand, then
/// [`commit`](DaxBase::commit) or [`rollback`](DaxBase::rollback), and
/// finally [`close`](DaxBase::close).
pub struct DaxBase {
    global: Arc<DaxSrcRegistry>,
    local: HashMap<String, Arc<dyn DaxSrc>>,
    local_sealed: bool,
    conns: HashMap<String, Box<dyn DaxConn>>,
}

impl DaxBase {
    /// A coordinator resolving through the process-wide source registry.
    pub fn new() -> Self {
        Self::with_registry(global_dax_src_registry())
    }

    /// A coordinator resolving through an explicitly provided registry
    /// instead of the process-wide one.
    pub fn with_registry(global: Arc<DaxSrcRegistry>) -> Self {
        Self {
            global,
            local: HashMap::new(),
            local_sealed: false,
            conns: HashMap::new(),
        }
    }

    /// Registers a transaction-local source. Local entries shadow global
    /// entries with the same name. Overwrites while unsealed; silently
    /// ignored once [`begin`](DaxBase::begin) has sealed the local registry.
    pub fn add_local_dax_src(&mut self, name: impl Into<String>, src: impl DaxSrc + 'static) {
        if self.local_sealed {
            return;
        }
        self.local.insert(name.into(), Arc::new(src));
    }

    /// Begins the transaction, sealing both the global registry and this
    /// instance's local registry. Idempotent.
    pub fn begin(&mut self) {
        self.global.seal();
        if !self.local_sealed {
            self.local_sealed = true;
            debug!("local dax source registry sealed");
        }
    }

    /// Resolves the connection for `name`, creating and caching it on first
    /// use.
    ///
    /// A cached connection is never recreated or replaced. Failed
    /// resolutions are never cached, so a retry for the same name can
    /// succeed once the missing registration is added or the underlying
    /// fault is fixed.
    pub fn dax_conn(&mut self, name: &str) -> Result<&mut dyn DaxConn, DaxError> {
        match self.conns.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_mut()),
            Entry::Vacant(entry) => {
                let src = self
                    .local
                    .get(name)
                    .cloned()
                    .or_else(|| self.global.lookup(name))
                    .ok_or_else(|| {
                        DaxError::new(DaxReason::DaxSrcIsNotFound {
                            name: name.to_string(),
                        })
                    })?;
                let conn = src.create_dax_conn().map_err(|cause| {
                    DaxError::with_cause(
                        DaxReason::FailToCreateDaxConn {
                            name: name.to_string(),
                        },
                        cause,
                    )
                })?;
                Ok(entry.insert(conn).as_mut())
            }
        }
    }

    /// Commits every cached connection, unconditionally — no short-circuit
    /// on failure and no implicit rollback of already-committed siblings.
    ///
    /// Success iff every connection committed; otherwise
    /// [`DaxReason::FailToCommitDaxConn`] carrying exactly the failing
    /// `(name, error)` pairs. Iteration order is unspecified.
    pub fn commit(&mut self) -> Result<(), DaxError> {
        let mut errors = BTreeMap::new();
        for (name, conn) in self.conns.iter_mut() {
            if let Err(err) = conn.commit() {
                errors.insert(name.clone(), err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            warn!(
                failed = errors.len(),
                cached = self.conns.len(),
                "some dax connections failed to commit"
            );
            Err(DaxError::new(DaxReason::FailToCommitDaxConn { errors }))
        }
    }

    /// Rolls back every cached connection, unconditionally, in unspecified
    /// order. Rollback cannot fail by contract.
    pub fn rollback(&mut self) {
        for conn in self.conns.values_mut() {
            conn.rollback();
        }
    }

    /// Closes every cached connection, unconditionally, in unspecified
    /// order.
    pub fn close(&mut self) {
        for conn in self.conns.values_mut() {
            conn.close();
        }
    }

    pub fn local_src_count(&self) -> usize {
        self.local.len()
    }

    pub fn cached_conn_count(&self) -> usize {
        self.conns.len()
    }

    pub fn is_local_sealed(&self) -> bool {
        self.local_sealed
    }
}

impl Default for DaxBase {
    fn default() -> Self {
        Self::new()
    }
}

impl Dax for DaxBase {
    fn dax_conn(&mut self, name: &str) -> Result<&mut dyn DaxConn, DaxError> {
        DaxBase::dax_conn(self, name)
    }
}
