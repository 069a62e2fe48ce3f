//! daxbase - structured errors plus a transaction-scoped resource coordinator
//!
//! This crate provides two tightly coupled facilities:
//!
//! - [`DaxError`], a structured, diagnosable error value carrying a typed
//!   reason, named situational fields, an optional causal chain, creation
//!   provenance, and a pluggable sync/async notification side-channel
//!   ([`notify`]).
//! - [`DaxBase`], a per-transaction coordinator that lazily opens, caches,
//!   and uniformly commits / rolls back / closes a set of named, pluggable
//!   resource connections, aggregating per-resource failures without
//!   short-circuiting.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daxbase::{DaxBase, DaxConn, DaxError, DaxSrc};
//!
//! struct MemDaxSrc;
//!
//! struct MemDaxConn;
//!
//! impl DaxConn for MemDaxConn {
//!     fn commit(&mut self) -> Result<(), DaxError> { Ok(()) }
//!     fn rollback(&mut self) {}
//!     fn close(&mut self) {}
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
//! }
//!
//! impl DaxSrc for MemDaxSrc {
//!     fn create_dax_conn(&self) -> Result<Box<dyn DaxConn>, DaxError> {
//!         Ok(Box::new(MemDaxConn))
//!     }
//! }
//!
//! let mut base = DaxBase::new();
//! base.add_local_dax_src("mem", MemDaxSrc);
//! base.begin();
//! let _conn = base.dax_conn("mem")?;
//! base.commit()?;
//! base.close();
//! # Ok::<(), daxbase::DaxError>(())
//! ```

// Error model
pub mod error;

// Failure-observer side-channel
pub mod notify;

// Coordinator, registries, capability contracts
pub mod dax;

pub use dax::{
    add_global_dax_src, global_dax_src_registry, seal_global_dax_srcs, Dax, DaxBase, DaxConn,
    DaxReason, DaxSrc, DaxSrcRegistry, TypedDax,
};
pub use error::{DaxError, ErrReason};
pub use notify::{
    add_async_err_handler, add_sync_err_handler, err_handler_registry, seal_err_handlers,
    ErrHandler, ErrHandlerRegistry,
};
