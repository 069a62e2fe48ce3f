//! Transaction-scoped coordination of named resource connections.
//!
//! A [`DaxBase`] lazily opens, caches, and uniformly commits / rolls back /
//! closes a set of named connections produced by pluggable [`DaxSrc`]
//! factories. Sources are resolved locally first, then through the shared
//! [`DaxSrcRegistry`], and each registry freezes behind a one-way seal when a
//! transaction begins.

pub mod base;
pub mod facade;
pub mod registry;

pub use base::{Dax, DaxBase};
pub use facade::TypedDax;
pub use registry::{
    add_global_dax_src, global_dax_src_registry, seal_global_dax_srcs, DaxSrcRegistry,
};

use std::any::Any;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::{DaxError, ErrReason};

/// A named, stateless factory producing one [`DaxConn`] per invocation.
///
/// The same source value may be asked to create connections repeatedly,
/// across distinct coordinators.
pub trait DaxSrc: Send + Sync {
    fn create_dax_conn(&self) -> Result<Box<dyn DaxConn>, DaxError>;
}

/// One opened resource session.
///
/// Commit may fail; rollback and close never do — failures there are only
/// observable through the notification side-channel, which fits their role
/// during cleanup and unwind.
pub trait DaxConn: Any {
    fn commit(&mut self) -> Result<(), DaxError>;

    fn rollback(&mut self);

    fn close(&mut self);

    /// Downcast seam for [`TypedDax`]. Implement as `{ self }`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The coordinator's built-in failure reasons.
#[derive(Debug, Error)]
pub enum DaxReason {
    /// No source is registered under the requested name, locally or globally.
    #[error("dax source `{name}` is not registered")]
    DaxSrcIsNotFound { name: String },

    /// The resolved source failed to create a connection; the underlying
    /// error travels as the cause of the wrapping [`DaxError`].
    #[error("failed to create a dax connection for `{name}`")]
    FailToCreateDaxConn { name: String },

    /// One or more cached connections failed to commit. Every connection was
    /// still asked to commit; `errors` holds exactly the failing ones.
    #[error("failed to commit one or more dax connections")]
    FailToCommitDaxConn { errors: BTreeMap<String, DaxError> },
}

impl ErrReason for DaxReason {
    fn name(&self) -> &'static str {
        match self {
            Self::DaxSrcIsNotFound { .. } => "DaxSrcIsNotFound",
            Self::FailToCreateDaxConn { .. } => "FailToCreateDaxConn",
            Self::FailToCommitDaxConn { .. } => "FailToCommitDaxConn",
        }
    }

    fn module(&self) -> &'static str {
        module_path!()
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::DaxSrcIsNotFound { name } | Self::FailToCreateDaxConn { name } => {
                vec![("name", name.clone())]
            }
            Self::FailToCommitDaxConn { errors } => {
                vec![("errors", format_commit_errors(errors))]
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Renders the per-name commit failures sorted by name, so the one-line
/// display stays deterministic even though commit iteration order is not.
fn format_commit_errors(errors: &BTreeMap<String, DaxError>) -> String {
    let entries: Vec<String> = errors
        .iter()
        .map(|(name, err)| format!("{}={}", name, err))
        .collect();
    format!("[{}]", entries.join(", "))
}
