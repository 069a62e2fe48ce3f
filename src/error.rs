//! Structured, diagnosable error values.
//!
//! A [`DaxError`] carries a typed *reason* (any [`ErrReason`] impl), the
//! reason's named fields harvested into an ordered *situation*, an optional
//! causal error for chain traversal, and the file/line where it was created.
//! Once constructed, none of these change.
//!
//! Constructing a failure value (via [`DaxError::new`] or
//! [`DaxError::with_cause`]) dispatches to the process-wide notification
//! registry in [`crate::notify`]; [`DaxError::ok`] never does.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use crate::notify;

/// A typed failure (or success) reason.
///
/// Each reason declares a stable name, its declaring module path (so
/// identically named reasons from different modules can be told apart), and
/// its situational fields in declaration order. Implementations are plain
/// data; the coordinator's built-in reasons live in [`crate::dax::DaxReason`]
/// and caller-defined reasons are treated identically.
pub trait ErrReason: fmt::Debug + Send + Sync + 'static {
    /// Stable name of the concrete reason variant, e.g. `"DaxSrcIsNotFound"`.
    fn name(&self) -> &'static str;

    /// Module path where the reason is declared (use `module_path!()`).
    fn module(&self) -> &'static str;

    /// Named situational fields, in declaration order.
    fn fields(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Downcast support for [`DaxError::reason`].
    fn as_any(&self) -> &dyn Any;
}

/// The success sentinel reason carried by [`DaxError::ok`].
#[derive(Debug)]
struct NoError;

impl ErrReason for NoError {
    fn name(&self) -> &'static str {
        "NoError"
    }

    fn module(&self) -> &'static str {
        module_path!()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An immutable, structured error value.
///
/// Cheap to clone (the reason and cause sit behind `Arc`s) and `Send + Sync`,
/// so it can cross into the asynchronous notification worker.
#[derive(Clone)]
pub struct DaxError {
    reason: Arc<dyn ErrReason>,
    situation: Vec<(&'static str, String)>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
    location: &'static Location<'static>,
}

impl DaxError {
    /// A success value; its reason is the `NoError` sentinel and no
    /// notification handler runs.
    #[track_caller]
    pub fn ok() -> Self {
        Self {
            reason: Arc::new(NoError),
            situation: Vec::new(),
            cause: None,
            location: Location::caller(),
        }
    }

    /// Builds a failure value from `reason`, capturing the immediate call
    /// site and dispatching to the sealed notification registry (if any).
    #[track_caller]
    pub fn new(reason: impl ErrReason) -> Self {
        Self::build(Arc::new(reason), None, Location::caller())
    }

    /// Like [`DaxError::new`], additionally retaining `cause` for chain
    /// traversal. The cause may be any error, including another `DaxError`.
    #[track_caller]
    pub fn with_cause(
        reason: impl ErrReason,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::build(Arc::new(reason), Some(Arc::new(cause)), Location::caller())
    }

    fn build(
        reason: Arc<dyn ErrReason>,
        cause: Option<Arc<dyn StdError + Send + Sync>>,
        location: &'static Location<'static>,
    ) -> Self {
        let situation = reason.fields();
        let err = Self {
            reason,
            situation,
            cause,
            location,
        };
        notify::err_handler_registry().notify(&err);
        err
    }

    /// True iff the reason is the success sentinel. Decided by type identity,
    /// so a caller-defined reason *named* `NoError` is still a failure.
    pub fn is_ok(&self) -> bool {
        self.reason.as_any().is::<NoError>()
    }

    /// Downcasts the reason to a concrete type for pattern matching.
    pub fn reason<R: ErrReason>(&self) -> Option<&R> {
        self.reason.as_any().downcast_ref::<R>()
    }

    /// Stable name of the reason variant.
    pub fn reason_name(&self) -> &'static str {
        self.reason.name()
    }

    /// Module path declaring the reason type.
    pub fn reason_module(&self) -> &'static str {
        self.reason.module()
    }

    /// The situation value for a named field, or `None` if unknown.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.situation
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The full situation, in field declaration order.
    pub fn situation(&self) -> &[(&'static str, String)] {
        &self.situation
    }

    /// The wrapped causal error, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Base name of the file where this value was created.
    pub fn file_name(&self) -> &'static str {
        Path::new(self.location.file())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(self.location.file())
    }

    /// Line number where this value was created.
    pub fn line_number(&self) -> u32 {
        self.location.line()
    }
}

impl fmt::Display for DaxError {
    /// The stable text contract:
    /// `{reason=<Name>[, field=value]*[, cause=<message>]}`, fields in
    /// declaration order, the cause clause last and only if present.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{reason={}", self.reason.name())?;
        for (name, value) in &self.situation {
            write!(f, ", {}={}", name, value)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ", cause={}", cause)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for DaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaxError")
            .field("reason", &self.reason)
            .field("situation", &self.situation)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .field(
                "at",
                &format_args!("{}:{}", self.file_name(), self.line_number()),
            )
            .finish()
    }
}

impl StdError for DaxError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn StdError + 'static))
    }
}
