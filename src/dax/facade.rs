//! Typed accessor layer over a [`Dax`] capability.

use std::any::type_name;
use std::marker::PhantomData;

use super::base::Dax;
use super::DaxConn;
use crate::error::DaxError;

/// A thin façade fixing the expected connection variant at construction
/// time.
///
/// `conn` resolves through the wrapped capability, propagates any resolution
/// failure unchanged, and downcasts the connection to `C`. A variant
/// mismatch means the façade author mapped a name to the wrong concrete
/// connection — a programmer error — and panics rather than being modeled
/// as a recoverable error.
pub struct TypedDax<D, C> {
    dax: D,
    _conn: PhantomData<fn() -> C>,
}

impl<D: Dax, C: DaxConn> TypedDax<D, C> {
    pub fn new(dax: D) -> Self {
        Self {
            dax,
            _conn: PhantomData,
        }
    }

    /// Resolves the connection for `name` as a `&mut C`.
    ///
    /// # Panics
    ///
    /// If the resolved connection is not a `C`.
    pub fn conn(&mut self, name: &str) -> Result<&mut C, DaxError> {
        let conn = self.dax.dax_conn(name)?;
        match conn.as_any_mut().downcast_mut::<C>() {
            Some(conn) => Ok(conn),
            None => panic!(
                "dax connection `{}` is not a {}",
                name,
                type_name::<C>()
            ),
        }
    }

    /// Hands back the wrapped capability.
    pub fn into_inner(self) -> D {
        self.dax
    }
}
