//! Admission lifecycle hooks
//!
//! An admission pipeline defaults an object before it is persisted and asks
//! it to validate itself on create, update and delete. Resources take part by
//! implementing [`CustomDefaulter`] and [`CustomValidator`]; the pipeline owns
//! dispatch, the hooks narrow the object they are handed and reject anything
//! that is not their kind.
//!
//! [`review`] adapts `AdmissionRequest`s carrying dynamic objects onto these
//! hooks for one concrete kind.

pub mod review;

use crate::runtime::Object;
use crate::Result;

/// Non-fatal messages returned to the client alongside an admission decision
pub type Warnings = Vec<String>;

/// Defaulting hook run before an object is persisted
pub trait CustomDefaulter {
    /// Fill in defaults on `obj` in place
    ///
    /// Must be idempotent and must reject objects of another kind.
    fn apply_defaults(&self, obj: &mut dyn Object) -> Result<()>;
}

/// Validation hooks run before create, update and delete
pub trait CustomValidator {
    /// Validate an object about to be created
    fn validate_create(&self, obj: &dyn Object) -> Result<Warnings>;

    /// Validate the transition from `old_obj` to `new_obj`
    fn validate_update(&self, old_obj: &dyn Object, new_obj: &dyn Object) -> Result<Warnings>;

    /// Validate an object about to be deleted
    fn validate_delete(&self, obj: &dyn Object) -> Result<Warnings>;
}
