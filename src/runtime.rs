//! Type-erased object model for lifecycle hooks
//!
//! Admission pipelines hand hooks whatever object they decoded. Hooks accept
//! a `&dyn Object` and narrow it to the concrete kind they handle, failing
//! with [`Error::TypeMismatch`] when the object is something else.

use std::any::Any;
use std::borrow::Cow;

use kube::Resource;

use crate::{Error, Result};

/// An object a lifecycle hook can be handed
pub trait Object: Any + Send + Sync {
    /// Kind of the concrete object (e.g., "ConfigMap")
    fn kind(&self) -> Cow<'_, str>;

    /// Borrow as `Any` for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as `Any` for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K> Object for K
where
    K: Resource<DynamicType = ()> + Any + Send + Sync,
{
    fn kind(&self) -> Cow<'_, str> {
        <K as Resource>::kind(&())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Narrow `obj` to `K`, naming `argument` in the error when it is not one
pub fn downcast_ref<'a, K>(obj: &'a dyn Object, argument: &str) -> Result<&'a K>
where
    K: Resource<DynamicType = ()> + 'static,
{
    let actual = obj.kind().into_owned();
    obj.as_any()
        .downcast_ref::<K>()
        .ok_or_else(|| Error::type_mismatch(argument, <K as Resource>::kind(&()), actual))
}

/// Mutable counterpart of [`downcast_ref`]
pub fn downcast_mut<'a, K>(obj: &'a mut dyn Object, argument: &str) -> Result<&'a mut K>
where
    K: Resource<DynamicType = ()> + 'static,
{
    let actual = obj.kind().into_owned();
    obj.as_any_mut()
        .downcast_mut::<K>()
        .ok_or_else(|| Error::type_mismatch(argument, <K as Resource>::kind(&()), actual))
}
