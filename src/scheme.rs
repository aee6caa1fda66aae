//! Registry of known kinds
//!
//! Maps each `GroupVersionKind` to the Rust type that represents it, so
//! generic machinery can recognise objects and find the kind of a type.
//! Modelled as a `DashMap` so registration and lookups can happen from any
//! thread without a surrounding lock.

use std::any::{type_name, TypeId};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kube::core::GroupVersionKind;
use kube::Resource;
use tracing::debug;

use crate::{Error, Result};

/// A registered kind
#[derive(Clone, Debug)]
struct KnownType {
    type_id: TypeId,
    type_name: &'static str,
}

/// Registry of kinds known to the process
#[derive(Debug, Default)]
pub struct Scheme {
    types: DashMap<GroupVersionKind, KnownType>,
}

impl Scheme {
    /// Create an empty scheme
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type under its own group, version and kind
    pub fn add_known_type<K>(&self) -> Result<()>
    where
        K: Resource<DynamicType = ()> + 'static,
    {
        let gvk = GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()));
        self.add_known_type_as::<K>(gvk)
    }

    /// Register `T` under an explicit group, version and kind
    ///
    /// Used for types that are not resources themselves, such as lists.
    /// Fails if the kind is already registered.
    pub fn add_known_type_as<T: 'static>(&self, gvk: GroupVersionKind) -> Result<()> {
        match self.types.entry(gvk) {
            Entry::Occupied(existing) => Err(Error::registration(format!(
                "{} is already registered as {}",
                display_gvk(existing.key()),
                existing.get().type_name
            ))),
            Entry::Vacant(slot) => {
                debug!(
                    gvk = %display_gvk(slot.key()),
                    type_name = type_name::<T>(),
                    "registered known type"
                );
                slot.insert(KnownType {
                    type_id: TypeId::of::<T>(),
                    type_name: type_name::<T>(),
                });
                Ok(())
            }
        }
    }

    /// Whether `gvk` is registered
    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.types.contains_key(gvk)
    }

    /// Group, version and kind `T` was registered under
    pub fn kind_for<T: 'static>(&self) -> Option<GroupVersionKind> {
        let wanted = TypeId::of::<T>();
        self.types
            .iter()
            .find(|entry| entry.value().type_id == wanted)
            .map(|entry| entry.key().clone())
    }

    /// Whether `gvk` is registered for type `T`
    pub fn is_type<T: 'static>(&self, gvk: &GroupVersionKind) -> bool {
        self.types
            .get(gvk)
            .is_some_and(|known| known.type_id == TypeId::of::<T>())
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no kinds are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Render a GVK as `group/version, Kind=kind`
pub fn display_gvk(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        format!("{}, Kind={}", gvk.version, gvk.kind)
    } else {
        format!("{}/{}, Kind={}", gvk.group, gvk.version, gvk.kind)
    }
}
