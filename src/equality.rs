//! Semantic equality registry
//!
//! Reconcilers decide whether an update is a no-op by comparing the old and
//! new revision of a record. Types whose structural equality is too strict
//! (for example because they carry data that is not part of their declared
//! identity) register a predicate here, and [`Equalities::deep_equal`] uses it
//! in place of `PartialEq`.

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::{Error, Result};

type EqualityFn = Arc<dyn Fn(&dyn Any, &dyn Any) -> bool + Send + Sync>;

/// Registry of per-type equality predicates
///
/// Predicates are registered once at startup and read for the rest of the
/// process lifetime. The registry is safe to share between threads.
#[derive(Default)]
pub struct Equalities {
    funcs: DashMap<TypeId, (&'static str, EqualityFn)>,
}

impl Equalities {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the equality predicate for `T`
    ///
    /// Fails if `T` already has a predicate.
    pub fn add_func<T, F>(&self, f: F) -> Result<()>
    where
        T: 'static,
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let name = type_name::<T>();
        match self.funcs.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => Err(Error::registration(format!(
                "equality function for {name} already registered"
            ))),
            Entry::Vacant(slot) => {
                let erased: EqualityFn = Arc::new(move |a: &dyn Any, b: &dyn Any| {
                    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                        (Some(a), Some(b)) => f(a, b),
                        _ => false,
                    }
                });
                slot.insert((name, erased));
                debug!(type_name = name, "registered equality function");
                Ok(())
            }
        }
    }

    /// Whether `T` has a registered predicate
    pub fn has_func<T: 'static>(&self) -> bool {
        self.funcs.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered predicates
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Whether no predicates are registered
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Compare two values, preferring the registered predicate for `T`
    pub fn deep_equal<T>(&self, a: &T, b: &T) -> bool
    where
        T: PartialEq + 'static,
    {
        // Clone the predicate out so the shard lock is not held while it runs;
        // predicates may call back into the registry.
        let func = self
            .funcs
            .get(&TypeId::of::<T>())
            .map(|entry| Arc::clone(&entry.value().1));
        match func {
            Some(func) => func(a, b),
            None => a == b,
        }
    }
}

impl std::fmt::Debug for Equalities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&'static str> = self.funcs.iter().map(|e| e.value().0).collect();
        names.sort_unstable();
        f.debug_struct("Equalities").field("funcs", &names).finish()
    }
}
