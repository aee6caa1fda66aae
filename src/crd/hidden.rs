//! Shared string map backing the hidden side channel

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Handle to a string map that is never serialized
///
/// Cloning the handle aliases the map: an insert through one clone is visible
/// through every other. Use [`SharedFields::deep_clone`] for an independent
/// copy.
#[derive(Clone, Debug, Default)]
pub struct SharedFields(Arc<RwLock<BTreeMap<String, String>>>);

impl SharedFields {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.0.read().clone()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.0.read().get(key).cloned()
    }

    /// Insert or overwrite one entry
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.0.write().insert(key.into(), value.into());
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether both handles point at the same map
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Independent copy of the map
    pub fn deep_clone(&self) -> Self {
        Self::from(self.snapshot())
    }
}

impl From<BTreeMap<String, String>> for SharedFields {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self(Arc::new(RwLock::new(fields)))
    }
}

impl<K, V> FromIterator<(K, V)> for SharedFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<BTreeMap<_, _>>(),
        )
    }
}

impl PartialEq for SharedFields {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.read() == *other.0.read()
    }
}
