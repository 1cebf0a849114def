use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type StoredValue = Arc<dyn Any + Send + Sync>;

/// Per-instance storage for computed lazy attribute values.
///
/// Every value a slot computes for an instance is kept here under the
/// slot's attribute name, so the next read of that attribute on the same
/// instance returns the stored value instead of computing again.
///
/// Values are stored type-erased. A read that asks for a different type than
/// the one stored under a name behaves as if nothing were stored.
///
/// The lock is only held for the duration of a single lookup, insert or
/// removal, never while a value is being computed.
///
/// # Examples
///
/// ```
/// use propcache_core::AttrCache;
///
/// let cache = AttrCache::new();
/// cache.insert("area", 12.5_f64);
///
/// assert_eq!(cache.get::<f64>("area"), Some(12.5));
/// assert_eq!(cache.get::<u32>("area"), None);
///
/// assert!(cache.remove("area"));
/// assert!(!cache.remove("area"));
/// ```
#[derive(Default)]
pub struct AttrCache {
    values: RwLock<HashMap<&'static str, StoredValue>>,
}

impl AttrCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the value stored under `name`, if one of type `R` is present.
    pub fn get<R>(&self, name: &str) -> Option<R>
    where
        R: Clone + 'static,
    {
        let values = self.values.read();
        values
            .get(name)
            .and_then(|value| value.downcast_ref::<R>())
            .cloned()
    }

    /// Stores `value` under `name`, replacing whatever was stored before.
    pub fn insert<R>(&self, name: &'static str, value: R)
    where
        R: Send + Sync + 'static,
    {
        self.values.write().insert(name, Arc::new(value));
    }

    /// Removes the value stored under `name`.
    ///
    /// Returns `true` if a value was present.
    pub fn remove(&self, name: &str) -> bool {
        self.values.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Names of the attributes currently stored, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.values.read().keys().copied().collect();
        names.sort_unstable();
        names
    }

}

/// Copies the stored entries. Values are shared with the original.
impl Clone for AttrCache {
    fn clone(&self) -> Self {
        Self {
            values: RwLock::new(self.values.read().clone()),
        }
    }
}

impl fmt::Debug for AttrCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrCache")
            .field("cached", &self.names())
            .finish()
    }
}

/// Gives lazy attribute slots access to an instance's [`AttrCache`].
///
/// Usually generated by `#[derive(PropCache)]`. A type that embeds a parent
/// type can return the parent's cache, so the parent's lazy attributes and
/// its own are stored (and purged) together.
///
/// Not implemented for references or smart pointers: registry lookups key on
/// the implementing type, so `Arc<T>` and `&T` reach `T` through auto-deref.
pub trait HasAttrCache {
    fn attr_cache(&self) -> &AttrCache;
}

impl HasAttrCache for AttrCache {
    fn attr_cache(&self) -> &AttrCache {
        self
    }
}
