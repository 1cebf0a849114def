//! # Registry
//!
//! [`PropCache`] maps each registered type to its [`PropsRecord`] and runs
//! purge and serialization filtering for instances by their type.
//!
//! An application normally owns one `PropCache`, built at startup and handed
//! to whatever needs to purge or snapshot instances. [`PropCache::global`]
//! provides a process-wide instance for code that cannot thread one through.
//!
//! # Examples
//!
//! ```rust
//! use propcache_core::{AttrCache, AttrSlot, HasAttrCache, PropCache, TypeDecl, TypeKey};
//!
//! struct Report {
//!     cache: AttrCache,
//! }
//!
//! impl HasAttrCache for Report {
//!     fn attr_cache(&self) -> &AttrCache {
//!         &self.cache
//!     }
//! }
//!
//! const TOTALS: u64 = 0b01;
//! let totals = AttrSlot::new("totals", TOTALS);
//!
//! let registry = PropCache::new();
//! registry.register_decl(TypeKey::of::<Report>(), TypeDecl::new().slot(totals.clone()));
//!
//! let report = Report { cache: AttrCache::new() };
//! totals.get_or_compute(&report, || 10_u64);
//!
//! assert_eq!(registry.purge_by_flag(&report, TOTALS).unwrap(), 1);
//! assert!(!totals.is_cached(&report));
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    GetState, HasAttrCache, LazyMembers, PropCacheError, PropsDecl, PropsRecord, Result, StateMap,
    TypeDecl, TypeKey,
};

static GLOBAL_REGISTRY: Lazy<PropCache> = Lazy::new(PropCache::new);

/// Registry of metadata records, one per registered type.
///
/// Entries are only ever added or replaced, never removed. Registering a type
/// again replaces its record: the new record is built from scratch and
/// nothing of the old one is merged.
pub struct PropCache {
    records: RwLock<HashMap<TypeKey, Arc<PropsRecord>>>,
}

impl PropCache {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Get the process-wide registry
    pub fn global() -> &'static PropCache {
        &GLOBAL_REGISTRY
    }

    /// Registers `T` from the declarations generated by the macros.
    ///
    /// Parents named by `T` must be registered first for their slots and
    /// exclusions to be inherited.
    pub fn register<T>(&self) -> Arc<PropsRecord>
    where
        T: PropsDecl + LazyMembers + 'static,
    {
        self.register_decl(TypeKey::of::<T>(), TypeDecl::from_type::<T>())
    }

    /// Registers a type from a hand-built declaration.
    pub fn register_decl(&self, key: TypeKey, decl: TypeDecl) -> Arc<PropsRecord> {
        // Built before taking the write lock: building reads parent records.
        let record = Arc::new(PropsRecord::build(key, &decl, self));

        tracing::debug!(
            type_name = key.name(),
            slots = record.slots().len(),
            excluded = record.excluded_attrs().len(),
            "registered type"
        );

        let previous = self.records.write().insert(key, Arc::clone(&record));
        if previous.is_some() {
            tracing::debug!(type_name = key.name(), "replaced existing record");
        }
        record
    }

    /// Returns the record for `T`, failing if `T` was never registered.
    pub fn record_for<T: ?Sized + 'static>(&self) -> Result<Arc<PropsRecord>> {
        self.record_for_key(&TypeKey::of::<T>())
    }

    pub fn record_for_key(&self, key: &TypeKey) -> Result<Arc<PropsRecord>> {
        self.try_record_for_key(key)
            .ok_or(PropCacheError::NotRegistered {
                type_name: key.name(),
            })
    }

    pub fn try_record_for<T: ?Sized + 'static>(&self) -> Option<Arc<PropsRecord>> {
        self.try_record_for_key(&TypeKey::of::<T>())
    }

    pub fn try_record_for_key(&self, key: &TypeKey) -> Option<Arc<PropsRecord>> {
        self.records.read().get(key).cloned()
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.records.read().contains_key(&TypeKey::of::<T>())
    }

    /// Resets every lazy attribute of `instance`.
    ///
    /// Returns the number of stored values removed.
    pub fn purge_all<T>(&self, instance: &T) -> Result<usize>
    where
        T: HasAttrCache + 'static,
    {
        Ok(self.record_for::<T>()?.purge_all(instance))
    }

    /// Resets the lazy attributes of `instance` whose flags share a bit with `flags`.
    pub fn purge_by_flag<T>(&self, instance: &T, flags: u64) -> Result<usize>
    where
        T: HasAttrCache + 'static,
    {
        Ok(self.record_for::<T>()?.purge_by_flag(instance, flags))
    }

    /// Removes the lazy and excluded attribute names of `T` from `state`.
    pub fn filter_for_serialization<T>(&self, _instance: &T, state: &mut StateMap) -> Result<()>
    where
        T: 'static,
    {
        self.record_for::<T>()?.filter_for_serialization(state);
        Ok(())
    }

    /// Serialized state of `instance` with lazy and excluded attributes removed.
    pub fn snapshot<T>(&self, instance: &T) -> Result<StateMap>
    where
        T: GetState + 'static,
    {
        self.record_for::<T>()?.snapshot(instance)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn registered_types(&self) -> Vec<TypeKey> {
        self.records.read().keys().copied().collect()
    }
}

impl Default for PropCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PropCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropCache")
            .field("records", &self.len())
            .finish()
    }
}
