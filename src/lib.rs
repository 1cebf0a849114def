//! # Propcache
//!
//! Lazily computed, per-instance attributes for Rust types, with flag-based
//! purging and serialization filtering.
//!
//! ## Features
//!
//! - **Compute once**: a `#[cached]` method runs on its first call per instance
//!   and returns the stored value afterwards
//! - **Selective purging**: tag lazy attributes with a flags bitmask and reset
//!   only the attributes whose flags match
//! - **Serialization filtering**: lazy attributes and attributes marked as
//!   excluded never appear in a snapshot of an instance
//! - **Explicit inheritance**: a type lists its parent types and inherits the
//!   metadata of those already registered
//!
//! ## Quick Start
//!
//! The generated code refers to `propcache_core` and `once_cell`, so both
//! must be dependencies of the crate using the macros.
//!
//! ```rust
//! use propcache::{cached_props, AttrCache, CachedExt, PropCache};
//! use serde::Serialize;
//!
//! const GEOMETRY: u64 = 0b01;
//! const LABELS: u64 = 0b10;
//!
//! #[derive(Serialize, PropCache)]
//! #[propcache(lazy, serde)]
//! struct Rect {
//!     w: f64,
//!     h: f64,
//!     #[propcache(exclude)]
//!     debug_name: String,
//!     #[serde(skip)]
//!     cache: AttrCache,
//! }
//!
//! #[cached_props]
//! impl Rect {
//!     #[cached(GEOMETRY)]
//!     fn area(&self) -> f64 {
//!         self.w * self.h
//!     }
//!
//!     #[cached(flags = LABELS)]
//!     fn label(&self) -> String {
//!         format!("{}x{}", self.w, self.h)
//!     }
//! }
//!
//! let registry = PropCache::new();
//! registry.register::<Rect>();
//!
//! let rect = Rect { w: 2.0, h: 3.0, debug_name: "r1".into(), cache: AttrCache::new() };
//! assert_eq!(rect.area(), 6.0);
//! assert_eq!(rect.label(), "2x3");
//!
//! // only the GEOMETRY group is reset
//! assert_eq!(rect.purge_cached_by_flag_in(&registry, GEOMETRY).unwrap(), 1);
//! assert!(!Rect::area_slot().is_cached(&rect));
//! assert!(Rect::label_slot().is_cached(&rect));
//!
//! let state = rect.cached_snapshot_in(&registry).unwrap();
//! assert!(state.contains_key("w"));
//! assert!(!state.contains_key("debug_name"));
//! ```
//!
//! ## Inheritance
//!
//! Rust has no class inheritance, so parents are declared explicitly with
//! `#[propcache(parents(..))]`. A child that embeds its parent can point
//! `#[propcache(cache)]` at the parent field to share the parent's cache,
//! so purging the child also purges the parent's lazy attributes. With
//! `#[propcache(serde)]`, that field must also be `#[serde(flatten)]`:
//! filtering removes top-level attributes only, so the parent's attributes
//! have to be serialized at the child's level for its exclusions to apply.
//!
//! Registration order matters: a parent must be registered before its
//! children for its metadata to be inherited.

pub use propcache_core::*;
pub use propcache_macros::{cached, cached_props, PropCache};

/// Purge and snapshot operations on any instance with an `AttrCache`.
///
/// The plain methods use [`PropCache::global`]; the `_in` variants take an
/// explicit registry. Every method fails with
/// [`PropCacheError::NotRegistered`] when the instance's type was never
/// registered with that registry.
///
/// Lookups use the instance's own type. Calling these through an `Arc<T>`,
/// `Box<T>` or `&T` reaches `T` by auto-deref.
pub trait CachedExt: HasAttrCache + Sized + 'static {
    /// Resets every lazy attribute of `self` in the global registry.
    fn purge_cached(&self) -> Result<usize> {
        self.purge_cached_in(PropCache::global())
    }

    fn purge_cached_in(&self, registry: &PropCache) -> Result<usize> {
        registry.purge_all(self)
    }

    /// Resets the lazy attributes of `self` whose flags share a bit with `flags`.
    fn purge_cached_by_flag(&self, flags: u64) -> Result<usize> {
        self.purge_cached_by_flag_in(PropCache::global(), flags)
    }

    fn purge_cached_by_flag_in(&self, registry: &PropCache, flags: u64) -> Result<usize> {
        registry.purge_by_flag(self, flags)
    }

    /// Serialized state of `self` without its lazy and excluded attributes.
    fn cached_snapshot(&self) -> Result<StateMap>
    where
        Self: GetState,
    {
        self.cached_snapshot_in(PropCache::global())
    }

    fn cached_snapshot_in(&self, registry: &PropCache) -> Result<StateMap>
    where
        Self: GetState,
    {
        registry.snapshot(self)
    }
}

impl<T: HasAttrCache + 'static> CachedExt for T {}
