//! # Lazy Attribute Slots
//!
//! A slot names one lazily computed attribute. The first read of the
//! attribute on an instance computes the value and stores it in the
//! instance's [`AttrCache`]; later reads return the stored value until the
//! slot is reset for that instance.
//!
//! - [`AttrSlot`] is the type-erased slot: name, flags bitmask and identity.
//!   It is what metadata records hold and what `#[cached]` methods use.
//! - [`LazyAttr`] pairs a slot with its computation function for use
//!   without the macros.
//!
//! # Examples
//!
//! ```rust
//! use propcache_core::{AttrCache, HasAttrCache, LazyAttr};
//!
//! struct Circle {
//!     radius: f64,
//!     cache: AttrCache,
//! }
//!
//! impl HasAttrCache for Circle {
//!     fn attr_cache(&self) -> &AttrCache {
//!         &self.cache
//!     }
//! }
//!
//! fn area(circle: &Circle) -> f64 {
//!     std::f64::consts::PI * circle.radius * circle.radius
//! }
//!
//! let area_attr = LazyAttr::new(area);
//! assert_eq!(area_attr.name(), "area");
//!
//! let circle = Circle { radius: 1.0, cache: AttrCache::new() };
//! let first = area_attr.compute_or_fetch(&circle);
//! assert_eq!(area_attr.compute_or_fetch(&circle), first);
//! assert!(area_attr.reset(&circle));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{AttrCache, HasAttrCache};

#[cfg(feature = "stats")]
use crate::SlotStats;

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    fn next() -> Self {
        SlotId(NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

struct SlotInner {
    id: SlotId,
    name: &'static str,
    flags: u64,
    #[cfg(feature = "stats")]
    stats: SlotStats,
}

/// A lazily computed attribute, identified by object identity.
///
/// Cloning an `AttrSlot` produces another handle to the same slot. Two slots
/// created separately are never equal, even when they share a name.
///
/// # Examples
///
/// ```
/// use propcache_core::{AttrCache, AttrSlot};
///
/// let slot = AttrSlot::new("answer", 0b01);
/// let cache = AttrCache::new();
///
/// assert_eq!(slot.get_or_compute(&cache, || 42), 42);
/// // stored: the computation is not run again
/// let again: i32 = slot.get_or_compute(&cache, || unreachable!());
/// assert_eq!(again, 42);
///
/// assert!(slot.matches(0b11));
/// assert!(!slot.matches(0b10));
/// assert_eq!(slot.to_string(), "<AttrSlot flags=1 attr=answer>");
/// ```
#[derive(Clone)]
pub struct AttrSlot {
    inner: Arc<SlotInner>,
}

impl AttrSlot {
    pub fn new(name: &'static str, flags: u64) -> Self {
        Self {
            inner: Arc::new(SlotInner {
                id: SlotId::next(),
                name,
                flags,
                #[cfg(feature = "stats")]
                stats: SlotStats::new(),
            }),
        }
    }

    pub fn id(&self) -> SlotId {
        self.inner.id
    }

    /// The attribute name values are stored under.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn flags(&self) -> u64 {
        self.inner.flags
    }

    /// Whether this slot's flags share at least one bit with `flags`.
    ///
    /// A slot with flags `0` never matches.
    #[inline]
    pub fn matches(&self, flags: u64) -> bool {
        self.inner.flags & flags != 0
    }

    /// Returns the stored value for `instance`, computing and storing it first if absent.
    ///
    /// The computation runs without any lock held. Two threads reading the
    /// same absent attribute on a shared instance may both compute; the value
    /// stored last is kept.
    pub fn get_or_compute<T, R, F>(&self, instance: &T, compute: F) -> R
    where
        T: HasAttrCache + ?Sized,
        R: Clone + Send + Sync + 'static,
        F: FnOnce() -> R,
    {
        let cache: &AttrCache = instance.attr_cache();
        if let Some(value) = cache.get::<R>(self.name()) {
            #[cfg(feature = "stats")]
            self.inner.stats.record_hit();
            return value;
        }

        #[cfg(feature = "stats")]
        self.inner.stats.record_miss();
        tracing::trace!(attr = self.name(), flags = self.flags(), "computing lazy attribute");

        let value = compute();
        cache.insert(self.name(), value.clone());
        value
    }

    /// Removes the stored value from `instance`.
    ///
    /// Returns `true` if a value was removed. Resetting an attribute that was
    /// never computed, or was already reset, does nothing.
    pub fn reset<T>(&self, instance: &T) -> bool
    where
        T: HasAttrCache + ?Sized,
    {
        let removed = instance.attr_cache().remove(self.name());
        #[cfg(feature = "stats")]
        if removed {
            self.inner.stats.record_reset();
        }
        removed
    }

    pub fn is_cached<T>(&self, instance: &T) -> bool
    where
        T: HasAttrCache + ?Sized,
    {
        instance.attr_cache().contains(self.name())
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &SlotStats {
        &self.inner.stats
    }
}

impl PartialEq for AttrSlot {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for AttrSlot {}

impl Hash for AttrSlot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for AttrSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<AttrSlot flags={} attr={}>", self.flags(), self.name())
    }
}

impl fmt::Debug for AttrSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A slot bound to the function that computes it.
///
/// # Type Parameters
///
/// * `T` - The instance type the function reads
/// * `R` - The computed value type. Reads return clones, so wrap large
///   values in an `Arc`
pub struct LazyAttr<T: ?Sized, R> {
    slot: AttrSlot,
    compute: Box<dyn Fn(&T) -> R + Send + Sync>,
}

impl<T: ?Sized, R> LazyAttr<T, R> {
    /// Wraps `compute` with flags `0`, naming the attribute after the function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        Self::with_flags(0, compute)
    }

    /// Wraps `compute` with the given flags, naming the attribute after the function.
    ///
    /// Closures have no usable name; use [`LazyAttr::named_with_flags`] for them.
    pub fn with_flags<F>(flags: u64, compute: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        Self::named_with_flags(function_name::<F>(), flags, compute)
    }

    pub fn named<F>(name: &'static str, compute: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        Self::named_with_flags(name, 0, compute)
    }

    pub fn named_with_flags<F>(name: &'static str, flags: u64, compute: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        Self {
            slot: AttrSlot::new(name, flags),
            compute: Box::new(compute),
        }
    }

    pub fn slot(&self) -> &AttrSlot {
        &self.slot
    }

    pub fn name(&self) -> &'static str {
        self.slot.name()
    }

    pub fn flags(&self) -> u64 {
        self.slot.flags()
    }
}

impl<T, R> LazyAttr<T, R>
where
    T: HasAttrCache + ?Sized,
    R: Clone + Send + Sync + 'static,
{
    /// Returns the stored value, or computes it from `instance` and stores it.
    pub fn compute_or_fetch(&self, instance: &T) -> R {
        self.slot
            .get_or_compute(instance, || (self.compute)(instance))
    }

    pub fn reset(&self, instance: &T) -> bool {
        self.slot.reset(instance)
    }

    pub fn is_cached(&self, instance: &T) -> bool {
        self.slot.is_cached(instance)
    }
}

impl<T: ?Sized, R> fmt::Debug for LazyAttr<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyAttr").field("slot", &self.slot).finish()
    }
}

/// Builds lazy attributes that all carry the same flags.
///
/// Returned by [`lazy_attribute_with_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LazyAttrFactory {
    flags: u64,
}

impl LazyAttrFactory {
    pub fn flags(&self) -> u64 {
        self.flags
    }

    pub fn wrap<T, R, F>(self, compute: F) -> LazyAttr<T, R>
    where
        T: ?Sized,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        LazyAttr::with_flags(self.flags, compute)
    }

    pub fn named<T, R, F>(self, name: &'static str, compute: F) -> LazyAttr<T, R>
    where
        T: ?Sized,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        LazyAttr::named_with_flags(name, self.flags, compute)
    }
}

/// Wraps a function as a lazy attribute with flags `0`.
pub fn lazy_attribute<T, R, F>(compute: F) -> LazyAttr<T, R>
where
    T: ?Sized,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    LazyAttr::new(compute)
}

/// Returns a factory producing lazy attributes with `flags`.
///
/// # Examples
///
/// ```
/// use propcache_core::{lazy_attribute_with_flags, AttrCache};
///
/// const GEOMETRY: u64 = 0b01;
///
/// fn perimeter(_cache: &AttrCache) -> u32 {
///     4
/// }
///
/// let attr = lazy_attribute_with_flags(GEOMETRY).wrap(perimeter);
/// assert_eq!(attr.name(), "perimeter");
/// assert_eq!(attr.flags(), GEOMETRY);
/// ```
pub fn lazy_attribute_with_flags(flags: u64) -> LazyAttrFactory {
    LazyAttrFactory { flags }
}

/// Attribute name for a function item: the last path segment of its type name.
///
/// `app::shapes::area` and `<app::Circle as app::Shape>::area` both give
/// `area`; generic arguments are dropped.
fn function_name<F>() -> &'static str {
    let full = std::any::type_name::<F>();
    let name = strip_generics(last_segment(full));
    if name.is_empty() || name.contains('{') {
        tracing::warn!(
            type_name = full,
            "lazy attribute wraps a closure; name it explicitly to avoid attribute name clashes"
        );
        return full;
    }
    name
}

fn last_segment(path: &'static str) -> &'static str {
    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    &path[start..]
}

fn strip_generics(segment: &'static str) -> &'static str {
    match segment.find('<') {
        Some(idx) => &segment[..idx],
        None => segment,
    }
}
