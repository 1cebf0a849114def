//! # Type Declarations
//!
//! What a type declares about itself at definition time: its own lazy
//! attribute slots, the declared types of its attributes, the attributes it
//! explicitly excludes from serialization, and the parent types whose
//! metadata it inherits.
//!
//! The macros implement [`LazyMembers`] (from `#[cached_props]`) and
//! [`PropsDecl`] (from `#[derive(PropCache)]`). Without macros, build a
//! [`TypeDecl`] by hand and pass it to `PropCache::register_decl`.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Annotation, AttrSlot, LazyAttr};

/// Identifies a registered type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Lazy attribute slots a type declares itself.
///
/// Generated by `#[cached_props]` on an impl block. Inherited slots are not
/// listed here; they come from the parents' records.
pub trait LazyMembers {
    fn lazy_slots() -> Vec<AttrSlot> {
        Vec::new()
    }
}

/// Field-level declarations of a type.
///
/// Generated by `#[derive(PropCache)]`.
pub trait PropsDecl {
    /// Declared attribute types, by attribute name.
    fn annotations() -> Vec<(&'static str, Annotation)> {
        Vec::new()
    }

    /// Attributes excluded from serialization regardless of their type.
    fn excluded_attrs() -> Vec<&'static str> {
        Vec::new()
    }

    /// Parent types to inherit slots and exclusions from, in order.
    fn parents() -> Vec<TypeKey> {
        Vec::new()
    }
}

/// Everything a metadata record is built from.
///
/// # Examples
///
/// ```
/// use propcache_core::{Annotation, AttrSlot, TypeDecl, Unserialized};
///
/// struct Base;
///
/// let decl = TypeDecl::new()
///     .slot(AttrSlot::new("area", 0b01))
///     .annotate("scratch", Annotation::of::<Unserialized>())
///     .exclude("token")
///     .parent::<Base>();
///
/// assert_eq!(decl.own_slots().len(), 1);
/// assert_eq!(decl.annotations().len(), 1);
/// assert_eq!(decl.excluded(), ["token".to_string()]);
/// assert_eq!(decl.parents().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeDecl {
    slots: Vec<AttrSlot>,
    annotations: Vec<(String, Annotation)>,
    excluded: Vec<String>,
    parents: Vec<TypeKey>,
}

impl TypeDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the declarations `T` made through the macros or trait impls.
    pub fn from_type<T>() -> Self
    where
        T: PropsDecl + LazyMembers,
    {
        let mut decl = Self::new().slots(T::lazy_slots());
        for (name, annotation) in T::annotations() {
            decl = decl.annotate(name, annotation);
        }
        for name in T::excluded_attrs() {
            decl = decl.exclude(name);
        }
        for key in T::parents() {
            decl = decl.parent_key(key);
        }
        decl
    }

    pub fn slot(mut self, slot: AttrSlot) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn slots(mut self, slots: impl IntoIterator<Item = AttrSlot>) -> Self {
        self.slots.extend(slots);
        self
    }

    /// Declares the slot of a [`LazyAttr`].
    pub fn lazy<T: ?Sized, R>(self, attr: &LazyAttr<T, R>) -> Self {
        self.slot(attr.slot().clone())
    }

    pub fn annotate(mut self, name: impl Into<String>, annotation: Annotation) -> Self {
        self.annotations.push((name.into(), annotation));
        self
    }

    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded.push(name.into());
        self
    }

    pub fn parent<P: ?Sized + 'static>(self) -> Self {
        self.parent_key(TypeKey::of::<P>())
    }

    pub fn parent_key(mut self, key: TypeKey) -> Self {
        self.parents.push(key);
        self
    }

    pub fn own_slots(&self) -> &[AttrSlot] {
        &self.slots
    }

    pub fn annotations(&self) -> &[(String, Annotation)] {
        &self.annotations
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn parents(&self) -> &[TypeKey] {
        &self.parents
    }
}
