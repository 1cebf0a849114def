//! # Serialization Exclusion
//!
//! [`Unserialized`] marks attributes that must never appear in a serialized
//! snapshot of an instance. It is only ever named in type declarations and
//! is never built as a value.
//!
//! Declared attribute types are described by [`Annotation`]; a record
//! excludes every attribute whose annotation refers to the marker.
//!
//! ```rust
//! use propcache_core::{Annotation, Unserialized};
//! use std::any::TypeId;
//!
//! assert!(Annotation::text("Option<Unserialized>").marks_excluded());
//! assert!(Annotation::of::<Unserialized>().marks_excluded());
//! assert!(Annotation::union([TypeId::of::<u32>(), TypeId::of::<Unserialized>()]).marks_excluded());
//! assert!(!Annotation::of::<u32>().marks_excluded());
//!
//! assert!(Unserialized::new().is_err());
//! ```

use std::any::TypeId;
use std::borrow::Cow;

use crate::{PropCacheError, Result};

/// Type-level marker: "exclude this attribute from serialized state".
///
/// The private field keeps it from being built outside this crate, and
/// [`Unserialized::new`] always fails.
#[derive(Debug)]
pub struct Unserialized {
    _private: (),
}

impl Unserialized {
    /// Name matched against textual annotations.
    pub const NAME: &'static str = "Unserialized";

    /// Always returns [`PropCacheError::MarkerInstantiation`].
    pub fn new() -> Result<Self> {
        Err(PropCacheError::MarkerInstantiation { marker: Self::NAME })
    }
}

/// The declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Source text of the declared type, as written (e.g. by `stringify!`).
    Text(Cow<'static, str>),
    /// A type that may be any of several member types.
    Union(Vec<TypeId>),
    /// A single concrete type.
    Type(TypeId),
}

impl Annotation {
    pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
        Annotation::Text(text.into())
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Annotation::Type(TypeId::of::<T>())
    }

    pub fn union(members: impl IntoIterator<Item = TypeId>) -> Self {
        Annotation::Union(members.into_iter().collect())
    }

    /// Whether this annotation designates an attribute excluded from serialization.
    ///
    /// Text matches when [`Unserialized::NAME`] appears as a whole identifier,
    /// so `Option<Unserialized>` and `u32 | propcache::Unserialized` match
    /// while `NotUnserialized` does not. Text that is not a type at all is
    /// simply not recognized.
    pub fn marks_excluded(&self) -> bool {
        let marker = TypeId::of::<Unserialized>();
        match self {
            Annotation::Text(text) => text
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .any(|token| token == Unserialized::NAME),
            Annotation::Union(members) => members.contains(&marker),
            Annotation::Type(id) => *id == marker,
        }
    }
}
