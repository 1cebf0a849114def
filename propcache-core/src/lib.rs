//! # Propcache Core
//!
//! Core types for the Propcache library: lazily computed, per-instance
//! attributes that can be purged selectively and kept out of serialized
//! snapshots.
//!
//! ## Features
//!
//! - **Lazy attributes**: computed on first read, stored on the instance
//! - **Flag-based purging**: group attributes with a bitmask and reset a group
//! - **Serialization filtering**: drop lazy and excluded attributes from state
//! - **Explicit inheritance**: records merge the metadata of registered parents
//! - **Statistics**: per-slot hit/miss/reset counters (`stats` feature)
//!
//! ## Module Organization
//!
//! - [`attr_cache`] - Per-instance storage of computed values
//! - [`slot`] - Lazy attribute slots and their factories
//! - [`marker`] - The `Unserialized` marker and attribute annotations
//! - [`decl`] - What a type declares at definition time
//! - [`record`] - Per-type metadata records
//! - [`registry`] - The type to record registry
//!
pub mod attr_cache;
pub mod decl;
mod error;
pub mod marker;
pub mod record;
pub mod registry;
pub mod slot;
mod state;

#[cfg(feature = "stats")]
mod stats;

pub use attr_cache::{AttrCache, HasAttrCache};
pub use decl::{LazyMembers, PropsDecl, TypeDecl, TypeKey};
pub use error::{PropCacheError, Result};
pub use marker::{Annotation, Unserialized};
pub use record::PropsRecord;
pub use registry::PropCache;
pub use slot::{
    lazy_attribute, lazy_attribute_with_flags, AttrSlot, LazyAttr, LazyAttrFactory, SlotId,
};
pub use state::{default_state, GetState, StateMap};

#[cfg(feature = "stats")]
pub use stats::SlotStats;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
