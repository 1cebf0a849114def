//! # Per-Type Metadata Records
//!
//! A [`PropsRecord`] holds, for one registered type, every lazy attribute
//! slot reachable from it and every attribute name excluded from its
//! serialized state. Records are built once at registration and never
//! change afterwards.
//!
//! Records expose the purge and serialization filter operations directly;
//! types do not gain new methods when registered.

use std::collections::{BTreeSet, HashSet};

use crate::{
    AttrSlot, GetState, HasAttrCache, PropCache, Result, SlotId, StateMap, TypeDecl, TypeKey,
};

/// Lazy attribute slots and excluded attribute names of one registered type.
#[derive(Debug)]
pub struct PropsRecord {
    type_key: TypeKey,
    slots: Vec<AttrSlot>,
    excluded_attrs: BTreeSet<String>,
}

impl PropsRecord {
    /// Builds the record for `type_key` from its declarations.
    ///
    /// Own slots come first, then the slots of each parent in declaration
    /// order, deduplicated by slot identity. A parent that is not registered
    /// in `registry` yet contributes nothing, and registering it later does
    /// not change this record.
    pub fn build(type_key: TypeKey, decl: &TypeDecl, registry: &PropCache) -> Self {
        let mut record = Self {
            type_key,
            slots: Vec::new(),
            excluded_attrs: BTreeSet::new(),
        };
        let mut seen: HashSet<SlotId> = HashSet::new();

        record.merge_slots(decl.own_slots(), &mut seen);

        for (name, annotation) in decl.annotations() {
            if annotation.marks_excluded() {
                record.excluded_attrs.insert(name.clone());
            }
        }
        record
            .excluded_attrs
            .extend(decl.excluded().iter().cloned());

        for parent in decl.parents() {
            if *parent == type_key {
                continue;
            }
            match registry.try_record_for_key(parent) {
                Some(parent_record) => {
                    record.merge_slots(&parent_record.slots, &mut seen);
                    record
                        .excluded_attrs
                        .extend(parent_record.excluded_attrs.iter().cloned());
                }
                None => {
                    tracing::debug!(
                        type_name = type_key.name(),
                        parent = parent.name(),
                        "parent type is not registered; its metadata is not inherited"
                    );
                }
            }
        }

        record
    }

    fn merge_slots(&mut self, slots: &[AttrSlot], seen: &mut HashSet<SlotId>) {
        for slot in slots {
            if seen.insert(slot.id()) {
                self.slots.push(slot.clone());
            }
        }
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn slots(&self) -> &[AttrSlot] {
        &self.slots
    }

    pub fn excluded_attrs(&self) -> &BTreeSet<String> {
        &self.excluded_attrs
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_attrs.contains(name)
    }

    /// Whether a slot with this attribute name is reachable from the type.
    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| slot.name() == name)
    }

    /// Resets every slot on `instance`.
    ///
    /// Returns the number of stored values removed.
    pub fn purge_all<T>(&self, instance: &T) -> usize
    where
        T: HasAttrCache + ?Sized,
    {
        let removed = self
            .slots
            .iter()
            .filter(|slot| slot.reset(instance))
            .count();
        tracing::trace!(
            type_name = self.type_key.name(),
            removed,
            "purged all lazy attributes"
        );
        removed
    }

    /// Resets the slots whose flags share a bit with `flags`.
    ///
    /// Slots with flags `0` are never selected. Returns the number of stored
    /// values removed.
    pub fn purge_by_flag<T>(&self, instance: &T, flags: u64) -> usize
    where
        T: HasAttrCache + ?Sized,
    {
        let removed = self
            .slots
            .iter()
            .filter(|slot| slot.matches(flags))
            .filter(|slot| slot.reset(instance))
            .count();
        tracing::trace!(
            type_name = self.type_key.name(),
            flags,
            removed,
            "purged lazy attributes by flag"
        );
        removed
    }

    /// Removes every lazy attribute name and every excluded name from `state`.
    pub fn filter_for_serialization(&self, state: &mut StateMap) {
        for slot in &self.slots {
            state.remove(slot.name());
        }
        for name in &self.excluded_attrs {
            state.remove(name.as_str());
        }
    }

    /// Base state of `instance`, filtered for serialization.
    pub fn snapshot<T>(&self, instance: &T) -> Result<StateMap>
    where
        T: GetState + ?Sized,
    {
        let mut state = instance.get_state()?;
        self.filter_for_serialization(&mut state);
        Ok(state)
    }
}
