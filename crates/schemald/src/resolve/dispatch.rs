//! Discriminator dispatch tables.
//!
//! Every type roots a discriminated union made of the leaves at or below it.
//! The table maps each member's `@type` literal to the member, so dispatch
//! costs one hash lookup regardless of how many members the union has.

use rustc_hash::FxHashMap;

use crate::error::RegistryError;
use crate::model::TypeId;
use crate::registry::Registry;

/// The dispatch table of the union rooted at one type.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    root: TypeId,
    members: FxHashMap<String, TypeId>,
    accepts_string: bool,
}

impl DispatchTable {
    /// Builds the table for the union rooted at `root`.
    pub fn build(registry: &Registry, root: TypeId) -> Result<DispatchTable, RegistryError> {
        let mut members: FxHashMap<String, TypeId> = FxHashMap::default();
        for leaf in registry.leaves_of(root) {
            let descriptor = registry.get(leaf);
            let Some(value) = &descriptor.discriminator else {
                continue;
            };
            if let Some(&other) = members.get(value) {
                return Err(RegistryError::AmbiguousDiscriminator {
                    value: value.clone(),
                    first: registry.get(other).name.clone(),
                    second: descriptor.name.clone(),
                });
            }
            members.insert(value.clone(), leaf);
        }

        Ok(DispatchTable {
            root,
            members,
            accepts_string: registry.get(root).string_alternative,
        })
    }

    /// Returns the type rooting this union.
    pub fn root(&self) -> TypeId {
        self.root
    }

    /// Selects the member whose discriminator is `value`.
    pub fn dispatch(&self, value: &str) -> Option<TypeId> {
        self.members.get(value).copied()
    }

    /// Returns true if a bare string is a legal member of this union.
    pub fn accepts_string(&self) -> bool {
        self.accepts_string
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the union has no instantiable member.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates over the members.
    pub fn members(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.members.values().copied()
    }
}
