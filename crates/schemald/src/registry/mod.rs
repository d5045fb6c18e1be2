//! The vocabulary registry.
//!
//! Holds every [`TypeDescriptor`] of a vocabulary, indexed by name and by
//! discriminator, and answers "what are type T's parents and properties" and
//! "which leaves make up the union rooted at T". Loading fails fast on any
//! inconsistency in the vocabulary file; a registry that exists is sound.

pub mod loader;

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::RegistryError;
use crate::limits::ID_REFERENCE;
use crate::model::{PropertyDescriptor, ScalarKind, TypeDescriptor, TypeId, TypeRef};

pub use loader::{
    decode_vocabulary, format_fingerprint, read_vocabulary, LoadOptions, PropertyRecord,
    TypeRecord, VocabularyFile,
};

/// An immutable, indexed set of type descriptors.
#[derive(Debug, Clone)]
pub struct Registry {
    types: Vec<TypeDescriptor>,
    by_name: FxHashMap<String, TypeId>,
    by_discriminator: FxHashMap<String, TypeId>,
    children: Vec<Vec<TypeId>>,
}

impl Registry {
    /// Builds a registry from decoded type records.
    pub fn from_records(
        records: Vec<TypeRecord>,
        options: &LoadOptions,
    ) -> Result<Registry, RegistryError> {
        if records.len() > options.max_types {
            return Err(RegistryError::LimitExceeded {
                what: "type",
                count: records.len(),
                max: options.max_types,
            });
        }

        // Pass 1: assign identities.
        let mut by_name = FxHashMap::default();
        for (index, record) in records.iter().enumerate() {
            if record.name.is_empty() {
                return Err(RegistryError::EmptyName { index });
            }
            if record.properties.len() > options.max_properties_per_type {
                return Err(RegistryError::LimitExceeded {
                    what: "property",
                    count: record.properties.len(),
                    max: options.max_properties_per_type,
                });
            }
            if by_name
                .insert(record.name.clone(), TypeId(index as u32))
                .is_some()
            {
                return Err(RegistryError::DuplicateType {
                    name: record.name.clone(),
                });
            }
        }

        // Pass 2: resolve names to identities.
        let mut types = Vec::with_capacity(records.len());
        let mut by_discriminator: FxHashMap<String, TypeId> = FxHashMap::default();
        for (index, record) in records.into_iter().enumerate() {
            let id = TypeId(index as u32);

            let mut parents = Vec::with_capacity(record.parents.len());
            for parent in &record.parents {
                let parent_id =
                    *by_name
                        .get(parent)
                        .ok_or_else(|| RegistryError::UndefinedParent {
                            child: record.name.clone(),
                            parent: parent.clone(),
                        })?;
                if !parents.contains(&parent_id) {
                    parents.push(parent_id);
                }
            }

            let mut own_properties: Vec<PropertyDescriptor> =
                Vec::with_capacity(record.properties.len());
            for prop in record.properties {
                let mut allowed = Vec::with_capacity(prop.types.len());
                for type_name in &prop.types {
                    let type_ref = resolve_type_name(type_name, &by_name).ok_or_else(|| {
                        RegistryError::UndefinedType {
                            owner: record.name.clone(),
                            property: prop.name.clone(),
                            name: type_name.clone(),
                        }
                    })?;
                    if !allowed.contains(&type_ref) {
                        allowed.push(type_ref);
                    }
                }

                // A record listing the same property twice declares their union.
                if let Some(existing) = own_properties.iter_mut().find(|p| p.name == prop.name) {
                    for type_ref in allowed {
                        if !existing.allowed.contains(&type_ref) {
                            existing.allowed.push(type_ref);
                        }
                    }
                    existing.cardinality = existing.cardinality.widen(prop.cardinality);
                    existing.deprecated &= prop.deprecated;
                    continue;
                }

                own_properties.push(PropertyDescriptor {
                    name: prop.name,
                    allowed,
                    cardinality: prop.cardinality,
                    deprecated: prop.deprecated,
                });
            }

            let discriminator = match (record.leaf, record.discriminator) {
                (true, value) => Some(value.unwrap_or_else(|| record.name.clone())),
                (false, Some(value)) => {
                    return Err(RegistryError::DiscriminatorOnAbstract {
                        name: record.name,
                        value,
                    });
                }
                (false, None) => None,
            };

            if let Some(value) = &discriminator {
                if let Some(&first) = by_discriminator.get(value) {
                    return Err(RegistryError::AmbiguousDiscriminator {
                        value: value.clone(),
                        first: types
                            .get(first.index())
                            .map(|t: &TypeDescriptor| t.name.clone())
                            .unwrap_or_default(),
                        second: record.name,
                    });
                }
                by_discriminator.insert(value.clone(), id);
            }

            types.push(TypeDescriptor {
                id,
                name: record.name,
                parents,
                own_properties,
                is_leaf: record.leaf,
                discriminator,
                string_alternative: record.string_alternative,
            });
        }

        check_acyclic(&types)?;

        let mut children = vec![Vec::new(); types.len()];
        for ty in &types {
            for parent in &ty.parents {
                children[parent.index()].push(ty.id);
            }
        }

        debug!(
            types = types.len(),
            leaves = by_discriminator.len(),
            "vocabulary registry indexed"
        );

        Ok(Registry {
            types,
            by_name,
            by_discriminator,
            children,
        })
    }

    /// Returns the number of types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the registry holds no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Looks up a type by name.
    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name).map(|id| &self.types[id.index()])
    }

    /// Returns the identity of a named type.
    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the descriptor for an identity issued by this registry.
    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.index()]
    }

    /// Returns the leaf selected by a discriminator literal, across the whole vocabulary.
    pub fn by_discriminator(&self, value: &str) -> Option<&TypeDescriptor> {
        self.by_discriminator
            .get(value)
            .map(|id| &self.types[id.index()])
    }

    /// Iterates over all types in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }

    /// Returns the direct subtypes of a type.
    pub fn children(&self, id: TypeId) -> &[TypeId] {
        &self.children[id.index()]
    }

    /// Returns the type and all of its transitive subtypes, each once,
    /// in breadth-first order.
    pub fn descendants(&self, id: TypeId) -> Vec<TypeId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            queue.extend(self.children(next).iter().copied());
        }
        order
    }

    /// Returns the leaves of the union rooted at `id` (the type itself if it
    /// is a leaf, plus every leaf below it).
    pub fn leaves_of(&self, id: TypeId) -> Vec<TypeId> {
        self.descendants(id)
            .into_iter()
            .filter(|t| self.types[t.index()].is_leaf)
            .collect()
    }

    /// Returns the members of the discriminated union named `name`.
    pub fn all_leaves_of(&self, name: &str) -> Option<Vec<&TypeDescriptor>> {
        let id = self.id_of(name)?;
        Some(
            self.leaves_of(id)
                .into_iter()
                .map(|t| &self.types[t.index()])
                .collect(),
        )
    }

    /// Renders a type reference by its vocabulary name.
    pub fn type_ref_name(&self, type_ref: TypeRef) -> &str {
        match type_ref {
            TypeRef::Type(id) => &self.types[id.index()].name,
            TypeRef::Scalar(kind) => kind.name(),
            TypeRef::IdReference => ID_REFERENCE,
        }
    }
}

fn resolve_type_name(name: &str, by_name: &FxHashMap<String, TypeId>) -> Option<TypeRef> {
    if name == ID_REFERENCE {
        return Some(TypeRef::IdReference);
    }
    if let Some(kind) = ScalarKind::from_name(name) {
        return Some(TypeRef::Scalar(kind));
    }
    by_name.get(name).map(|id| TypeRef::Type(*id))
}

/// Rejects parent graphs that contain a cycle, naming the cycle.
pub(crate) fn check_acyclic(types: &[TypeDescriptor]) -> Result<(), RegistryError> {
    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;

    let mut color = vec![WHITE; types.len()];
    for start in 0..types.len() {
        if color[start] != WHITE {
            continue;
        }
        // Explicit stack of (type, next parent position).
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        color[start] = GREY;
        while let Some(top) = stack.last_mut() {
            let (node, pos) = *top;
            match types[node].parents.get(pos) {
                Some(parent) => {
                    top.1 += 1;
                    let parent = parent.index();
                    match color[parent] {
                        WHITE => {
                            color[parent] = GREY;
                            stack.push((parent, 0));
                        }
                        GREY => {
                            let from = stack.iter().position(|(n, _)| *n == parent).unwrap_or(0);
                            let mut cycle: Vec<String> = stack[from..]
                                .iter()
                                .map(|(n, _)| types[*n].name.clone())
                                .collect();
                            cycle.push(types[parent].name.clone());
                            return Err(RegistryError::CyclicInheritance { cycle });
                        }
                        _ => {}
                    }
                }
                None => {
                    color[node] = BLACK;
                    stack.pop();
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::Cardinality;

    fn records(value: serde_json::Value) -> Vec<TypeRecord> {
        serde_json::from_value(value).unwrap()
    }

    fn registry(value: serde_json::Value) -> Result<Registry, RegistryError> {
        Registry::from_records(records(value), &LoadOptions::default())
    }

    #[test]
    fn test_lookup_and_parents() {
        let reg = registry(json!([
            { "name": "Thing", "properties": [{ "name": "name", "types": ["Text"] }] },
            { "name": "Organization", "parents": ["Thing"] },
            { "name": "Place", "parents": ["Thing"] },
            { "name": "LocalBusiness", "parents": ["Organization", "Place", "Organization"] }
        ]))
        .unwrap();

        assert_eq!(reg.len(), 4);
        let lb = reg.lookup("LocalBusiness").unwrap();
        assert_eq!(lb.parents.len(), 2, "duplicate parent is dropped");
        assert_eq!(reg.get(lb.parents[0]).name, "Organization");
        assert_eq!(reg.get(lb.parents[1]).name, "Place");
        assert_eq!(lb.discriminator.as_deref(), Some("LocalBusiness"));
        assert!(reg.lookup("Nope").is_none());
    }

    #[test]
    fn test_property_type_resolution() {
        let reg = registry(json!([
            { "name": "Thing" },
            { "name": "Person", "parents": ["Thing"], "properties": [
                { "name": "knows", "types": ["Person", "IdReference", "Person"] },
                { "name": "birthDate", "types": ["Date"], "cardinality": "single" },
                { "name": "siblings", "types": ["Person"], "deprecated": true }
            ] }
        ]))
        .unwrap();

        let person = reg.lookup("Person").unwrap();
        let knows = person.own_property("knows").unwrap();
        assert_eq!(knows.allowed, vec![TypeRef::Type(person.id), TypeRef::IdReference]);
        assert_eq!(knows.cardinality, Cardinality::MultipleOrSingle);

        let birth = person.own_property("birthDate").unwrap();
        assert_eq!(birth.allowed, vec![TypeRef::Scalar(ScalarKind::Date)]);
        assert_eq!(birth.cardinality, Cardinality::Single);

        assert!(person.own_property("siblings").unwrap().deprecated);
    }

    #[test]
    fn test_undefined_parent() {
        let err = registry(json!([{ "name": "Person", "parents": ["Thing"] }])).unwrap_err();
        assert!(matches!(err, RegistryError::UndefinedParent { ref parent, .. } if parent == "Thing"));
    }

    #[test]
    fn test_undefined_property_type() {
        let err = registry(json!([
            { "name": "Thing", "properties": [{ "name": "x", "types": ["Widget"] }] }
        ]))
        .unwrap_err();
        assert_eq!(err.code(), "R007");
    }

    #[test]
    fn test_duplicate_type() {
        let err = registry(json!([{ "name": "Thing" }, { "name": "Thing" }])).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType { .. }));
    }

    #[test]
    fn test_empty_name() {
        let err = registry(json!([{ "name": "" }])).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyName { index: 0 }));
    }

    #[test]
    fn test_reused_discriminator() {
        let err = registry(json!([
            { "name": "Thing" },
            { "name": "Person", "parents": ["Thing"] },
            { "name": "Human", "parents": ["Thing"], "discriminator": "Person" }
        ]))
        .unwrap_err();
        match err {
            RegistryError::AmbiguousDiscriminator { value, first, second } => {
                assert_eq!(value, "Person");
                assert_eq!(first, "Person");
                assert_eq!(second, "Human");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discriminator_on_abstract() {
        let err = registry(json!([{ "name": "Thing", "leaf": false, "discriminator": "T" }]))
            .unwrap_err();
        assert_eq!(err.code(), "R008");
    }

    #[test]
    fn test_cycle_detected() {
        let err = registry(json!([
            { "name": "A", "parents": ["C"] },
            { "name": "B", "parents": ["A"] },
            { "name": "C", "parents": ["B"] }
        ]))
        .unwrap_err();
        match err {
            RegistryError::CyclicInheritance { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let err = registry(json!([{ "name": "A", "parents": ["A"] }])).unwrap_err();
        assert!(matches!(err, RegistryError::CyclicInheritance { .. }));
    }

    #[test]
    fn test_all_leaves_of() {
        let reg = registry(json!([
            { "name": "Place" },
            { "name": "Accommodation", "parents": ["Place"], "stringAlternative": true },
            { "name": "Apartment", "parents": ["Accommodation"] },
            { "name": "Room", "parents": ["Accommodation"], "leaf": false },
            { "name": "HotelRoom", "parents": ["Room"] }
        ]))
        .unwrap();

        let mut names: Vec<_> = reg
            .all_leaves_of("Accommodation")
            .unwrap()
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Accommodation", "Apartment", "HotelRoom"]);
        assert!(reg.all_leaves_of("Missing").is_none());
    }

    #[test]
    fn test_descendants_visit_diamond_once() {
        let reg = registry(json!([
            { "name": "Thing" },
            { "name": "A", "parents": ["Thing"] },
            { "name": "B", "parents": ["Thing"] },
            { "name": "C", "parents": ["A", "B"] }
        ]))
        .unwrap();
        let thing = reg.id_of("Thing").unwrap();
        assert_eq!(reg.descendants(thing).len(), 4);
    }

    #[test]
    fn test_limits() {
        let options = LoadOptions {
            max_types: 1,
            ..LoadOptions::default()
        };
        let err = Registry::from_records(
            records(json!([{ "name": "A" }, { "name": "B" }])),
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::LimitExceeded { what: "type", .. }));
    }
}
