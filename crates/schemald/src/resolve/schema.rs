//! Composed property sets.
//!
//! A type's resolved schema is the union of its own properties with those of
//! every ancestor. Ancestors are visited once each in post-order over the
//! parent DAG, so a type reaching the same ancestor along several paths
//! composes it exactly once. When several definitions share a name, their
//! allowed sets are unioned and the most permissive cardinality wins.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::error::RegistryError;
use crate::model::{Cardinality, TypeDescriptor, TypeId, TypeRef};
use crate::registry::Registry;

/// A property after composition across the inheritance DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    pub name: String,
    pub allowed: Vec<TypeRef>,
    pub cardinality: Cardinality,
    /// True only if every contributing definition is deprecated.
    pub deprecated: bool,
    /// Types contributing a definition, in composition order.
    pub declared_by: Vec<TypeId>,
}

impl ResolvedProperty {
    /// Iterates over the entity types in the allowed set.
    pub fn entity_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.allowed.iter().filter_map(|t| t.as_type())
    }

    /// Returns true if a bare `{ "@id" }` reference is allowed.
    pub fn allows_reference(&self) -> bool {
        self.allowed.contains(&TypeRef::IdReference)
    }
}

/// The composed view of one type.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    type_id: TypeId,
    /// Post-order linearisation: every ancestor once, parents before
    /// children, the type itself last.
    linearization: Vec<TypeId>,
    ancestors: FxHashSet<TypeId>,
    properties: Vec<ResolvedProperty>,
    index: FxHashMap<String, usize>,
}

impl ResolvedSchema {
    /// Returns the type this schema describes.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the post-order linearisation of the type's ancestry.
    pub fn linearization(&self) -> &[TypeId] {
        &self.linearization
    }

    /// Returns true if `other` is this type or one of its ancestors.
    pub fn is_subtype_of(&self, other: TypeId) -> bool {
        self.ancestors.contains(&other)
    }

    /// Looks up a composed property by name.
    pub fn property(&self, name: &str) -> Option<&ResolvedProperty> {
        self.index.get(name).map(|&i| &self.properties[i])
    }

    /// Returns all composed properties, in composition order.
    pub fn properties(&self) -> &[ResolvedProperty] {
        &self.properties
    }

    /// Returns the number of composed properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if the type has no properties at all.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Computes the post-order ancestry of `root`, visiting each ancestor once.
pub fn linearize(registry: &Registry, root: TypeId) -> Result<Vec<TypeId>, RegistryError> {
    fn visit(
        registry: &Registry,
        id: TypeId,
        on_path: &mut Vec<TypeId>,
        done: &mut FxHashSet<TypeId>,
        order: &mut Vec<TypeId>,
    ) -> Result<(), RegistryError> {
        if done.contains(&id) {
            return Ok(());
        }
        if let Some(pos) = on_path.iter().position(|t| *t == id) {
            let mut cycle: Vec<String> = on_path[pos..]
                .iter()
                .map(|t| registry.get(*t).name.clone())
                .collect();
            cycle.push(registry.get(id).name.clone());
            return Err(RegistryError::CyclicInheritance { cycle });
        }

        on_path.push(id);
        for parent in &registry.get(id).parents {
            visit(registry, *parent, on_path, done, order)?;
        }
        on_path.pop();

        done.insert(id);
        order.push(id);
        Ok(())
    }

    let mut order = Vec::new();
    visit(
        registry,
        root,
        &mut Vec::new(),
        &mut FxHashSet::default(),
        &mut order,
    )?;
    Ok(order)
}

/// Composes the resolved schema of one type.
pub fn compose(registry: &Registry, root: TypeId) -> Result<ResolvedSchema, RegistryError> {
    let linearization = linearize(registry, root)?;

    let mut properties: Vec<ResolvedProperty> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for ancestor in &linearization {
        let descriptor: &TypeDescriptor = registry.get(*ancestor);
        for prop in &descriptor.own_properties {
            match index.get(&prop.name) {
                Some(&i) => {
                    let existing = &mut properties[i];
                    for type_ref in &prop.allowed {
                        if !existing.allowed.contains(type_ref) {
                            existing.allowed.push(*type_ref);
                        }
                    }
                    existing.cardinality = existing.cardinality.widen(prop.cardinality);
                    if existing.deprecated != prop.deprecated {
                        warn!(
                            property = %prop.name,
                            on = %descriptor.name,
                            "property is deprecated along only some inheritance paths"
                        );
                    }
                    existing.deprecated &= prop.deprecated;
                    existing.declared_by.push(*ancestor);
                }
                None => {
                    index.insert(prop.name.clone(), properties.len());
                    properties.push(ResolvedProperty {
                        name: prop.name.clone(),
                        allowed: prop.allowed.clone(),
                        cardinality: prop.cardinality,
                        deprecated: prop.deprecated,
                        declared_by: vec![*ancestor],
                    });
                }
            }
        }
    }

    Ok(ResolvedSchema {
        type_id: root,
        ancestors: linearization.iter().copied().collect(),
        linearization,
        properties,
        index,
    })
}
