//! In-memory entity graphs.
//!
//! An [`EntityGraph`] owns its entities in an arena and links them by
//! [`EntityKey`]. A link is a key, never a nested copy, so reference cycles
//! (two people who `knows` each other) are ordinary key cycles and cost
//! nothing to represent or traverse.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Number;

use crate::model::builder::EntityBuilder;

/// Index of an entity within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(pub(crate) usize);

impl EntityKey {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A scalar property value, kept in its JSON form.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    /// Compares two scalars, treating numerically equal numbers as equal
    /// regardless of their integer or float representation.
    pub fn same_as(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => {
                a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
            }
            _ => self == other,
        }
    }
}

/// A link from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// An entity in the same graph.
    Node(EntityKey),
    /// An `@id` that is not backed by an entity in this graph.
    Id(String),
}

/// One element of a property value.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Scalar(Scalar),
    Ref(EntityRef),
}

impl NodeValue {
    /// Returns the linked key, if this is a local link.
    pub fn as_key(&self) -> Option<EntityKey> {
        match self {
            NodeValue::Ref(EntityRef::Node(key)) => Some(*key),
            _ => None,
        }
    }
}

impl From<Scalar> for NodeValue {
    fn from(scalar: Scalar) -> Self {
        NodeValue::Scalar(scalar)
    }
}

impl From<EntityKey> for NodeValue {
    fn from(key: EntityKey) -> Self {
        NodeValue::Ref(EntityRef::Node(key))
    }
}

/// A property value: a bare element or an array of elements. The variant
/// records the shape the value had (or should have) in JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    One(NodeValue),
    Many(Vec<NodeValue>),
}

impl PropertyValue {
    /// Returns the elements regardless of shape.
    pub fn as_slice(&self) -> &[NodeValue] {
        match self {
            PropertyValue::One(v) => std::slice::from_ref(v),
            PropertyValue::Many(vs) => vs,
        }
    }

    /// Appends an element, turning a bare value into an array.
    pub fn push(&mut self, value: NodeValue) {
        let mut values = match std::mem::replace(self, PropertyValue::Many(Vec::new())) {
            PropertyValue::One(first) => vec![first],
            PropertyValue::Many(values) => values,
        };
        values.push(value);
        *self = PropertyValue::Many(values);
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true for an empty array.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Appends `value` to `properties[name]`, creating a bare value if absent.
pub(crate) fn push_property(
    properties: &mut BTreeMap<String, PropertyValue>,
    name: &str,
    value: NodeValue,
) {
    match properties.get_mut(name) {
        Some(existing) => existing.push(value),
        None => {
            properties.insert(name.to_string(), PropertyValue::One(value));
        }
    }
}

/// A typed node.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// The `@type` discriminator of a concrete leaf type.
    pub type_name: String,
    pub id: Option<String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Entity {
    /// Creates an entity with no id and no properties.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            properties: BTreeMap::new(),
        }
    }

    /// Looks up a property value.
    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.properties.get(property)
    }

    /// Iterates over the keys this entity links to, one per link.
    pub fn links(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.properties
            .values()
            .flat_map(|v| v.as_slice())
            .filter_map(NodeValue::as_key)
    }
}

/// An arena of entities plus the keys of its root entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGraph {
    entities: Vec<Entity>,
    roots: Vec<EntityKey>,
}

impl EntityGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity and returns its key.
    pub fn insert(&mut self, entity: Entity) -> EntityKey {
        let key = EntityKey(self.entities.len());
        self.entities.push(entity);
        key
    }

    /// Adds an entity built with a builder function.
    ///
    /// ```rust
    /// use schemald::model::EntityGraph;
    ///
    /// let mut graph = EntityGraph::new();
    /// let ada = graph.add("Person", |e| e.text("name", "Ada Lovelace"));
    /// assert_eq!(graph.get(ada).unwrap().type_name, "Person");
    /// ```
    pub fn add<F>(&mut self, type_name: impl Into<String>, f: F) -> EntityKey
    where
        F: FnOnce(EntityBuilder) -> EntityBuilder,
    {
        let entity = f(EntityBuilder::new(type_name)).build();
        self.insert(entity)
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key.0)
    }

    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key.0)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over all entities in key order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityKey(i), e))
    }

    /// Links `from.property` to `to`, appending if the property is already
    /// set. Returns false if `from` is not in the graph.
    pub fn link(&mut self, from: EntityKey, property: &str, to: EntityKey) -> bool {
        match self.entities.get_mut(from.0) {
            Some(entity) => {
                push_property(&mut entity.properties, property, NodeValue::from(to));
                true
            }
            None => false,
        }
    }

    /// Marks an entity as a root. Roots become the top-level nodes of a
    /// built document, in the order they were added.
    pub fn add_root(&mut self, key: EntityKey) {
        if !self.roots.contains(&key) {
            self.roots.push(key);
        }
    }

    /// Returns the explicitly marked roots.
    pub fn roots(&self) -> &[EntityKey] {
        &self.roots
    }

    /// Returns the explicit roots, or [`default_roots`](Self::default_roots)
    /// when none were marked.
    pub fn effective_roots(&self) -> Vec<EntityKey> {
        if self.roots.is_empty() {
            self.default_roots()
        } else {
            self.roots.clone()
        }
    }

    /// Returns every entity without incoming links, in key order. Entities
    /// reachable only through a cycle contribute their lowest key, so every
    /// entity is reachable from the result.
    pub fn default_roots(&self) -> Vec<EntityKey> {
        let mut has_incoming = vec![false; self.entities.len()];
        for entity in &self.entities {
            for target in entity.links() {
                if let Some(flag) = has_incoming.get_mut(target.0) {
                    *flag = true;
                }
            }
        }

        let mut roots: Vec<EntityKey> = (0..self.entities.len())
            .filter(|&i| !has_incoming[i])
            .map(EntityKey)
            .collect();

        let mut reached = self.reachable_from(&roots);
        for i in 0..self.entities.len() {
            let key = EntityKey(i);
            if !reached.contains(&key) {
                roots.push(key);
                reached.extend(self.reachable_from(&[key]));
            }
        }
        roots
    }

    /// Returns the keys reachable from `start` (inclusive). Links to keys
    /// outside the graph are skipped.
    pub fn reachable_from(&self, start: &[EntityKey]) -> FxHashSet<EntityKey> {
        let mut seen: FxHashSet<EntityKey> = FxHashSet::default();
        let mut stack: Vec<EntityKey> = start.to_vec();
        while let Some(key) = stack.pop() {
            let Some(entity) = self.get(key) else {
                continue;
            };
            if !seen.insert(key) {
                continue;
            }
            stack.extend(entity.links().filter(|k| !seen.contains(k)));
        }
        seen
    }

    /// Finds the entity carrying `@id` = `id`.
    pub fn find_by_id(&self, id: &str) -> Option<EntityKey> {
        self.iter()
            .find(|(_, e)| e.id.as_deref() == Some(id))
            .map(|(k, _)| k)
    }

    /// Iterates over the keys linked from one entity.
    pub fn outgoing(&self, key: EntityKey) -> impl Iterator<Item = EntityKey> + '_ {
        self.get(key).into_iter().flat_map(Entity::links)
    }

    fn id_index(&self) -> FxHashMap<&str, EntityKey> {
        let mut index = FxHashMap::default();
        for (key, entity) in self.iter() {
            if let Some(id) = entity.id.as_deref() {
                index.entry(id).or_insert(key);
            }
        }
        index
    }

    /// Decides whether the graph reachable from `roots` matches the graph
    /// reachable from `other_roots` in `other`, up to key numbering and the
    /// choice between linking by key and linking by `@id`.
    ///
    /// Roots are paired by position. When one list is longer, its extra
    /// roots must be reached from the paired ones (a document that lists
    /// every node at top level still matches its nested form). Ids are
    /// compared only when both sides carry one, and array-vs-bare shape is
    /// not significant.
    pub fn equivalent(
        &self,
        roots: &[EntityKey],
        other: &EntityGraph,
        other_roots: &[EntityKey],
    ) -> bool {
        let mut pairing = Bisimulation {
            left: self,
            right: other,
            left_ids: self.id_index(),
            right_ids: other.id_index(),
            forward: FxHashMap::default(),
            backward: FxHashMap::default(),
            pending: Vec::new(),
        };

        for (a, b) in roots.iter().zip(other_roots) {
            if !pairing.pair(*a, *b) {
                return false;
            }
        }
        if !pairing.run() {
            return false;
        }

        let shared = roots.len().min(other_roots.len());
        roots[shared..].iter().all(|k| pairing.forward.contains_key(k))
            && other_roots[shared..]
                .iter()
                .all(|k| pairing.backward.contains_key(k))
    }
}

struct Bisimulation<'a> {
    left: &'a EntityGraph,
    right: &'a EntityGraph,
    left_ids: FxHashMap<&'a str, EntityKey>,
    right_ids: FxHashMap<&'a str, EntityKey>,
    forward: FxHashMap<EntityKey, EntityKey>,
    backward: FxHashMap<EntityKey, EntityKey>,
    pending: Vec<(EntityKey, EntityKey)>,
}

/// A link after resolving `@id`s that name an entity of the same graph.
enum Target<'a> {
    Key(EntityKey),
    External(&'a str),
}

impl<'a> Bisimulation<'a> {
    fn pair(&mut self, a: EntityKey, b: EntityKey) -> bool {
        match (self.forward.get(&a), self.backward.get(&b)) {
            (Some(&fb), Some(&ba)) => fb == b && ba == a,
            (None, None) => {
                self.forward.insert(a, b);
                self.backward.insert(b, a);
                self.pending.push((a, b));
                true
            }
            _ => false,
        }
    }

    fn run(&mut self) -> bool {
        while let Some((a, b)) = self.pending.pop() {
            if !self.compare(a, b) {
                return false;
            }
        }
        true
    }

    fn compare(&mut self, a: EntityKey, b: EntityKey) -> bool {
        let (left_graph, right_graph) = (self.left, self.right);
        let (Some(left), Some(right)) = (left_graph.get(a), right_graph.get(b)) else {
            return false;
        };
        if left.type_name != right.type_name {
            return false;
        }
        if let (Some(x), Some(y)) = (&left.id, &right.id) {
            if x != y {
                return false;
            }
        }
        if left.properties.len() != right.properties.len() {
            return false;
        }

        for (name, lv) in &left.properties {
            let Some(rv) = right.properties.get(name) else {
                return false;
            };
            let (ls, rs) = (lv.as_slice(), rv.as_slice());
            if ls.len() != rs.len() {
                return false;
            }
            for (x, y) in ls.iter().zip(rs) {
                let same = match (x, y) {
                    (NodeValue::Scalar(p), NodeValue::Scalar(q)) => p.same_as(q),
                    (NodeValue::Ref(p), NodeValue::Ref(q)) => {
                        let p = target(p, &self.left_ids);
                        let q = target(q, &self.right_ids);
                        match (p, q) {
                            (Target::Key(p), Target::Key(q)) => self.pair(p, q),
                            (Target::External(p), Target::External(q)) => p == q,
                            _ => false,
                        }
                    }
                    _ => false,
                };
                if !same {
                    return false;
                }
            }
        }
        true
    }
}

fn target<'a>(link: &'a EntityRef, ids: &FxHashMap<&str, EntityKey>) -> Target<'a> {
    match link {
        EntityRef::Node(key) => Target::Key(*key),
        EntityRef::Id(id) => match ids.get(id.as_str()) {
            Some(key) => Target::Key(*key),
            None => Target::External(id),
        },
    }
}
