//! Builder API for ergonomic entity construction.
//!
//! Provides a fluent interface for building entities, either standalone or
//! directly inside an [`EntityGraph`](crate::model::EntityGraph).
//!
//! # Example
//!
//! ```rust
//! use schemald::model::EntityGraph;
//!
//! let mut graph = EntityGraph::new();
//! let address = graph.add("PostalAddress", |e| e
//!     .text("streetAddress", "12 Analytical Row")
//!     .text("addressLocality", "London")
//! );
//! let ada = graph.add("Person", |e| e
//!     .id("https://example.org/ada")
//!     .text("name", "Ada Lovelace")
//!     .text("birthDate", "1815-12-10")
//!     .link("address", address)
//! );
//! graph.add_root(ada);
//! ```
//!
//! Setting the same property twice appends: the value becomes an array.

use std::collections::BTreeMap;

use serde_json::Number;

use crate::model::entity::{push_property, Entity, EntityKey, EntityRef, NodeValue, PropertyValue, Scalar};

/// Builder for a single entity.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    type_name: String,
    id: Option<String>,
    properties: BTreeMap<String, PropertyValue>,
}

impl EntityBuilder {
    /// Creates a builder for an entity of the given `@type`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            properties: BTreeMap::new(),
        }
    }

    /// Sets the entity's `@id`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Appends an element to a property.
    pub fn value(mut self, property: &str, value: NodeValue) -> Self {
        push_property(&mut self.properties, property, value);
        self
    }

    /// Sets a property to an array, replacing any earlier value. Use this
    /// to emit a one-element array rather than a bare value.
    pub fn many(mut self, property: &str, values: impl IntoIterator<Item = NodeValue>) -> Self {
        self.properties.insert(
            property.to_string(),
            PropertyValue::Many(values.into_iter().collect()),
        );
        self
    }

    /// Appends a text value.
    pub fn text(self, property: &str, value: impl Into<String>) -> Self {
        self.value(property, NodeValue::Scalar(Scalar::Text(value.into())))
    }

    /// Appends an integer or other exact number.
    pub fn number(self, property: &str, value: impl Into<Number>) -> Self {
        self.value(property, NodeValue::Scalar(Scalar::Number(value.into())))
    }

    /// Appends a float. NaN and infinities have no JSON form and are skipped.
    pub fn float(self, property: &str, value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => self.value(property, NodeValue::Scalar(Scalar::Number(n))),
            None => self,
        }
    }

    /// Appends a boolean.
    pub fn boolean(self, property: &str, value: bool) -> Self {
        self.value(property, NodeValue::Scalar(Scalar::Bool(value)))
    }

    /// Appends a link to another entity of the same graph.
    pub fn link(self, property: &str, target: EntityKey) -> Self {
        self.value(property, NodeValue::Ref(EntityRef::Node(target)))
    }

    /// Appends a reference by `@id`, typically to a node outside the graph.
    pub fn reference(self, property: &str, id: impl Into<String>) -> Self {
        self.value(property, NodeValue::Ref(EntityRef::Id(id.into())))
    }

    /// Builds the entity.
    pub fn build(self) -> Entity {
        Entity {
            type_name: self.type_name,
            id: self.id,
            properties: self.properties,
        }
    }
}
