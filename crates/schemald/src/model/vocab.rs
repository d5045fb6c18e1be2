//! Vocabulary descriptors: types, properties, and the references between them.
//!
//! Descriptors are created once when a registry is loaded and are immutable
//! afterwards. Types refer to each other through [`TypeId`], an index into
//! the owning registry, so identity comparisons are integer comparisons.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a type within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Returns the registry index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Scalar kinds a property value may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
    Time,
    Url,
}

impl ScalarKind {
    /// All kinds, in the order they are tried when a property lists several.
    pub const ALL: [ScalarKind; 7] = [
        ScalarKind::Text,
        ScalarKind::Number,
        ScalarKind::Boolean,
        ScalarKind::Date,
        ScalarKind::DateTime,
        ScalarKind::Time,
        ScalarKind::Url,
    ];

    /// Parses a vocabulary type name into a scalar kind.
    pub fn from_name(name: &str) -> Option<ScalarKind> {
        match name {
            "Text" => Some(ScalarKind::Text),
            "Number" => Some(ScalarKind::Number),
            "Boolean" => Some(ScalarKind::Boolean),
            "Date" => Some(ScalarKind::Date),
            "DateTime" => Some(ScalarKind::DateTime),
            "Time" => Some(ScalarKind::Time),
            "URL" => Some(ScalarKind::Url),
            _ => None,
        }
    }

    /// Returns the vocabulary spelling of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Text => "Text",
            ScalarKind::Number => "Number",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Date => "Date",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::Time => "Time",
            ScalarKind::Url => "URL",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One member of a property's allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A vocabulary type; values are nodes whose `@type` dispatches under it.
    Type(TypeId),
    /// A scalar kind.
    Scalar(ScalarKind),
    /// A bare `{ "@id": ... }` reference.
    IdReference,
}

impl TypeRef {
    /// Returns the referenced type, if this is an entity reference.
    pub fn as_type(self) -> Option<TypeId> {
        match self {
            TypeRef::Type(id) => Some(id),
            _ => None,
        }
    }
}

/// How many values a property accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    /// Exactly one value; arrays are rejected.
    #[serde(rename = "single")]
    Single,
    /// A bare value or an array of values.
    #[default]
    #[serde(rename = "multiple-or-single")]
    MultipleOrSingle,
}

impl Cardinality {
    /// Returns the more permissive of two cardinalities.
    pub fn widen(self, other: Cardinality) -> Cardinality {
        if self == Cardinality::MultipleOrSingle || other == Cardinality::MultipleOrSingle {
            Cardinality::MultipleOrSingle
        } else {
            Cardinality::Single
        }
    }

    /// Returns true if arrays are accepted.
    pub fn allows_many(self) -> bool {
        self == Cardinality::MultipleOrSingle
    }
}

/// A property as declared by one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    /// Allowed members, deduplicated, in declaration order.
    pub allowed: Vec<TypeRef>,
    pub cardinality: Cardinality,
    pub deprecated: bool,
}

/// A vocabulary type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub name: String,
    /// Direct parents, deduplicated by identity, in declaration order.
    pub parents: Vec<TypeId>,
    pub own_properties: Vec<PropertyDescriptor>,
    pub is_leaf: bool,
    /// The `@type` literal that selects this type. Set for leaves only.
    pub discriminator: Option<String>,
    /// Whether the union rooted at this type also admits a bare string.
    pub string_alternative: bool,
}

impl TypeDescriptor {
    /// Looks up an own property by name.
    pub fn own_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.own_properties.iter().find(|p| p.name == name)
    }
}
