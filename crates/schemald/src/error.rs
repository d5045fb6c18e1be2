//! Error types for vocabulary loading, document validation, and building.
//!
//! Vocabulary errors are fatal for the process: a broken vocabulary must be
//! surfaced at startup. Document errors are accumulated into a
//! [`ValidationResult`](crate::validate::ValidationResult) and never abort
//! the process.

use thiserror::Error;

/// Error while loading or resolving a vocabulary.
#[derive(Debug, Error)]
pub enum RegistryError {
    // === R001-R003: input ===
    #[error("[R001] failed to read vocabulary file: {0}")]
    Io(#[from] std::io::Error),

    #[error("[R002] malformed vocabulary file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("[R003] vocabulary decompression failed: {0}")]
    Decompression(String),

    // === R004-R008: record contents ===
    #[error("[R004] type record #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("[R005] type {name:?} is declared more than once")]
    DuplicateType { name: String },

    #[error("[R006] type {child:?} extends undefined parent {parent:?}")]
    UndefinedParent { child: String, parent: String },

    #[error("[R007] property {property:?} of type {owner:?} allows undefined type {name:?}")]
    UndefinedType {
        owner: String,
        property: String,
        name: String,
    },

    #[error("[R008] type {name:?} is not a leaf but declares discriminator {value:?}")]
    DiscriminatorOnAbstract { name: String, value: String },

    // === R009-R010: graph shape ===
    #[error("[R009] cyclic inheritance: {}", .cycle.join(" -> "))]
    CyclicInheritance { cycle: Vec<String> },

    #[error("[R010] discriminator {value:?} is claimed by both {first:?} and {second:?}")]
    AmbiguousDiscriminator {
        value: String,
        first: String,
        second: String,
    },

    // === R011: limits ===
    #[error("[R011] {what} count {count} exceeds maximum {max}")]
    LimitExceeded {
        what: &'static str,
        count: usize,
        max: usize,
    },
}

impl RegistryError {
    /// Returns the stable error code (e.g. "R009").
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Io(_) => "R001",
            RegistryError::Malformed(_) => "R002",
            RegistryError::Decompression(_) => "R003",
            RegistryError::EmptyName { .. } => "R004",
            RegistryError::DuplicateType { .. } => "R005",
            RegistryError::UndefinedParent { .. } => "R006",
            RegistryError::UndefinedType { .. } => "R007",
            RegistryError::DiscriminatorOnAbstract { .. } => "R008",
            RegistryError::CyclicInheritance { .. } => "R009",
            RegistryError::AmbiguousDiscriminator { .. } => "R010",
            RegistryError::LimitExceeded { .. } => "R011",
        }
    }
}

/// Fatal per-document error. Validation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("[S001] malformed JSON: {message}")]
    MalformedJson { message: String },

    #[error("[S002] {path}: expected a JSON object")]
    NotAnObject { path: String },

    #[error("[S003] document has no @context")]
    MissingContext,

    #[error("[S004] unsupported @context {found}: expected \"https://schema.org\"")]
    UnsupportedContext { found: String },

    #[error("[S005] @graph must be an array")]
    GraphNotArray,

    #[error("[S006] {path}: @graph entries must be node objects")]
    GraphNodeNotObject { path: String },

    #[error("[S007] @id {id:?} appears on more than one @graph node ({first} and {second})")]
    DuplicateIdentifier {
        id: String,
        first: String,
        second: String,
    },

    #[error("[S008] document has more than {max} nodes")]
    TooManyNodes { max: usize },
}

impl StructuralError {
    /// Returns the stable error code (e.g. "S007").
    pub fn code(&self) -> &'static str {
        match self {
            StructuralError::MalformedJson { .. } => "S001",
            StructuralError::NotAnObject { .. } => "S002",
            StructuralError::MissingContext => "S003",
            StructuralError::UnsupportedContext { .. } => "S004",
            StructuralError::GraphNotArray => "S005",
            StructuralError::GraphNodeNotObject { .. } => "S006",
            StructuralError::DuplicateIdentifier { .. } => "S007",
            StructuralError::TooManyNodes { .. } => "S008",
        }
    }
}

/// A semantic or structural problem found while validating a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("[V101] {path}: value {value} of {property:?} matches none of {}", .allowed.join(" | "))]
    TypeMismatch {
        path: String,
        property: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("[V102] {path}: {property:?} accepts a single value but an array was supplied")]
    Cardinality { path: String, property: String },

    #[error("[V103] {path}: {property:?} is not a property of {type_name:?}")]
    UnknownProperty {
        path: String,
        type_name: String,
        property: String,
    },

    #[error("[V104] {path}: reference {id:?} does not resolve to a node in this document")]
    DanglingReference { path: String, id: String },

    #[error("[V105] {path}: unknown type {type_name:?}")]
    UnknownType { path: String, type_name: String },

    #[error("[V106] {path}: node has no @type and the context admits more than one type")]
    MissingType { path: String },

    #[error("[V107] {path}: multiple @type values are not supported")]
    UnsupportedTypeArray { path: String },

    #[error("[V108] {path}: expected a node of type {expected:?}")]
    RootTypeMismatch { path: String, expected: String },

    #[error("[V109] {path}: nesting exceeds maximum depth {max}")]
    TooDeep { path: String, max: usize },

    #[error("[V110] {path}: @id must be a string")]
    InvalidIdentifier { path: String },

    #[error("[V111] {path}: type {type_name:?} is abstract and cannot be instantiated")]
    AbstractType { path: String, type_name: String },
}

impl ValidationError {
    /// Returns the stable error code (e.g. "V101").
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Structural(e) => e.code(),
            ValidationError::TypeMismatch { .. } => "V101",
            ValidationError::Cardinality { .. } => "V102",
            ValidationError::UnknownProperty { .. } => "V103",
            ValidationError::DanglingReference { .. } => "V104",
            ValidationError::UnknownType { .. } => "V105",
            ValidationError::MissingType { .. } => "V106",
            ValidationError::UnsupportedTypeArray { .. } => "V107",
            ValidationError::RootTypeMismatch { .. } => "V108",
            ValidationError::TooDeep { .. } => "V109",
            ValidationError::InvalidIdentifier { .. } => "V110",
            ValidationError::AbstractType { .. } => "V111",
        }
    }

    /// Returns true for errors that abort validation of the whole document.
    pub fn is_structural(&self) -> bool {
        matches!(self, ValidationError::Structural(_))
    }
}

/// A tolerated irregularity. Callers decide whether warnings fail a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationWarning {
    #[error("[W201] {path}: {property:?} is not declared on {type_name:?} (tolerated extension)")]
    UnknownProperty {
        path: String,
        type_name: String,
        property: String,
    },

    #[error("[W202] {path}: {property:?} is deprecated")]
    DeprecatedProperty { path: String, property: String },

    #[error("[W203] {path}: reference {id:?} does not resolve to a node in this document")]
    DanglingReference { path: String, id: String },

    #[error("[W204] {path}: reference {id:?} points at a {found:?}, expected one of {}", .allowed.join(" | "))]
    ReferenceTypeMismatch {
        path: String,
        id: String,
        found: String,
        allowed: Vec<String>,
    },

    #[error("[W205] {path}: JSON-LD keyword {keyword:?} is not interpreted")]
    UnsupportedKeyword { path: String, keyword: String },

    #[error("[W206] {path}: node {id:?} is also defined at {first}; definitions are merged")]
    DuplicateNode {
        path: String,
        id: String,
        first: String,
    },
}

impl ValidationWarning {
    /// Returns the stable warning code (e.g. "W202").
    pub fn code(&self) -> &'static str {
        match self {
            ValidationWarning::UnknownProperty { .. } => "W201",
            ValidationWarning::DeprecatedProperty { .. } => "W202",
            ValidationWarning::DanglingReference { .. } => "W203",
            ValidationWarning::ReferenceTypeMismatch { .. } => "W204",
            ValidationWarning::UnsupportedKeyword { .. } => "W205",
            ValidationWarning::DuplicateNode { .. } => "W206",
        }
    }
}

/// Error while building a document from an entity graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("[B301] entity {key} has unknown type {type_name:?}")]
    UnknownType { key: usize, type_name: String },

    #[error("[B302] entity {from} links to key {key} which is not in the graph")]
    DanglingKey { from: usize, key: usize },

    #[error("[B303] entity {key} is part of a reference cycle and cannot be inlined")]
    CyclicInline { key: usize },

    #[error("[B304] entity graph has no roots")]
    NoRoots,

    #[error("[B305] built document failed validation with {} error(s)", .0.len())]
    Invalid(Vec<ValidationError>),

    #[error("[B306] entity {key} would be inlined deeper than {max} levels")]
    TooDeep { key: usize, max: usize },
}

impl BuildError {
    /// Returns the stable error code (e.g. "B303").
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::UnknownType { .. } => "B301",
            BuildError::DanglingKey { .. } => "B302",
            BuildError::CyclicInline { .. } => "B303",
            BuildError::NoRoots => "B304",
            BuildError::Invalid(_) => "B305",
            BuildError::TooDeep { .. } => "B306",
        }
    }
}

/// Error while materialising a document into an entity graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("[P401] document failed validation with {} error(s)", .0.len())]
    Invalid(Vec<ValidationError>),
}

impl ParseError {
    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::Invalid(_) => "P401",
        }
    }

    /// Returns the validation errors that rejected the document.
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ParseError::Invalid(errors) => errors,
        }
    }
}
