//! schemald: vocabulary-driven validation and construction of schema.org
//! JSON-LD documents.
//!
//! A vocabulary (the schema.org type hierarchy with its properties) is
//! loaded once, resolved eagerly, and then shared read-only by any number of
//! concurrent validations and builds.
//!
//! # Overview
//!
//! - **Vocabulary-driven**: nothing about individual schema.org types is
//!   hard-coded; a regenerated vocabulary file needs no code change
//! - **Diamond-safe**: types with several parents compose each ancestor once
//! - **Diagnostic**: validation accumulates every independent problem, each
//!   with a JSON-pointer path and a stable code
//!
//! # Quick Start
//!
//! ```rust
//! use schemald::{build, core_vocabulary, parse_document, validate, BuildOptions, EntityGraph};
//!
//! let vocab = core_vocabulary();
//!
//! // Build a document from an entity graph
//! let mut graph = EntityGraph::new();
//! let address = graph.add("PostalAddress", |e| e.text("addressLocality", "Springfield"));
//! let shop = graph.add("AutoPartsStore", |e| {
//!     e.text("name", "Parts & Co").link("address", address)
//! });
//! graph.add_root(shop);
//! let document = build(vocab, &graph, &BuildOptions::default()).unwrap();
//!
//! // Validate it against the expected root type
//! let json = document.to_json();
//! let result = validate(vocab, &json, Some("LocalBusiness"));
//! assert!(result.ok);
//!
//! // And parse it back
//! let parsed = parse_document(vocab, &json, None).unwrap();
//! assert!(graph.equivalent(&[shop], &parsed.graph, &parsed.roots));
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Vocabulary loading and the type index
//! - [`resolve`]: Composed schemas and union dispatch tables
//! - [`reference`]: `@id` indexing and reference resolution
//! - [`coerce`]: Matching JSON values against a property's allowed types
//! - [`validate`]: Document validation
//! - [`codec`]: Building documents from entity graphs and parsing them back
//! - [`model`]: Type descriptors, entities, and documents
//! - [`error`]: Error types
//! - [`limits`]: Bounds for untrusted input
//!
//! # Security
//!
//! Documents are treated as untrusted input:
//! - Nesting depth and node count are bounded
//! - Walks over documents are iterative or depth-limited
//! - Vocabulary files are bounded in type count and decompressed size

pub mod codec;
pub mod coerce;
pub mod core_vocab;
pub mod error;
pub mod limits;
pub mod model;
pub mod reference;
pub mod registry;
pub mod resolve;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{build, parse_document, parse_document_with, BuildOptions, ParsedDocument, ReferencePolicy};
pub use core_vocab::core_vocabulary;
pub use error::{BuildError, ParseError, RegistryError, StructuralError, ValidationError, ValidationWarning};
pub use model::{
    Cardinality, Document, Entity, EntityBuilder, EntityGraph, EntityKey, EntityRef, NodeValue,
    PropertyValue, Scalar, TypeDescriptor, TypeId,
};
pub use registry::LoadOptions;
pub use resolve::{normalize_type_name, Vocabulary};
pub use validate::{validate, validate_str, validate_with, ValidationOptions, ValidationResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
