//! Conversion between JSON-LD documents and entity graphs.
//!
//! [`parse_document`] validates a document and materialises it into an
//! [`EntityGraph`](crate::model::EntityGraph); [`build`] goes the other way
//! and validates its own output.

pub mod emit;
pub mod parse;

pub use emit::{build, BuildOptions, ContainerPolicy, IdMinting, ReferencePolicy, ShapePolicy};
pub use parse::{parse_document, parse_document_with, ParsedDocument};
