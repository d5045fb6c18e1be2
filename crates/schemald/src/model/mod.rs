//! Data model types.
//!
//! - Vocabulary descriptors (types, properties, scalar kinds)
//! - Entity graphs (typed nodes linked by key)
//! - Documents (single node or `@graph` containers)
//! - Builders (ergonomic construction)

pub mod builder;
pub mod document;
pub mod entity;
pub mod vocab;

pub use builder::EntityBuilder;
pub use document::{top_level, Document, NodeObject, TopLevel};
pub use entity::{Entity, EntityGraph, EntityKey, EntityRef, NodeValue, PropertyValue, Scalar};
pub use vocab::{Cardinality, PropertyDescriptor, ScalarKind, TypeDescriptor, TypeId, TypeRef};
