//! Type resolution.
//!
//! Turns a [`Registry`] into a [`Vocabulary`]: the registry plus, for every
//! type, its composed [`ResolvedSchema`] and the [`DispatchTable`] of the
//! union it roots. Everything is computed eagerly so that a broken vocabulary
//! is reported at load time, and nothing is mutated afterwards. A
//! `Vocabulary` is `Send + Sync` and is shared by reference across any
//! number of concurrent validations.

pub mod dispatch;
pub mod schema;

use std::path::Path;

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::limits::SCHEMA_ORG_TYPE_PREFIXES;
use crate::model::{TypeId, TypeRef};
use crate::registry::{
    decode_vocabulary, format_fingerprint, read_vocabulary, LoadOptions, Registry, VocabularyFile,
};

pub use dispatch::DispatchTable;
pub use schema::{compose, linearize, ResolvedProperty, ResolvedSchema};

/// A loaded and fully resolved vocabulary.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    registry: Registry,
    schemas: Vec<ResolvedSchema>,
    dispatch: Vec<DispatchTable>,
    version: Option<String>,
    fingerprint: [u8; 32],
}

impl Vocabulary {
    /// Resolves every type of a registry.
    pub fn resolve(registry: Registry) -> Result<Vocabulary, RegistryError> {
        let mut schemas = Vec::with_capacity(registry.len());
        let mut dispatch = Vec::with_capacity(registry.len());
        for ty in registry.iter() {
            schemas.push(compose(&registry, ty.id)?);
            dispatch.push(DispatchTable::build(&registry, ty.id)?);
        }

        debug!(
            types = schemas.len(),
            properties = schemas.iter().map(ResolvedSchema::len).sum::<usize>(),
            "resolved vocabulary schemas"
        );

        Ok(Vocabulary {
            registry,
            schemas,
            dispatch,
            version: None,
            fingerprint: [0u8; 32],
        })
    }

    /// Builds a vocabulary from a decoded vocabulary file.
    pub fn from_file(file: VocabularyFile, options: &LoadOptions) -> Result<Vocabulary, RegistryError> {
        let registry = Registry::from_records(file.types, options)?;
        let mut vocab = Vocabulary::resolve(registry)?;
        vocab.version = file.version;
        vocab.fingerprint = file.fingerprint;

        info!(
            types = vocab.registry.len(),
            version = vocab.version.as_deref().unwrap_or("unversioned"),
            fingerprint = %format_fingerprint(&vocab.fingerprint),
            "vocabulary loaded"
        );
        Ok(vocab)
    }

    /// Builds a vocabulary from raw (optionally zstd-compressed) bytes.
    pub fn from_slice(bytes: &[u8], options: &LoadOptions) -> Result<Vocabulary, RegistryError> {
        Vocabulary::from_file(decode_vocabulary(bytes)?, options)
    }

    /// Builds a vocabulary from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Vocabulary, RegistryError> {
        Vocabulary::from_slice(json.as_bytes(), &LoadOptions::default())
    }

    /// Reads and builds a vocabulary from a file on disk.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Vocabulary, RegistryError> {
        Vocabulary::from_file(read_vocabulary(path)?, options)
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the version string declared by the vocabulary file.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the SHA-256 fingerprint of the vocabulary file.
    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    /// Returns the resolved schema of a type.
    pub fn schema(&self, id: TypeId) -> &ResolvedSchema {
        &self.schemas[id.index()]
    }

    /// Returns the resolved schema of a named type.
    pub fn schema_of(&self, name: &str) -> Option<&ResolvedSchema> {
        self.registry.id_of(name).map(|id| self.schema(id))
    }

    /// Returns the dispatch table of the union rooted at a type.
    pub fn dispatch(&self, id: TypeId) -> &DispatchTable {
        &self.dispatch[id.index()]
    }

    /// Returns the name of a type.
    pub fn name(&self, id: TypeId) -> &str {
        &self.registry.get(id).name
    }

    /// Returns true if `sub` is `sup` or one of its descendants.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        self.schema(sub).is_subtype_of(sup)
    }

    /// Selects the member of any of the listed unions whose discriminator is
    /// `discriminator`, trying the unions in order.
    pub fn dispatch_any(&self, allowed: &[TypeRef], discriminator: &str) -> Option<TypeId> {
        allowed
            .iter()
            .filter_map(|t| t.as_type())
            .find_map(|root| self.dispatch(root).dispatch(discriminator))
    }

    /// Returns the only concrete type admitted by the listed unions, if there
    /// is exactly one. Used to type nodes that omit `@type`.
    pub fn single_concrete(&self, allowed: &[TypeRef]) -> Option<TypeId> {
        let mut members: FxHashSet<TypeId> = FxHashSet::default();
        for root in allowed.iter().filter_map(|t| t.as_type()) {
            members.extend(self.dispatch(root).members());
            if members.len() > 1 {
                return None;
            }
        }
        members.into_iter().next()
    }

    /// Returns true if any of the listed unions admits a bare string.
    pub fn accepts_string(&self, allowed: &[TypeRef]) -> bool {
        allowed
            .iter()
            .filter_map(|t| t.as_type())
            .any(|root| self.dispatch(root).accepts_string())
    }

    /// Renders an allowed set by vocabulary names.
    pub fn describe(&self, allowed: &[TypeRef]) -> Vec<String> {
        allowed
            .iter()
            .map(|t| self.registry.type_ref_name(*t).to_string())
            .collect()
    }
}

/// Strips a schema.org IRI or `schema:` prefix from a `@type` value.
pub fn normalize_type_name(value: &str) -> &str {
    SCHEMA_ORG_TYPE_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: &str = r#"{ "version": "test-1", "types": [
        { "name": "Thing", "properties": [{ "name": "name", "types": ["Text"] }] },
        { "name": "Person", "parents": ["Thing"], "properties": [
            { "name": "knows", "types": ["Person", "IdReference"] }
        ] },
        { "name": "Patient", "parents": ["Person"] },
        { "name": "Place", "parents": ["Thing"] },
        { "name": "Accommodation", "parents": ["Place"], "stringAlternative": true },
        { "name": "House", "parents": ["Accommodation"] }
    ] }"#;

    #[test]
    fn test_from_json_str() {
        let vocab = Vocabulary::from_json_str(VOCAB).unwrap();
        assert_eq!(vocab.version(), Some("test-1"));
        assert_ne!(vocab.fingerprint(), &[0u8; 32]);
        assert_eq!(vocab.registry().len(), 6);

        let person = vocab.schema_of("Person").unwrap();
        assert!(person.property("name").is_some());
        assert!(person.property("knows").is_some());
    }

    #[test]
    fn test_dispatch_any_and_single_concrete() {
        let vocab = Vocabulary::from_json_str(VOCAB).unwrap();
        let reg = vocab.registry();
        let person = TypeRef::Type(reg.id_of("Person").unwrap());
        let house = TypeRef::Type(reg.id_of("House").unwrap());

        assert_eq!(vocab.dispatch_any(&[person], "Patient"), reg.id_of("Patient"));
        assert_eq!(vocab.dispatch_any(&[person], "House"), None);
        assert_eq!(vocab.dispatch_any(&[person, house], "House"), reg.id_of("House"));

        assert_eq!(vocab.single_concrete(&[person]), None);
        assert_eq!(vocab.single_concrete(&[house]), reg.id_of("House"));
        assert_eq!(vocab.single_concrete(&[TypeRef::IdReference]), None);
    }

    #[test]
    fn test_accepts_string() {
        let vocab = Vocabulary::from_json_str(VOCAB).unwrap();
        let reg = vocab.registry();
        let accommodation = TypeRef::Type(reg.id_of("Accommodation").unwrap());
        let place = TypeRef::Type(reg.id_of("Place").unwrap());
        assert!(vocab.accepts_string(&[accommodation]));
        assert!(!vocab.accepts_string(&[place]));
    }

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("Person"), "Person");
        assert_eq!(normalize_type_name("https://schema.org/Person"), "Person");
        assert_eq!(normalize_type_name("http://schema.org/Person"), "Person");
        assert_eq!(normalize_type_name("schema:Person"), "Person");
        assert_eq!(normalize_type_name("https://schema.org/"), "https://schema.org/");
        assert_eq!(normalize_type_name("ex:Person"), "ex:Person");
    }

    #[test]
    fn test_vocabulary_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Vocabulary>();
    }
}
