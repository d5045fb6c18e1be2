//! Hard bounds and well-known constants.
//!
//! Documents are untrusted input: every walk over a document is bounded by
//! these limits so a hostile payload cannot exhaust the stack or memory.
//! Vocabulary limits guard the startup path against runaway generator output.

/// The only `@context` value a document may carry.
pub const SCHEMA_ORG_CONTEXT: &str = "https://schema.org";

/// IRI prefixes that normalise to bare type names in `@type`.
pub const SCHEMA_ORG_TYPE_PREFIXES: [&str; 3] =
    ["https://schema.org/", "http://schema.org/", "schema:"];

/// IRIs accepted as spellings of the `Boolean` scalar.
pub const SCHEMA_ORG_TRUE: &str = "https://schema.org/True";
pub const SCHEMA_ORG_FALSE: &str = "https://schema.org/False";

/// The type name denoting a bare `{ "@id": ... }` reference.
pub const ID_REFERENCE: &str = "IdReference";

/// The property whose presence marks a type as an extension point.
pub const EXTENSION_PROPERTY: &str = "additionalProperty";

/// Maximum nesting depth of inline nodes.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Maximum number of node objects in a single document.
pub const MAX_DOCUMENT_NODES: usize = 100_000;

/// Maximum number of type records in a vocabulary file.
pub const MAX_VOCABULARY_TYPES: usize = 10_000;

/// Maximum number of own properties on a single type record.
pub const MAX_PROPERTIES_PER_TYPE: usize = 2_000;

/// zstd frame magic, little-endian `0xFD2FB528`.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Maximum decompressed size of a vocabulary file (64 MiB).
pub const MAX_VOCABULARY_BYTES: usize = 64 * 1024 * 1024;

/// Values longer than this are truncated when rendered into diagnostics.
pub const MAX_RENDERED_VALUE_LEN: usize = 80;
