//! Vocabulary file decoding.
//!
//! A vocabulary file is JSON, either a bare array of type records or an
//! object `{ "version": ..., "types": [...] }`. Files that begin with the
//! zstd frame magic are decompressed first.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::RegistryError;
use crate::limits::{
    MAX_PROPERTIES_PER_TYPE, MAX_VOCABULARY_BYTES, MAX_VOCABULARY_TYPES, ZSTD_MAGIC,
};
use crate::model::Cardinality;

/// Bounds applied while loading a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub max_types: usize,
    pub max_properties_per_type: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_types: MAX_VOCABULARY_TYPES,
            max_properties_per_type: MAX_PROPERTIES_PER_TYPE,
        }
    }
}

/// One type as it appears in the vocabulary file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRecord {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
    #[serde(default = "default_leaf")]
    pub leaf: bool,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub string_alternative: bool,
}

fn default_leaf() -> bool {
    true
}

/// One property as it appears in the vocabulary file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    pub types: Vec<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub deprecated: bool,
}

/// A decoded vocabulary file.
#[derive(Debug, Clone)]
pub struct VocabularyFile {
    pub version: Option<String>,
    pub types: Vec<TypeRecord>,
    /// SHA-256 of the bytes as supplied (before decompression).
    pub fingerprint: [u8; 32],
}

#[derive(Deserialize)]
struct Versioned {
    #[serde(default)]
    version: Option<String>,
    types: Vec<TypeRecord>,
}

/// Reads and decodes a vocabulary file from disk.
pub fn read_vocabulary(path: impl AsRef<Path>) -> Result<VocabularyFile, RegistryError> {
    let bytes = std::fs::read(path)?;
    decode_vocabulary(&bytes)
}

/// Decodes vocabulary bytes, decompressing zstd input transparently.
pub fn decode_vocabulary(bytes: &[u8]) -> Result<VocabularyFile, RegistryError> {
    let fingerprint: [u8; 32] = Sha256::digest(bytes).into();

    let decompressed;
    let json = if bytes.starts_with(&ZSTD_MAGIC) {
        decompressed = decompress(bytes)?;
        decompressed.as_slice()
    } else {
        bytes
    };

    let (version, types) = match serde_json::from_slice::<Value>(json)? {
        Value::Array(items) => {
            let types = serde_json::from_value(Value::Array(items))?;
            (None, types)
        }
        other => {
            let versioned: Versioned = serde_json::from_value(other)?;
            (versioned.version, versioned.types)
        }
    };

    Ok(VocabularyFile {
        version,
        types,
        fingerprint,
    })
}

fn decompress(compressed: &[u8]) -> Result<Vec<u8>, RegistryError> {
    let decoder = zstd::Decoder::new(compressed)
        .map_err(|e| RegistryError::Decompression(e.to_string()))?;

    let mut decompressed = Vec::new();
    decoder
        .take(MAX_VOCABULARY_BYTES as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| RegistryError::Decompression(e.to_string()))?;

    if decompressed.len() > MAX_VOCABULARY_BYTES {
        return Err(RegistryError::LimitExceeded {
            what: "decompressed vocabulary byte",
            count: decompressed.len(),
            max: MAX_VOCABULARY_BYTES,
        });
    }
    Ok(decompressed)
}

/// Formats a fingerprint as lowercase hex.
pub fn format_fingerprint(fingerprint: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for byte in fingerprint {
        s.push_str(&format!("{:02x}", byte));
    }
    s
}
