//! The bundled schema.org core vocabulary.
//!
//! A curated subset of schema.org (things, people, organizations, local
//! businesses, places, creative works, offers, ratings and events) that is
//! enough for typical structured-data markup. Applications with their own
//! generated vocabulary load it through [`Vocabulary::load`] instead.

use lazy_static::lazy_static;

use crate::registry::LoadOptions;
use crate::resolve::Vocabulary;

/// The bundled vocabulary file, as JSON.
pub const CORE_VOCABULARY_JSON: &str = include_str!("../vocab/schemaorg-core.json");

lazy_static! {
    static ref CORE: Vocabulary =
        Vocabulary::from_slice(CORE_VOCABULARY_JSON.as_bytes(), &LoadOptions::default())
            .expect("bundled vocabulary must resolve");
}

/// Returns the bundled core vocabulary, resolving it on first use.
pub fn core_vocabulary() -> &'static Vocabulary {
    &CORE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_vocabulary_resolves() {
        let vocab = core_vocabulary();
        assert_eq!(vocab.version(), Some("core-29.0"));
        assert!(vocab.registry().lookup("LocalBusiness").is_some());
        assert!(vocab.registry().by_discriminator("Dentist").is_some());
    }

    #[test]
    fn test_core_vocabulary_is_shared() {
        assert!(std::ptr::eq(core_vocabulary(), core_vocabulary()));
    }

    #[test]
    fn test_abstract_types_have_no_discriminator() {
        let vocab = core_vocabulary();
        let thing = vocab.registry().lookup("Intangible").unwrap();
        assert!(!thing.is_leaf);
        assert!(vocab.registry().by_discriminator("Intangible").is_none());
    }
}
