//! Validation options and results.

use serde::Deserialize;

use crate::error::{ValidationError, ValidationWarning};
use crate::limits::{MAX_DOCUMENT_NODES, MAX_NESTING_DEPTH};

/// What to do with a reference whose `@id` is neither defined in the
/// document nor an absolute IRI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DanglingPolicy {
    #[default]
    Error,
    Warn,
    Ignore,
}

/// How to treat keys that are not properties of a node's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownPropertyPolicy {
    /// Unknown keys are errors, except on types declaring
    /// `additionalProperty` and for absolute-IRI keys, which warn.
    #[default]
    Strict,
    /// Every unknown key is a warning.
    Tolerant,
}

/// Options for a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub dangling: DanglingPolicy,
    pub unknown_properties: UnknownPropertyPolicy,
    /// Warn when a local reference points at a node of a type the property
    /// does not admit.
    pub check_reference_types: bool,
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            dangling: DanglingPolicy::default(),
            unknown_properties: UnknownPropertyPolicy::default(),
            check_reference_types: true,
            max_depth: MAX_NESTING_DEPTH,
            max_nodes: MAX_DOCUMENT_NODES,
        }
    }
}

/// The outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    /// Node objects checked against a schema.
    pub nodes_validated: usize,
}

impl ValidationResult {
    /// Returns true if there are neither errors nor warnings.
    pub fn is_clean(&self) -> bool {
        self.ok && self.warnings.is_empty()
    }

    /// Returns true if the document passes, optionally failing on warnings.
    pub fn passes(&self, treat_warnings_as_errors: bool) -> bool {
        if treat_warnings_as_errors {
            self.is_clean()
        } else {
            self.ok
        }
    }

    /// Returns the warnings if the document passes, the whole result
    /// otherwise.
    pub fn into_result(
        self,
        treat_warnings_as_errors: bool,
    ) -> Result<Vec<ValidationWarning>, ValidationResult> {
        if self.passes(treat_warnings_as_errors) {
            Ok(self.warnings)
        } else {
            Err(self)
        }
    }

    /// Returns true if validation was aborted by a structural error.
    pub fn is_structural_failure(&self) -> bool {
        self.errors.iter().any(ValidationError::is_structural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructuralError;

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ValidationOptions =
            serde_json::from_str(r#"{ "dangling": "warn", "unknown_properties": "tolerant" }"#)
                .unwrap();
        assert_eq!(options.dangling, DanglingPolicy::Warn);
        assert_eq!(options.unknown_properties, UnknownPropertyPolicy::Tolerant);
        assert!(options.check_reference_types);
        assert_eq!(options.max_depth, MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_warnings_as_errors() {
        let result = ValidationResult {
            ok: true,
            warnings: vec![ValidationWarning::DeprecatedProperty {
                path: "/siblings".into(),
                property: "siblings".into(),
            }],
            ..Default::default()
        };
        assert!(result.passes(false));
        assert!(!result.passes(true));
        assert!(!result.is_clean());
        assert_eq!(result.clone().into_result(false).unwrap().len(), 1);
        assert!(result.into_result(true).is_err());
    }

    #[test]
    fn test_structural_failure() {
        let result = ValidationResult {
            ok: false,
            errors: vec![StructuralError::MissingContext.into()],
            ..Default::default()
        };
        assert!(result.is_structural_failure());
    }
}
