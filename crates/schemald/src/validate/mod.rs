//! Document validation.
//!
//! A [`Validator`] walks one document against a resolved [`Vocabulary`].
//! It moves `Start -> Validating -> Done`, or ends in `Failed` once any
//! error has been recorded.
//!
//! Structural problems (malformed JSON, missing or foreign `@context`,
//! duplicate top-level `@id`s) abort immediately and the result holds only
//! that error. Everything else is accumulated: each node is checked
//! completely, all of its properties in turn, before its inline children
//! are visited, so one pass reports as many independent problems as
//! possible.
//!
//! # Example
//!
//! ```rust
//! use schemald::{core_vocabulary, validate};
//! use serde_json::json;
//!
//! let doc = json!({
//!     "@context": "https://schema.org",
//!     "@type": "Person",
//!     "name": "Ada"
//! });
//! let result = validate(core_vocabulary(), &doc, None);
//! assert!(result.ok);
//! ```

mod report;

pub use report::{DanglingPolicy, UnknownPropertyPolicy, ValidationOptions, ValidationResult};

use serde_json::Value;
use tracing::{debug, trace};

use crate::coerce::{coerce, declared_type, dispatch_root, Matched, Mismatch};
use crate::error::{StructuralError, ValidationError, ValidationWarning};
use crate::limits::{EXTENSION_PROPERTY, MAX_RENDERED_VALUE_LEN};
use crate::model::{top_level, NodeObject, TypeId};
use crate::reference::{is_absolute_iri, NodeIndex, Resolution};
use crate::resolve::{normalize_type_name, ResolvedProperty, Vocabulary};
use crate::util::pointer;

/// Validates a document with default options.
///
/// `expected_root` names the type (or union) the document's root must
/// belong to. For a `Graph`, at least one top-level node must belong to it.
pub fn validate(vocab: &Vocabulary, document: &Value, expected_root: Option<&str>) -> ValidationResult {
    validate_with(vocab, document, expected_root, &ValidationOptions::default())
}

/// Validates a document.
pub fn validate_with(
    vocab: &Vocabulary,
    document: &Value,
    expected_root: Option<&str>,
    options: &ValidationOptions,
) -> ValidationResult {
    let mut validator = Validator::new(vocab, options);
    validator.run(document, expected_root);
    validator.finish()
}

/// Parses and validates a JSON string. Malformed JSON is a structural error.
pub fn validate_str(vocab: &Vocabulary, json: &str, expected_root: Option<&str>) -> ValidationResult {
    match serde_json::from_str::<Value>(json) {
        Ok(document) => validate(vocab, &document, expected_root),
        Err(e) => ValidationResult {
            ok: false,
            errors: vec![StructuralError::MalformedJson {
                message: e.to_string(),
            }
            .into()],
            warnings: Vec::new(),
            nodes_validated: 0,
        },
    }
}

/// Validator progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorState {
    Start,
    Validating,
    Done,
    Failed,
}

/// Single-document validator.
#[derive(Debug)]
pub struct Validator<'v> {
    vocab: &'v Vocabulary,
    options: ValidationOptions,
    state: ValidatorState,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
    nodes_validated: usize,
}

impl<'v> Validator<'v> {
    pub fn new(vocab: &'v Vocabulary, options: &ValidationOptions) -> Self {
        Self {
            vocab,
            options: options.clone(),
            state: ValidatorState::Start,
            errors: Vec::new(),
            warnings: Vec::new(),
            nodes_validated: 0,
        }
    }

    pub fn state(&self) -> ValidatorState {
        self.state
    }

    /// Validates a document. A validator checks one document; later calls
    /// are ignored.
    pub fn run(&mut self, document: &Value, expected_root: Option<&str>) {
        if self.state != ValidatorState::Start {
            return;
        }

        let expected = match expected_root {
            None => None,
            Some(name) => match self.vocab.registry().id_of(normalize_type_name(name)) {
                Some(id) => Some(id),
                None => {
                    self.errors.push(ValidationError::UnknownType {
                        path: pointer::display("").to_string(),
                        type_name: name.to_string(),
                    });
                    self.state = ValidatorState::Failed;
                    return;
                }
            },
        };

        let top = match top_level(document) {
            Ok(top) => top,
            Err(e) => return self.abort(e),
        };
        let index = match NodeIndex::build(&top, self.options.max_nodes) {
            Ok(index) => index,
            Err(e) => return self.abort(e),
        };
        self.state = ValidatorState::Validating;

        for redefinition in index.redefinitions() {
            self.warnings.push(ValidationWarning::DuplicateNode {
                path: redefinition.path.clone(),
                id: redefinition.id.clone(),
                first: pointer::display(&redefinition.first).to_string(),
            });
        }

        if top.graph {
            for key in top.outer.keys() {
                if key != "@context" && key != "@graph" {
                    self.warnings.push(ValidationWarning::UnsupportedKeyword {
                        path: pointer::push_key("", key),
                        keyword: key.clone(),
                    });
                }
            }
        }

        let mut root_matched = false;
        for (path, node) in &top.nodes {
            let ty = match dispatch_root(self.vocab, node, expected) {
                Ok((ty, _)) => ty,
                Err(mismatch) => {
                    self.root_mismatch(mismatch, path, node);
                    continue;
                }
            };

            if let Some(expected) = expected {
                if self.vocab.is_subtype(ty, expected) {
                    root_matched = true;
                } else if !top.graph {
                    self.errors.push(ValidationError::RootTypeMismatch {
                        path: pointer::display(path).to_string(),
                        expected: self.vocab.name(expected).to_string(),
                    });
                }
            }

            self.validate_node(&index, node, path, ty, 0);
        }

        if let Some(expected) = expected {
            if top.graph && !root_matched {
                self.errors.push(ValidationError::RootTypeMismatch {
                    path: pointer::push_key("", "@graph"),
                    expected: self.vocab.name(expected).to_string(),
                });
            }
        }

        self.state = if self.errors.is_empty() {
            ValidatorState::Done
        } else {
            ValidatorState::Failed
        };

        debug!(
            nodes = self.nodes_validated,
            errors = self.errors.len(),
            warnings = self.warnings.len(),
            "document validated"
        );
    }

    /// Packages the outcome.
    pub fn finish(self) -> ValidationResult {
        ValidationResult {
            ok: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
            nodes_validated: self.nodes_validated,
        }
    }

    fn abort(&mut self, error: StructuralError) {
        debug!(code = error.code(), "document rejected: {}", error);
        self.errors.clear();
        self.errors.push(error.into());
        self.state = ValidatorState::Failed;
    }

    fn validate_node(
        &mut self,
        index: &NodeIndex<'_>,
        node: &NodeObject,
        path: &str,
        ty: TypeId,
        depth: usize,
    ) {
        self.nodes_validated += 1;
        trace!(path = pointer::display(path), type_name = self.vocab.name(ty), "validating node");

        if let Some(id) = node.get("@id") {
            if !id.is_string() {
                self.errors.push(ValidationError::InvalidIdentifier {
                    path: pointer::push_key(path, "@id"),
                });
            }
        }

        let vocab = self.vocab;
        let schema = vocab.schema(ty);
        let extensible = schema.property(EXTENSION_PROPERTY).is_some();
        let mut children: Vec<(String, &NodeObject, TypeId)> = Vec::new();

        for (key, value) in node {
            if matches!(key.as_str(), "@type" | "@id" | "@context") {
                continue;
            }
            let key_path = pointer::push_key(path, key);

            if key.starts_with('@') {
                self.warnings.push(ValidationWarning::UnsupportedKeyword {
                    path: key_path,
                    keyword: key.clone(),
                });
                continue;
            }

            let Some(property) = schema.property(key) else {
                self.unknown_property(key_path, ty, key, extensible);
                continue;
            };

            if property.deprecated {
                self.warnings.push(ValidationWarning::DeprecatedProperty {
                    path: key_path.clone(),
                    property: key.clone(),
                });
            }

            let coerced = coerce(vocab, property, value);
            if !coerced.cardinality_ok {
                self.errors.push(ValidationError::Cardinality {
                    path: key_path.clone(),
                    property: key.clone(),
                });
            }

            for element in &coerced.elements {
                let element_path = match element.index {
                    Some(i) => pointer::push_index(&key_path, i),
                    None => key_path.clone(),
                };
                match &element.outcome {
                    Ok(Matched::Scalar(_)) | Ok(Matched::BareString) => {}
                    Ok(Matched::Reference { id }) => {
                        self.check_reference(index, property, id, element_path);
                    }
                    Ok(Matched::Node { type_id, .. }) => {
                        if let Value::Object(child) = element.value {
                            children.push((element_path, child, *type_id));
                        }
                    }
                    Err(mismatch) => {
                        self.element_mismatch(mismatch, element_path, property, element.value);
                    }
                }
            }
        }

        for (child_path, child, child_ty) in children {
            if depth + 1 > self.options.max_depth {
                self.errors.push(ValidationError::TooDeep {
                    path: child_path,
                    max: self.options.max_depth,
                });
                continue;
            }
            self.validate_node(index, child, &child_path, child_ty, depth + 1);
        }
    }

    fn unknown_property(&mut self, path: String, ty: TypeId, key: &str, extensible: bool) {
        let tolerated = self.options.unknown_properties == UnknownPropertyPolicy::Tolerant
            || extensible
            || is_absolute_iri(key);
        let type_name = self.vocab.name(ty).to_string();
        if tolerated {
            self.warnings.push(ValidationWarning::UnknownProperty {
                path,
                type_name,
                property: key.to_string(),
            });
        } else {
            self.errors.push(ValidationError::UnknownProperty {
                path,
                type_name,
                property: key.to_string(),
            });
        }
    }

    fn check_reference(
        &mut self,
        index: &NodeIndex<'_>,
        property: &ResolvedProperty,
        id: &str,
        path: String,
    ) {
        match index.resolve(id) {
            Resolution::Local(handle) => {
                if !self.options.check_reference_types {
                    return;
                }
                let allowed: Vec<TypeId> = property.entity_types().collect();
                if allowed.is_empty() {
                    return;
                }
                let Some(found) = declared_type(self.vocab, index.node(handle).object) else {
                    return;
                };
                if !allowed.iter().any(|root| self.vocab.is_subtype(found, *root)) {
                    self.warnings.push(ValidationWarning::ReferenceTypeMismatch {
                        path,
                        id: id.to_string(),
                        found: self.vocab.name(found).to_string(),
                        allowed: allowed
                            .iter()
                            .map(|t| self.vocab.name(*t).to_string())
                            .collect(),
                    });
                }
            }
            Resolution::External => {}
            Resolution::Dangling => match self.options.dangling {
                DanglingPolicy::Error => self.errors.push(ValidationError::DanglingReference {
                    path,
                    id: id.to_string(),
                }),
                DanglingPolicy::Warn => self.warnings.push(ValidationWarning::DanglingReference {
                    path,
                    id: id.to_string(),
                }),
                DanglingPolicy::Ignore => {}
            },
        }
    }

    fn element_mismatch(
        &mut self,
        mismatch: &Mismatch,
        path: String,
        property: &ResolvedProperty,
        value: &Value,
    ) {
        let error = match mismatch {
            Mismatch::NoMatch => ValidationError::TypeMismatch {
                path,
                property: property.name.clone(),
                value: render(value),
                allowed: self.vocab.describe(&property.allowed),
            },
            Mismatch::UnknownType(type_name) => ValidationError::UnknownType {
                path,
                type_name: type_name.clone(),
            },
            Mismatch::AbstractType(type_name) => ValidationError::AbstractType {
                path,
                type_name: type_name.clone(),
            },
            Mismatch::MissingType => ValidationError::MissingType { path },
            Mismatch::TypeArray => ValidationError::UnsupportedTypeArray { path },
        };
        self.errors.push(error);
    }

    fn root_mismatch(&mut self, mismatch: Mismatch, path: &str, node: &NodeObject) {
        let path = pointer::display(path).to_string();
        let error = match mismatch {
            Mismatch::UnknownType(type_name) => ValidationError::UnknownType { path, type_name },
            Mismatch::AbstractType(type_name) => ValidationError::AbstractType { path, type_name },
            Mismatch::MissingType => ValidationError::MissingType { path },
            Mismatch::TypeArray => ValidationError::UnsupportedTypeArray { path },
            Mismatch::NoMatch => ValidationError::UnknownType {
                path,
                type_name: node.get("@type").map(render).unwrap_or_default(),
            },
        };
        self.errors.push(error);
    }
}

/// Renders a value for a diagnostic, truncated to a readable length.
fn render(value: &Value) -> String {
    let mut out = value.to_string();
    if out.chars().count() > MAX_RENDERED_VALUE_LEN {
        out = out.chars().take(MAX_RENDERED_VALUE_LEN).collect();
        out.push_str("...");
    }
    out
}
