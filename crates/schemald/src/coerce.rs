//! Value coercion.
//!
//! Normalises a raw property value to a sequence of elements and matches
//! each element against the property's allowed set. A bare value is a
//! one-element sequence; an array is accepted only where the property is
//! `multiple-or-single`. Each element is matched by trying, in order:
//!
//! 1. the scalar kinds the property lists, in vocabulary order
//! 2. a bare string, if one of the allowed unions admits one
//! 3. the `{ "@id": string }` reference shape, if `IdReference` is allowed
//! 4. an inline node, dispatched on its `@type` through the dispatch tables
//!    of the allowed entity types (or defaulted when `@type` is absent and
//!    exactly one concrete type is admitted)
//!
//! The first match wins.

use serde_json::Value;

use crate::limits::{SCHEMA_ORG_FALSE, SCHEMA_ORG_TRUE};
use crate::model::{Cardinality, NodeObject, ScalarKind, TypeId, TypeRef};
use crate::reference::reference_id;
use crate::resolve::{normalize_type_name, ResolvedProperty, Vocabulary};
use crate::util::datetime::{is_date, is_datetime, is_time};

/// The JSON shape a property value was supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    Multiple,
}

/// A successful element match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matched<'a> {
    Scalar(ScalarKind),
    /// A plain string standing in for an entity of a union that admits one.
    BareString,
    Reference { id: &'a str },
    Node {
        type_id: TypeId,
        /// True if `@type` was absent and the type was inferred.
        defaulted: bool,
    },
}

/// Why an element failed to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The element fits none of the allowed types.
    NoMatch,
    /// `@type` names nothing in the vocabulary.
    UnknownType(String),
    /// `@type` names a type that cannot be instantiated.
    AbstractType(String),
    /// `@type` is absent and several concrete types would be admitted.
    MissingType,
    /// `@type` is an array of more than one value.
    TypeArray,
}

/// One element of a coerced value.
#[derive(Debug, Clone)]
pub struct Element<'a> {
    /// Position within the array, or `None` for a bare value.
    pub index: Option<usize>,
    pub value: &'a Value,
    pub outcome: Result<Matched<'a>, Mismatch>,
}

/// A property value split into matched elements.
#[derive(Debug, Clone)]
pub struct Coerced<'a> {
    pub shape: Shape,
    /// False if an array was supplied for a `single` property.
    pub cardinality_ok: bool,
    pub elements: Vec<Element<'a>>,
}

impl Coerced<'_> {
    /// Returns true if the shape is legal and every element matched.
    pub fn is_ok(&self) -> bool {
        self.cardinality_ok && self.elements.iter().all(|e| e.outcome.is_ok())
    }
}

/// Coerces a raw value against a resolved property.
pub fn coerce<'a>(vocab: &Vocabulary, property: &ResolvedProperty, value: &'a Value) -> Coerced<'a> {
    match value {
        Value::Array(items) => Coerced {
            shape: Shape::Multiple,
            cardinality_ok: property.cardinality == Cardinality::MultipleOrSingle,
            elements: items
                .iter()
                .enumerate()
                .map(|(i, item)| Element {
                    index: Some(i),
                    value: item,
                    outcome: match_element(vocab, &property.allowed, item),
                })
                .collect(),
        },
        single => Coerced {
            shape: Shape::Single,
            cardinality_ok: true,
            elements: vec![Element {
                index: None,
                value: single,
                outcome: match_element(vocab, &property.allowed, single),
            }],
        },
    }
}

/// Matches one element against an allowed set.
pub fn match_element<'a>(
    vocab: &Vocabulary,
    allowed: &[TypeRef],
    value: &'a Value,
) -> Result<Matched<'a>, Mismatch> {
    for type_ref in allowed {
        if let TypeRef::Scalar(kind) = type_ref {
            if scalar_matches(*kind, value) {
                return Ok(Matched::Scalar(*kind));
            }
        }
    }

    let object = match value {
        Value::String(_) if vocab.accepts_string(allowed) => return Ok(Matched::BareString),
        Value::Object(object) => object,
        _ => return Err(Mismatch::NoMatch),
    };

    if let Some(id) = reference_id(object) {
        return if allowed.contains(&TypeRef::IdReference) {
            Ok(Matched::Reference { id })
        } else {
            Err(Mismatch::NoMatch)
        };
    }

    if !allowed.iter().any(|t| t.as_type().is_some()) {
        return Err(Mismatch::NoMatch);
    }

    match declared_type_name(object)? {
        Some(name) => match vocab.dispatch_any(allowed, name) {
            Some(type_id) => Ok(Matched::Node {
                type_id,
                defaulted: false,
            }),
            None => Err(classify_unmatched(vocab, name)),
        },
        None => match vocab.single_concrete(allowed) {
            Some(type_id) => Ok(Matched::Node {
                type_id,
                defaulted: true,
            }),
            None => Err(Mismatch::MissingType),
        },
    }
}

/// Determines the type of a top-level node. `@type` selects any leaf of the
/// vocabulary; when it is absent, the node is typed from `expected` if that
/// admits exactly one concrete type.
pub fn dispatch_root(
    vocab: &Vocabulary,
    node: &NodeObject,
    expected: Option<TypeId>,
) -> Result<(TypeId, bool), Mismatch> {
    match declared_type_name(node)? {
        Some(name) => match vocab.registry().by_discriminator(name) {
            Some(descriptor) => Ok((descriptor.id, false)),
            None => Err(classify_unmatched(vocab, name)),
        },
        None => expected
            .and_then(|root| vocab.single_concrete(&[TypeRef::Type(root)]))
            .map(|id| (id, true))
            .ok_or(Mismatch::MissingType),
    }
}

/// Returns the concrete leaf a node's `@type` names, ignoring context.
pub fn declared_type(vocab: &Vocabulary, node: &NodeObject) -> Option<TypeId> {
    let name = declared_type_name(node).ok()??;
    vocab.registry().by_discriminator(name).map(|d| d.id)
}

/// Reads `@type`, normalised. A one-element array is accepted.
fn declared_type_name(node: &NodeObject) -> Result<Option<&str>, Mismatch> {
    match node.get("@type") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(normalize_type_name(s))),
        Some(Value::Array(items)) => match items.as_slice() {
            [Value::String(s)] => Ok(Some(normalize_type_name(s))),
            [_, _, ..] => Err(Mismatch::TypeArray),
            _ => Err(Mismatch::NoMatch),
        },
        Some(_) => Err(Mismatch::NoMatch),
    }
}

fn classify_unmatched(vocab: &Vocabulary, name: &str) -> Mismatch {
    let registry = vocab.registry();
    match registry.lookup(name) {
        Some(descriptor) if !descriptor.is_leaf => Mismatch::AbstractType(name.to_string()),
        Some(_) => Mismatch::NoMatch,
        None if registry.by_discriminator(name).is_some() => Mismatch::NoMatch,
        None => Mismatch::UnknownType(name.to_string()),
    }
}

/// Returns true if `value` is a legal instance of a scalar kind.
pub fn scalar_matches(kind: ScalarKind, value: &Value) -> bool {
    match (kind, value) {
        (ScalarKind::Text, Value::String(_)) => true,
        (ScalarKind::Number, Value::Number(_)) => true,
        (ScalarKind::Number, Value::String(s)) => is_numeric_string(s),
        (ScalarKind::Boolean, Value::Bool(_)) => true,
        (ScalarKind::Boolean, Value::String(s)) => s == SCHEMA_ORG_TRUE || s == SCHEMA_ORG_FALSE,
        (ScalarKind::Date, Value::String(s)) => is_date(s),
        (ScalarKind::DateTime, Value::String(s)) => is_datetime(s),
        (ScalarKind::Time, Value::String(s)) => is_time(s),
        (ScalarKind::Url, Value::String(s)) => is_url(s),
        _ => false,
    }
}

/// A decimal number written as a string, e.g. `"4.5"` or `"-12"`.
fn is_numeric_string(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
        && s.parse::<f64>().is_ok_and(f64::is_finite)
}

fn is_url(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}
