//! Document parsing: JSON-LD into an [`EntityGraph`].
//!
//! A document is validated first and materialised only if it passes. Inline
//! nodes become entities linked by key; references that resolve within the
//! document become key links too, so reference cycles are plain key cycles.
//! External and dangling references stay [`EntityRef::Id`]. A nested node
//! repeating an earlier `@id` is merged into the first definition: it
//! contributes only properties the first definition lacks. Tolerated
//! unknown properties are dropped, but typed nodes with an `@id` found
//! under them become detached entities so references to them still link.

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::debug;

use crate::coerce::{coerce, declared_type, dispatch_root, Matched, Shape};
use crate::error::{ParseError, ValidationWarning};
use crate::model::{
    top_level, Entity, EntityGraph, EntityKey, EntityRef, NodeObject, NodeValue, PropertyValue,
    Scalar, TypeId,
};
use crate::reference::reference_id;
use crate::resolve::{normalize_type_name, Vocabulary};
use crate::validate::{validate_with, ValidationOptions};

/// A materialised document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub graph: EntityGraph,
    /// Top-level nodes, in document order.
    pub roots: Vec<EntityKey>,
    /// Warnings raised while validating the document.
    pub warnings: Vec<ValidationWarning>,
}

/// Validates and materialises a document with default options.
pub fn parse_document(
    vocab: &Vocabulary,
    document: &Value,
    expected_root: Option<&str>,
) -> Result<ParsedDocument, ParseError> {
    parse_document_with(vocab, document, expected_root, &ValidationOptions::default())
}

/// Validates and materialises a document.
pub fn parse_document_with(
    vocab: &Vocabulary,
    document: &Value,
    expected_root: Option<&str>,
    options: &ValidationOptions,
) -> Result<ParsedDocument, ParseError> {
    let result = validate_with(vocab, document, expected_root, options);
    if !result.ok {
        return Err(ParseError::Invalid(result.errors));
    }

    let expected = expected_root.and_then(|name| vocab.registry().id_of(normalize_type_name(name)));
    let top = top_level(document).map_err(|e| ParseError::Invalid(vec![e.into()]))?;

    let mut materializer = Materializer {
        vocab,
        graph: EntityGraph::new(),
        by_id: FxHashMap::default(),
    };

    let mut roots = Vec::with_capacity(top.nodes.len());
    for (_, node) in &top.nodes {
        // Validation succeeded, so every top-level node dispatches.
        if let Ok((ty, _)) = dispatch_root(vocab, node, expected) {
            let key = materializer.materialize(node, ty);
            materializer.graph.add_root(key);
            roots.push(key);
        }
    }
    materializer.link_local_ids();

    debug!(entities = materializer.graph.len(), roots = roots.len(), "document parsed");

    Ok(ParsedDocument {
        graph: materializer.graph,
        roots,
        warnings: result.warnings,
    })
}

struct Materializer<'v> {
    vocab: &'v Vocabulary,
    graph: EntityGraph,
    by_id: FxHashMap<String, EntityKey>,
}

impl Materializer<'_> {
    fn materialize(&mut self, node: &NodeObject, ty: TypeId) -> EntityKey {
        let id = node.get("@id").and_then(Value::as_str);
        let existing = id.and_then(|id| self.by_id.get(id).copied());
        let key = match existing {
            Some(key) => key,
            None => {
                let descriptor = self.vocab.registry().get(ty);
                let type_name = descriptor
                    .discriminator
                    .clone()
                    .unwrap_or_else(|| descriptor.name.clone());
                let mut entity = Entity::new(type_name);
                entity.id = id.map(str::to_string);
                let key = self.graph.insert(entity);
                if let Some(id) = id {
                    self.by_id.insert(id.to_string(), key);
                }
                key
            }
        };

        let vocab = self.vocab;
        let schema = vocab.schema(ty);
        for (name, value) in node {
            if name.starts_with('@') {
                continue;
            }
            let Some(property) = schema.property(name) else {
                self.materialize_detached(value);
                continue;
            };
            if existing.is_some() && self.has_property(key, name) {
                continue;
            }

            let coerced = coerce(vocab, property, value);
            let mut elements = Vec::with_capacity(coerced.elements.len());
            for element in &coerced.elements {
                let node_value = match element.outcome {
                    Ok(Matched::Scalar(_)) | Ok(Matched::BareString) => match scalar(element.value) {
                        Some(s) => NodeValue::Scalar(s),
                        None => continue,
                    },
                    Ok(Matched::Reference { id }) => NodeValue::Ref(EntityRef::Id(id.to_string())),
                    Ok(Matched::Node { type_id, .. }) => match element.value {
                        Value::Object(child) => NodeValue::from(self.materialize(child, type_id)),
                        _ => continue,
                    },
                    Err(_) => continue,
                };
                elements.push(node_value);
            }

            let property_value = match (coerced.shape, elements.len()) {
                (Shape::Single, 1) => elements.pop().map(PropertyValue::One),
                (Shape::Single, _) => None,
                (Shape::Multiple, _) => Some(PropertyValue::Many(elements)),
            };
            if let (Some(property_value), Some(entity)) = (property_value, self.graph.get_mut(key)) {
                entity.properties.insert(name.clone(), property_value);
            }
        }
        key
    }

    /// Materialises the identified, typed nodes held by an undeclared
    /// property. Other nodes are searched for identified descendants.
    fn materialize_detached(&mut self, value: &Value) {
        let nodes: Vec<&NodeObject> = match value {
            Value::Object(object) => vec![object],
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            _ => return,
        };
        for node in nodes {
            if reference_id(node).is_some() {
                continue;
            }
            match (node.contains_key("@id"), declared_type(self.vocab, node)) {
                (true, Some(ty)) => {
                    self.materialize(node, ty);
                }
                _ => {
                    for (name, child) in node {
                        if !name.starts_with('@') {
                            self.materialize_detached(child);
                        }
                    }
                }
            }
        }
    }

    fn has_property(&self, key: EntityKey, name: &str) -> bool {
        self.graph
            .get(key)
            .is_some_and(|e| e.properties.contains_key(name))
    }

    /// Rewrites references to ids defined in the document as key links.
    fn link_local_ids(&mut self) {
        let keys: Vec<EntityKey> = self.graph.iter().map(|(k, _)| k).collect();
        for key in keys {
            let Some(entity) = self.graph.get_mut(key) else {
                continue;
            };
            for value in entity.properties.values_mut() {
                let elements: &mut [NodeValue] = match value {
                    PropertyValue::One(v) => std::slice::from_mut(v),
                    PropertyValue::Many(vs) => vs,
                };
                for element in elements {
                    if let NodeValue::Ref(EntityRef::Id(id)) = element {
                        if let Some(&target) = self.by_id.get(id.as_str()) {
                            *element = NodeValue::from(target);
                        }
                    }
                }
            }
        }
    }
}

fn scalar(value: &Value) -> Option<Scalar> {
    match value {
        Value::String(s) => Some(Scalar::Text(s.clone())),
        Value::Number(n) => Some(Scalar::Number(n.clone())),
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_json_str(
            r#"[
            { "name": "Thing", "properties": [{ "name": "name", "types": ["Text"] }] },
            { "name": "Person", "parents": ["Thing"], "properties": [
                { "name": "knows", "types": ["Person", "IdReference"] },
                { "name": "sameAs", "types": ["URL", "IdReference"] },
                { "name": "birthDate", "types": ["Date"], "cardinality": "single" }
            ] }
        ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cycle_becomes_key_cycle() {
        let v = vocab();
        let doc = json!({
            "@context": "https://schema.org",
            "@graph": [
                { "@id": "#a", "@type": "Person", "knows": { "@id": "#b" } },
                { "@id": "#b", "@type": "Person", "knows": { "@id": "#a" } }
            ]
        });
        let parsed = parse_document(&v, &doc, None).unwrap();
        assert_eq!(parsed.roots.len(), 2);
        let (a, b) = (parsed.roots[0], parsed.roots[1]);
        assert_eq!(parsed.graph.outgoing(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(parsed.graph.outgoing(b).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_shapes_are_preserved() {
        let v = vocab();
        let doc = json!({
            "@context": "https://schema.org",
            "@type": "Person",
            "name": ["Ada"],
            "birthDate": "1815-12-10"
        });
        let parsed = parse_document(&v, &doc, None).unwrap();
        let ada = parsed.graph.get(parsed.roots[0]).unwrap();
        assert!(matches!(ada.get("name"), Some(PropertyValue::Many(v)) if v.len() == 1));
        assert!(matches!(ada.get("birthDate"), Some(PropertyValue::One(_))));
    }

    #[test]
    fn test_inline_nodes_and_external_refs() {
        let v = vocab();
        let doc = json!({
            "@context": "https://schema.org",
            "@type": "Person",
            "knows": [{ "@type": "Person", "name": "Charles" }, { "@id": "https://example.org/mary" }]
        });
        let parsed = parse_document(&v, &doc, None).unwrap();
        assert_eq!(parsed.graph.len(), 2);
        let root = parsed.graph.get(parsed.roots[0]).unwrap();
        let knows = root.get("knows").unwrap().as_slice();
        assert!(knows[0].as_key().is_some());
        assert_eq!(
            knows[1],
            NodeValue::Ref(EntityRef::Id("https://example.org/mary".into()))
        );
    }

    #[test]
    fn test_redefinition_merges_into_first() {
        let v = vocab();
        let doc = json!({
            "@context": "https://schema.org",
            "@graph": [
                { "@id": "#a", "@type": "Person", "knows": { "@id": "#b", "@type": "Person", "name": "B" } },
                { "@id": "#b", "@type": "Person", "name": "Other", "birthDate": "1900-01-01" }
            ]
        });
        let parsed = parse_document(&v, &doc, None).unwrap();
        assert_eq!(parsed.graph.len(), 2);
        assert_eq!(parsed.warnings.len(), 1);
        let b = parsed.graph.get(parsed.roots[1]).unwrap();
        assert_eq!(
            b.get("name"),
            Some(&PropertyValue::One(NodeValue::Scalar(Scalar::Text("B".into()))))
        );
        assert!(b.get("birthDate").is_some());
    }

    #[test]
    fn test_nodes_under_unknown_keys_stay_linkable() {
        let v = vocab();
        let doc = json!({
            "@context": "https://schema.org",
            "@type": "Person",
            "https://example.org/extra": [{ "@id": "#x", "@type": "Person", "name": "X" }],
            "knows": { "@id": "#x" }
        });
        let parsed = parse_document(&v, &doc, None).unwrap();
        assert_eq!(parsed.graph.len(), 2);
        let root = parsed.graph.get(parsed.roots[0]).unwrap();
        assert!(root.get("https://example.org/extra").is_none());
        let target = root.get("knows").unwrap().as_slice()[0].as_key().unwrap();
        assert_eq!(parsed.graph.get(target).unwrap().id.as_deref(), Some("#x"));

        let rebuilt = crate::codec::build(&v, &parsed.graph, &Default::default()).unwrap();
        assert_eq!(rebuilt.nodes()[0]["knows"]["name"], json!("X"));
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let v = vocab();
        let doc = json!({ "@context": "https://schema.org", "@type": "Person", "birthDate": 1990 });
        let err = parse_document(&v, &doc, None).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.code(), "P401");
    }
}
