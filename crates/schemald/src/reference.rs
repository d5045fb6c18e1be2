//! Reference resolution.
//!
//! [`NodeIndex`] flattens every node object of a document into a table of
//! [`NodeHandle`]s and indexes them by `@id`. References resolve to handles,
//! never to copies, so cyclic documents are walked in bounded time. The
//! index borrows the document and never mutates it.
//!
//! A reference that does not resolve locally is classified as either
//! [`Resolution::External`] (an absolute IRI, which schema.org documents
//! routinely use to point at canonical pages) or [`Resolution::Dangling`]
//! (a relative or blank-node id that should have been defined in this
//! document). The validator applies its dangling-reference policy to the
//! latter only.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::StructuralError;
use crate::model::{NodeObject, TopLevel};
use crate::util::pointer;

/// Handle to an indexed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Outcome of resolving an `@id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Defined by a node of this document.
    Local(NodeHandle),
    /// Not defined here, but an absolute IRI.
    External,
    /// Not defined here and not an absolute IRI.
    Dangling,
}

/// An indexed node object.
#[derive(Debug, Clone)]
pub struct IndexedNode<'a> {
    pub path: String,
    pub object: &'a NodeObject,
    pub id: Option<&'a str>,
    pub top_level: bool,
    pub depth: usize,
}

/// A nested node repeating an `@id` defined earlier in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redefinition {
    pub id: String,
    pub path: String,
    pub first: String,
}

/// Document-wide node index.
#[derive(Debug)]
pub struct NodeIndex<'a> {
    nodes: Vec<IndexedNode<'a>>,
    by_id: FxHashMap<&'a str, NodeHandle>,
    by_path: FxHashMap<String, NodeHandle>,
    top_level_ids: FxHashMap<&'a str, NodeHandle>,
    redefinitions: Vec<Redefinition>,
}

impl<'a> NodeIndex<'a> {
    /// Indexes every node reachable from the top-level nodes.
    ///
    /// Fails if two top-level `@graph` nodes share an `@id` or if the
    /// document holds more than `max_nodes` nodes.
    pub fn build(top: &TopLevel<'a>, max_nodes: usize) -> Result<NodeIndex<'a>, StructuralError> {
        let mut index = NodeIndex {
            nodes: Vec::new(),
            by_id: FxHashMap::default(),
            by_path: FxHashMap::default(),
            top_level_ids: FxHashMap::default(),
            redefinitions: Vec::new(),
        };

        // Explicit stack in document order: each top-level node is fully
        // walked before the next one.
        let mut stack: Vec<(String, &'a NodeObject, usize)> = Vec::new();
        for (path, node) in &top.nodes {
            stack.push((path.clone(), *node, 0));
            while let Some((path, object, depth)) = stack.pop() {
                if index.nodes.len() >= max_nodes {
                    return Err(StructuralError::TooManyNodes { max: max_nodes });
                }
                index.add(path.clone(), object, depth)?;

                let mut children = Vec::new();
                for (key, value) in object {
                    if key.starts_with('@') {
                        continue;
                    }
                    collect_nodes(value, pointer::push_key(&path, key), depth + 1, &mut children);
                }
                stack.extend(children.into_iter().rev());
            }
        }

        Ok(index)
    }

    fn add(&mut self, path: String, object: &'a NodeObject, depth: usize) -> Result<(), StructuralError> {
        let handle = NodeHandle(self.nodes.len());
        let id = object.get("@id").and_then(Value::as_str);
        let top_level = depth == 0;

        if let Some(id) = id {
            if top_level {
                if let Some(&first) = self.top_level_ids.get(id) {
                    return Err(StructuralError::DuplicateIdentifier {
                        id: id.to_string(),
                        first: self.nodes[first.0].path.clone(),
                        second: path,
                    });
                }
                self.top_level_ids.insert(id, handle);
            }

            match self.by_id.get(id) {
                Some(&first) => self.redefinitions.push(Redefinition {
                    id: id.to_string(),
                    path: path.clone(),
                    first: self.nodes[first.0].path.clone(),
                }),
                None => {
                    self.by_id.insert(id, handle);
                }
            }
        }

        self.by_path.insert(path.clone(), handle);
        self.nodes.push(IndexedNode {
            path,
            object,
            id,
            top_level,
            depth,
        });
        Ok(())
    }

    /// Returns the number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, handle: NodeHandle) -> &IndexedNode<'a> {
        &self.nodes[handle.0]
    }

    /// Iterates over all nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &IndexedNode<'a>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeHandle(i), n))
    }

    /// Returns the handle of the node at a JSON pointer.
    pub fn handle_at(&self, path: &str) -> Option<NodeHandle> {
        self.by_path.get(path).copied()
    }

    /// Returns the handle of the defining node for `handle`: itself, or the
    /// earlier node that first defined the same `@id`.
    pub fn canonical(&self, handle: NodeHandle) -> NodeHandle {
        self.nodes[handle.0]
            .id
            .and_then(|id| self.by_id.get(id).copied())
            .unwrap_or(handle)
    }

    /// Nested nodes that repeat an earlier `@id`.
    pub fn redefinitions(&self) -> &[Redefinition] {
        &self.redefinitions
    }

    /// Resolves an `@id`.
    pub fn resolve(&self, id: &str) -> Resolution {
        match self.by_id.get(id) {
            Some(&handle) => Resolution::Local(handle),
            None if is_absolute_iri(id) => Resolution::External,
            None => Resolution::Dangling,
        }
    }

    /// Resolves every element of `property` on a node: references through
    /// the id table, inline nodes to their own (canonical) handle. Scalars
    /// are skipped.
    pub fn follow(&self, handle: NodeHandle, property: &str) -> Vec<Resolution> {
        let node = &self.nodes[handle.0];
        let Some(value) = node.object.get(property) else {
            return Vec::new();
        };
        let base = pointer::push_key(&node.path, property);

        let elements: Vec<(String, &Value)> = match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (pointer::push_index(&base, i), v))
                .collect(),
            other => vec![(base, other)],
        };

        let mut out = Vec::new();
        for (path, element) in elements {
            let Value::Object(object) = element else {
                continue;
            };
            if let Some(id) = reference_id(object) {
                out.push(self.resolve(id));
            } else if let Some(h) = self.handle_at(&path) {
                out.push(Resolution::Local(self.canonical(h)));
            }
        }
        out
    }
}

/// Pushes the node objects found in a property value, in document order.
fn collect_nodes<'a>(
    value: &'a Value,
    path: String,
    depth: usize,
    out: &mut Vec<(String, &'a NodeObject, usize)>,
) {
    match value {
        Value::Object(object) if reference_id(object).is_none() => {
            out.push((path, object, depth));
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if let Value::Object(object) = item {
                    if reference_id(object).is_none() {
                        out.push((pointer::push_index(&path, i), object, depth));
                    }
                }
            }
        }
        _ => {}
    }
}

/// Returns the id of a bare `{ "@id": string }` reference.
pub fn reference_id(object: &NodeObject) -> Option<&str> {
    if object.len() != 1 {
        return None;
    }
    object.get("@id").and_then(Value::as_str)
}

/// Returns true if `value` begins with an RFC 3986 scheme (`ALPHA *(
/// ALPHA / DIGIT / "+" / "-" / "." ) ":"`). Blank node identifiers (`_:`)
/// are not IRIs.
pub fn is_absolute_iri(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let valid_scheme = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid_scheme && !rest.is_empty() && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::limits::MAX_DOCUMENT_NODES;
    use crate::model::top_level;

    #[test]
    fn test_cycle_resolves_to_handles() {
        let doc = json!({
            "@context": "https://schema.org",
            "@graph": [
                { "@id": "#a", "@type": "Person", "knows": { "@id": "#b" } },
                { "@id": "#b", "@type": "Person", "knows": { "@id": "#a" } }
            ]
        });
        let top = top_level(&doc).unwrap();
        let index = NodeIndex::build(&top, MAX_DOCUMENT_NODES).unwrap();
        assert_eq!(index.len(), 2);

        let Resolution::Local(a) = index.resolve("#a") else { panic!() };
        let Resolution::Local(b) = index.resolve("#b") else { panic!() };
        assert_eq!(index.follow(a, "knows"), vec![Resolution::Local(b)]);
        assert_eq!(index.follow(b, "knows"), vec![Resolution::Local(a)]);
    }

    #[test]
    fn test_nested_nodes_are_indexed() {
        let doc = json!({
            "@context": "https://schema.org",
            "@type": "Person",
            "knows": [
                { "@type": "Person", "name": "Charles" },
                { "@id": "#mary", "@type": "Person" },
                { "@id": "https://example.org/people/ada" }
            ],
            "address": { "@type": "PostalAddress" }
        });
        let top = top_level(&doc).unwrap();
        let index = NodeIndex::build(&top, MAX_DOCUMENT_NODES).unwrap();
        let paths: Vec<_> = index.iter().map(|(_, n)| n.path.as_str()).collect();
        assert_eq!(paths, vec!["", "/address", "/knows/0", "/knows/1"]);

        let root = index.handle_at("").unwrap();
        let knows = index.follow(root, "knows");
        assert_eq!(knows.len(), 3);
        assert_eq!(knows[0], Resolution::Local(index.handle_at("/knows/0").unwrap()));
        assert_eq!(knows[1], index.resolve("#mary"));
        assert_eq!(knows[2], Resolution::External);
    }

    #[test]
    fn test_classification() {
        let doc = json!({ "@context": "https://schema.org", "@type": "Person" });
        let top = top_level(&doc).unwrap();
        let index = NodeIndex::build(&top, MAX_DOCUMENT_NODES).unwrap();
        assert_eq!(index.resolve("https://example.org/x"), Resolution::External);
        assert_eq!(index.resolve("urn:isbn:0451450523"), Resolution::External);
        assert_eq!(index.resolve("#missing"), Resolution::Dangling);
        assert_eq!(index.resolve("_:b0"), Resolution::Dangling);
        assert_eq!(index.resolve("relative/path"), Resolution::Dangling);
    }

    #[test]
    fn test_duplicate_top_level_ids_are_structural() {
        let doc = json!({
            "@context": "https://schema.org",
            "@graph": [
                { "@id": "#a", "@type": "Person" },
                { "@id": "#a", "@type": "Person" }
            ]
        });
        let top = top_level(&doc).unwrap();
        let err = NodeIndex::build(&top, MAX_DOCUMENT_NODES).unwrap_err();
        assert_eq!(
            err,
            StructuralError::DuplicateIdentifier {
                id: "#a".into(),
                first: "/@graph/0".into(),
                second: "/@graph/1".into(),
            }
        );
    }

    #[test]
    fn test_nested_redefinition_is_recorded() {
        let doc = json!({
            "@context": "https://schema.org",
            "@graph": [
                { "@id": "#a", "@type": "Person", "knows": { "@id": "#b", "@type": "Person" } },
                { "@id": "#b", "@type": "Person", "name": "B" }
            ]
        });
        let top = top_level(&doc).unwrap();
        let index = NodeIndex::build(&top, MAX_DOCUMENT_NODES).unwrap();
        assert_eq!(index.redefinitions().len(), 1);
        assert_eq!(index.redefinitions()[0].first, "/@graph/0/knows");

        let later = index.handle_at("/@graph/1").unwrap();
        assert_eq!(index.canonical(later), index.handle_at("/@graph/0/knows").unwrap());
    }

    #[test]
    fn test_node_limit() {
        let doc = json!({
            "@context": "https://schema.org",
            "@type": "Person",
            "knows": [{ "@type": "Person" }, { "@type": "Person" }]
        });
        let top = top_level(&doc).unwrap();
        assert_eq!(
            NodeIndex::build(&top, 2).unwrap_err(),
            StructuralError::TooManyNodes { max: 2 }
        );
    }
}
