//! JSON-LD document containers.
//!
//! A document is either a single node carrying `@context` or a `Graph`
//! (`{ "@context", "@graph": [nodes] }`). [`Document`] is the form the
//! builder emits; [`top_level`] splits an incoming JSON value into its
//! top-level nodes, reporting the structural problems that make a document
//! unprocessable.

use serde_json::{Map, Value};

use crate::error::StructuralError;
use crate::limits::SCHEMA_ORG_CONTEXT;
use crate::util::pointer;

/// A JSON node object.
pub type NodeObject = Map<String, Value>;

/// A document ready for serialisation.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// A single node, emitted with `@context` added.
    Node(NodeObject),
    /// Several top-level nodes under `@graph`.
    Graph(Vec<NodeObject>),
}

impl Document {
    pub fn is_graph(&self) -> bool {
        matches!(self, Document::Graph(_))
    }

    /// Returns the top-level nodes.
    pub fn nodes(&self) -> &[NodeObject] {
        match self {
            Document::Node(node) => std::slice::from_ref(node),
            Document::Graph(nodes) => nodes,
        }
    }

    /// Renders the document as JSON with `@context` in place.
    pub fn to_json(&self) -> Value {
        self.clone().into_json()
    }

    /// Consumes the document and renders it as JSON.
    pub fn into_json(self) -> Value {
        let context = Value::String(SCHEMA_ORG_CONTEXT.to_string());
        match self {
            Document::Node(node) => {
                let mut out = Map::with_capacity(node.len() + 1);
                out.insert("@context".to_string(), context);
                out.extend(node);
                Value::Object(out)
            }
            Document::Graph(nodes) => {
                let mut out = Map::with_capacity(2);
                out.insert("@context".to_string(), context);
                out.insert(
                    "@graph".to_string(),
                    Value::Array(nodes.into_iter().map(Value::Object).collect()),
                );
                Value::Object(out)
            }
        }
    }

    /// Serialises the document to a pretty-printed string.
    pub fn to_string_pretty(&self) -> String {
        // A Value built from maps and arrays always serialises.
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }
}

/// The top-level layout of an incoming document.
#[derive(Debug)]
pub struct TopLevel<'a> {
    /// True if the document is a `Graph` container.
    pub graph: bool,
    /// The outermost object.
    pub outer: &'a NodeObject,
    /// Top-level node objects with their JSON pointers.
    pub nodes: Vec<(String, &'a NodeObject)>,
}

/// Splits a document into its top-level nodes.
pub fn top_level(document: &Value) -> Result<TopLevel<'_>, StructuralError> {
    let Value::Object(outer) = document else {
        return Err(StructuralError::NotAnObject {
            path: pointer::display("").to_string(),
        });
    };

    match outer.get("@context") {
        None => return Err(StructuralError::MissingContext),
        Some(Value::String(s)) if s == SCHEMA_ORG_CONTEXT => {}
        Some(other) => {
            return Err(StructuralError::UnsupportedContext {
                found: other.to_string(),
            });
        }
    }

    let Some(graph) = outer.get("@graph") else {
        return Ok(TopLevel {
            graph: false,
            outer,
            nodes: vec![(String::new(), outer)],
        });
    };

    let Value::Array(entries) = graph else {
        return Err(StructuralError::GraphNotArray);
    };

    let base = pointer::push_key("", "@graph");
    let mut nodes = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let path = pointer::push_index(&base, i);
        match entry {
            Value::Object(node) => nodes.push((path, node)),
            _ => return Err(StructuralError::GraphNodeNotObject { path }),
        }
    }

    Ok(TopLevel {
        graph: true,
        outer,
        nodes,
    })
}
