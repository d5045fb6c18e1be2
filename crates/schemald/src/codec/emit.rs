//! Document building: an [`EntityGraph`] into JSON-LD.
//!
//! The builder chooses, for every link, whether to inline the target or
//! emit a `{ "@id" }` reference, following [`ReferencePolicy`]. Entities
//! that end up referenced get an `@id` minted if they lack one. Under
//! [`ReferencePolicy::InlineOnceThenReference`] an entity that would nest
//! deeper than [`MAX_NESTING_DEPTH`] is referenced instead and emitted as
//! an extra top-level node. The result
//! is validated before it is returned, so a built document always passes
//! the validator unchanged.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::BuildError;
use crate::limits::MAX_NESTING_DEPTH;
use crate::model::{Document, EntityGraph, EntityKey, EntityRef, NodeObject, NodeValue, PropertyValue, Scalar};
use crate::resolve::{normalize_type_name, Vocabulary};
use crate::validate::validate;

/// How links between entities are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferencePolicy {
    /// Inline every link. Cyclic graphs cannot be built.
    AlwaysInline,
    /// Emit every entity at top level and every link as a reference.
    AlwaysReference,
    /// Inline the first occurrence (depth-first from the roots) and
    /// reference later ones. First occurrences past the nesting limit are
    /// hoisted to top level.
    #[default]
    InlineOnceThenReference,
}

/// Which container the document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerPolicy {
    /// A single node when there is one top-level node, a `Graph` otherwise.
    #[default]
    Auto,
    /// Always a `Graph`.
    Graph,
}

/// How property values are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapePolicy {
    /// Emit arrays and bare values as the entity records them.
    #[default]
    Preserve,
    /// Collapse one-element arrays to bare values.
    Canonical,
}

/// How missing `@id`s are minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdMinting {
    /// `_:b0`, `_:b1`, ...
    #[default]
    BlankNode,
    /// `urn:uuid:` followed by a random UUID.
    UrnUuid,
}

/// Options for building a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub references: ReferencePolicy,
    pub container: ContainerPolicy,
    pub shape: ShapePolicy,
    pub id_minting: IdMinting,
}

/// Builds a document from the graph's effective roots.
pub fn build(vocab: &Vocabulary, graph: &EntityGraph, options: &BuildOptions) -> Result<Document, BuildError> {
    let roots = graph.effective_roots();
    if roots.is_empty() {
        return Err(BuildError::NoRoots);
    }

    let order = reachable_order(vocab, graph, &roots)?;
    if options.references == ReferencePolicy::AlwaysInline {
        check_acyclic(graph, &order)?;
    }

    let ids = assign_ids(graph, &roots, &order, options);

    let mut emitter = Emitter {
        graph,
        options,
        ids,
        emitted: FxHashSet::default(),
        hoisted: Vec::new(),
    };

    let top: Vec<EntityKey> = match options.references {
        ReferencePolicy::AlwaysReference => order.clone(),
        ReferencePolicy::AlwaysInline | ReferencePolicy::InlineOnceThenReference => roots.clone(),
    };
    emitter.emitted.extend(top.iter().copied());

    let mut nodes = Vec::with_capacity(top.len());
    for key in &top {
        nodes.push(emitter.entity(*key, 0)?);
    }
    let mut next = 0;
    while next < emitter.hoisted.len() {
        let key = emitter.hoisted[next];
        next += 1;
        nodes.push(emitter.entity(key, 0)?);
    }
    let top_level = nodes.len();

    let document = match (options.container, nodes.len()) {
        (ContainerPolicy::Auto, 1) => match nodes.pop() {
            Some(node) => Document::Node(node),
            None => return Err(BuildError::NoRoots),
        },
        _ => Document::Graph(nodes),
    };

    let result = validate(vocab, &document.to_json(), None);
    if !result.ok {
        return Err(BuildError::Invalid(result.errors));
    }

    debug!(
        entities = order.len(),
        top_level,
        hoisted = emitter.hoisted.len(),
        minted = emitter.ids.minted,
        policy = ?options.references,
        "document built"
    );
    Ok(document)
}

/// Lists the entities reachable from the roots, roots first, checking that
/// every link targets an entity of the graph and every type is known.
fn reachable_order(
    vocab: &Vocabulary,
    graph: &EntityGraph,
    roots: &[EntityKey],
) -> Result<Vec<EntityKey>, BuildError> {
    let mut seen: FxHashSet<EntityKey> = FxHashSet::default();
    let mut order: Vec<EntityKey> = Vec::new();
    for root in roots {
        if graph.get(*root).is_none() {
            return Err(BuildError::DanglingKey {
                from: root.index(),
                key: root.index(),
            });
        }
        if seen.insert(*root) {
            order.push(*root);
        }
    }

    let mut next = 0;
    while next < order.len() {
        let key = order[next];
        next += 1;
        let Some(entity) = graph.get(key) else {
            continue;
        };
        let type_name = normalize_type_name(&entity.type_name);
        if vocab.registry().by_discriminator(type_name).is_none() {
            return Err(BuildError::UnknownType {
                key: key.index(),
                type_name: entity.type_name.clone(),
            });
        }
        for target in entity.links() {
            if graph.get(target).is_none() {
                return Err(BuildError::DanglingKey {
                    from: key.index(),
                    key: target.index(),
                });
            }
            if seen.insert(target) {
                order.push(target);
            }
        }
    }
    Ok(order)
}

/// Rejects cycles among the given entities.
fn check_acyclic(graph: &EntityGraph, order: &[EntityKey]) -> Result<(), BuildError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: FxHashMap<EntityKey, Color> = order.iter().map(|k| (*k, Color::White)).collect();
    for start in order {
        if color.get(start) != Some(&Color::White) {
            continue;
        }
        let mut stack: Vec<(EntityKey, Vec<EntityKey>)> =
            vec![(*start, graph.outgoing(*start).collect())];
        color.insert(*start, Color::Gray);

        while let Some((key, pending)) = stack.last_mut() {
            let key = *key;
            let Some(next) = pending.pop() else {
                color.insert(key, Color::Black);
                stack.pop();
                continue;
            };
            match color.get(&next).copied().unwrap_or(Color::Black) {
                Color::Gray => return Err(BuildError::CyclicInline { key: next.index() }),
                Color::White => {
                    color.insert(next, Color::Gray);
                    stack.push((next, graph.outgoing(next).collect()));
                }
                Color::Black => {}
            }
        }
    }
    Ok(())
}

struct AssignedIds<'g> {
    ids: FxHashMap<EntityKey, String>,
    taken: FxHashSet<&'g str>,
    minting: IdMinting,
    counter: usize,
    minted: usize,
}

impl AssignedIds<'_> {
    fn mint(&mut self, key: EntityKey) -> String {
        let id = match self.minting {
            IdMinting::BlankNode => loop {
                let candidate = format!("_:b{}", self.counter);
                self.counter += 1;
                if !self.taken.contains(candidate.as_str()) {
                    break candidate;
                }
            },
            IdMinting::UrnUuid => format!("urn:uuid:{}", Uuid::new_v4()),
        };
        self.ids.insert(key, id.clone());
        self.minted += 1;
        id
    }
}

/// Decides which entities carry an `@id` and mints the missing ones.
fn assign_ids<'g>(
    graph: &'g EntityGraph,
    roots: &[EntityKey],
    order: &[EntityKey],
    options: &BuildOptions,
) -> AssignedIds<'g> {
    let mut incoming: FxHashMap<EntityKey, usize> = FxHashMap::default();
    for key in order {
        for target in graph.outgoing(*key) {
            *incoming.entry(target).or_insert(0) += 1;
        }
    }
    let root_set: FxHashSet<EntityKey> = roots.iter().copied().collect();

    let mut assigned = AssignedIds {
        ids: FxHashMap::default(),
        taken: graph.iter().filter_map(|(_, e)| e.id.as_deref()).collect(),
        minting: options.id_minting,
        counter: 0,
        minted: 0,
    };

    for key in order {
        let Some(entity) = graph.get(*key) else {
            continue;
        };
        if let Some(id) = &entity.id {
            assigned.ids.insert(*key, id.clone());
            continue;
        }

        let links = incoming.get(key).copied().unwrap_or(0);
        let needs_id = match options.references {
            ReferencePolicy::AlwaysReference => links > 0,
            ReferencePolicy::AlwaysInline | ReferencePolicy::InlineOnceThenReference => {
                links + usize::from(root_set.contains(key)) >= 2
            }
        };
        if needs_id {
            assigned.mint(*key);
        }
    }
    assigned
}

struct Emitter<'g> {
    graph: &'g EntityGraph,
    options: &'g BuildOptions,
    ids: AssignedIds<'g>,
    emitted: FxHashSet<EntityKey>,
    /// Entities moved to top level because they sat past the nesting limit.
    hoisted: Vec<EntityKey>,
}

impl Emitter<'_> {
    fn entity(&mut self, key: EntityKey, depth: usize) -> Result<NodeObject, BuildError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(BuildError::TooDeep {
                key: key.index(),
                max: MAX_NESTING_DEPTH,
            });
        }
        let graph = self.graph;
        let Some(entity) = graph.get(key) else {
            return Err(BuildError::DanglingKey {
                from: key.index(),
                key: key.index(),
            });
        };

        let mut out = Map::with_capacity(entity.properties.len() + 2);
        out.insert(
            "@type".to_string(),
            Value::String(normalize_type_name(&entity.type_name).to_string()),
        );
        if let Some(id) = self.ids.ids.get(&key) {
            out.insert("@id".to_string(), Value::String(id.clone()));
        }

        for (name, value) in &entity.properties {
            let mut rendered = Vec::with_capacity(value.len());
            for element in value.as_slice() {
                rendered.push(self.value(element, depth)?);
            }
            let json = match value {
                PropertyValue::One(_) if rendered.len() == 1 => rendered.pop(),
                PropertyValue::Many(_)
                    if rendered.len() == 1 && self.options.shape == ShapePolicy::Canonical =>
                {
                    rendered.pop()
                }
                _ => Some(Value::Array(rendered)),
            };
            if let Some(json) = json {
                out.insert(name.clone(), json);
            }
        }
        Ok(out)
    }

    fn value(&mut self, element: &NodeValue, depth: usize) -> Result<Value, BuildError> {
        let key = match element {
            NodeValue::Scalar(Scalar::Text(s)) => return Ok(Value::String(s.clone())),
            NodeValue::Scalar(Scalar::Number(n)) => return Ok(Value::Number(n.clone())),
            NodeValue::Scalar(Scalar::Bool(b)) => return Ok(Value::Bool(*b)),
            NodeValue::Ref(EntityRef::Id(id)) => return Ok(reference(id)),
            NodeValue::Ref(EntityRef::Node(key)) => *key,
        };

        let inline = match self.options.references {
            ReferencePolicy::AlwaysInline => true,
            ReferencePolicy::AlwaysReference => false,
            ReferencePolicy::InlineOnceThenReference => self.emitted.insert(key),
        };
        let hoist = inline
            && depth + 1 > MAX_NESTING_DEPTH
            && self.options.references == ReferencePolicy::InlineOnceThenReference;
        if hoist {
            let id = match self.ids.ids.get(&key) {
                Some(id) => id.clone(),
                None => self.ids.mint(key),
            };
            self.hoisted.push(key);
            return Ok(reference(&id));
        }
        if inline {
            return self.entity(key, depth + 1).map(Value::Object);
        }
        match self.ids.ids.get(&key) {
            Some(id) => Ok(reference(id)),
            None => self.entity(key, depth + 1).map(Value::Object),
        }
    }
}

fn reference(id: &str) -> Value {
    let mut out = Map::with_capacity(1);
    out.insert("@id".to_string(), Value::String(id.to_string()));
    Value::Object(out)
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
                { "name": "spouse", "types": ["Person", "IdReference"], "cardinality": "single" }
            ] }
        ]"#,
        )
        .unwrap()
    }

    fn friends() -> (EntityGraph, EntityKey, EntityKey) {
        let mut graph = EntityGraph::new();
        let a = graph.add("Person", |e| e.text("name", "Ada"));
        let b = graph.add("Person", |e| e.text("name", "Charles"));
        graph.link(a, "knows", b);
        graph.link(b, "knows", a);
        graph.add_root(a);
        (graph, a, b)
    }

    #[test]
    fn test_inline_once_breaks_cycles() {
        let v = vocab();
        let (graph, _, _) = friends();
        let doc = build(&v, &graph, &BuildOptions::default()).unwrap();
        assert_eq!(
            doc.to_json(),
            json!({
                "@context": "https://schema.org",
                "@type": "Person",
                "@id": "_:b0",
                "name": "Ada",
                "knows": {
                    "@type": "Person",
                    "name": "Charles",
                    "knows": { "@id": "_:b0" }
                }
            })
        );
    }

    #[test]
    fn test_always_reference_uses_graph() {
        let v = vocab();
        let (graph, _, _) = friends();
        let options = BuildOptions {
            references: ReferencePolicy::AlwaysReference,
            ..Default::default()
        };
        let doc = build(&v, &graph, &options).unwrap();
        assert!(doc.is_graph());
        assert_eq!(doc.nodes().len(), 2);
        assert_eq!(doc.nodes()[0]["knows"], json!({ "@id": "_:b1" }));
        assert_eq!(doc.nodes()[1]["knows"], json!({ "@id": "_:b0" }));
    }

    #[test]
    fn test_always_inline_rejects_cycles() {
        let v = vocab();
        let (graph, _, _) = friends();
        let options = BuildOptions {
            references: ReferencePolicy::AlwaysInline,
            ..Default::default()
        };
        assert!(matches!(
            build(&v, &graph, &options),
            Err(BuildError::CyclicInline { .. })
        ));
    }

    #[test]
    fn test_always_inline_duplicates_shared_entities() {
        let v = vocab();
        let mut graph = EntityGraph::new();
        let shared = graph.add("Person", |e| e.text("name", "Mary"));
        let a = graph.add("Person", |e| e.link("knows", shared));
        let b = graph.add("Person", |e| e.link("knows", shared));
        graph.add_root(a);
        graph.add_root(b);

        let options = BuildOptions {
            references: ReferencePolicy::AlwaysInline,
            ..Default::default()
        };
        let doc = build(&v, &graph, &options).unwrap();
        let nodes = doc.nodes();
        assert_eq!(nodes[0]["knows"]["@id"], json!("_:b0"));
        assert_eq!(nodes[1]["knows"]["@id"], json!("_:b0"));
        assert_eq!(nodes[1]["knows"]["name"], json!("Mary"));
    }

    #[test]
    fn test_shape_policies() {
        let v = vocab();
        let mut graph = EntityGraph::new();
        graph.add("Person", |e| e.many("name", [NodeValue::Scalar(Scalar::Text("Ada".into()))]));

        let preserved = build(&v, &graph, &BuildOptions::default()).unwrap();
        assert_eq!(preserved.nodes()[0]["name"], json!(["Ada"]));

        let options = BuildOptions {
            shape: ShapePolicy::Canonical,
            container: ContainerPolicy::Graph,
            ..Default::default()
        };
        let canonical = build(&v, &graph, &options).unwrap();
        assert!(canonical.is_graph());
        assert_eq!(canonical.nodes()[0]["name"], json!("Ada"));
    }

    #[test]
    fn test_urn_uuid_minting() {
        let v = vocab();
        let (graph, _, _) = friends();
        let options = BuildOptions {
            id_minting: IdMinting::UrnUuid,
            ..Default::default()
        };
        let doc = build(&v, &graph, &options).unwrap();
        let id = doc.nodes()[0]["@id"].as_str().unwrap();
        assert!(id.starts_with("urn:uuid:"));
        assert_eq!(doc.nodes()[0]["knows"]["knows"]["@id"], json!(id));
    }

    #[test]
    fn test_minting_skips_taken_ids() {
        let v = vocab();
        let mut graph = EntityGraph::new();
        let a = graph.add("Person", |e| e.id("_:b0"));
        let b = graph.add("Person", |e| e.link("spouse", a));
        graph.link(a, "knows", b);
        graph.add_root(a);
        graph.add_root(b);
        let doc = build(&v, &graph, &BuildOptions::default()).unwrap();
        assert_eq!(doc.nodes()[0]["@id"], json!("_:b0"));
        assert_eq!(doc.nodes()[1]["@id"], json!("_:b1"));
        assert_eq!(doc.nodes()[0]["knows"], json!({ "@id": "_:b1" }));
        assert_eq!(doc.nodes()[1]["spouse"], json!({ "@id": "_:b0" }));
    }

    #[test]
    fn test_long_chain_is_hoisted_past_nesting_limit() {
        let v = vocab();
        let mut graph = EntityGraph::new();
        let keys: Vec<EntityKey> = (0..71)
            .map(|i| graph.add("Person", |e| e.text("name", format!("p{i}"))))
            .collect();
        for pair in keys.windows(2) {
            graph.link(pair[0], "knows", pair[1]);
        }
        graph.add_root(keys[0]);

        let doc = build(&v, &graph, &BuildOptions::default()).unwrap();
        assert!(doc.is_graph());
        let nodes = doc.nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1]["@id"], json!("_:b0"));
        assert_eq!(nodes[1]["name"], json!("p65"));

        let mut deepest = &Value::Object(nodes[0].clone());
        for _ in 0..MAX_NESTING_DEPTH {
            deepest = &deepest["knows"];
        }
        assert_eq!(deepest["name"], json!("p64"));
        assert_eq!(deepest["knows"], json!({ "@id": "_:b0" }));

        let parsed = crate::codec::parse_document(&v, &doc.to_json(), None).unwrap();
        assert!(graph.equivalent(&[keys[0]], &parsed.graph, &parsed.roots));

        let options = BuildOptions {
            references: ReferencePolicy::AlwaysInline,
            ..Default::default()
        };
        assert!(matches!(
            build(&v, &graph, &options),
            Err(BuildError::TooDeep { key: 65, .. })
        ));
    }

    #[test]
    fn test_build_errors() {
        let v = vocab();
        assert_eq!(
            build(&v, &EntityGraph::new(), &BuildOptions::default()),
            Err(BuildError::NoRoots)
        );

        let mut graph = EntityGraph::new();
        graph.add("Robot", |e| e);
        assert!(matches!(
            build(&v, &graph, &BuildOptions::default()),
            Err(BuildError::UnknownType { key: 0, .. })
        ));

        let mut graph = EntityGraph::new();
        graph.add("Person", |e| e.link("knows", EntityKey(9)));
        assert_eq!(
            build(&v, &graph, &BuildOptions::default()),
            Err(BuildError::DanglingKey { from: 0, key: 9 })
        );

        let mut graph = EntityGraph::new();
        graph.add("Person", |e| e.text("shoeSize", "42"));
        assert!(matches!(
            build(&v, &graph, &BuildOptions::default()),
            Err(BuildError::Invalid(errors)) if errors[0].code() == "V103"
        ));
    }

    #[test]
    fn test_options_deserialize() {
        let options: BuildOptions =
            serde_json::from_str(r#"{ "references": "always-reference", "id_minting": "urn-uuid" }"#)
                .unwrap();
        assert_eq!(options.references, ReferencePolicy::AlwaysReference);
        assert_eq!(options.id_minting, IdMinting::UrnUuid);
        assert_eq!(options.shape, ShapePolicy::Preserve);
    }
}
