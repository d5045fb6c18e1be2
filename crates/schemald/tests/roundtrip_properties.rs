//! Property-based tests for building, parsing, and type composition.
//!
//! - Round trip: a built document validates, and parsing it yields a graph
//!   equivalent to the one it was built from, under every reference policy
//! - Cardinality: arrays are rejected exactly where a property is single
//! - Diamond: shared ancestors contribute their properties once

use proptest::prelude::*;
use schemald::codec::{ContainerPolicy, IdMinting, ShapePolicy};
use schemald::{
    build, core_vocabulary, parse_document, validate, BuildError, BuildOptions, EntityGraph,
    EntityKey, ReferencePolicy, Vocabulary,
};
use serde_json::json;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

const KINDS: [&str; 4] = ["Person", "Patient", "Organization", "Dentist"];

/// Entity kinds plus link pairs between them (by position).
fn graph_strategy() -> impl Strategy<Value = (Vec<(usize, String)>, Vec<(usize, usize)>)> {
    prop::collection::vec((0..KINDS.len(), "[A-Za-z ]{0,12}"), 1..8).prop_flat_map(|entities| {
        let n = entities.len();
        let links = prop::collection::vec((0..n, 0..n), 0..(n * 2));
        (Just(entities), links)
    })
}

fn policy_strategy() -> impl Strategy<Value = BuildOptions> {
    (
        prop_oneof![
            Just(ReferencePolicy::AlwaysInline),
            Just(ReferencePolicy::AlwaysReference),
            Just(ReferencePolicy::InlineOnceThenReference),
        ],
        prop_oneof![Just(ContainerPolicy::Auto), Just(ContainerPolicy::Graph)],
        prop_oneof![Just(ShapePolicy::Preserve), Just(ShapePolicy::Canonical)],
        prop_oneof![Just(IdMinting::BlankNode), Just(IdMinting::UrnUuid)],
    )
        .prop_map(|(references, container, shape, id_minting)| BuildOptions {
            references,
            container,
            shape,
            id_minting,
        })
}

/// The property linking `from` to `to`, chosen so every pair is legal.
fn link_property(from: &str, to: &str) -> &'static str {
    match (from, to) {
        ("Person" | "Patient", "Person" | "Patient") => "knows",
        ("Person" | "Patient", _) => "worksFor",
        (_, "Person" | "Patient") => "employee",
        _ => "member",
    }
}

fn make_graph(entities: &[(usize, String)], links: &[(usize, usize)]) -> (EntityGraph, Vec<EntityKey>) {
    let mut graph = EntityGraph::new();
    let keys: Vec<EntityKey> = entities
        .iter()
        .map(|(kind, name)| graph.add(KINDS[*kind], |e| e.text("name", name.clone())))
        .collect();
    for (from, to) in links {
        let property = link_property(KINDS[entities[*from].0], KINDS[entities[*to].0]);
        graph.link(keys[*from], property, keys[*to]);
    }
    (graph, keys)
}

fn assert_round_trip(vocab: &Vocabulary, graph: &EntityGraph, options: &BuildOptions) -> Result<(), TestCaseError> {
    let document = match build(vocab, graph, options) {
        Ok(document) => document,
        Err(BuildError::CyclicInline { .. }) => {
            prop_assert_eq!(options.references, ReferencePolicy::AlwaysInline);
            return Ok(());
        }
        Err(e) => return Err(TestCaseError::fail(format!("build failed: {e}"))),
    };

    let json = document.to_json();
    let result = validate(vocab, &json, None);
    prop_assert!(result.ok, "{:?}", result.errors);

    let parsed = parse_document(vocab, &json, None)
        .map_err(|e| TestCaseError::fail(format!("parse failed: {e}")))?;
    prop_assert!(
        graph.equivalent(&graph.effective_roots(), &parsed.graph, &parsed.roots),
        "not equivalent: {}",
        document.to_string_pretty()
    );
    Ok(())
}

// =============================================================================
// ROUND TRIP
// =============================================================================

mod round_trip_properties {
    use super::*;

    proptest! {
        /// Built documents validate and parse back to the same graph.
        #[test]
        fn build_then_parse_is_equivalent(
            (entities, links) in graph_strategy(),
            options in policy_strategy(),
        ) {
            let (graph, _) = make_graph(&entities, &links);
            assert_round_trip(core_vocabulary(), &graph, &options)?;
        }

        /// Explicit roots survive the round trip in order.
        #[test]
        fn explicit_roots_are_top_level(
            (entities, links) in graph_strategy(),
            root_picks in prop::collection::vec(any::<prop::sample::Index>(), 1..3),
        ) {
            let (mut graph, keys) = make_graph(&entities, &links);
            for pick in &root_picks {
                graph.add_root(keys[pick.index(keys.len())]);
            }
            let options = BuildOptions::default();
            assert_round_trip(core_vocabulary(), &graph, &options)?;

            let json = build(core_vocabulary(), &graph, &options).unwrap().into_json();
            let parsed = parse_document(core_vocabulary(), &json, None).unwrap();
            prop_assert_eq!(parsed.roots.len(), graph.roots().len());
        }

        /// Building the same graph twice with blank-node ids is deterministic.
        #[test]
        fn blank_node_minting_is_deterministic((entities, links) in graph_strategy()) {
            let (graph, _) = make_graph(&entities, &links);
            let options = BuildOptions::default();
            let first = build(core_vocabulary(), &graph, &options).unwrap();
            let second = build(core_vocabulary(), &graph, &options).unwrap();
            prop_assert_eq!(first.to_json(), second.to_json());
        }
    }
}

// =============================================================================
// CARDINALITY
// =============================================================================

mod cardinality_properties {
    use super::*;

    proptest! {
        /// Arrays of two or more values are rejected on a single property.
        #[test]
        fn arrays_rejected_for_single(values in prop::collection::vec(-1000i64..1000, 2..6)) {
            let doc = json!({ "@context": "https://schema.org", "@type": "Rating", "ratingValue": values });
            let result = validate(core_vocabulary(), &doc, None);
            prop_assert!(!result.ok);
            prop_assert!(result.errors.iter().all(|e| e.code() == "V102"));
        }

        /// A bare number is accepted on a single property.
        #[test]
        fn bare_number_accepted_for_single(value in -1.0e6f64..1.0e6) {
            let doc = json!({ "@context": "https://schema.org", "@type": "Rating", "ratingValue": value });
            prop_assert!(validate(core_vocabulary(), &doc, None).ok);
        }

        /// Bare values and arrays are both accepted on a multiple property.
        #[test]
        fn multiple_accepts_both_shapes(names in prop::collection::vec("[a-z]{1,8}", 1..5)) {
            let bare = json!({ "@context": "https://schema.org", "@type": "Person", "name": names[0] });
            let array = json!({ "@context": "https://schema.org", "@type": "Person", "name": names });
            prop_assert!(validate(core_vocabulary(), &bare, None).ok);
            prop_assert!(validate(core_vocabulary(), &array, None).ok);
        }
    }
}

// =============================================================================
// DIAMOND COMPOSITION
// =============================================================================

mod diamond_properties {
    use super::*;

    fn properties(prefix: &str, count: usize) -> serde_json::Value {
        (0..count)
            .map(|i| json!({ "name": format!("{prefix}{i}"), "types": ["Text"] }))
            .collect()
    }

    proptest! {
        /// A type reaching an ancestor along several paths composes it once.
        #[test]
        fn shared_ancestor_counted_once(
            base in 0usize..6,
            left in 0usize..4,
            right in 0usize..4,
            own in 0usize..3,
            shared in 0usize..3,
            repeat_base in any::<bool>(),
        ) {
            let mut parents = vec!["Left", "Right"];
            if repeat_base {
                parents.push("Base");
                parents.push("Base");
            }
            let mut right_properties = properties("right", right);
            // Properties also declared on the other branch are unioned, not duplicated.
            if let serde_json::Value::Array(items) = &mut right_properties {
                for i in 0..shared.min(left) {
                    items.push(json!({ "name": format!("left{i}"), "types": ["Number"] }));
                }
            }
            let records = json!([
                { "name": "Base", "properties": properties("base", base) },
                { "name": "Left", "parents": ["Base"], "properties": properties("left", left) },
                { "name": "Right", "parents": ["Base"], "properties": right_properties },
                { "name": "Diamond", "parents": parents, "properties": properties("own", own) },
            ]);
            let vocab = Vocabulary::from_json_str(&records.to_string()).unwrap();

            let diamond = vocab.schema_of("Diamond").unwrap();
            prop_assert_eq!(diamond.len(), base + left + right + own);
            prop_assert_eq!(vocab.schema_of("Left").unwrap().len(), base + left);

            for i in 0..shared.min(left) {
                let property = diamond.property(&format!("left{i}")).unwrap();
                prop_assert_eq!(property.allowed.len(), 2);
            }
        }
    }
}
