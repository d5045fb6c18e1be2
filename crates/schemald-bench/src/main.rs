//! Benchmark for schema.org JSON-LD validation using generated business data.
//!
//! Builds a directory of local businesses (with addresses, ratings, and
//! reviews that link back to the business they review) through the builder
//! API, makes one in ten invalid, then measures build, validate and parse
//! throughput, single-threaded and with the vocabulary shared across worker
//! threads.
//!
//! Usage: bench-validate [businesses] [threads]
//! Set `RUST_LOG=schemald=debug` to see per-document logging.

use std::thread;
use std::time::{Duration, Instant};

use schemald::{
    build, core_vocabulary, parse_document, validate, BuildOptions, EntityGraph, ReferencePolicy,
    Vocabulary,
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

const BUSINESS_TYPES: [&str; 6] = [
    "Dentist",
    "Physician",
    "AutoPartsStore",
    "Restaurant",
    "Store",
    "LocalBusiness",
];

const CITIES: [&str; 5] = ["Springfield", "Shelbyville", "Ogdenville", "North Haverbrook", "Capital City"];

/// Deterministic xorshift, so runs are comparable.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

/// Builds one document's entity graph: a business plus its satellites.
fn business_graph(rng: &mut Rng, index: usize) -> EntityGraph {
    let mut graph = EntityGraph::new();

    let city = CITIES[rng.below(CITIES.len())];
    let address = graph.add("PostalAddress", |e| {
        e.text("streetAddress", format!("{} Main Street", 1 + rng.below(900)))
            .text("addressLocality", city)
            .text("postalCode", format!("{:05}", rng.below(99_999)))
    });
    let rating = graph.add("AggregateRating", |e| {
        e.float("ratingValue", 1.0 + rng.below(40) as f64 / 10.0)
            .number("reviewCount", 1 + rng.below(500) as u64)
    });
    let parent = graph.add("Organization", |e| {
        e.id(format!("https://example.org/org/{}", index % 17))
            .text("name", format!("Holding {}", index % 17))
    });

    let kind = BUSINESS_TYPES[rng.below(BUSINESS_TYPES.len())];
    let business = graph.add(kind, |e| {
        e.text("name", format!("Business {}", index))
            .text("telephone", format!("+1-555-{:04}", rng.below(10_000)))
            .text("priceRange", "$$")
            .link("address", address)
            .link("aggregateRating", rating)
            .link("parentOrganization", parent)
    });

    let reviews = 1 + rng.below(4);
    for r in 0..reviews {
        let author = graph.add("Person", |e| e.text("name", format!("Reviewer {}", r)));
        let review = graph.add("Review", |e| {
            e.text("reviewBody", "Friendly staff, would come back.")
                .link("author", author)
                .link("itemReviewed", business)
        });
        graph.link(business, "review", review);
    }

    graph.add_root(business);
    graph
}

fn throughput(count: usize, elapsed: Duration) -> f64 {
    count as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
}

fn validate_all(vocab: &Vocabulary, documents: &[Value]) -> usize {
    documents
        .iter()
        .filter(|doc| validate(vocab, doc, Some("LocalBusiness")).ok)
        .count()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let count: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(20_000);
    let threads: usize = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(4));

    let load_start = Instant::now();
    let vocab = core_vocabulary();
    info!(types = vocab.registry().len(), elapsed = ?load_start.elapsed(), "vocabulary resolved");

    // Entity graphs
    let mut rng = Rng(0x5eed_cafe_f00d_beef);
    let graphs: Vec<EntityGraph> = (0..count).map(|i| business_graph(&mut rng, i)).collect();

    // Build
    let options = BuildOptions {
        references: ReferencePolicy::InlineOnceThenReference,
        ..Default::default()
    };
    let build_start = Instant::now();
    let mut documents = Vec::with_capacity(count);
    for (i, graph) in graphs.iter().enumerate() {
        match build(vocab, graph, &options) {
            Ok(doc) => {
                let mut json = doc.into_json();
                // Every tenth document carries a type mismatch.
                if i % 10 == 0 {
                    if let Some(root) = json.as_object_mut() {
                        root.insert("foundingDate".to_string(), Value::from("next spring"));
                    }
                }
                documents.push(json);
            }
            Err(e) => eprintln!("build failed: {}", e),
        }
    }
    let build_time = build_start.elapsed();
    let bytes: usize = documents.iter().map(|d| d.to_string().len()).sum();
    println!(
        "Built {} documents ({} bytes) in {:?} ({:.0} docs/s)",
        documents.len(),
        bytes,
        build_time,
        throughput(documents.len(), build_time)
    );

    // Validate, single thread
    let validate_start = Instant::now();
    let valid = validate_all(vocab, &documents);
    let validate_time = validate_start.elapsed();
    println!(
        "Validated {} documents ({} ok) in {:?} ({:.0} docs/s)",
        documents.len(),
        valid,
        validate_time,
        throughput(documents.len(), validate_time)
    );

    // Validate, shared vocabulary across threads
    let chunk = documents.len().div_ceil(threads.max(1)).max(1);
    let parallel_start = Instant::now();
    let parallel_valid: usize = thread::scope(|s| {
        let handles: Vec<_> = documents
            .chunks(chunk)
            .map(|part| s.spawn(move || validate_all(vocab, part)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap_or(0)).sum()
    });
    let parallel_time = parallel_start.elapsed();
    println!(
        "Validated {} documents ({} ok) on {} threads in {:?} ({:.0} docs/s)",
        documents.len(),
        parallel_valid,
        threads,
        parallel_time,
        throughput(documents.len(), parallel_time)
    );

    // Parse
    let parse_start = Instant::now();
    let mut entities = 0;
    for doc in &documents {
        if let Ok(parsed) = parse_document(vocab, doc, None) {
            entities += parsed.graph.len();
        }
    }
    let parse_time = parse_start.elapsed();
    println!(
        "Parsed {} documents ({} entities) in {:?} ({:.0} docs/s)",
        documents.len(),
        entities,
        parse_time,
        throughput(documents.len(), parse_time)
    );

    println!("\n=== Summary ===");
    println!("Documents: {}", documents.len());
    println!("Average size: {} bytes", bytes / documents.len().max(1));
    println!(
        "Speedup with {} threads: {:.2}x",
        threads,
        validate_time.as_secs_f64() / parallel_time.as_secs_f64().max(f64::EPSILON)
    );
}
