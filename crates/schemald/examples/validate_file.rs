//! Simple validator to inspect schema.org JSON-LD files.
//!
//! Usage: validate_file <document.json> [expected-type] [vocabulary.json[.zst]]

use std::fs;

use schemald::registry::format_fingerprint;
use schemald::{core_vocabulary, parse_document, validate_str, LoadOptions, Vocabulary};

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "document.json".to_string());
    let expected = args.next();
    let vocab_path = args.next();

    let loaded;
    let vocab = match &vocab_path {
        Some(p) => {
            loaded = Vocabulary::load(p, &LoadOptions::default()).expect("Failed to load vocabulary");
            &loaded
        }
        None => core_vocabulary(),
    };

    println!("Vocabulary: {} types", vocab.registry().len());
    if let Some(version) = vocab.version() {
        println!("Version: {}", version);
    }
    println!("Fingerprint: {}", format_fingerprint(vocab.fingerprint()));

    println!("\nReading: {}", path);
    let json = fs::read_to_string(&path).expect("Failed to read file");
    println!("File size: {} bytes", json.len());

    let result = validate_str(vocab, &json, expected.as_deref());

    println!("\n=== Result ===");
    println!("OK: {}", result.ok);
    println!("Nodes validated: {}", result.nodes_validated);

    if !result.errors.is_empty() {
        println!("\n=== Errors ({}) ===", result.errors.len());
        for error in &result.errors {
            println!("  {}", error);
        }
    }
    if !result.warnings.is_empty() {
        println!("\n=== Warnings ({}) ===", result.warnings.len());
        for warning in &result.warnings {
            println!("  {}", warning);
        }
    }

    if result.ok {
        let value: serde_json::Value = serde_json::from_str(&json).expect("Failed to parse JSON");
        let parsed = parse_document(vocab, &value, expected.as_deref()).expect("Failed to materialise");
        println!("\n=== Entities ({}) ===", parsed.graph.len());
        for (key, entity) in parsed.graph.iter() {
            let id = entity.id.as_deref().unwrap_or("-");
            println!(
                "  #{:<4} {:<24} {:<32} {} properties",
                key.index(),
                entity.type_name,
                id,
                entity.properties.len()
            );
        }
    }
}
