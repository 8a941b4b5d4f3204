//! Validates compiled conformance documents and the checked-in expected
//! JSON against the document schema at docs/seqn-document-schema.json.

use std::path::{Path, PathBuf};

use seqn_interchange::to_interchange;

fn root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn validator() -> jsonschema::Validator {
    let schema_path = root().join("docs/seqn-document-schema.json");
    let schema_src = std::fs::read_to_string(&schema_path)
        .unwrap_or_else(|e| panic!("Failed to read schema at {}: {}", schema_path.display(), e));
    let schema_value: serde_json::Value = serde_json::from_str(&schema_src).unwrap();
    jsonschema::validator_for(&schema_value)
        .unwrap_or_else(|e| panic!("Failed to compile schema: {}", e))
}

fn files(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(suffix))
        .collect();
    paths.sort();
    paths
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn compiled_positive_sources_match_schema() {
    let validator = validator();
    let mut failures = Vec::new();
    let sources = files(&root().join("conformance/positive"), ".seqn");

    for path in &sources {
        let src = std::fs::read_to_string(path).unwrap();
        let doc = seqn_core::seqn_to_document(&src)
            .unwrap_or_else(|e| panic!("{} failed to compile: {}", path.display(), e));
        let instance = to_interchange(&doc);
        if let Err(error) = validator.validate(&instance) {
            failures.push(format!("{}: {}", path.display(), error));
        }
    }

    assert!(!sources.is_empty(), "No conformance sources found -- check paths");
    assert!(
        failures.is_empty(),
        "Schema validation failed for {} of {} documents:\n{}",
        failures.len(),
        sources.len(),
        failures.join("\n")
    );
}

#[test]
fn expected_outputs_match_schema() {
    let validator = validator();
    let mut failures = Vec::new();
    let mut tested = 0usize;

    let dirs = ["conformance/positive", "conformance/decompile"];
    for dir in dirs {
        for path in files(&root().join(dir), ".json") {
            let name = path.to_string_lossy();
            if name.contains("expected-error") {
                continue;
            }
            // Decompile inputs with an expected error are deliberately malformed.
            let error_twin = name.replace(".json", ".expected-error.json");
            if Path::new(&error_twin).exists() {
                continue;
            }
            if let Err(error) = validator.validate(&read_json(&path)) {
                failures.push(format!("{}: {}", path.display(), error));
            }
            tested += 1;
        }
    }

    assert!(tested > 0, "No expected JSON files found -- check paths");
    assert!(
        failures.is_empty(),
        "Schema validation failed for {} of {} files:\n{}",
        failures.len(),
        tested,
        failures.join("\n")
    );
}

#[test]
fn malformed_documents_are_rejected() {
    let validator = validator();
    let bad = [
        serde_json::json!({"steps": []}),
        serde_json::json!({"id": "x", "steps": [
            {"type": "command", "stem": "CMD", "time": {"type": "ABSOLUTE", "tag": "12:00:00"}}
        ]}),
        serde_json::json!({"id": "x", "steps": [
            {"type": "command", "stem": "CMD", "time": {"type": "COMMAND_COMPLETE"},
             "args": [{"type": "repeat", "value": [[{"type": "repeat", "value": []}]]}]}
        ]}),
        serde_json::json!({"id": "x", "locals": []}),
        serde_json::json!({"id": "x", "requests": [{"name": "r", "steps": []}]}),
    ];
    for instance in &bad {
        assert!(
            !validator.is_valid(instance),
            "expected schema rejection: {}",
            instance
        );
    }
}
