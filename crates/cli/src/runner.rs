/// Conformance suite runner.
///
/// Convention:
///   positive/        -- *.seqn + *.expected.json (compiles, and the text is canonical)
///   negative/        -- *.seqn + *.expected-error.json (compile error expected)
///   decompile/       -- *.json + *.expected.seqn or *.expected-error.json
///   time/durations.json -- duration inputs with their expected parse or error kind
use crate::tap::Tap;
use serde_json::Value;
use seqn_core::{check_round_trip, document_to_seqn, parse_duration_string, seqn_to_document};
use seqn_core::DurationUnit;
use seqn_interchange::{from_interchange, to_interchange};
use std::path::{Path, PathBuf};

pub struct RunResult {
    pub failed: usize,
}

pub fn run_suite(suite_dir: &Path) -> RunResult {
    let tap = collect(suite_dir);
    let failed = tap.failure_count();
    tap.finish();
    RunResult { failed }
}

fn collect(suite_dir: &Path) -> Tap {
    let mut tap = Tap::new();
    run_positive_tests(suite_dir, &mut tap);
    run_negative_tests(suite_dir, &mut tap);
    run_decompile_tests(suite_dir, &mut tap);
    run_duration_tests(suite_dir, &mut tap);
    tracing::debug!(failed = tap.failure_count(), "conformance suite finished");
    tap
}

fn run_positive_tests(suite_dir: &Path, tap: &mut Tap) {
    let dir = suite_dir.join("positive");
    for source_path in files_with_extension(&dir, "seqn") {
        let name = stem(&source_path);
        let expected_path = dir.join(format!("{}.expected.json", name));
        if !expected_path.exists() {
            tap.not_ok(
                format!("positive/{}", name),
                format!("missing expected file: {}", expected_path.display()),
            );
            continue;
        }

        let outcome = read_text(&source_path).and_then(|src| {
            let expected = read_json(&expected_path)?;
            Ok((src, expected))
        });
        let (src, expected) = match outcome {
            Ok(pair) => pair,
            Err(e) => {
                tap.not_ok(format!("positive/{}", name), e);
                continue;
            }
        };

        let compiled = match seqn_to_document(&src) {
            Ok(doc) => {
                let got = to_interchange(&doc);
                if json_equal(&got, &expected) {
                    Ok(())
                } else {
                    Err(format!("output mismatch:\n{}", json_diff(&expected, &got)))
                }
            }
            Err(e) => Err(format!("unexpected {} error: {}", e.kind(), e)),
        };
        tap.check(format!("positive/{}", name), compiled);

        let round_trip = check_round_trip(&src)
            .map(|_| ())
            .map_err(|e| e.to_string());
        tap.check(format!("round-trip/{}", name), round_trip);
    }
}

fn run_negative_tests(suite_dir: &Path, tap: &mut Tap) {
    let dir = suite_dir.join("negative");
    for source_path in files_with_extension(&dir, "seqn") {
        let name = stem(&source_path);
        let test_name = format!("negative/{}", name);
        let expected_path = dir.join(format!("{}.expected-error.json", name));
        if !expected_path.exists() {
            tap.not_ok(
                test_name,
                format!("missing expected-error file: {}", expected_path.display()),
            );
            continue;
        }

        let result = read_text(&source_path).and_then(|src| {
            let expected = read_json(&expected_path)?;
            match seqn_to_document(&src) {
                Ok(_) => Err("expected a compile error but compilation succeeded".to_string()),
                Err(e) => compare_error(&expected, &e.to_json_value()),
            }
        });
        tap.check(test_name, result);
    }
}

fn run_decompile_tests(suite_dir: &Path, tap: &mut Tap) {
    let dir = suite_dir.join("decompile");
    for json_path in files_with_extension(&dir, "json") {
        let name = stem(&json_path);
        if name.contains(".expected") {
            continue;
        }
        let test_name = format!("decompile/{}", name);
        let expected_text = dir.join(format!("{}.expected.seqn", name));
        let expected_error = dir.join(format!("{}.expected-error.json", name));

        let result = read_json(&json_path).and_then(|value| {
            let rendered = from_interchange(&value)
                .map_err(interchange_error_json)
                .and_then(|doc| document_to_seqn(&doc).map_err(|e| e.to_json_value()));

            if expected_text.exists() {
                let want = read_text(&expected_text)?;
                match rendered {
                    Ok(got) if got == want => Ok(()),
                    Ok(got) => Err(format!("--- expected\n{}+++ got\n{}", want, got)),
                    Err(e) => Err(format!("unexpected error: {}", e)),
                }
            } else if expected_error.exists() {
                let want = read_json(&expected_error)?;
                match rendered {
                    Ok(_) => Err("expected an error but decompilation succeeded".to_string()),
                    Err(got) => compare_error(&want, &got),
                }
            } else {
                Err(format!(
                    "missing {} or {}",
                    expected_text.display(),
                    expected_error.display()
                ))
            }
        });
        tap.check(test_name, result);
    }
}

fn run_duration_tests(suite_dir: &Path, tap: &mut Tap) {
    let path = suite_dir.join("time").join("durations.json");
    if !path.exists() {
        return;
    }
    let cases = match read_json(&path) {
        Ok(Value::Array(cases)) => cases,
        Ok(_) => {
            tap.not_ok("time/durations", "durations.json must hold an array");
            return;
        }
        Err(e) => {
            tap.not_ok("time/durations", e);
            return;
        }
    };

    for (index, case) in cases.iter().enumerate() {
        let input = case.get("input").and_then(Value::as_str).unwrap_or_default();
        tap.check(
            format!("time/durations/{} ({})", index, input),
            run_duration_case(input, case),
        );
    }
}

fn run_duration_case(input: &str, case: &Value) -> Result<(), String> {
    let unit = match case.get("unit").and_then(Value::as_str) {
        Some(u) => u.parse::<DurationUnit>().map_err(|e| e.to_string())?,
        None => DurationUnit::default(),
    };

    match (parse_duration_string(input, unit), case.get("expected")) {
        (Ok(parsed), Some(expected)) => {
            let got = serde_json::to_value(parsed).map_err(|e| e.to_string())?;
            if !json_equal(&got, expected) {
                return Err(format!("output mismatch:\n{}", json_diff(expected, &got)));
            }
            match case.get("display").and_then(Value::as_str) {
                Some(display) if display != parsed.to_string() => Err(format!(
                    "display mismatch: expected '{}', got '{}'",
                    display, parsed
                )),
                _ => Ok(()),
            }
        }
        (Ok(parsed), None) => Err(format!("expected an error, got {}", parsed)),
        (Err(e), _) => match case.get("error").and_then(Value::as_str) {
            Some(kind) if kind == e.kind() => Ok(()),
            _ => Err(format!("unexpected error: {}", e)),
        },
    }
}

// -- Helpers --

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut results = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ext) {
                results.push(path);
            }
        }
    }
    results.sort();
    results
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn read_text(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

fn read_json(path: &Path) -> Result<Value, String> {
    let src = read_text(path)?;
    serde_json::from_str(&src).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))
}

fn interchange_error_json(e: seqn_interchange::InterchangeError) -> Value {
    serde_json::json!({
        "column":  null,
        "kind":    "interchange",
        "line":    null,
        "message": e.to_string(),
    })
}

fn compare_error(expected: &Value, got: &Value) -> Result<(), String> {
    if json_equal(expected, got) {
        Ok(())
    } else {
        Err(format!("error mismatch:\n{}", json_diff(expected, got)))
    }
}

/// Deep equality of two JSON values, normalizing number types.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(am), Value::Object(bm)) => {
            am.len() == bm.len()
                && am
                    .iter()
                    .all(|(k, v)| bm.get(k).is_some_and(|bv| json_equal(v, bv)))
        }
        (Value::Array(av), Value::Array(bv)) => {
            av.len() == bv.len() && av.iter().zip(bv).all(|(a, b)| json_equal(a, b))
        }
        (Value::Number(an), Value::Number(bn)) => an.as_f64() == bn.as_f64(),
        _ => a == b,
    }
}

fn json_diff(expected: &Value, got: &Value) -> String {
    let exp_str = serde_json::to_string_pretty(expected).unwrap_or_default();
    let got_str = serde_json::to_string_pretty(got).unwrap_or_default();
    format!("--- expected\n{}\n+++ got\n{}", exp_str, got_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suite() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["positive", "negative", "decompile", "time"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        dir
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        std::fs::write(dir.join(rel), content).unwrap();
    }

    #[test]
    fn json_equal_ignores_key_order_and_number_repr() {
        assert!(json_equal(
            &json!({"a": 1, "b": [1.0, "x"]}),
            &json!({"b": [1, "x"], "a": 1.0})
        ));
        assert!(!json_equal(&json!({"a": 1}), &json!({"a": 1, "b": null})));
    }

    #[test]
    fn positive_case_produces_two_points() {
        let dir = suite();
        write(dir.path(), "positive/noop.seqn", "@ID \"seq\"\n\nC NOOP\n");
        write(
            dir.path(),
            "positive/noop.expected.json",
            r#"{"id": "seq", "steps": [
                {"args": [], "stem": "NOOP",
                 "time": {"type": "COMMAND_COMPLETE"}, "type": "command"}]}"#,
        );
        let tap = collect(dir.path());
        assert_eq!(tap.failure_count(), 0, "{}", tap.render());
        assert!(tap.render().contains("ok 2 - round-trip/noop"));
    }

    #[test]
    fn negative_case_compares_error_json() {
        let dir = suite();
        write(dir.path(), "negative/no_id.seqn", "C NOOP\n");
        write(
            dir.path(),
            "negative/no_id.expected-error.json",
            r#"{"column": null, "kind": "extraction", "line": 1, "message": "wrong"}"#,
        );
        let tap = collect(dir.path());
        assert_eq!(tap.failure_count(), 1);
        assert!(tap.render().contains("error mismatch"));
    }

    #[test]
    fn missing_expected_file_fails() {
        let dir = suite();
        write(dir.path(), "positive/orphan.seqn", "@ID \"x\"\n");
        let tap = collect(dir.path());
        assert_eq!(tap.failure_count(), 1);
        assert!(tap.render().contains("missing expected file"));
    }

    #[test]
    fn duration_cases_check_fields_and_errors() {
        let dir = suite();
        write(
            dir.path(),
            "time/durations.json",
            r#"[
              {"input": "90", "unit": "minutes", "display": "1h 30m",
               "expected": {"years": 0, "days": 0, "hours": 1, "minutes": 30, "seconds": 0,
                            "milliseconds": 0, "microseconds": 0, "is_negative": false}},
              {"input": "soon", "error": "format"}
            ]"#,
        );
        let tap = collect(dir.path());
        assert_eq!(tap.failure_count(), 0, "{}", tap.render());
    }
}
