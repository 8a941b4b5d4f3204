//! Reading and writing sequence documents as interchange JSON.
//!
//! The main entry point is [`from_interchange`], which takes a
//! `&serde_json::Value` and produces a [`Document`]. It walks the JSON by
//! hand so that errors name the offending step, and so that a repeat
//! argument with a non-array value is skipped with a warning instead of
//! rejecting the whole document.

use crate::types::*;
use serde_json::Value;
use std::fmt;

/// Errors during interchange JSON deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterchangeError {
    /// The document is missing a required top-level field.
    MissingField { field: String },
    /// A step, request, or command is malformed.
    ItemError {
        kind: String,
        index: usize,
        message: String,
    },
    /// The document structure is invalid.
    InvalidDocument(String),
}

impl fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterchangeError::MissingField { field } => {
                write!(f, "document missing required field: '{}'", field)
            }
            InterchangeError::ItemError {
                kind,
                index,
                message,
            } => {
                write!(f, "{} #{}: {}", kind, index, message)
            }
            InterchangeError::InvalidDocument(msg) => {
                write!(f, "invalid document: {}", msg)
            }
        }
    }
}

impl std::error::Error for InterchangeError {}

/// Render a document as interchange JSON.
pub fn to_interchange(doc: &Document) -> Value {
    // Every field is a plain map/sequence/string/number, so this cannot fail.
    serde_json::to_value(doc).unwrap_or(Value::Null)
}

/// Deserialize an interchange JSON document into typed structs.
pub fn from_interchange(doc: &Value) -> Result<Document, InterchangeError> {
    if !doc.is_object() {
        return Err(InterchangeError::InvalidDocument(
            "top level must be an object".to_string(),
        ));
    }

    let id = doc
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "id".to_string(),
        })?
        .to_string();

    let metadata = parse_metadata(doc, "document", 0)?;
    let parameters = parse_variables(doc, "parameters")?;
    let locals = parse_variables(doc, "locals")?;

    let steps = match doc.get("steps") {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => parse_steps(v, "step")?,
    };

    let requests = match doc.get("requests") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(arr)) => arr
            .iter()
            .enumerate()
            .map(|(i, r)| parse_request(r, i))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(InterchangeError::InvalidDocument(
                "'requests' must be an array".to_string(),
            ))
        }
    };

    let immediate_commands = match doc.get("immediate_commands") {
        None | Some(Value::Null) => None,
        Some(Value::Array(arr)) => Some(
            arr.iter()
                .enumerate()
                .map(|(i, c)| parse_immediate(c, i))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => {
            return Err(InterchangeError::InvalidDocument(
                "'immediate_commands' must be an array".to_string(),
            ))
        }
    };

    let hardware_commands = match doc.get("hardware_commands") {
        None | Some(Value::Null) => None,
        Some(Value::Array(arr)) => Some(
            arr.iter()
                .enumerate()
                .map(|(i, c)| parse_hardware(c, i))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => {
            return Err(InterchangeError::InvalidDocument(
                "'hardware_commands' must be an array".to_string(),
            ))
        }
    };

    Ok(Document {
        id,
        metadata,
        parameters,
        locals,
        steps,
        requests,
        immediate_commands,
        hardware_commands,
    })
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn item_err(kind: &str, index: usize, message: impl Into<String>) -> InterchangeError {
    InterchangeError::ItemError {
        kind: kind.to_string(),
        index,
        message: message.into(),
    }
}

fn required_str(
    obj: &Value,
    field: &str,
    kind: &str,
    index: usize,
) -> Result<String, InterchangeError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| item_err(kind, index, format!("missing '{}' field", field)))
}

fn optional_str(obj: &Value, field: &str) -> Option<String> {
    obj.get(field).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn parse_metadata(obj: &Value, kind: &str, index: usize) -> Result<Metadata, InterchangeError> {
    match obj.get("metadata") {
        None | Some(Value::Null) => Ok(Metadata::new()),
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(_) => Err(item_err(kind, index, "'metadata' must be an object")),
    }
}

fn parse_variables(
    doc: &Value,
    field: &str,
) -> Result<Option<Vec<VariableDeclaration>>, InterchangeError> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value::<Vec<VariableDeclaration>>(v.clone())
            .map(Some)
            .map_err(|e| InterchangeError::InvalidDocument(format!("'{}': {}", field, e))),
    }
}

fn parse_time(obj: &Value, kind: &str, index: usize) -> Result<Time, InterchangeError> {
    let time = obj
        .get("time")
        .ok_or_else(|| item_err(kind, index, "missing 'time' field"))?;
    serde_json::from_value::<Time>(time.clone())
        .map_err(|e| item_err(kind, index, format!("invalid time: {}", e)))
}

fn parse_engine(obj: &Value, kind: &str, index: usize) -> Result<Option<i64>, InterchangeError> {
    match obj.get("engine") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| item_err(kind, index, "'engine' must be an integer")),
    }
}

fn parse_models(obj: &Value, kind: &str, index: usize) -> Result<Vec<Model>, InterchangeError> {
    match obj.get("models") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value::<Vec<Model>>(v.clone())
            .map_err(|e| item_err(kind, index, format!("invalid models: {}", e))),
    }
}

fn parse_base_arg(v: &Value, kind: &str, index: usize) -> Result<BaseArgument, InterchangeError> {
    serde_json::from_value::<BaseArgument>(v.clone())
        .map_err(|e| item_err(kind, index, format!("invalid argument: {}", e)))
}

fn parse_args(obj: &Value, kind: &str, index: usize) -> Result<Vec<Argument>, InterchangeError> {
    let arr = match obj.get("args") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(arr)) => arr,
        Some(_) => return Err(item_err(kind, index, "'args' must be an array")),
    };

    let mut args = Vec::with_capacity(arr.len());
    for arg in arr {
        if arg.get("type").and_then(|t| t.as_str()) != Some("repeat") {
            args.push(parse_base_arg(arg, kind, index)?.into());
            continue;
        }

        let sets = match arg.get("value") {
            Some(Value::Array(sets)) => sets,
            other => {
                tracing::warn!(
                    kind,
                    index,
                    value = ?other,
                    "repeat argument value must be an array; skipping argument"
                );
                continue;
            }
        };

        let mut repeat = Vec::with_capacity(sets.len());
        for set in sets {
            let set = set.as_array().ok_or_else(|| {
                item_err(kind, index, "repeat argument sets must be arrays")
            })?;
            repeat.push(
                set.iter()
                    .map(|a| parse_base_arg(a, kind, index))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }
        args.push(Argument::Repeat(repeat));
    }
    Ok(args)
}

fn parse_steps(v: &Value, kind: &str) -> Result<Vec<Step>, InterchangeError> {
    let arr = v
        .as_array()
        .ok_or_else(|| InterchangeError::InvalidDocument(format!("'{}s' must be an array", kind)))?;
    arr.iter()
        .enumerate()
        .map(|(i, s)| parse_step(s, kind, i))
        .collect()
}

fn parse_step(obj: &Value, kind: &str, index: usize) -> Result<Step, InterchangeError> {
    let step_type = obj.get("type").and_then(|t| t.as_str()).unwrap_or("");

    let time = parse_time(obj, kind, index)?;
    let args = parse_args(obj, kind, index)?;
    let description = optional_str(obj, "description");
    let metadata = parse_metadata(obj, kind, index)?;
    let models = parse_models(obj, kind, index)?;

    match step_type {
        "command" => Ok(Step::Command(CommandStep {
            stem: required_str(obj, "stem", kind, index)?,
            time,
            args,
            description,
            metadata,
            models,
        })),
        "activate" | "load" => {
            let step = ActivateStep {
                sequence: required_str(obj, "sequence", kind, index)?,
                time,
                args,
                engine: parse_engine(obj, kind, index)?,
                epoch: optional_str(obj, "epoch"),
                description,
                metadata,
                models,
            };
            Ok(if step_type == "activate" {
                Step::Activate(step)
            } else {
                Step::Load(step)
            })
        }
        "ground_block" | "ground_event" => {
            let step = GroundStep {
                name: required_str(obj, "name", kind, index)?,
                time,
                args,
                description,
                metadata,
                models,
            };
            Ok(if step_type == "ground_block" {
                Step::GroundBlock(step)
            } else {
                Step::GroundEvent(step)
            })
        }
        other => Err(item_err(
            kind,
            index,
            format!("unknown step type '{}'", other),
        )),
    }
}

fn parse_request(obj: &Value, index: usize) -> Result<Request, InterchangeError> {
    let name = required_str(obj, "name", "request", index)?;

    let timing = match (obj.get("time"), obj.get("ground_epoch")) {
        (Some(_), None) => RequestTiming::Time(parse_time(obj, "request", index)?),
        (None, Some(ge)) => RequestTiming::GroundEpoch(
            serde_json::from_value::<GroundEpoch>(ge.clone())
                .map_err(|e| item_err("request", index, format!("invalid ground_epoch: {}", e)))?,
        ),
        (Some(_), Some(_)) => {
            return Err(item_err(
                "request",
                index,
                "request has both 'time' and 'ground_epoch'",
            ))
        }
        (None, None) => {
            return Err(item_err(
                "request",
                index,
                "request needs 'time' or 'ground_epoch'",
            ))
        }
    };

    let steps = match obj.get("steps") {
        Some(v) => parse_steps(v, "request step")?,
        None => return Err(item_err("request", index, "missing 'steps' field")),
    };

    Ok(Request {
        name,
        timing,
        steps,
        description: optional_str(obj, "description"),
        metadata: parse_metadata(obj, "request", index)?,
    })
}

fn parse_immediate(obj: &Value, index: usize) -> Result<ImmediateCommand, InterchangeError> {
    let kind = "immediate command";
    let args = parse_args(obj, kind, index)?;
    let description = optional_str(obj, "description");
    let metadata = parse_metadata(obj, kind, index)?;

    match obj.get("type").and_then(|t| t.as_str()).unwrap_or("command") {
        "command" => Ok(ImmediateCommand::Command(ImmediateStem {
            stem: required_str(obj, "stem", kind, index)?,
            args,
            description,
            metadata,
        })),
        t @ ("activate" | "load") => {
            let cmd = ImmediateActivate {
                sequence: required_str(obj, "sequence", kind, index)?,
                args,
                engine: parse_engine(obj, kind, index)?,
                epoch: optional_str(obj, "epoch"),
                description,
                metadata,
            };
            Ok(if t == "activate" {
                ImmediateCommand::Activate(cmd)
            } else {
                ImmediateCommand::Load(cmd)
            })
        }
        other => Err(item_err(kind, index, format!("unknown type '{}'", other))),
    }
}

fn parse_hardware(obj: &Value, index: usize) -> Result<HardwareCommand, InterchangeError> {
    let kind = "hardware command";
    Ok(HardwareCommand {
        stem: required_str(obj, "stem", kind, index)?,
        description: optional_str(obj, "description"),
        metadata: parse_metadata(obj, kind, index)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_doc(steps: Vec<Value>) -> Value {
        json!({
            "id": "test-seq",
            "steps": steps
        })
    }

    #[test]
    fn test_empty_document() {
        let doc = from_interchange(&json!({"id": "empty"})).unwrap();
        assert_eq!(doc.id, "empty");
        assert!(doc.steps.is_empty());
        assert!(doc.metadata.is_empty());
        assert!(doc.parameters.is_none());
        assert!(doc.immediate_commands.is_none());
    }

    #[test]
    fn test_missing_id() {
        let result = from_interchange(&json!({"steps": []}));
        match result.unwrap_err() {
            InterchangeError::MissingField { field } => assert_eq!(field, "id"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_document() {
        assert!(matches!(
            from_interchange(&json!([1, 2])),
            Err(InterchangeError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_parse_command_step() {
        let doc = make_doc(vec![json!({
            "type": "command",
            "stem": "FSW_CMD",
            "time": {"type": "ABSOLUTE", "tag": "2024-123T12:00:00"},
            "args": [
                {"type": "string", "value": "hello"},
                {"type": "number", "value": 5},
                {"type": "boolean", "value": true},
                {"type": "symbol", "value": "ON"},
                {"type": "hex", "value": "0xFF"}
            ],
            "description": "first",
            "metadata": {"owner": "ops"},
            "models": [{"variable": "temp", "value": 20, "offset": "00:00:01"}]
        })]);

        let result = from_interchange(&doc).unwrap();
        assert_eq!(result.steps.len(), 1);
        match &result.steps[0] {
            Step::Command(c) => {
                assert_eq!(c.stem, "FSW_CMD");
                assert_eq!(c.args.len(), 5);
                assert_eq!(c.args[3], Argument::Symbol("ON".to_string()));
                assert_eq!(c.description.as_deref(), Some("first"));
                assert_eq!(c.metadata["owner"], "ops");
                assert_eq!(c.models[0].variable, "temp");
            }
            other => panic!("expected Command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_activate_with_engine() {
        let doc = make_doc(vec![json!({
            "type": "activate",
            "sequence": "child.seq",
            "time": {"type": "COMMAND_COMPLETE"},
            "engine": 3,
            "epoch": "E1"
        })]);
        let result = from_interchange(&doc).unwrap();
        match &result.steps[0] {
            Step::Activate(a) => {
                assert_eq!(a.sequence, "child.seq");
                assert_eq!(a.engine, Some(3));
                assert_eq!(a.epoch.as_deref(), Some("E1"));
            }
            other => panic!("expected Activate, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_step_type_is_error() {
        let doc = make_doc(vec![json!({
            "type": "teleport",
            "time": {"type": "COMMAND_COMPLETE"}
        })]);
        match from_interchange(&doc).unwrap_err() {
            InterchangeError::ItemError { index, message, .. } => {
                assert_eq!(index, 0);
                assert!(message.contains("teleport"));
            }
            other => panic!("expected ItemError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_time_is_error() {
        let doc = make_doc(vec![json!({"type": "command", "stem": "NOOP"})]);
        let err = from_interchange(&doc).unwrap_err();
        assert!(err.to_string().contains("time"), "{}", err);
    }

    #[test]
    fn test_malformed_repeat_is_skipped() {
        let doc = make_doc(vec![json!({
            "type": "command",
            "stem": "CMD",
            "time": {"type": "COMMAND_COMPLETE"},
            "args": [
                {"type": "number", "value": 1},
                {"type": "repeat", "value": "not-an-array"},
                {"type": "number", "value": 2}
            ]
        })]);
        let result = from_interchange(&doc).unwrap();
        assert_eq!(
            result.steps[0].args(),
            &[
                Argument::Number(1.into()),
                Argument::Number(2.into())
            ]
        );
    }

    #[test]
    fn test_repeat_set_must_be_array() {
        let doc = make_doc(vec![json!({
            "type": "command",
            "stem": "CMD",
            "time": {"type": "COMMAND_COMPLETE"},
            "args": [{"type": "repeat", "value": [1, 2]}]
        })]);
        assert!(from_interchange(&doc).is_err());
    }

    #[test]
    fn test_parse_request_with_ground_epoch() {
        let doc = json!({
            "id": "req",
            "requests": [{
                "name": "power_on",
                "ground_epoch": {"name": "AOS", "delta": "+00:05:00"},
                "steps": [{
                    "type": "command",
                    "stem": "PWR_ON",
                    "time": {"type": "COMMAND_RELATIVE", "tag": "00:00:01"}
                }],
                "description": "power up"
            }]
        });
        let result = from_interchange(&doc).unwrap();
        let req = &result.requests[0];
        assert_eq!(req.name, "power_on");
        assert_eq!(
            req.timing,
            RequestTiming::GroundEpoch(GroundEpoch {
                name: "AOS".to_string(),
                delta: Some("+00:05:00".to_string())
            })
        );
        assert_eq!(req.steps.len(), 1);
    }

    #[test]
    fn test_request_needs_timing() {
        let doc = json!({
            "id": "req",
            "requests": [{"name": "r", "steps": []}]
        });
        assert!(from_interchange(&doc).is_err());
    }

    #[test]
    fn test_parse_immediate_and_hardware() {
        let doc = json!({
            "id": "imm",
            "immediate_commands": [
                {"stem": "NOOP"},
                {"type": "load", "sequence": "s", "engine": 1}
            ],
            "hardware_commands": [{"stem": "HW_RESET", "description": "reset"}]
        });
        let result = from_interchange(&doc).unwrap();
        let imm = result.immediate_commands.unwrap();
        assert!(matches!(&imm[0], ImmediateCommand::Command(c) if c.stem == "NOOP"));
        assert!(matches!(&imm[1], ImmediateCommand::Load(l) if l.engine == Some(1)));
        let hw = result.hardware_commands.unwrap();
        assert_eq!(hw[0].stem, "HW_RESET");
    }

    #[test]
    fn test_parse_variables() {
        let doc = json!({
            "id": "vars",
            "parameters": [{
                "name": "count",
                "type": "UINT",
                "allowable_ranges": [{"min": 0, "max": 10}]
            }],
            "locals": [{"name": "mode", "type": "ENUM", "enum_name": "Mode", "allowable_values": ["A", "B"]}]
        });
        let result = from_interchange(&doc).unwrap();
        let params = result.parameters.unwrap();
        assert_eq!(params[0].type_tag.as_deref(), Some("UINT"));
        assert_eq!(
            params[0].allowable_ranges.as_deref(),
            Some(&[AllowableRange { min: 0.0, max: 10.0 }][..])
        );
        let locals = result.locals.unwrap();
        assert_eq!(locals[0].enum_name.as_deref(), Some("Mode"));
    }

    #[test]
    fn test_round_trip_through_interchange() {
        let doc = json!({
            "id": "rt",
            "metadata": {"lgo": true, "author": "ops"},
            "steps": [{
                "type": "ground_event",
                "name": "GE",
                "time": {"type": "EPOCH_RELATIVE", "tag": "-00:01:00"},
                "args": []
            }]
        });
        let parsed = from_interchange(&doc).unwrap();
        assert!(parsed.load_and_go());
        let back = from_interchange(&to_interchange(&parsed)).unwrap();
        assert_eq!(parsed, back);
    }
}
