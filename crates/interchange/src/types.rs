//! Typed structs representing the sequence document JSON shape.
//!
//! Variant-bearing parts of the document (steps, times, arguments,
//! immediate commands) are closed enums tagged the same way on the wire,
//! so every consumer matches them exhaustively.

use serde::{Deserialize, Serialize};

/// Free-form metadata. Insertion order is preserved.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key that carries the load-and-go flag.
pub const LOAD_AND_GO_KEY: &str = "lgo";

// ── Document ────────────────────────────────────────────────────────

/// Root of a sequence document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// `@INPUT_PARAMS` group. Non-empty when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<VariableDeclaration>>,
    /// `@LOCALS` group. Non-empty when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locals: Option<Vec<VariableDeclaration>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<Request>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate_commands: Option<Vec<ImmediateCommand>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_commands: Option<Vec<HardwareCommand>>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            ..Document::default()
        }
    }

    /// True when the document metadata carries `"lgo": true`.
    pub fn load_and_go(&self) -> bool {
        matches!(
            self.metadata.get(LOAD_AND_GO_KEY),
            Some(serde_json::Value::Bool(true))
        )
    }
}

// ── Variables ───────────────────────────────────────────────────────

/// An inclusive numeric range a variable may take.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AllowableRange {
    pub min: f64,
    pub max: f64,
}

/// One entry of an `@INPUT_PARAMS` or `@LOCALS` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VariableDeclaration {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowable_ranges: Option<Vec<AllowableRange>>,
    /// Discrete values; each is a JSON string or number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowable_values: Option<Vec<serde_json::Value>>,
}

// ── Time ────────────────────────────────────────────────────────────

/// When a step fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Time {
    Absolute { tag: String },
    CommandComplete,
    CommandRelative { tag: String },
    EpochRelative { tag: String },
}

impl Time {
    /// The time tag, if the variant has one.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Time::Absolute { tag } | Time::CommandRelative { tag } | Time::EpochRelative { tag } => {
                Some(tag)
            }
            Time::CommandComplete => None,
        }
    }
}

// ── Arguments ───────────────────────────────────────────────────────

/// A non-repeating argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BaseArgument {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
    Symbol(String),
    Hex(String),
}

/// A command argument. `Repeat` holds argument sets rendered as one
/// bracket group; sets themselves cannot repeat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Argument {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
    Symbol(String),
    Hex(String),
    Repeat(Vec<Vec<BaseArgument>>),
}

impl From<BaseArgument> for Argument {
    fn from(arg: BaseArgument) -> Self {
        match arg {
            BaseArgument::String(s) => Argument::String(s),
            BaseArgument::Number(n) => Argument::Number(n),
            BaseArgument::Boolean(b) => Argument::Boolean(b),
            BaseArgument::Symbol(s) => Argument::Symbol(s),
            BaseArgument::Hex(h) => Argument::Hex(h),
        }
    }
}

// ── Models ──────────────────────────────────────────────────────────

/// Value assigned by an `@MODEL` line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelValue {
    Boolean(bool),
    Number(serde_json::Number),
    String(String),
}

/// A modeled variable update attached to a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub variable: String,
    pub value: ModelValue,
    pub offset: String,
}

// ── Steps ───────────────────────────────────────────────────────────

/// A time-tagged command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandStep {
    pub stem: String,
    pub time: Time,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

/// Activation or load of another sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivateStep {
    pub sequence: String,
    pub time: Time,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

/// Ground block or ground event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroundStep {
    pub name: String,
    pub time: Time,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

/// A single step of a sequence or request, dispatched by kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Command(CommandStep),
    Activate(ActivateStep),
    Load(ActivateStep),
    GroundBlock(GroundStep),
    GroundEvent(GroundStep),
}

impl Step {
    pub fn time(&self) -> &Time {
        match self {
            Step::Command(c) => &c.time,
            Step::Activate(a) | Step::Load(a) => &a.time,
            Step::GroundBlock(g) | Step::GroundEvent(g) => &g.time,
        }
    }

    pub fn args(&self) -> &[Argument] {
        match self {
            Step::Command(c) => &c.args,
            Step::Activate(a) | Step::Load(a) => &a.args,
            Step::GroundBlock(g) | Step::GroundEvent(g) => &g.args,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Step::Command(c) => c.description.as_deref(),
            Step::Activate(a) | Step::Load(a) => a.description.as_deref(),
            Step::GroundBlock(g) | Step::GroundEvent(g) => g.description.as_deref(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Step::Command(c) => &c.metadata,
            Step::Activate(a) | Step::Load(a) => &a.metadata,
            Step::GroundBlock(g) | Step::GroundEvent(g) => &g.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Step::Command(c) => &mut c.metadata,
            Step::Activate(a) | Step::Load(a) => &mut a.metadata,
            Step::GroundBlock(g) | Step::GroundEvent(g) => &mut g.metadata,
        }
    }

    pub fn models(&self) -> &[Model] {
        match self {
            Step::Command(c) => &c.models,
            Step::Activate(a) | Step::Load(a) => &a.models,
            Step::GroundBlock(g) | Step::GroundEvent(g) => &g.models,
        }
    }

    pub fn models_mut(&mut self) -> &mut Vec<Model> {
        match self {
            Step::Command(c) => &mut c.models,
            Step::Activate(a) | Step::Load(a) => &mut a.models,
            Step::GroundBlock(g) | Step::GroundEvent(g) => &mut g.models,
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// A named ground epoch a request is scheduled against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundEpoch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

/// How a request is scheduled. Serialized as either a `time` or a
/// `ground_epoch` field on the request object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestTiming {
    Time(Time),
    GroundEpoch(GroundEpoch),
}

/// A top-level container of steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub name: String,
    #[serde(flatten)]
    pub timing: RequestTiming,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

// ── Immediate / hardware ────────────────────────────────────────────

/// Untimed command of an `@IMMEDIATE` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImmediateStem {
    pub stem: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// Untimed activate/load of an `@IMMEDIATE` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImmediateActivate {
    pub sequence: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImmediateCommand {
    Command(ImmediateStem),
    Activate(ImmediateActivate),
    Load(ImmediateActivate),
}

impl ImmediateCommand {
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            ImmediateCommand::Command(c) => &mut c.metadata,
            ImmediateCommand::Activate(a) | ImmediateCommand::Load(a) => &mut a.metadata,
        }
    }
}

/// Command of a `@HARDWARE` section. Hardware commands take no arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HardwareCommand {
    pub stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn time_wire_shape() {
        let t = Time::Absolute {
            tag: "2024-001T00:00:00".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({"type": "ABSOLUTE", "tag": "2024-001T00:00:00"})
        );
        assert_eq!(
            serde_json::to_value(Time::CommandComplete).unwrap(),
            json!({"type": "COMMAND_COMPLETE"})
        );
    }

    #[test]
    fn repeat_argument_wire_shape() {
        let arg = Argument::Repeat(vec![vec![
            BaseArgument::Number(1.into()),
            BaseArgument::String("a".to_string()),
        ]]);
        assert_eq!(
            serde_json::to_value(&arg).unwrap(),
            json!({"type": "repeat", "value": [[
                {"type": "number", "value": 1},
                {"type": "string", "value": "a"}
            ]]})
        );
    }

    #[test]
    fn request_timing_is_flattened() {
        let req = Request {
            name: "r".to_string(),
            timing: RequestTiming::GroundEpoch(GroundEpoch {
                name: "pass".to_string(),
                delta: None,
            }),
            steps: vec![],
            description: None,
            metadata: Metadata::new(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["ground_epoch"]["name"], "pass");
        assert!(v.get("time").is_none());
    }

    #[test]
    fn load_and_go_reads_metadata() {
        let mut doc = Document::new("seq");
        assert!(!doc.load_and_go());
        doc.metadata.insert("lgo".to_string(), json!(true));
        assert!(doc.load_and_go());
        doc.metadata.insert("lgo".to_string(), json!("yes"));
        assert!(!doc.load_and_go());
    }
}
