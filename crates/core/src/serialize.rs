//! Canonical SeqN output: the line-by-line inverse of the grammar parser
//! and extractor.
//!
//! Sections appear in a fixed order separated by one blank line. A
//! document that cannot be rendered so that it reads back identically is
//! rejected whole; no partial text is returned.

use seqn_interchange::{
    AllowableRange, Argument, BaseArgument, Document, HardwareCommand, ImmediateCommand, Metadata,
    Model, ModelValue, Request, RequestTiming, Step, Time, VariableDeclaration, LOAD_AND_GO_KEY,
};
use serde_json::Value;

use crate::error::SeqnError;
use crate::extract::parse_number;
use crate::grammar::grammar;
use crate::time::{matches_any, TimeKind, ABSOLUTE_TAGS, EPOCH_TAGS, RELATIVE_TAGS};

pub fn serialize(doc: &Document) -> Result<String, SeqnError> {
    let mut sections: Vec<String> = Vec::new();

    let mut header = format!("@ID {}\n", quote(&doc.id));
    if doc.load_and_go() {
        header.push_str("@LOAD_AND_GO\n");
    }
    sections.push(header);

    if let Some(params) = &doc.parameters {
        sections.push(variables("INPUT_PARAMS", params)?);
    }
    if let Some(locals) = &doc.locals {
        sections.push(variables("LOCALS", locals)?);
    }

    let metadata = without_load_and_go(&doc.metadata);
    if !metadata.is_empty() {
        let mut out = String::new();
        metadata_lines(&mut out, &metadata)?;
        sections.push(out);
    }

    if !doc.steps.is_empty() {
        let mut out = String::new();
        for step in &doc.steps {
            step_lines(&mut out, step)?;
        }
        sections.push(out);
    }

    for request in &doc.requests {
        sections.push(request_lines(request)?);
    }

    if let Some(commands) = &doc.immediate_commands {
        let mut out = String::from("@IMMEDIATE\n");
        for command in commands {
            immediate_lines(&mut out, command)?;
        }
        sections.push(out);
    }

    if let Some(commands) = &doc.hardware_commands {
        let mut out = String::from("@HARDWARE\n");
        for command in commands {
            hardware_lines(&mut out, command)?;
        }
        sections.push(out);
    }

    let mut text = String::new();
    for (i, mut section) in sections.into_iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        ensure_trailing_newline(&mut section);
        text.push_str(&section);
    }
    tracing::debug!(id = %doc.id, bytes = text.len(), "serialized document");
    Ok(text)
}

fn ensure_trailing_newline(text: &mut String) {
    if !text.ends_with('\n') {
        text.push('\n');
    }
}

/// Document metadata as written to `@METADATA` lines. `lgo` is carried by
/// `@LOAD_AND_GO` instead.
fn without_load_and_go(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(key, _)| key.as_str() != LOAD_AND_GO_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// JSON string literal; SeqN strings share JSON's escapes.
fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

fn word<'a>(text: &'a str, what: &str) -> Result<&'a str, SeqnError> {
    if grammar().is_word(text) {
        Ok(text)
    } else {
        Err(SeqnError::serialization(format!(
            "{} '{}' is not a valid identifier",
            what, text
        )))
    }
}

// ── Variables ──────────────────────────────────────────────────────

fn variables(block: &str, decls: &[VariableDeclaration]) -> Result<String, SeqnError> {
    if decls.is_empty() {
        return Err(SeqnError::serialization(format!(
            "@{} group must declare at least one variable",
            block
        )));
    }
    let mut out = format!("@{}_BEGIN\n", block);
    for decl in decls {
        out.push_str(word(&decl.name, "variable name")?);
        match (&decl.type_tag, &decl.enum_name) {
            (Some(t), enum_name) => {
                out.push(' ');
                out.push_str(word(t, "variable type")?);
                if let Some(e) = enum_name {
                    out.push(' ');
                    out.push_str(word(e, "enum name")?);
                }
            }
            (None, Some(e)) => {
                return Err(SeqnError::serialization(format!(
                    "variable '{}' has enum name '{}' but no type",
                    decl.name, e
                )));
            }
            (None, None) => {}
        }

        let ranges = match &decl.allowable_ranges {
            Some(r) if !r.is_empty() => Some(ranges(r)?),
            _ => None,
        };
        let values = match &decl.allowable_values {
            Some(v) => Some(values(&decl.name, v)?),
            None => None,
        };
        match (ranges, values) {
            (Some(r), Some(v)) => out.push_str(&format!(" {} {}", quote(&r), quote(&v))),
            (Some(r), None) => out.push_str(&format!(" {}", quote(&r))),
            (None, Some(v)) => out.push_str(&format!(" \"\" {}", quote(&v))),
            (None, None) => {}
        }
        out.push('\n');
    }
    out.push_str(&format!("@{}_END\n", block));
    Ok(out)
}

fn ranges(ranges: &[AllowableRange]) -> Result<String, SeqnError> {
    let parts = ranges
        .iter()
        .map(|r| {
            if r.min.is_finite() && r.max.is_finite() {
                Ok(format!("{}...{}", r.min, r.max))
            } else {
                Err(SeqnError::serialization("allowable range bounds must be finite"))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(","))
}

fn values(name: &str, values: &[Value]) -> Result<String, SeqnError> {
    let bad = |v: &Value| {
        SeqnError::serialization(format!(
            "allowable value {} of '{}' would not read back unchanged",
            v, name
        ))
    };
    if values.is_empty() {
        return Err(SeqnError::serialization(format!(
            "variable '{}' has an empty allowable values list",
            name
        )));
    }
    let parts = values
        .iter()
        .map(|v| match v {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s)
                if !s.is_empty()
                    && !s.contains(',')
                    && s.trim() == s
                    && parse_number(s).is_none() =>
            {
                Ok(s.clone())
            }
            other => Err(bad(other)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(","))
}

// ── Attachments ────────────────────────────────────────────────────

fn metadata_lines(out: &mut String, metadata: &Metadata) -> Result<(), SeqnError> {
    for (key, value) in metadata {
        let rendered = serde_json::to_string_pretty(value)
            .map_err(|e| SeqnError::serialization(format!("metadata '{}': {}", key, e)))?;
        out.push_str(&format!("@METADATA {} {}\n", quote(key), rendered));
    }
    Ok(())
}

fn model_lines(out: &mut String, models: &[Model]) {
    for model in models {
        let value = match &model.value {
            ModelValue::Boolean(b) => b.to_string(),
            ModelValue::Number(n) => n.to_string(),
            ModelValue::String(s) => quote(s),
        };
        out.push_str(&format!(
            "@MODEL {} {} {}\n",
            quote(&model.variable),
            value,
            quote(&model.offset)
        ));
    }
}

fn activation_lines(out: &mut String, engine: Option<i64>, epoch: Option<&str>) {
    if let Some(engine) = engine {
        out.push_str(&format!("@ENGINE {}\n", engine));
    }
    if let Some(epoch) = epoch {
        out.push_str(&format!("@EPOCH {}\n", quote(epoch)));
    }
}

fn description(out: &mut String, description: Option<&str>) -> Result<(), SeqnError> {
    if let Some(d) = description {
        if d.contains(['\n', '\r']) {
            return Err(SeqnError::serialization(format!(
                "description {:?} spans more than one line",
                d
            )));
        }
        out.push_str(" # ");
        out.push_str(d);
    }
    Ok(())
}

// ── Arguments ──────────────────────────────────────────────────────

fn base_argument(arg: &BaseArgument) -> Result<String, SeqnError> {
    Ok(match arg {
        BaseArgument::String(s) => quote(s),
        BaseArgument::Number(n) => n.to_string(),
        BaseArgument::Boolean(b) => b.to_string(),
        BaseArgument::Symbol(s) if s == "true" || s == "false" => {
            return Err(SeqnError::serialization(format!(
                "symbol '{}' would read back as a boolean",
                s
            )));
        }
        BaseArgument::Symbol(s) => word(s, "symbol")?.to_string(),
        BaseArgument::Hex(h) if grammar().is_hex(h) => h.clone(),
        BaseArgument::Hex(h) => {
            return Err(SeqnError::serialization(format!(
                "'{}' is not a hex literal",
                h
            )));
        }
    })
}

fn argument(arg: &Argument) -> Result<String, SeqnError> {
    match arg {
        Argument::Repeat(sets) => {
            let items = sets
                .iter()
                .flatten()
                .map(base_argument)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", items.join(" ")))
        }
        Argument::String(s) => base_argument(&BaseArgument::String(s.clone())),
        Argument::Number(n) => Ok(n.to_string()),
        Argument::Boolean(b) => Ok(b.to_string()),
        Argument::Symbol(s) => base_argument(&BaseArgument::Symbol(s.clone())),
        Argument::Hex(h) => base_argument(&BaseArgument::Hex(h.clone())),
    }
}

fn arguments(out: &mut String, args: &[Argument]) -> Result<(), SeqnError> {
    for arg in args {
        out.push(' ');
        out.push_str(&argument(arg)?);
    }
    Ok(())
}

// ── Steps ──────────────────────────────────────────────────────────

fn checked_tag(marker: char, tag: &str, kinds: &[TimeKind]) -> Result<String, SeqnError> {
    if matches_any(tag, kinds) {
        Ok(format!("{}{}", marker, tag))
    } else {
        Err(SeqnError::serialization(format!(
            "'{}' is not a valid {} time tag",
            tag,
            kinds[0].name()
        )))
    }
}

fn time_prefix(time: &Time) -> Result<String, SeqnError> {
    let (marker, kinds) = match time {
        Time::CommandComplete => return Ok("C".to_string()),
        Time::Absolute { .. } => ('A', ABSOLUTE_TAGS),
        Time::CommandRelative { .. } => ('R', RELATIVE_TAGS),
        Time::EpochRelative { .. } => ('E', EPOCH_TAGS),
    };
    checked_tag(marker, time.tag().unwrap_or_default(), kinds)
}

fn step_lines(out: &mut String, step: &Step) -> Result<(), SeqnError> {
    let head = match step {
        Step::Command(c) => word(&c.stem, "command stem")?.to_string(),
        Step::Activate(a) => format!("@ACTIVATE({})", quote(&a.sequence)),
        Step::Load(a) => format!("@LOAD({})", quote(&a.sequence)),
        Step::GroundBlock(g) => format!("@GROUND_BLOCK({})", quote(&g.name)),
        Step::GroundEvent(g) => format!("@GROUND_EVENT({})", quote(&g.name)),
    };
    out.push_str(&time_prefix(step.time())?);
    out.push(' ');
    out.push_str(&head);
    arguments(out, step.args())?;
    description(out, step.description())?;
    out.push('\n');
    if let Step::Activate(a) | Step::Load(a) = step {
        activation_lines(out, a.engine, a.epoch.as_deref());
    }
    metadata_lines(out, step.metadata())?;
    model_lines(out, step.models());
    Ok(())
}

fn request_lines(request: &Request) -> Result<String, SeqnError> {
    let mut out = match &request.timing {
        RequestTiming::Time(time) => time_prefix(time)?,
        RequestTiming::GroundEpoch(ground) => {
            let delta = match &ground.delta {
                Some(d) => checked_tag('G', d, EPOCH_TAGS)?,
                None => "G".to_string(),
            };
            format!("{} {}", delta, quote(&ground.name))
        }
    };
    out.push_str(&format!(" @REQUEST_BEGIN({})", quote(&request.name)));
    description(&mut out, request.description.as_deref())?;
    out.push('\n');
    for step in &request.steps {
        step_lines(&mut out, step)?;
    }
    out.push_str("@REQUEST_END\n");
    metadata_lines(&mut out, &request.metadata)?;
    Ok(out)
}

fn immediate_lines(out: &mut String, command: &ImmediateCommand) -> Result<(), SeqnError> {
    match command {
        ImmediateCommand::Command(c) => {
            out.push_str(word(&c.stem, "command stem")?);
            arguments(out, &c.args)?;
            description(out, c.description.as_deref())?;
            out.push('\n');
            metadata_lines(out, &c.metadata)?;
        }
        ImmediateCommand::Activate(a) | ImmediateCommand::Load(a) => {
            let directive = if matches!(command, ImmediateCommand::Load(_)) {
                "@LOAD"
            } else {
                "@ACTIVATE"
            };
            out.push_str(&format!("{}({})", directive, quote(&a.sequence)));
            arguments(out, &a.args)?;
            description(out, a.description.as_deref())?;
            out.push('\n');
            activation_lines(out, a.engine, a.epoch.as_deref());
            metadata_lines(out, &a.metadata)?;
        }
    }
    Ok(())
}

fn hardware_lines(out: &mut String, command: &HardwareCommand) -> Result<(), SeqnError> {
    out.push_str(word(&command.stem, "hardware stem")?);
    description(out, command.description.as_deref())?;
    out.push('\n');
    metadata_lines(out, &command.metadata)
}
