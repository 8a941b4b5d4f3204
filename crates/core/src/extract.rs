//! Document extraction: walks a [`SyntaxTree`] and builds the typed
//! sequence [`Document`].
//!
//! Attachment lines (`@METADATA`, `@MODEL`, `@ENGINE`, `@EPOCH`) belong to
//! the most recent step, request or section command; `@METADATA` before any
//! of those belongs to the document. Inside `@IMMEDIATE` and `@HARDWARE`
//! only that section's commands are candidates, so an attachment before the
//! section's first command is an error.

use seqn_interchange::{
    ActivateStep, AllowableRange, Argument, BaseArgument, CommandStep, Document, GroundEpoch,
    GroundStep, HardwareCommand, ImmediateActivate, ImmediateCommand, ImmediateStem, Metadata,
    Model, ModelValue, Request, RequestTiming, Step, Time, VariableDeclaration, LOAD_AND_GO_KEY,
};
use serde_json::{Number, Value};

use crate::cst::{
    ArgNode, CommandLine, Declaration, Head, Node, RequestBlock, RequestHeader, SectionKind, Span,
    SyntaxTree, TimeMarker, TimePrefix, VariableBlock,
};
use crate::error::SeqnError;
use crate::time::{matches_any, TimeKind, ABSOLUTE_TAGS, EPOCH_TAGS, RELATIVE_TAGS};

/// Where the enclosing lines of a node live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Steps,
    Request,
    Section(SectionKind),
}

/// The item attachment lines currently apply to. Always the last one
/// pushed into its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Document,
    Step,
    Request,
    RequestStep,
    Immediate,
    Hardware,
    /// Inside `@IMMEDIATE` / `@HARDWARE` before its first command.
    SectionStart,
}

struct Extractor {
    doc: Document,
    id_line: Option<u32>,
    target: Target,
}

pub fn extract(tree: &SyntaxTree) -> Result<Document, SeqnError> {
    let mut ex = Extractor {
        doc: Document::default(),
        id_line: None,
        target: Target::Document,
    };
    for node in &tree.nodes {
        ex.node(node, Scope::Steps)?;
    }
    if ex.id_line.is_none() {
        return Err(SeqnError::extraction(1, "missing @ID"));
    }
    tracing::debug!(
        id = %ex.doc.id,
        steps = ex.doc.steps.len(),
        requests = ex.doc.requests.len(),
        "extracted document"
    );
    Ok(ex.doc)
}

impl Extractor {
    fn node(&mut self, node: &Node, scope: Scope) -> Result<(), SeqnError> {
        let line = node.span().line;
        match node {
            Node::Id { value, .. } => {
                if let Some(first) = self.id_line {
                    return Err(SeqnError::extraction(
                        line,
                        format!("duplicate @ID (first on line {})", first),
                    ));
                }
                self.id_line = Some(line);
                self.doc.id = value.clone();
            }
            Node::LoadAndGo { .. } => {
                self.doc
                    .metadata
                    .insert(LOAD_AND_GO_KEY.to_string(), Value::Bool(true));
            }
            Node::Variables {
                block,
                declarations,
                ..
            } => self.variables(*block, declarations, line)?,
            Node::Metadata { key, value, .. } => {
                let metadata = self.metadata_mut().ok_or_else(|| {
                    SeqnError::extraction(line, "@METADATA has nothing to attach to")
                })?;
                metadata.insert(key.clone(), value.clone());
            }
            Node::Model {
                variable,
                value,
                offset,
                ..
            } => {
                let model = Model {
                    variable: variable.clone(),
                    value: model_value(value)?,
                    offset: offset.clone(),
                };
                self.models_mut()
                    .ok_or_else(|| SeqnError::extraction(line, "@MODEL must follow a step"))?
                    .push(model);
            }
            Node::Engine { value, .. } => {
                let engine: i64 = value.parse().map_err(|_| {
                    SeqnError::extraction(line, format!("engine '{}' is not an integer", value))
                })?;
                let (slot, _) = self.activation_mut().ok_or_else(|| {
                    SeqnError::extraction(line, "@ENGINE must follow @ACTIVATE or @LOAD")
                })?;
                if slot.replace(engine).is_some() {
                    return Err(SeqnError::extraction(line, "duplicate @ENGINE"));
                }
            }
            Node::Epoch { value, .. } => {
                let (_, slot) = self.activation_mut().ok_or_else(|| {
                    SeqnError::extraction(line, "@EPOCH must follow @ACTIVATE or @LOAD")
                })?;
                if slot.replace(value.clone()).is_some() {
                    return Err(SeqnError::extraction(line, "duplicate @EPOCH"));
                }
            }
            Node::Command(c) => match scope {
                Scope::Steps => {
                    self.doc.steps.push(step(c)?);
                    self.target = Target::Step;
                }
                Scope::Request => {
                    let step = step(c)?;
                    if let Some(r) = self.doc.requests.last_mut() {
                        r.steps.push(step);
                    }
                    self.target = Target::RequestStep;
                }
                Scope::Section(SectionKind::Immediate) => {
                    let command = immediate(c)?;
                    self.doc
                        .immediate_commands
                        .get_or_insert_with(Vec::new)
                        .push(command);
                    self.target = Target::Immediate;
                }
                Scope::Section(SectionKind::Hardware) => {
                    let command = hardware(c)?;
                    self.doc
                        .hardware_commands
                        .get_or_insert_with(Vec::new)
                        .push(command);
                    self.target = Target::Hardware;
                }
            },
            Node::Request(r) => self.request(r)?,
            Node::Section { kind, nodes, .. } => {
                self.target = Target::SectionStart;
                match kind {
                    SectionKind::Immediate => {
                        self.doc.immediate_commands.get_or_insert_with(Vec::new);
                    }
                    SectionKind::Hardware => {
                        self.doc.hardware_commands.get_or_insert_with(Vec::new);
                    }
                }
                for n in nodes {
                    self.node(n, Scope::Section(*kind))?;
                }
            }
            Node::Comment { .. } => {}
        }
        Ok(())
    }

    fn variables(
        &mut self,
        block: VariableBlock,
        declarations: &[Declaration],
        line: u32,
    ) -> Result<(), SeqnError> {
        if declarations.is_empty() {
            return Err(SeqnError::extraction(
                line,
                format!("@{}_BEGIN block declares no variables", block.directive()),
            ));
        }
        let slot = match block {
            VariableBlock::InputParams => &mut self.doc.parameters,
            VariableBlock::Locals => &mut self.doc.locals,
        };
        if slot.is_some() {
            return Err(SeqnError::extraction(
                line,
                format!("@{} declared more than once", block.directive()),
            ));
        }
        *slot = Some(
            declarations
                .iter()
                .map(variable)
                .collect::<Result<Vec<_>, _>>()?,
        );
        Ok(())
    }

    fn request(&mut self, r: &RequestBlock) -> Result<(), SeqnError> {
        let timing = match &r.header {
            RequestHeader::Time(prefix) => RequestTiming::Time(time(prefix)?),
            RequestHeader::Ground { delta, epoch } => {
                if let Some(d) = delta {
                    check_tag(d, EPOCH_TAGS, r.span)?;
                }
                RequestTiming::GroundEpoch(GroundEpoch {
                    name: epoch.clone(),
                    delta: delta.clone(),
                })
            }
        };
        self.doc.requests.push(Request {
            name: r.name.clone(),
            timing,
            steps: Vec::new(),
            description: r.description.clone(),
            metadata: Metadata::new(),
        });
        self.target = Target::Request;
        for node in &r.body {
            self.node(node, Scope::Request)?;
        }
        self.target = Target::Request;
        Ok(())
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        let doc = &mut self.doc;
        match self.target {
            Target::Document => Some(&mut doc.metadata),
            Target::Step => doc.steps.last_mut().map(Step::metadata_mut),
            Target::Request => doc.requests.last_mut().map(|r| &mut r.metadata),
            Target::RequestStep => doc
                .requests
                .last_mut()?
                .steps
                .last_mut()
                .map(Step::metadata_mut),
            Target::Immediate => doc
                .immediate_commands
                .as_mut()?
                .last_mut()
                .map(ImmediateCommand::metadata_mut),
            Target::Hardware => doc
                .hardware_commands
                .as_mut()?
                .last_mut()
                .map(|h| &mut h.metadata),
            Target::SectionStart => None,
        }
    }

    fn last_step_mut(&mut self) -> Option<&mut Step> {
        match self.target {
            Target::Step => self.doc.steps.last_mut(),
            Target::RequestStep => self.doc.requests.last_mut()?.steps.last_mut(),
            _ => None,
        }
    }

    fn models_mut(&mut self) -> Option<&mut Vec<Model>> {
        self.last_step_mut().map(Step::models_mut)
    }

    /// Engine and epoch slots of the current activate/load.
    fn activation_mut(&mut self) -> Option<(&mut Option<i64>, &mut Option<String>)> {
        if self.target == Target::Immediate {
            return match self.doc.immediate_commands.as_mut()?.last_mut()? {
                ImmediateCommand::Activate(a) | ImmediateCommand::Load(a) => {
                    Some((&mut a.engine, &mut a.epoch))
                }
                ImmediateCommand::Command(_) => None,
            };
        }
        match self.last_step_mut()? {
            Step::Activate(a) | Step::Load(a) => Some((&mut a.engine, &mut a.epoch)),
            _ => None,
        }
    }
}

fn check_tag(tag: &str, kinds: &[TimeKind], span: Span) -> Result<(), SeqnError> {
    if matches_any(tag, kinds) {
        Ok(())
    } else {
        let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
        Err(SeqnError::extraction(
            span.line,
            format!("invalid time tag '{}', expected {}", tag, names.join(" or ")),
        ))
    }
}

fn time(prefix: &TimePrefix) -> Result<Time, SeqnError> {
    let tagged = |letter: char, kinds: &[TimeKind]| -> Result<String, SeqnError> {
        let tag = prefix.tag.clone().ok_or_else(|| {
            SeqnError::extraction(
                prefix.span.line,
                format!("time prefix '{}' needs a time tag", letter),
            )
        })?;
        check_tag(&tag, kinds, prefix.span)?;
        Ok(tag)
    };
    Ok(match prefix.marker {
        TimeMarker::Absolute => Time::Absolute {
            tag: tagged('A', ABSOLUTE_TAGS)?,
        },
        TimeMarker::Complete => Time::CommandComplete,
        TimeMarker::Relative => Time::CommandRelative {
            tag: tagged('R', RELATIVE_TAGS)?,
        },
        TimeMarker::Epoch => Time::EpochRelative {
            tag: tagged('E', EPOCH_TAGS)?,
        },
    })
}

fn step(c: &CommandLine) -> Result<Step, SeqnError> {
    let prefix = c
        .time
        .as_ref()
        .ok_or_else(|| SeqnError::extraction(c.span.line, "step without a time prefix"))?;
    let time = time(prefix)?;
    let args = arguments(&c.args)?;
    let description = c.description.clone();
    let activate = |sequence: &String, time: Time, args, description| ActivateStep {
        sequence: sequence.clone(),
        time,
        args,
        engine: None,
        epoch: None,
        description,
        metadata: Metadata::new(),
        models: Vec::new(),
    };
    let ground = |name: &String, time: Time, args, description| GroundStep {
        name: name.clone(),
        time,
        args,
        description,
        metadata: Metadata::new(),
        models: Vec::new(),
    };
    Ok(match &c.head {
        Head::Stem(stem) => Step::Command(CommandStep {
            stem: stem.clone(),
            time,
            args,
            description,
            metadata: Metadata::new(),
            models: Vec::new(),
        }),
        Head::Activate(s) => Step::Activate(activate(s, time, args, description)),
        Head::Load(s) => Step::Load(activate(s, time, args, description)),
        Head::GroundBlock(n) => Step::GroundBlock(ground(n, time, args, description)),
        Head::GroundEvent(n) => Step::GroundEvent(ground(n, time, args, description)),
    })
}

fn immediate(c: &CommandLine) -> Result<ImmediateCommand, SeqnError> {
    let args = arguments(&c.args)?;
    let description = c.description.clone();
    let activate = |sequence: &String| ImmediateActivate {
        sequence: sequence.clone(),
        args: args.clone(),
        engine: None,
        epoch: None,
        description: description.clone(),
        metadata: Metadata::new(),
    };
    match &c.head {
        Head::Stem(stem) => Ok(ImmediateCommand::Command(ImmediateStem {
            stem: stem.clone(),
            args: args.clone(),
            description: description.clone(),
            metadata: Metadata::new(),
        })),
        Head::Activate(s) => Ok(ImmediateCommand::Activate(activate(s))),
        Head::Load(s) => Ok(ImmediateCommand::Load(activate(s))),
        Head::GroundBlock(_) | Head::GroundEvent(_) => Err(SeqnError::extraction(
            c.span.line,
            "ground blocks and events are not allowed in @IMMEDIATE",
        )),
    }
}

fn hardware(c: &CommandLine) -> Result<HardwareCommand, SeqnError> {
    let Head::Stem(stem) = &c.head else {
        return Err(SeqnError::extraction(
            c.span.line,
            "@HARDWARE takes plain command stems only",
        ));
    };
    if !c.args.is_empty() {
        return Err(SeqnError::extraction(
            c.span.line,
            format!("hardware command '{}' takes no arguments", stem),
        ));
    }
    Ok(HardwareCommand {
        stem: stem.clone(),
        description: c.description.clone(),
        metadata: Metadata::new(),
    })
}

// ── Values ─────────────────────────────────────────────────────────

/// Integer when the text is an integer, float otherwise.
pub(crate) fn parse_number(text: &str) -> Option<Number> {
    let text = text.strip_prefix('+').unwrap_or(text);
    if let Ok(i) = text.parse::<i64>() {
        return Some(i.into());
    }
    if let Ok(u) = text.parse::<u64>() {
        return Some(u.into());
    }
    if !text.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b)) {
        return None;
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn number(text: &str, span: Span) -> Result<Number, SeqnError> {
    parse_number(text).ok_or_else(|| {
        SeqnError::extraction(span.line, format!("'{}' is not a representable number", text))
    })
}

fn base_argument(arg: &ArgNode) -> Result<BaseArgument, SeqnError> {
    Ok(match arg {
        ArgNode::Str(s, _) => BaseArgument::String(s.clone()),
        ArgNode::Number(n, span) => BaseArgument::Number(number(n, *span)?),
        ArgNode::Hex(h, _) => BaseArgument::Hex(h.clone()),
        ArgNode::Word(w, _) if w == "true" => BaseArgument::Boolean(true),
        ArgNode::Word(w, _) if w == "false" => BaseArgument::Boolean(false),
        ArgNode::Word(w, _) => BaseArgument::Symbol(w.clone()),
        ArgNode::Repeat(_, span) => {
            return Err(SeqnError::extraction(
                span.line,
                "repeat groups cannot be nested",
            ))
        }
    })
}

fn arguments(args: &[ArgNode]) -> Result<Vec<Argument>, SeqnError> {
    args.iter()
        .map(|arg| match arg {
            ArgNode::Repeat(items, _) => {
                let set = items
                    .iter()
                    .map(base_argument)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Argument::Repeat(if set.is_empty() {
                    Vec::new()
                } else {
                    vec![set]
                }))
            }
            other => base_argument(other).map(Argument::from),
        })
        .collect()
}

fn model_value(value: &ArgNode) -> Result<ModelValue, SeqnError> {
    match value {
        ArgNode::Str(s, _) => Ok(ModelValue::String(s.clone())),
        ArgNode::Number(n, span) => Ok(ModelValue::Number(number(n, *span)?)),
        ArgNode::Word(w, _) if w == "true" => Ok(ModelValue::Boolean(true)),
        ArgNode::Word(w, _) if w == "false" => Ok(ModelValue::Boolean(false)),
        other => Err(SeqnError::extraction(
            other.span().line,
            "model value must be a string, number or boolean",
        )),
    }
}

fn variable(decl: &Declaration) -> Result<VariableDeclaration, SeqnError> {
    let allowable_ranges = match decl.ranges.as_deref() {
        None | Some("") => None,
        Some(text) => Some(ranges(text, decl.span)?),
    };
    let allowable_values = match decl.values.as_deref() {
        None | Some("") => None,
        Some(text) => Some(
            text.split(',')
                .map(|item| {
                    let item = item.trim();
                    parse_number(item)
                        .map(Value::Number)
                        .unwrap_or_else(|| Value::String(item.to_string()))
                })
                .collect(),
        ),
    };
    Ok(VariableDeclaration {
        name: decl.name.clone(),
        type_tag: decl.type_tag.clone(),
        enum_name: decl.enum_name.clone(),
        allowable_ranges,
        allowable_values,
    })
}

/// `min...max[,min...max]*`
fn ranges(text: &str, span: Span) -> Result<Vec<AllowableRange>, SeqnError> {
    let bound = |s: &str| -> Result<f64, SeqnError> {
        s.trim().parse::<f64>().map_err(|_| {
            SeqnError::extraction(span.line, format!("invalid range bound '{}'", s.trim()))
        })
    };
    text.split(',')
        .map(|part| {
            let (min, max) = part.split_once("...").ok_or_else(|| {
                SeqnError::extraction(
                    span.line,
                    format!("range '{}' must be written min...max", part.trim()),
                )
            })?;
            Ok(AllowableRange {
                min: bound(min)?,
                max: bound(max)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::grammar;
    use serde_json::json;

    fn doc(src: &str) -> Document {
        extract(&grammar().parse(src).unwrap()).unwrap()
    }

    fn extract_err(src: &str) -> (u32, String) {
        match extract(&grammar().parse(src).unwrap()).unwrap_err() {
            SeqnError::Extraction { line, message } => (line, message),
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn command_step_with_arguments() {
        let d = doc("@ID \"seq\"\nR00:00:01 CMD 1 -2.5 \"s\" ON true 0x1F [1 2]\n");
        assert_eq!(d.id, "seq");
        let Step::Command(c) = &d.steps[0] else {
            panic!("expected command step");
        };
        assert_eq!(
            c.time,
            Time::CommandRelative {
                tag: "00:00:01".into()
            }
        );
        assert_eq!(
            serde_json::to_value(&c.args).unwrap(),
            json!([
                {"type": "number", "value": 1},
                {"type": "number", "value": -2.5},
                {"type": "string", "value": "s"},
                {"type": "symbol", "value": "ON"},
                {"type": "boolean", "value": true},
                {"type": "hex", "value": "0x1F"},
                {"type": "repeat", "value": [[
                    {"type": "number", "value": 1},
                    {"type": "number", "value": 2}
                ]]}
            ])
        );
    }

    #[test]
    fn empty_repeat_group_has_no_sets() {
        let d = doc("@ID \"s\"\nC CMD []\n");
        assert_eq!(d.steps[0].args(), &[Argument::Repeat(vec![])]);
    }

    #[test]
    fn attachments_follow_latest_item() {
        let src = "@ID \"s\"\n\
                   @METADATA \"doc\" 1\n\
                   C @ACTIVATE(\"child\")\n\
                   @ENGINE 3\n\
                   @EPOCH \"e1\"\n\
                   @METADATA \"step\" {\"a\": true}\n\
                   @MODEL \"v\" false \"00:00:01\"\n";
        let d = doc(src);
        assert_eq!(d.metadata.get("doc"), Some(&json!(1)));
        let Step::Activate(a) = &d.steps[0] else {
            panic!("expected activate");
        };
        assert_eq!(a.engine, Some(3));
        assert_eq!(a.epoch.as_deref(), Some("e1"));
        assert_eq!(a.metadata.get("step"), Some(&json!({"a": true})));
        assert_eq!(a.models[0].value, ModelValue::Boolean(false));
    }

    #[test]
    fn request_metadata_after_end() {
        let src = "@ID \"s\"\n\
                   E+00:10:00 @REQUEST_BEGIN(\"r\")\n\
                   C CMD\n\
                   @METADATA \"inner\" 1\n\
                   @REQUEST_END\n\
                   @METADATA \"outer\" 2\n";
        let d = doc(src);
        let r = &d.requests[0];
        assert_eq!(
            r.timing,
            RequestTiming::Time(Time::EpochRelative {
                tag: "+00:10:00".into()
            })
        );
        assert_eq!(r.steps[0].metadata().get("inner"), Some(&json!(1)));
        assert_eq!(r.metadata.get("outer"), Some(&json!(2)));
    }

    #[test]
    fn load_and_go_sets_metadata() {
        let d = doc("@ID \"s\"\n@LOAD_AND_GO\n");
        assert!(d.load_and_go());
    }

    #[test]
    fn declarations_parse_ranges_and_values() {
        let src = "@ID \"s\"\n@LOCALS_BEGIN\nx INT \"\" \"1,two, 3.5\"\ny FLOAT \"0...1.5,10...20\"\n@LOCALS_END\n";
        let d = doc(src);
        let locals = d.locals.unwrap();
        assert_eq!(locals[0].allowable_ranges, None);
        assert_eq!(
            locals[0].allowable_values,
            Some(vec![json!(1), json!("two"), json!(3.5)])
        );
        assert_eq!(
            locals[1].allowable_ranges,
            Some(vec![
                AllowableRange { min: 0.0, max: 1.5 },
                AllowableRange {
                    min: 10.0,
                    max: 20.0
                }
            ])
        );
    }

    #[test]
    fn sections_build_immediate_and_hardware() {
        let src = "@ID \"s\"\n@IMMEDIATE\nNOOP 1\n@ACTIVATE(\"x\")\n@ENGINE 1\n@HARDWARE\nRESET\n@METADATA \"k\" \"v\"\n";
        let d = doc(src);
        let imm = d.immediate_commands.unwrap();
        assert_eq!(imm.len(), 2);
        assert!(matches!(&imm[1], ImmediateCommand::Activate(a) if a.engine == Some(1)));
        let hw = d.hardware_commands.unwrap();
        assert_eq!(hw[0].stem, "RESET");
        assert_eq!(hw[0].metadata.get("k"), Some(&json!("v")));
    }

    #[test]
    fn missing_and_duplicate_id() {
        assert_eq!(extract_err("C NOOP\n").1, "missing @ID");
        let (line, message) = extract_err("@ID \"a\"\n@ID \"b\"\n");
        assert_eq!(line, 2);
        assert!(message.contains("duplicate"));
    }

    #[test]
    fn invalid_time_tags() {
        let (line, message) = extract_err("@ID \"s\"\nA12:00:00 CMD\n");
        assert_eq!(line, 2);
        assert!(message.contains("absolute"), "{}", message);
        assert!(extract_err("@ID \"s\"\nR-10 CMD\n").1.contains("relative"));
        assert!(extract_err("@ID \"s\"\nA CMD\n").1.contains("needs a time tag"));
    }

    #[test]
    fn misplaced_attachments() {
        assert!(extract_err("@ID \"s\"\n@MODEL \"v\" 1 \"0\"\n").1.contains("@MODEL"));
        assert!(extract_err("@ID \"s\"\nC CMD\n@ENGINE 1\n").1.contains("@ENGINE"));
        assert!(extract_err("@ID \"s\"\nC @LOAD(\"x\")\n@EPOCH \"a\"\n@EPOCH \"b\"\n")
            .1
            .contains("duplicate"));
    }

    #[test]
    fn section_attachments_stay_in_their_section() {
        let (line, message) = extract_err("@ID \"s\"\nC CMD\n@IMMEDIATE\n@METADATA \"k\" 1\nNOOP\n");
        assert_eq!(line, 4);
        assert!(message.contains("nothing to attach to"), "{}", message);

        let src = "@ID \"s\"\nC @LOAD(\"x\")\n@HARDWARE\n@ENGINE 1\nRESET\n";
        assert!(extract_err(src).1.contains("@ENGINE"));

        let src = "@ID \"s\"\nC @REQUEST_BEGIN(\"r\")\nC CMD\n@REQUEST_END\n@IMMEDIATE\n@METADATA \"k\" 1\n";
        assert_eq!(extract_err(src).0, 6);

        let d = doc("@ID \"s\"\nC CMD\n@IMMEDIATE\nNOOP\n@METADATA \"k\" 1\n");
        assert!(d.steps[0].metadata().is_empty());
        let mut imm = d.immediate_commands.unwrap();
        assert_eq!(imm[0].metadata_mut().get("k"), Some(&json!(1)));
    }

    #[test]
    fn hardware_rejects_arguments() {
        assert!(extract_err("@ID \"s\"\n@HARDWARE\nRESET 1\n")
            .1
            .contains("no arguments"));
    }

    #[test]
    fn declaration_groups() {
        assert!(extract_err("@ID \"s\"\n@LOCALS_BEGIN\n@LOCALS_END\n")
            .1
            .contains("no variables"));
        let src = "@ID \"s\"\n@LOCALS_BEGIN\na\n@LOCALS_END\n@LOCALS_BEGIN\nb\n@LOCALS_END\n";
        assert!(extract_err(src).1.contains("more than once"));
        assert!(extract_err("@ID \"s\"\n@LOCALS_BEGIN\na INT \"1..2\"\n@LOCALS_END\n")
            .1
            .contains("min...max"));
    }

    #[test]
    fn number_forms() {
        assert_eq!(parse_number("42"), Some(42.into()));
        assert_eq!(parse_number("+7"), Some(7.into()));
        assert_eq!(parse_number("18446744073709551615"), Some(u64::MAX.into()));
        assert_eq!(parse_number("1e3"), Number::from_f64(1000.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("two"), None);
    }
}
