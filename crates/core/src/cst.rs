//! Concrete syntax tree produced by the grammar parser.
//! Nodes follow the source line by line and carry the position of their
//! first token. Nothing is validated here beyond shape: time tags,
//! numbers and declaration strings are kept as written for the extractor.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyntaxTree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Id {
        value: String,
        span: Span,
    },
    LoadAndGo {
        span: Span,
    },
    Variables {
        block: VariableBlock,
        declarations: Vec<Declaration>,
        span: Span,
    },
    Metadata {
        key: String,
        value: serde_json::Value,
        span: Span,
    },
    Model {
        variable: String,
        value: ArgNode,
        offset: String,
        span: Span,
    },
    /// `@ENGINE`, number as written
    Engine {
        value: String,
        span: Span,
    },
    Epoch {
        value: String,
        span: Span,
    },
    Command(CommandLine),
    Request(RequestBlock),
    Section {
        kind: SectionKind,
        nodes: Vec<Node>,
        span: Span,
    },
    Comment {
        text: String,
        span: Span,
    },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Id { span, .. }
            | Node::LoadAndGo { span }
            | Node::Variables { span, .. }
            | Node::Metadata { span, .. }
            | Node::Model { span, .. }
            | Node::Engine { span, .. }
            | Node::Epoch { span, .. }
            | Node::Section { span, .. }
            | Node::Comment { span, .. } => *span,
            Node::Command(c) => c.span,
            Node::Request(r) => r.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableBlock {
    InputParams,
    Locals,
}

impl VariableBlock {
    pub fn directive(self) -> &'static str {
        match self {
            VariableBlock::InputParams => "INPUT_PARAMS",
            VariableBlock::Locals => "LOCALS",
        }
    }
}

/// `name [type] [enum] ["ranges"] ["values"]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Declaration {
    pub name: String,
    pub type_tag: Option<String>,
    pub enum_name: Option<String>,
    pub ranges: Option<String>,
    pub values: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMarker {
    /// `A`
    Absolute,
    /// `C`
    Complete,
    /// `R`
    Relative,
    /// `E`
    Epoch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimePrefix {
    pub marker: TimeMarker,
    pub tag: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Head {
    Stem(String),
    Activate(String),
    Load(String),
    GroundBlock(String),
    GroundEvent(String),
}

/// A step, or an untimed command inside `@IMMEDIATE` / `@HARDWARE`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    pub time: Option<TimePrefix>,
    pub head: Head,
    pub args: Vec<ArgNode>,
    pub description: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestHeader {
    Time(TimePrefix),
    /// `G<delta?> "<epoch>"`
    Ground {
        delta: Option<String>,
        epoch: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBlock {
    pub header: RequestHeader,
    pub name: String,
    pub description: Option<String>,
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Immediate,
    Hardware,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgNode {
    Str(String, Span),
    Number(String, Span),
    Hex(String, Span),
    Word(String, Span),
    /// Bracket group; items are never groups themselves.
    Repeat(Vec<ArgNode>, Span),
}

impl ArgNode {
    pub fn span(&self) -> Span {
        match self {
            ArgNode::Str(_, s)
            | ArgNode::Number(_, s)
            | ArgNode::Hex(_, s)
            | ArgNode::Word(_, s)
            | ArgNode::Repeat(_, s) => *s,
        }
    }
}
