//! SeqN grammar: the directive table, token-class patterns and the
//! line-oriented parser that turns source text into a [`SyntaxTree`].
//!
//! The grammar is compiled once per process and shared read-only; every
//! [`Grammar::parse`] call builds its own parser state.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cst::{
    ArgNode, CommandLine, Declaration, Head, Node, RequestBlock, RequestHeader, SectionKind, Span,
    SyntaxTree, TimeMarker, TimePrefix, VariableBlock,
};
use crate::error::SeqnError;
use crate::lexer::{self, Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Id,
    LoadAndGo,
    InputParamsBegin,
    InputParamsEnd,
    LocalsBegin,
    LocalsEnd,
    Metadata,
    Model,
    Engine,
    Epoch,
    Activate,
    Load,
    GroundBlock,
    GroundEvent,
    RequestBegin,
    RequestEnd,
    Immediate,
    Hardware,
}

const DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("ID", DirectiveKind::Id),
    ("LOAD_AND_GO", DirectiveKind::LoadAndGo),
    ("INPUT_PARAMS_BEGIN", DirectiveKind::InputParamsBegin),
    ("INPUT_PARAMS_END", DirectiveKind::InputParamsEnd),
    ("LOCALS_BEGIN", DirectiveKind::LocalsBegin),
    ("LOCALS_END", DirectiveKind::LocalsEnd),
    ("METADATA", DirectiveKind::Metadata),
    ("MODEL", DirectiveKind::Model),
    ("ENGINE", DirectiveKind::Engine),
    ("EPOCH", DirectiveKind::Epoch),
    ("ACTIVATE", DirectiveKind::Activate),
    ("LOAD", DirectiveKind::Load),
    ("GROUND_BLOCK", DirectiveKind::GroundBlock),
    ("GROUND_EVENT", DirectiveKind::GroundEvent),
    ("REQUEST_BEGIN", DirectiveKind::RequestBegin),
    ("REQUEST_END", DirectiveKind::RequestEnd),
    ("IMMEDIATE", DirectiveKind::Immediate),
    ("HARDWARE", DirectiveKind::Hardware),
];

/// Compiled SeqN recognizer.
#[derive(Debug)]
pub struct Grammar {
    directives: HashMap<&'static str, DirectiveKind>,
    time_prefix: Regex,
    word: Regex,
    hex: Regex,
}

static GRAMMAR: Lazy<Grammar> = Lazy::new(Grammar::compile);

/// The process-wide grammar, compiled on first use.
pub fn grammar() -> &'static Grammar {
    &GRAMMAR
}

impl Grammar {
    fn compile() -> Self {
        tracing::debug!(directives = DIRECTIVES.len(), "compiling SeqN grammar");
        Grammar {
            directives: DIRECTIVES.iter().copied().collect(),
            time_prefix: Regex::new(r"^(?P<marker>[ACREG])(?P<tag>[+-]?[0-9][0-9:T.+\-]*)?$")
                .unwrap(),
            word: Regex::new(r"^[A-Za-z_][A-Za-z0-9_.:+\-]*$").unwrap(),
            hex: Regex::new(r"^0[xX][0-9A-Fa-f]+$").unwrap(),
        }
    }

    pub fn directive(&self, name: &str) -> Option<DirectiveKind> {
        self.directives.get(name).copied()
    }

    /// True when `text` lexes as exactly one word token.
    pub fn is_word(&self, text: &str) -> bool {
        self.word.is_match(text)
    }

    pub fn is_hex(&self, text: &str) -> bool {
        self.hex.is_match(text)
    }

    pub fn parse(&self, src: &str) -> Result<SyntaxTree, SeqnError> {
        let tokens = lexer::lex(src)?;
        let tree = Parser::new(self, &tokens).parse_document()?;
        tracing::debug!(nodes = tree.nodes.len(), "parsed SeqN");
        Ok(tree)
    }
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Steps,
    RequestBody,
    Immediate,
    Hardware,
}

impl Context {
    fn is_timed(self) -> bool {
        matches!(self, Context::Steps | Context::RequestBody)
    }
}

enum Prefix {
    Timed(TimePrefix),
    Ground { delta: Option<String>, span: Span },
}

fn describe(token: &Token) -> String {
    match token {
        Token::Directive(d) => format!("'@{}'", d),
        Token::Word(w) => format!("'{}'", w),
        Token::Str(s) => format!("string {:?}", s),
        Token::Number(n) | Token::Hex(n) => format!("'{}'", n),
        Token::Json(_) => "JSON value".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Comment(_) => "comment".to_string(),
        Token::Newline => "end of line".to_string(),
        Token::Eof => "end of input".to_string(),
    }
}

struct Parser<'a> {
    grammar: &'a Grammar,
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(grammar: &'a Grammar, tokens: &'a [Spanned]) -> Self {
        Parser {
            grammar,
            tokens,
            pos: 0,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn span(&self) -> Span {
        let s = self.cur();
        Span {
            line: s.line,
            column: s.column,
        }
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn err(&self, msg: impl Into<String>) -> SeqnError {
        let s = self.cur();
        SeqnError::parse(s.line, s.column, msg)
    }

    fn err_at(span: Span, msg: impl Into<String>) -> SeqnError {
        SeqnError::parse(span.line, span.column, msg)
    }

    fn unexpected(&self, wanted: &str) -> SeqnError {
        self.err(format!("expected {}, got {}", wanted, describe(self.peek())))
    }

    fn skip_newlines(&mut self) {
        while self.peek() == &Token::Newline {
            self.advance();
        }
    }

    fn expect_eol(&mut self) -> Result<(), SeqnError> {
        match self.peek() {
            Token::Newline => {
                self.advance();
                Ok(())
            }
            Token::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), SeqnError> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&describe(&token)))
        }
    }

    fn take_str(&mut self) -> Result<String, SeqnError> {
        if let Token::Str(s) = self.peek().clone() {
            self.advance();
            Ok(s)
        } else {
            Err(self.unexpected("string literal"))
        }
    }

    fn take_word(&mut self) -> Result<String, SeqnError> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    /// `("name")` after a directive.
    fn take_paren_str(&mut self) -> Result<String, SeqnError> {
        self.expect(Token::LParen)?;
        let s = self.take_str()?;
        self.expect(Token::RParen)?;
        Ok(s)
    }

    /// Trailing `# text`; one leading space is part of the `# ` marker.
    fn take_description(&mut self) -> Option<String> {
        if let Token::Comment(text) = self.peek().clone() {
            self.advance();
            Some(text.strip_prefix(' ').unwrap_or(&text).to_string())
        } else {
            None
        }
    }

    fn directive_kind(&self, name: &str) -> Result<DirectiveKind, SeqnError> {
        self.grammar
            .directive(name)
            .ok_or_else(|| self.err(format!("unknown directive '@{}'", name)))
    }

    // ── Document ───────────────────────────────────────────────────

    fn parse_document(&mut self) -> Result<SyntaxTree, SeqnError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_newlines();
            let span = self.span();
            let node = match self.peek().clone() {
                Token::Eof => break,
                Token::Directive(name) => match self.directive_kind(&name)? {
                    DirectiveKind::Id => {
                        self.advance();
                        let value = self.take_str()?;
                        self.expect_eol()?;
                        Node::Id { value, span }
                    }
                    DirectiveKind::LoadAndGo => {
                        self.advance();
                        self.expect_eol()?;
                        Node::LoadAndGo { span }
                    }
                    DirectiveKind::InputParamsBegin => {
                        self.parse_variables(VariableBlock::InputParams)?
                    }
                    DirectiveKind::LocalsBegin => self.parse_variables(VariableBlock::Locals)?,
                    DirectiveKind::Immediate => self.parse_section(SectionKind::Immediate)?,
                    DirectiveKind::Hardware => self.parse_section(SectionKind::Hardware)?,
                    _ => self.parse_line(Context::Steps)?,
                },
                _ => self.parse_line(Context::Steps)?,
            };
            nodes.push(node);
        }
        Ok(SyntaxTree { nodes })
    }

    /// One line valid in any section: comment, attachment or command.
    fn parse_line(&mut self, ctx: Context) -> Result<Node, SeqnError> {
        let span = self.span();
        match self.peek().clone() {
            Token::Comment(text) => {
                self.advance();
                self.expect_eol()?;
                Ok(Node::Comment { text, span })
            }
            Token::Directive(name) => match self.directive_kind(&name)? {
                DirectiveKind::Metadata => self.parse_metadata(),
                DirectiveKind::Model => self.parse_model(),
                DirectiveKind::Engine => {
                    self.advance();
                    let value = match self.peek().clone() {
                        Token::Number(n) => {
                            self.advance();
                            n
                        }
                        _ => return Err(self.unexpected("engine number")),
                    };
                    self.expect_eol()?;
                    Ok(Node::Engine { value, span })
                }
                DirectiveKind::Epoch => {
                    self.advance();
                    let value = self.take_str()?;
                    self.expect_eol()?;
                    Ok(Node::Epoch { value, span })
                }
                DirectiveKind::Activate
                | DirectiveKind::Load
                | DirectiveKind::GroundBlock
                | DirectiveKind::GroundEvent
                    if !ctx.is_timed() =>
                {
                    self.parse_command(None, ctx)
                }
                DirectiveKind::Activate
                | DirectiveKind::Load
                | DirectiveKind::GroundBlock
                | DirectiveKind::GroundEvent
                | DirectiveKind::RequestBegin => {
                    Err(self.err(format!("'@{}' needs a time prefix", name)))
                }
                DirectiveKind::InputParamsEnd
                | DirectiveKind::LocalsEnd
                | DirectiveKind::RequestEnd => {
                    Err(self.err(format!("'@{}' without a matching begin", name)))
                }
                _ => Err(self.err(format!("'@{}' is not allowed here", name))),
            },
            Token::Word(_) if !ctx.is_timed() => self.parse_command(None, ctx),
            Token::Word(_) => match self.parse_time_prefix()? {
                Prefix::Timed(prefix) => {
                    if matches!(self.peek(), Token::Directive(d) if d == "REQUEST_BEGIN") {
                        if ctx == Context::RequestBody {
                            return Err(self.err("requests cannot be nested"));
                        }
                        self.parse_request(RequestHeader::Time(prefix), span)
                    } else {
                        self.parse_command(Some(prefix), ctx)
                    }
                }
                Prefix::Ground { delta, span: g } => {
                    if ctx == Context::RequestBody {
                        return Err(self.err("requests cannot be nested"));
                    }
                    let epoch = self.take_str()?;
                    if !matches!(self.peek(), Token::Directive(d) if d == "REQUEST_BEGIN") {
                        return Err(Self::err_at(
                            g,
                            "ground epoch prefix 'G' only precedes @REQUEST_BEGIN",
                        ));
                    }
                    self.parse_request(RequestHeader::Ground { delta, epoch }, span)
                }
            },
            _ => Err(self.unexpected(if ctx.is_timed() {
                "time prefix or directive"
            } else {
                "command stem or directive"
            })),
        }
    }

    fn parse_time_prefix(&mut self) -> Result<Prefix, SeqnError> {
        let span = self.span();
        let word = self.take_word()?;
        let caps = self.grammar.time_prefix.captures(&word).ok_or_else(|| {
            Self::err_at(
                span,
                format!("expected time prefix (A, C, R, E or G), got '{}'", word),
            )
        })?;
        let tag = caps.name("tag").map(|m| m.as_str().to_string());
        let marker = match &caps["marker"] {
            "A" => TimeMarker::Absolute,
            "C" if tag.is_some() => {
                return Err(Self::err_at(span, "'C' takes no time tag"));
            }
            "C" => TimeMarker::Complete,
            "R" => TimeMarker::Relative,
            "E" => TimeMarker::Epoch,
            _ => return Ok(Prefix::Ground { delta: tag, span }),
        };
        Ok(Prefix::Timed(TimePrefix { marker, tag, span }))
    }

    // ── Commands ───────────────────────────────────────────────────

    fn parse_command(
        &mut self,
        time: Option<TimePrefix>,
        ctx: Context,
    ) -> Result<Node, SeqnError> {
        let span = time.as_ref().map_or_else(|| self.span(), |t| t.span);
        let head = match self.peek().clone() {
            Token::Word(stem) => {
                self.advance();
                Head::Stem(stem)
            }
            Token::Directive(name) => {
                let kind = self.directive_kind(&name)?;
                let make: fn(String) -> Head = match kind {
                    DirectiveKind::Activate => Head::Activate,
                    DirectiveKind::Load => Head::Load,
                    DirectiveKind::GroundBlock => Head::GroundBlock,
                    DirectiveKind::GroundEvent => Head::GroundEvent,
                    _ => return Err(self.err(format!("'@{}' cannot start a command", name))),
                };
                self.advance();
                make(self.take_paren_str()?)
            }
            _ => {
                return Err(self.unexpected(if ctx.is_timed() {
                    "command stem after time prefix"
                } else {
                    "command stem"
                }))
            }
        };
        let args = self.parse_args()?;
        let description = self.take_description();
        self.expect_eol()?;
        Ok(Node::Command(CommandLine {
            time,
            head,
            args,
            description,
            span,
        }))
    }

    fn parse_args(&mut self) -> Result<Vec<ArgNode>, SeqnError> {
        let mut args = Vec::new();
        loop {
            let span = self.span();
            match self.peek().clone() {
                Token::LBracket => {
                    self.advance();
                    let mut items = Vec::new();
                    loop {
                        match self.peek() {
                            Token::RBracket => {
                                self.advance();
                                break;
                            }
                            Token::LBracket => {
                                return Err(self.err("repeat groups cannot be nested"));
                            }
                            Token::Newline | Token::Eof => {
                                return Err(Self::err_at(span, "unterminated repeat group"));
                            }
                            _ => match self.parse_scalar_arg()? {
                                Some(arg) => items.push(arg),
                                None => return Err(self.unexpected("argument or ']'")),
                            },
                        }
                    }
                    args.push(ArgNode::Repeat(items, span));
                }
                _ => match self.parse_scalar_arg()? {
                    Some(arg) => args.push(arg),
                    None => return Ok(args),
                },
            }
        }
    }

    fn parse_scalar_arg(&mut self) -> Result<Option<ArgNode>, SeqnError> {
        let span = self.span();
        let arg = match self.peek().clone() {
            Token::Str(s) => ArgNode::Str(s, span),
            Token::Number(n) => ArgNode::Number(n, span),
            Token::Hex(h) => ArgNode::Hex(h, span),
            Token::Word(w) => ArgNode::Word(w, span),
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(arg))
    }

    // ── Blocks ─────────────────────────────────────────────────────

    fn parse_request(&mut self, header: RequestHeader, span: Span) -> Result<Node, SeqnError> {
        self.advance(); // @REQUEST_BEGIN
        let name = self.take_paren_str()?;
        let description = self.take_description();
        self.expect_eol()?;

        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Token::Eof => {
                    return Err(Self::err_at(
                        span,
                        format!("request \"{}\" is missing @REQUEST_END", name),
                    ));
                }
                Token::Directive(d) if d == "REQUEST_END" => {
                    self.advance();
                    self.expect_eol()?;
                    break;
                }
                _ => body.push(self.parse_line(Context::RequestBody)?),
            }
        }
        Ok(Node::Request(RequestBlock {
            header,
            name,
            description,
            body,
            span,
        }))
    }

    fn parse_section(&mut self, kind: SectionKind) -> Result<Node, SeqnError> {
        let span = self.span();
        self.advance();
        self.expect_eol()?;
        let ctx = match kind {
            SectionKind::Immediate => Context::Immediate,
            SectionKind::Hardware => Context::Hardware,
        };
        let mut nodes = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Token::Eof => break,
                Token::Directive(d) if d == "IMMEDIATE" || d == "HARDWARE" => break,
                _ => nodes.push(self.parse_line(ctx)?),
            }
        }
        Ok(Node::Section { kind, nodes, span })
    }

    fn parse_variables(&mut self, block: VariableBlock) -> Result<Node, SeqnError> {
        let span = self.span();
        let end = format!("{}_END", block.directive());
        self.advance();
        self.expect_eol()?;

        let mut declarations = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().clone() {
                Token::Eof => {
                    return Err(Self::err_at(
                        span,
                        format!("@{}_BEGIN is missing @{}", block.directive(), end),
                    ));
                }
                Token::Directive(d) if d == end => {
                    self.advance();
                    self.expect_eol()?;
                    break;
                }
                Token::Comment(_) => {
                    self.advance();
                    self.expect_eol()?;
                }
                Token::Word(_) => declarations.push(self.parse_declaration()?),
                _ => return Err(self.unexpected(&format!("declaration or @{}", end))),
            }
        }
        Ok(Node::Variables {
            block,
            declarations,
            span,
        })
    }

    fn parse_declaration(&mut self) -> Result<Declaration, SeqnError> {
        let span = self.span();
        let name = self.take_word()?;
        let mut words = Vec::new();
        while let Token::Word(w) = self.peek().clone() {
            if words.len() == 2 {
                return Err(self.err(format!("unexpected '{}' after type and enum name", w)));
            }
            words.push(w);
            self.advance();
        }
        let mut strings = Vec::new();
        while let Token::Str(s) = self.peek().clone() {
            if strings.len() == 2 {
                return Err(self.err("a declaration takes at most ranges and values strings"));
            }
            strings.push(s);
            self.advance();
        }
        self.expect_eol()?;

        let mut words = words.into_iter();
        let mut strings = strings.into_iter();
        Ok(Declaration {
            name,
            type_tag: words.next(),
            enum_name: words.next(),
            ranges: strings.next(),
            values: strings.next(),
            span,
        })
    }

    // ── Attachments ────────────────────────────────────────────────

    fn parse_metadata(&mut self) -> Result<Node, SeqnError> {
        let span = self.span();
        self.advance();
        let key = self.take_str()?;
        let value = match self.peek().clone() {
            Token::Json(v) => {
                self.advance();
                v
            }
            _ => return Err(self.unexpected("metadata value")),
        };
        self.expect_eol()?;
        Ok(Node::Metadata { key, value, span })
    }

    fn parse_model(&mut self) -> Result<Node, SeqnError> {
        let span = self.span();
        self.advance();
        let variable = match self.peek().clone() {
            Token::Str(s) | Token::Word(s) => {
                self.advance();
                s
            }
            _ => return Err(self.unexpected("model variable")),
        };
        let value = match self.parse_scalar_arg()? {
            Some(ArgNode::Hex(..)) | None => return Err(self.unexpected("model value")),
            Some(v) => v,
        };
        let offset = self.take_str()?;
        self.expect_eol()?;
        Ok(Node::Model {
            variable,
            value,
            offset,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SyntaxTree {
        grammar().parse(src).unwrap()
    }

    fn parse_err(src: &str) -> (u32, u32, String) {
        match grammar().parse(src).unwrap_err() {
            SeqnError::Parse {
                line,
                column,
                message,
            } => (line, column, message),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn grammar_is_shared() {
        assert!(std::ptr::eq(grammar(), grammar()));
        assert_eq!(grammar().directive("ID"), Some(DirectiveKind::Id));
        assert_eq!(grammar().directive("NOPE"), None);
    }

    #[test]
    fn command_line_node() {
        let tree = parse("@ID \"s\"\nR00:00:10 CMD_A 1 \"two\" [3 ON] # go now\n");
        assert_eq!(tree.nodes.len(), 2);
        match &tree.nodes[1] {
            Node::Command(c) => {
                let t = c.time.as_ref().unwrap();
                assert_eq!(t.marker, TimeMarker::Relative);
                assert_eq!(t.tag.as_deref(), Some("00:00:10"));
                assert_eq!(c.head, Head::Stem("CMD_A".into()));
                assert_eq!(c.args.len(), 3);
                match &c.args[2] {
                    ArgNode::Repeat(items, _) => assert_eq!(items.len(), 2),
                    other => panic!("expected repeat, got {:?}", other),
                }
                assert_eq!(c.description.as_deref(), Some("go now"));
                assert_eq!(c.span, Span { line: 2, column: 1 });
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn activate_head() {
        let tree = parse("C @ACTIVATE(\"child\") 5\n@ENGINE 2\n@EPOCH \"e\"\n");
        match &tree.nodes[0] {
            Node::Command(c) => {
                assert_eq!(c.time.as_ref().unwrap().marker, TimeMarker::Complete);
                assert_eq!(c.head, Head::Activate("child".into()));
            }
            other => panic!("expected command, got {:?}", other),
        }
        assert!(matches!(&tree.nodes[1], Node::Engine { value, .. } if value == "2"));
        assert!(matches!(&tree.nodes[2], Node::Epoch { value, .. } if value == "e"));
    }

    #[test]
    fn request_block() {
        let src = "A2024-001T00:00:00 @REQUEST_BEGIN(\"r1\") # first\n\
                   C CMD\n\
                   @METADATA \"k\" 1\n\
                   @REQUEST_END\n";
        match &parse(src).nodes[0] {
            Node::Request(r) => {
                assert_eq!(r.name, "r1");
                assert_eq!(r.description.as_deref(), Some("first"));
                assert_eq!(r.body.len(), 2);
                assert!(matches!(&r.header, RequestHeader::Time(t) if t.marker == TimeMarker::Absolute));
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn ground_epoch_request() {
        let src = "G+00:10:00 \"launch\" @REQUEST_BEGIN(\"r\")\nC CMD\n@REQUEST_END\n";
        match &parse(src).nodes[0] {
            Node::Request(r) => assert_eq!(
                r.header,
                RequestHeader::Ground {
                    delta: Some("+00:10:00".into()),
                    epoch: "launch".into()
                }
            ),
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn sections_collect_untimed_commands() {
        let src = "@IMMEDIATE\nNOOP\n@LOAD(\"s\")\n@HARDWARE\nRESET # hard\n";
        let tree = parse(src);
        assert_eq!(tree.nodes.len(), 2);
        match &tree.nodes[0] {
            Node::Section { kind, nodes, .. } => {
                assert_eq!(*kind, SectionKind::Immediate);
                assert_eq!(nodes.len(), 2);
            }
            other => panic!("expected section, got {:?}", other),
        }
        assert!(matches!(&tree.nodes[1], Node::Section { kind: SectionKind::Hardware, nodes, .. } if nodes.len() == 1));
    }

    #[test]
    fn variable_block() {
        let src = "@INPUT_PARAMS_BEGIN\nmode UINT\nlevel INT LEVELS \"0...10\" \"1,2\"\n@INPUT_PARAMS_END\n";
        match &parse(src).nodes[0] {
            Node::Variables {
                block,
                declarations,
                ..
            } => {
                assert_eq!(*block, VariableBlock::InputParams);
                assert_eq!(declarations[0].type_tag.as_deref(), Some("UINT"));
                assert_eq!(declarations[1].enum_name.as_deref(), Some("LEVELS"));
                assert_eq!(declarations[1].values.as_deref(), Some("1,2"));
            }
            other => panic!("expected variables, got {:?}", other),
        }
    }

    #[test]
    fn model_line() {
        match &parse("@MODEL \"temp\" 21.5 \"00:01:00\"\n").nodes[0] {
            Node::Model {
                variable, value, offset, ..
            } => {
                assert_eq!(variable, "temp");
                assert!(matches!(value, ArgNode::Number(n, _) if n == "21.5"));
                assert_eq!(offset, "00:01:00");
            }
            other => panic!("expected model, got {:?}", other),
        }
    }

    #[test]
    fn missing_time_prefix() {
        let (line, column, message) = parse_err("@ID \"x\"\nNOOP 1\n");
        assert_eq!((line, column), (2, 1));
        assert!(message.contains("time prefix"), "{}", message);
    }

    #[test]
    fn nested_repeat_rejected() {
        let (_, column, message) = parse_err("C CMD [1 [2]]");
        assert_eq!(column, 10);
        assert!(message.contains("nested"));
    }

    #[test]
    fn nested_request_rejected() {
        let src = "C @REQUEST_BEGIN(\"a\")\nC @REQUEST_BEGIN(\"b\")\n@REQUEST_END\n@REQUEST_END\n";
        let (line, _, message) = parse_err(src);
        assert_eq!(line, 2);
        assert!(message.contains("nested"));
    }

    #[test]
    fn unterminated_blocks() {
        let (line, _, message) = parse_err("C CMD\nC @REQUEST_BEGIN(\"a\")\nC X\n");
        assert_eq!(line, 2);
        assert!(message.contains("@REQUEST_END"));
        let (line, _, message) = parse_err("@LOCALS_BEGIN\nx\n");
        assert_eq!(line, 1);
        assert!(message.contains("@LOCALS_END"));
    }

    #[test]
    fn stray_end_and_unknown_directive() {
        assert!(parse_err("@REQUEST_END\n").2.contains("without a matching begin"));
        assert!(parse_err("@BOGUS\n").2.contains("unknown directive"));
    }

    #[test]
    fn ground_prefix_needs_request() {
        let (_, _, message) = parse_err("G10 \"e\" CMD\n");
        assert!(message.contains("'G'") || message.contains("string"), "{}", message);
    }

    #[test]
    fn complete_prefix_takes_no_tag() {
        assert!(parse_err("C10 CMD\n").2.contains("no time tag"));
    }

    #[test]
    fn word_and_hex_classes() {
        let g = grammar();
        assert!(g.is_word("CMD_A.b"));
        assert!(!g.is_word("1CMD"));
        assert!(!g.is_word("has space"));
        assert!(g.is_hex("0xBEEF"));
        assert!(!g.is_hex("0x"));
    }
}
