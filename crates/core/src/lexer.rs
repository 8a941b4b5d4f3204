use crate::error::SeqnError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `@NAME`, stored without the `@`
    Directive(String),
    /// Stems, symbols, time prefixes, type names, booleans
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Decimal literal, kept as written
    Number(String),
    /// `0x...` literal, kept as written
    Hex(String),
    /// Value of an `@METADATA` line; may span several lines
    Json(serde_json::Value),
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// Text after `#` up to the end of the line
    Comment(String),
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

/// Characters allowed after the first character of a word.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '+' | '-')
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    line_start: usize,
    tokens: Vec<Spanned>,
}

impl Lexer {
    fn column(&self, pos: usize) -> u32 {
        (pos - self.line_start) as u32 + 1
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, token: Token, line: u32, column: u32) {
        self.tokens.push(Spanned {
            token,
            line,
            column,
        });
    }

    fn err(&self, line: u32, column: u32, msg: impl Into<String>) -> SeqnError {
        SeqnError::parse(line, column, msg)
    }

    /// `@METADATA "key"` has just been lexed; the rest of the statement is JSON.
    fn expects_json(&self) -> bool {
        let n = self.tokens.len();
        n >= 2
            && matches!(self.tokens[n - 1].token, Token::Str(_))
            && matches!(&self.tokens[n - 2].token, Token::Directive(d) if d == "METADATA")
    }

    fn lex_json(&mut self, line: u32, column: u32) -> Result<(), SeqnError> {
        let rest: String = self.chars[self.pos..].iter().collect();
        let mut stream = serde_json::Deserializer::from_str(&rest).into_iter::<serde_json::Value>();
        match stream.next() {
            Some(Ok(value)) => {
                let consumed = rest[..stream.byte_offset()].chars().count();
                for _ in 0..consumed {
                    if self.chars[self.pos] == '\n' {
                        self.line += 1;
                        self.line_start = self.pos + 1;
                    }
                    self.pos += 1;
                }
                self.push(Token::Json(value), line, column);
                Ok(())
            }
            Some(Err(e)) => {
                let (l, c) = if e.line() <= 1 {
                    (line, column + e.column() as u32 - 1)
                } else {
                    (line + e.line() as u32 - 1, e.column() as u32)
                };
                Err(self.err(l, c, format!("invalid metadata value: {}", e)))
            }
            None => Err(self.err(line, column, "expected metadata value")),
        }
    }

    fn lex_string(&mut self, line: u32, column: u32) -> Result<(), SeqnError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.chars.get(self.pos).copied() {
                None | Some('\n') => {
                    return Err(self.err(line, column, "unterminated string literal"));
                }
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') if matches!(self.peek_at(1), None | Some('\n')) => {
                    return Err(self.err(line, column, "unterminated escape in string"));
                }
                Some('\\') => self.pos += 2,
                Some(_) => self.pos += 1,
            }
        }
        // Escapes are JSON's, so the literal decodes as a JSON string.
        let literal: String = self.chars[start..self.pos].iter().collect();
        let s: String = serde_json::from_str(&literal)
            .map_err(|e| self.err(line, column, format!("invalid string literal: {}", e)))?;
        self.push(Token::Str(s), line, column);
        Ok(())
    }

    fn lex_number(&mut self, line: u32, column: u32) -> Result<(), SeqnError> {
        let start = self.pos;
        if matches!(self.peek_at(0), Some('+' | '-')) {
            self.pos += 1;
        }
        self.skip_digits();
        if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            self.skip_digits();
        }
        if matches!(self.peek_at(0), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1 + sign;
                self.skip_digits();
            }
        }
        if self.peek_at(0).is_some_and(is_word_char) {
            while self.peek_at(0).is_some_and(is_word_char) {
                self.pos += 1;
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            return Err(self.err(line, column, format!("invalid number '{}'", text)));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(Token::Number(text), line, column);
        Ok(())
    }

    fn skip_digits(&mut self) {
        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn lex_hex(&mut self, line: u32, column: u32) -> Result<(), SeqnError> {
        let start = self.pos;
        self.pos += 2;
        while self.peek_at(0).is_some_and(|c| c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if text.len() == 2 || self.peek_at(0).is_some_and(is_word_char) {
            return Err(self.err(line, column, format!("invalid hex literal '{}'", text)));
        }
        self.push(Token::Hex(text), line, column);
        Ok(())
    }

    fn run(mut self) -> Result<Vec<Spanned>, SeqnError> {
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            let line = self.line;
            let column = self.column(self.pos);

            if c == '\n' {
                self.push(Token::Newline, line, column);
                self.pos += 1;
                self.line += 1;
                self.line_start = self.pos;
                continue;
            }

            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }

            if self.expects_json() {
                self.lex_json(line, column)?;
                continue;
            }

            match c {
                '#' => {
                    let start = self.pos + 1;
                    while self.pos < self.chars.len() && self.chars[self.pos] != '\n' {
                        self.pos += 1;
                    }
                    let text: String = self.chars[start..self.pos].iter().collect();
                    self.push(Token::Comment(text.trim_end_matches('\r').to_string()), line, column);
                }
                '@' => {
                    self.pos += 1;
                    let start = self.pos;
                    while self
                        .peek_at(0)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        self.pos += 1;
                    }
                    if start == self.pos {
                        return Err(self.err(line, column, "expected directive name after '@'"));
                    }
                    let name: String = self.chars[start..self.pos].iter().collect();
                    self.push(Token::Directive(name), line, column);
                }
                '"' => self.lex_string(line, column)?,
                '(' => {
                    self.push(Token::LParen, line, column);
                    self.pos += 1;
                }
                ')' => {
                    self.push(Token::RParen, line, column);
                    self.pos += 1;
                }
                '[' => {
                    self.push(Token::LBracket, line, column);
                    self.pos += 1;
                }
                ']' => {
                    self.push(Token::RBracket, line, column);
                    self.pos += 1;
                }
                '0' if matches!(self.peek_at(1), Some('x' | 'X')) => self.lex_hex(line, column)?,
                c if c.is_ascii_digit() => self.lex_number(line, column)?,
                '+' | '-' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.lex_number(line, column)?
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let start = self.pos;
                    while self.peek_at(0).is_some_and(is_word_char) {
                        self.pos += 1;
                    }
                    let word: String = self.chars[start..self.pos].iter().collect();
                    self.push(Token::Word(word), line, column);
                }
                other => {
                    return Err(self.err(line, column, format!("unexpected character '{}'", other)));
                }
            }
        }

        let (line, column) = (self.line, self.column(self.pos));
        self.push(Token::Eof, line, column);
        Ok(self.tokens)
    }
}

pub fn lex(src: &str) -> Result<Vec<Spanned>, SeqnError> {
    Lexer {
        chars: src.chars().collect(),
        pos: 0,
        line: 1,
        line_start: 0,
        tokens: Vec::new(),
    }
    .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn command_line_tokens() {
        assert_eq!(
            tokens("R00:00:01 CMD_A 1 -2.5 0xFF ON \"hi\" # note\n"),
            vec![
                Token::Word("R00:00:01".into()),
                Token::Word("CMD_A".into()),
                Token::Number("1".into()),
                Token::Number("-2.5".into()),
                Token::Hex("0xFF".into()),
                Token::Word("ON".into()),
                Token::Str("hi".into()),
                Token::Comment(" note".into()),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn directive_with_parens_and_brackets() {
        assert_eq!(
            tokens("C @ACTIVATE(\"seq\") [1 2]"),
            vec![
                Token::Word("C".into()),
                Token::Directive("ACTIVATE".into()),
                Token::LParen,
                Token::Str("seq".into()),
                Token::RParen,
                Token::LBracket,
                Token::Number("1".into()),
                Token::Number("2".into()),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_follow_json() {
        assert_eq!(
            tokens(r#""a\"b\\c\nA""#),
            vec![Token::Str("a\"b\\c\nA".into()), Token::Eof]
        );
    }

    #[test]
    fn metadata_value_spans_lines() {
        let spanned = lex("@METADATA \"k\" {\n  \"a\": [1,\n 2]\n}\nC NOOP\n").unwrap();
        assert_eq!(spanned[2].token, Token::Json(json!({"a": [1, 2]})));
        assert_eq!(spanned[3].token, Token::Newline);
        assert_eq!(spanned[3].line, 4);
        let stem = &spanned[5];
        assert_eq!(stem.token, Token::Word("NOOP".into()));
        assert_eq!((stem.line, stem.column), (5, 3));
    }

    #[test]
    fn metadata_scalar_value() {
        assert_eq!(
            tokens("@METADATA \"k\" \"v\""),
            vec![
                Token::Directive("METADATA".into()),
                Token::Str("k".into()),
                Token::Json(json!("v")),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let spanned = lex("\n  C  NOOP").unwrap();
        assert_eq!((spanned[1].line, spanned[1].column), (2, 3));
        assert_eq!((spanned[2].line, spanned[2].column), (2, 6));
    }

    #[test]
    fn unterminated_string_is_a_parse_error() {
        let err = lex("C CMD \"open\nC NOOP").unwrap_err();
        assert_eq!(err, SeqnError::parse(1, 7, "unterminated string literal"));
    }

    #[test]
    fn bad_json_reports_position() {
        match lex("@METADATA \"k\" {\"a\": }").unwrap_err() {
            SeqnError::Parse { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column >= 15, "column {}", column);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn number_glued_to_word_is_rejected() {
        assert!(lex("C CMD 12abc").is_err());
        assert!(lex("C CMD 0x").is_err());
    }

    #[test]
    fn unexpected_character() {
        let err = lex("C CMD $").unwrap_err();
        assert_eq!(err, SeqnError::parse(1, 7, "unexpected character '$'"));
    }
}
