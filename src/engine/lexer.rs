//! Lexer -- tokenizes Python-style source into a stream of [`Token`]s.
//!
//! Positions are exact: `line` is 1-based and `col` is a 0-based *byte* offset
//! into that line, so every span can be sliced straight out of the original
//! text. Comments and blank lines produce no tokens. Logical lines end with a
//! `Newline` token; indentation changes produce `Indent` / `Dedent`.

use serde::Serialize;

use super::error::SyntaxError;

/// A position in the source: 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    Str,
    Op,
    Newline,
    Indent,
    Dedent,
    EndOfFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// True for a name token with exactly this text (keywords are names here).
    pub fn is_name(&self, name: &str) -> bool {
        self.kind == TokenKind::Name && self.text == name
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }
}

const OPERATORS_3: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const OPERATORS_2: &[&str] = &[
    "==", "!=", "<=", ">=", "->", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "**",
    "//", "<<", ">>", ":=",
];
const OPERATORS_1: &str = "+-*/%@&|^~<>()[]{},:.;=";

const STRING_PREFIXES: &[&str] = &[
    "r", "u", "b", "f", "br", "rb", "fr", "rf", "R", "U", "B", "F", "Br", "bR", "BR", "Rb", "rB",
    "RB", "Fr", "fR", "FR", "Rf", "rF", "RF",
];

/// Lexer for Python-style source.
#[derive(Debug)]
pub struct Lexer<'a> {
    lines: Vec<&'a str>,
    row: usize,
    col: usize,
    tokens: Vec<Token>,
    indents: Vec<usize>,
    brackets: Vec<(char, usize)>,
    continuation: bool,
    line_has_tokens: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.split('\n').collect(),
            row: 0,
            col: 0,
            tokens: Vec::new(),
            indents: vec![0],
            brackets: Vec::new(),
            continuation: false,
            line_has_tokens: false,
        }
    }

    /// Tokenize the whole source.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        while self.row < self.lines.len() {
            let at_logical_start = self.brackets.is_empty() && !self.continuation;
            self.continuation = false;
            self.col = 0;

            if at_logical_start && !self.handle_indentation()? {
                self.row += 1;
                continue;
            }

            self.scan_line()?;

            if self.brackets.is_empty() && !self.continuation && self.line_has_tokens {
                let line_no = self.row + 1;
                let end = Pos::new(line_no, self.lines[self.row].len());
                self.push(TokenKind::Newline, "", Span::new(end, end));
                self.line_has_tokens = false;
            }
            self.row += 1;
        }

        if let Some((open, line)) = self.brackets.last() {
            return Err(SyntaxError::new(*line, format!("'{open}' was never closed")));
        }
        if self.continuation {
            return Err(SyntaxError::new(
                self.lines.len(),
                "unexpected end of file after line continuation",
            ));
        }

        let eof = Pos::new(self.lines.len(), 0);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, "", Span::new(eof, eof));
        }
        self.push(TokenKind::EndOfFile, "", Span::new(eof, eof));
        Ok(self.tokens)
    }

    /// Measure indentation at the start of a logical line and emit
    /// Indent/Dedent. Returns false for blank and comment-only lines.
    fn handle_indentation(&mut self) -> Result<bool, SyntaxError> {
        let line = self.lines[self.row];
        let mut width = 0usize;
        let mut first = line.len();
        for (i, ch) in line.char_indices() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => {
                    first = i;
                    break;
                }
            }
        }

        let rest = &line[first..];
        if rest.trim().is_empty() || rest.starts_with('#') {
            return Ok(false);
        }

        let line_no = self.row + 1;
        let here = Pos::new(line_no, first);
        let top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.indents.push(width);
            self.push(TokenKind::Indent, "", Span::new(Pos::new(line_no, 0), here));
        } else if width < top {
            while width < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.push(TokenKind::Dedent, "", Span::new(here, here));
            }
            if self.indents.last().copied().unwrap_or(0) != width {
                return Err(SyntaxError::new(
                    line_no,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        self.col = first;
        Ok(true)
    }

    fn scan_line(&mut self) -> Result<(), SyntaxError> {
        loop {
            let line = self.lines[self.row];
            let Some(ch) = line[self.col..].chars().next() else {
                return Ok(());
            };
            let line_no = self.row + 1;

            match ch {
                ' ' | '\t' | '\r' | '\x0c' => self.col += 1,
                '#' => return Ok(()),
                '\\' => {
                    if line[self.col + 1..].trim().is_empty() {
                        self.continuation = true;
                        return Ok(());
                    }
                    return Err(SyntaxError::new(
                        line_no,
                        "unexpected character after line continuation character",
                    ));
                }
                '"' | '\'' => self.scan_string(0)?,
                c if c.is_ascii_digit() => self.scan_number(),
                '.' if line[self.col + 1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit()) =>
                {
                    self.scan_number()
                }
                c if c == '_' || c.is_alphabetic() => {
                    let start = self.col;
                    let len = line[start..]
                        .char_indices()
                        .find(|(_, c)| !(*c == '_' || c.is_alphanumeric()))
                        .map(|(i, _)| i)
                        .unwrap_or(line.len() - start);
                    let word = &line[start..start + len];
                    let next = line[start + len..].chars().next();
                    if STRING_PREFIXES.contains(&word) && matches!(next, Some('"') | Some('\'')) {
                        self.scan_string(len)?;
                    } else {
                        self.col = start + len;
                        self.push(
                            TokenKind::Name,
                            word,
                            Span::new(Pos::new(line_no, start), Pos::new(line_no, start + len)),
                        );
                    }
                }
                _ => self.scan_operator()?,
            }
        }
    }

    fn scan_number(&mut self) {
        let line = self.lines[self.row];
        let start = self.col;
        let bytes = line.as_bytes();
        let hex = line[start..].starts_with("0x") || line[start..].starts_with("0X");
        let mut end = start;
        while end < bytes.len() {
            let b = bytes[end];
            let exponent_sign = (b == b'+' || b == b'-')
                && !hex
                && end > start
                && matches!(bytes[end - 1], b'e' | b'E');
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
                end += 1;
            } else {
                break;
            }
        }
        let line_no = self.row + 1;
        self.col = end;
        self.push(
            TokenKind::Number,
            &line[start..end],
            Span::new(Pos::new(line_no, start), Pos::new(line_no, end)),
        );
    }

    /// Scan a string literal whose prefix is `prefix_len` bytes long. Triple
    /// quoted strings (and backslash-newline escapes) may span several lines.
    fn scan_string(&mut self, prefix_len: usize) -> Result<(), SyntaxError> {
        let start_row = self.row;
        let start_col = self.col;
        let line = self.lines[self.row];
        let quote_at = start_col + prefix_len;
        let quote = line.as_bytes()[quote_at];
        let triple = line[quote_at..].as_bytes().starts_with(&[quote, quote, quote]);
        let mut pos = quote_at + if triple { 3 } else { 1 };

        loop {
            let bytes = self.lines[self.row].as_bytes();
            let mut closed = None;
            while pos < bytes.len() {
                let b = bytes[pos];
                if b == b'\\' {
                    pos += 2;
                    continue;
                }
                if b == quote {
                    if !triple {
                        closed = Some(pos + 1);
                        break;
                    }
                    if bytes[pos..].starts_with(&[quote, quote, quote]) {
                        closed = Some(pos + 3);
                        break;
                    }
                }
                pos += 1;
            }

            if let Some(end) = closed {
                let text = if self.row == start_row {
                    self.lines[start_row][start_col..end].to_string()
                } else {
                    let mut parts = vec![&self.lines[start_row][start_col..]];
                    parts.extend(&self.lines[start_row + 1..self.row]);
                    parts.push(&self.lines[self.row][..end]);
                    parts.join("\n")
                };
                self.col = end;
                self.push(
                    TokenKind::Str,
                    text,
                    Span::new(
                        Pos::new(start_row + 1, start_col),
                        Pos::new(self.row + 1, end),
                    ),
                );
                return Ok(());
            }

            // An escaped newline continues any string; an unescaped one only
            // continues a triple-quoted string.
            let escaped_newline = pos > bytes.len();
            if !triple && !escaped_newline {
                return Err(SyntaxError::new(
                    start_row + 1,
                    "unterminated string literal",
                ));
            }
            if self.row + 1 >= self.lines.len() {
                return Err(SyntaxError::new(
                    start_row + 1,
                    "unterminated triple-quoted string literal",
                ));
            }
            self.row += 1;
            pos = 0;
        }
    }

    fn scan_operator(&mut self) -> Result<(), SyntaxError> {
        let line = self.lines[self.row];
        let rest = &line[self.col..];
        let line_no = self.row + 1;

        let op = OPERATORS_3
            .iter()
            .chain(OPERATORS_2.iter())
            .find(|op| rest.starts_with(**op))
            .map(|op| op.to_string())
            .or_else(|| {
                rest.chars()
                    .next()
                    .filter(|c| OPERATORS_1.contains(*c))
                    .map(|c| c.to_string())
            });

        let Some(op) = op else {
            let ch = rest.chars().next().unwrap_or(' ');
            return Err(SyntaxError::new(
                line_no,
                format!("invalid character '{ch}'"),
            ));
        };

        match op.as_str() {
            "(" | "[" | "{" => {
                let open = op.chars().next().unwrap_or('(');
                self.brackets.push((open, line_no));
            }
            ")" | "]" | "}" => {
                let close = op.chars().next().unwrap_or(')');
                let expected = match close {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, _)) => {
                        return Err(SyntaxError::new(
                            line_no,
                            format!("closing '{close}' does not match '{open}'"),
                        ))
                    }
                    None => {
                        return Err(SyntaxError::new(line_no, format!("unmatched '{close}'")))
                    }
                }
            }
            _ => {}
        }

        let start = self.col;
        self.col += op.len();
        self.push(
            TokenKind::Op,
            op,
            Span::new(Pos::new(line_no, start), Pos::new(line_no, self.col)),
        );
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, span: Span) {
        if !matches!(kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent) {
            self.line_has_tokens = true;
        }
        self.tokens.push(Token::new(kind, text, span));
    }
}

/// Convenience wrapper around [`Lexer::tokenize`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source).tokenize()
}
