//! Parser -- transforms a token stream into a [`Stmt`] tree.
//!
//! Only statement structure is parsed. Expressions stay opaque: each one is
//! kept as the [`Span`] it covers in the original source, which is all the
//! extractor needs to slice exact text back out.

use super::error::SyntaxError;
use super::lexer::{tokenize, Pos, Span, Token, TokenKind};

/// Statement tree node. `span` always covers the whole statement, including
/// nested bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    FunctionDef {
        name: String,
        span: Span,
        body: Vec<Stmt>,
    },
    ClassDef {
        name: String,
        span: Span,
        body: Vec<Stmt>,
    },
    /// `elif` chains are stored as a nested `If` in `orelse`.
    If {
        test: Span,
        span: Span,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Span,
        span: Span,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Span,
        iter: Span,
        span: Span,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Assign {
        targets: Vec<Span>,
        value: Span,
        span: Span,
    },
    Return {
        value: Option<Span>,
        span: Span,
    },
    /// `with`, `try`, `except`, `finally`, `match`, `case` and friends.
    Compound {
        keyword: String,
        span: Span,
        body: Vec<Stmt>,
    },
    Simple {
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::FunctionDef { span, .. }
            | Stmt::ClassDef { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Compound { span, .. }
            | Stmt::Simple { span } => *span,
        }
    }
}

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// Parse Python-style source into a [`Module`].
pub fn parse(source: &str) -> Result<Module, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_module()
}

const SOFT_BLOCK_KEYWORDS: &[&str] = &["match", "case"];

/// Parser for the statement layer.
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens
            .last()
            .map(|t| t.span.end)
            .unwrap_or(Pos::new(1, 0));
        Self {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::EndOfFile,
                text: String::new(),
                span: Span::new(end, end),
            },
        }
    }

    /// Get current token
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    /// Peek ahead
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&self.eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn line(&self) -> usize {
        self.current().span.start.line
    }

    pub fn parse_module(&mut self) -> Result<Module, SyntaxError> {
        let mut body = Vec::new();
        while !self.at(TokenKind::EndOfFile) {
            self.parse_statement_into(&mut body)?;
        }
        Ok(Module { body })
    }

    fn parse_statement_into(&mut self, out: &mut Vec<Stmt>) -> Result<(), SyntaxError> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Indent => return Err(SyntaxError::new(tok.span.start.line, "unexpected indent")),
            TokenKind::Dedent | TokenKind::Newline => {
                self.pos += 1;
                return Ok(());
            }
            _ => {}
        }

        if tok.kind == TokenKind::Name {
            match tok.text.as_str() {
                "def" => {
                    out.push(self.parse_def(tok.span.start)?);
                    return Ok(());
                }
                "class" => {
                    out.push(self.parse_class()?);
                    return Ok(());
                }
                "if" => {
                    out.push(self.parse_if()?);
                    return Ok(());
                }
                "while" => {
                    out.push(self.parse_while()?);
                    return Ok(());
                }
                "for" => {
                    out.push(self.parse_for(tok.span.start)?);
                    return Ok(());
                }
                "async" if self.peek().is_name("def") => {
                    self.pos += 1;
                    out.push(self.parse_def(tok.span.start)?);
                    return Ok(());
                }
                "async" if self.peek().is_name("for") => {
                    self.pos += 1;
                    out.push(self.parse_for(tok.span.start)?);
                    return Ok(());
                }
                "async" if self.peek().is_name("with") => {
                    self.pos += 1;
                    out.push(self.parse_compound("with", tok.span.start)?);
                    return Ok(());
                }
                "with" => {
                    out.push(self.parse_compound("with", tok.span.start)?);
                    return Ok(());
                }
                "try" => {
                    out.push(self.parse_compound("try", tok.span.start)?);
                    loop {
                        let next = self.current().clone();
                        let clause = ["except", "else", "finally"]
                            .into_iter()
                            .find(|kw| next.is_name(kw));
                        match clause {
                            Some(kw) => out.push(self.parse_compound(kw, next.span.start)?),
                            None => break,
                        }
                    }
                    return Ok(());
                }
                "elif" | "else" | "except" | "finally" => {
                    return Err(SyntaxError::new(
                        tok.span.start.line,
                        format!("'{}' without a matching statement", tok.text),
                    ));
                }
                kw if SOFT_BLOCK_KEYWORDS.contains(&kw) && self.line_ends_with_colon() => {
                    out.push(self.parse_compound(kw, tok.span.start)?);
                    return Ok(());
                }
                _ => {}
            }
        }

        self.parse_simple_line(out)
    }

    fn parse_def(&mut self, start: Pos) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        self.pos += 1; // def
        let name_tok = self.current().clone();
        if name_tok.kind != TokenKind::Name {
            return Err(SyntaxError::new(line, "expected a function name after 'def'"));
        }
        self.pos += 1;
        let colon = self.header_colon("def")?;
        self.pos = colon + 1;
        let body = self.parse_block("def", line)?;
        Ok(Stmt::FunctionDef {
            name: name_tok.text,
            span: Span::new(start, end_of(&body)),
            body,
        })
    }

    fn parse_class(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.current().span.start;
        let line = start.line;
        self.pos += 1; // class
        let name_tok = self.current().clone();
        if name_tok.kind != TokenKind::Name {
            return Err(SyntaxError::new(line, "expected a class name after 'class'"));
        }
        self.pos += 1;
        let colon = self.header_colon("class")?;
        self.pos = colon + 1;
        let body = self.parse_block("class", line)?;
        Ok(Stmt::ClassDef {
            name: name_tok.text,
            span: Span::new(start, end_of(&body)),
            body,
        })
    }

    /// Parses `if` and `elif` (the latter becomes a nested `If`).
    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        let kw = self.current().clone();
        let start = kw.span.start;
        self.pos += 1;
        let colon = self.header_colon(&kw.text)?;
        let test = self.expression_span(self.pos, colon, &kw.text)?;
        self.pos = colon + 1;
        let body = self.parse_block(&kw.text, start.line)?;

        let orelse = if self.current().is_name("elif") {
            vec![self.parse_if()?]
        } else {
            self.parse_else_clause()?
        };

        let end = if orelse.is_empty() { end_of(&body) } else { end_of(&orelse) };
        Ok(Stmt::If {
            test,
            span: Span::new(start, end),
            body,
            orelse,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.current().span.start;
        self.pos += 1;
        let colon = self.header_colon("while")?;
        let test = self.expression_span(self.pos, colon, "while")?;
        self.pos = colon + 1;
        let body = self.parse_block("while", start.line)?;
        let orelse = self.parse_else_clause()?;
        let end = if orelse.is_empty() { end_of(&body) } else { end_of(&orelse) };
        Ok(Stmt::While {
            test,
            span: Span::new(start, end),
            body,
            orelse,
        })
    }

    fn parse_for(&mut self, start: Pos) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        self.pos += 1; // for
        let colon = self.header_colon("for")?;

        let mut depth = 0i32;
        let mut in_at = None;
        for idx in self.pos..colon {
            let tok = &self.tokens[idx];
            depth += bracket_delta(tok);
            if depth == 0 && tok.is_name("in") {
                in_at = Some(idx);
                break;
            }
        }
        let Some(in_at) = in_at else {
            return Err(SyntaxError::new(line, "expected 'in' in for statement"));
        };

        let target = self.expression_span(self.pos, in_at, "for")?;
        let iter = self.expression_span(in_at + 1, colon, "in")?;
        self.pos = colon + 1;
        let body = self.parse_block("for", line)?;
        let orelse = self.parse_else_clause()?;
        let end = if orelse.is_empty() { end_of(&body) } else { end_of(&orelse) };
        Ok(Stmt::For {
            target,
            iter,
            span: Span::new(start, end),
            body,
            orelse,
        })
    }

    fn parse_compound(&mut self, keyword: &str, start: Pos) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        let colon = self.header_colon(keyword)?;
        self.pos = colon + 1;
        let body = self.parse_block(keyword, line)?;
        Ok(Stmt::Compound {
            keyword: keyword.to_string(),
            span: Span::new(start, end_of(&body)),
            body,
        })
    }

    fn parse_else_clause(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        if !(self.current().is_name("else") && self.peek().is_op(":")) {
            return Ok(Vec::new());
        }
        let line = self.line();
        self.pos += 2;
        self.parse_block("else", line)
    }

    /// Body after a header colon: either an indented block or the rest of the
    /// header line (`if x: return y`).
    fn parse_block(&mut self, keyword: &str, header_line: usize) -> Result<Vec<Stmt>, SyntaxError> {
        let mut body = Vec::new();
        if !self.at(TokenKind::Newline) {
            self.parse_simple_line(&mut body)?;
            return Ok(body);
        }

        self.pos += 1;
        if !self.at(TokenKind::Indent) {
            return Err(SyntaxError::new(
                header_line,
                format!("expected an indented block after '{keyword}' on line {header_line}"),
            ));
        }
        self.pos += 1;

        while !self.at(TokenKind::Dedent) && !self.at(TokenKind::EndOfFile) {
            self.parse_statement_into(&mut body)?;
        }
        if self.at(TokenKind::Dedent) {
            self.pos += 1;
        }
        if body.is_empty() {
            return Err(SyntaxError::new(
                header_line,
                format!("expected an indented block after '{keyword}' on line {header_line}"),
            ));
        }
        Ok(body)
    }

    /// One logical line of `;`-separated simple statements.
    fn parse_simple_line(&mut self, out: &mut Vec<Stmt>) -> Result<(), SyntaxError> {
        let start = self.pos;
        let mut end = start;
        while end < self.tokens.len()
            && !matches!(
                self.tokens[end].kind,
                TokenKind::Newline | TokenKind::EndOfFile
            )
        {
            if matches!(self.tokens[end].kind, TokenKind::Indent | TokenKind::Dedent) {
                return Err(SyntaxError::new(self.tokens[end].span.start.line, "unexpected indent"));
            }
            end += 1;
        }

        let mut depth = 0i32;
        let mut seg_start = start;
        for idx in start..=end {
            let at_end = idx == end;
            if !at_end {
                let tok = &self.tokens[idx];
                depth += bracket_delta(tok);
                if !(depth == 0 && tok.is_op(";")) {
                    continue;
                }
            }
            if seg_start < idx {
                out.push(self.classify_simple(seg_start, idx)?);
            }
            seg_start = idx + 1;
        }

        self.pos = end;
        if self.at(TokenKind::Newline) {
            self.pos += 1;
        }
        Ok(())
    }

    fn classify_simple(&self, from: usize, to: usize) -> Result<Stmt, SyntaxError> {
        let toks = &self.tokens[from..to];
        let span = span_of(toks);
        let line = span.start.line;

        if toks[0].is_name("return") {
            let value = (toks.len() > 1).then(|| span_of(&toks[1..]));
            return Ok(Stmt::Return { value, span });
        }

        let mut depth = 0i32;
        let mut splits = Vec::new();
        for (idx, tok) in toks.iter().enumerate() {
            depth += bracket_delta(tok);
            if depth == 0 && tok.is_op("=") {
                splits.push(idx);
            }
        }
        if splits.is_empty() {
            return Ok(Stmt::Simple { span });
        }

        let mut targets = Vec::new();
        let mut seg_start = 0;
        for &split in &splits {
            let mut seg = &toks[seg_start..split];
            // `name: Type = value` -> the target is `name`.
            if targets.is_empty() {
                let mut d = 0i32;
                if let Some(colon) = seg.iter().position(|t| {
                    d += bracket_delta(t);
                    d == 0 && t.is_op(":")
                }) {
                    seg = &seg[..colon];
                }
            }
            if seg.is_empty() {
                return Err(SyntaxError::new(line, "invalid assignment target"));
            }
            targets.push(span_of(seg));
            seg_start = split + 1;
        }
        let value_toks = &toks[seg_start..];
        if value_toks.is_empty() {
            return Err(SyntaxError::new(line, "expected a value after '='"));
        }
        Ok(Stmt::Assign {
            targets,
            value: span_of(value_toks),
            span,
        })
    }

    /// Index of the header-terminating `:` on the current logical line.
    fn header_colon(&self, keyword: &str) -> Result<usize, SyntaxError> {
        let mut depth = 0i32;
        let mut idx = self.pos;
        while let Some(tok) = self.tokens.get(idx) {
            if matches!(tok.kind, TokenKind::Newline | TokenKind::EndOfFile) {
                break;
            }
            depth += bracket_delta(tok);
            if depth == 0 && tok.is_op(":") {
                return Ok(idx);
            }
            idx += 1;
        }
        Err(SyntaxError::new(
            self.line(),
            format!("expected ':' after '{keyword}' header"),
        ))
    }

    fn line_ends_with_colon(&self) -> bool {
        let mut idx = self.pos;
        while let Some(tok) = self.tokens.get(idx + 1) {
            if matches!(tok.kind, TokenKind::Newline | TokenKind::EndOfFile) {
                return self.tokens[idx].is_op(":");
            }
            idx += 1;
        }
        false
    }

    fn expression_span(&self, from: usize, to: usize, after: &str) -> Result<Span, SyntaxError> {
        if from >= to {
            return Err(SyntaxError::new(
                self.line(),
                format!("expected an expression after '{after}'"),
            ));
        }
        Ok(span_of(&self.tokens[from..to]))
    }
}

fn bracket_delta(tok: &Token) -> i32 {
    if tok.kind != TokenKind::Op {
        return 0;
    }
    match tok.text.as_str() {
        "(" | "[" | "{" => 1,
        ")" | "]" | "}" => -1,
        _ => 0,
    }
}

fn span_of(toks: &[Token]) -> Span {
    let start = toks.first().map(|t| t.span.start).unwrap_or(Pos::new(1, 0));
    let end = toks.last().map(|t| t.span.end).unwrap_or(start);
    Span::new(start, end)
}

fn end_of(body: &[Stmt]) -> Pos {
    body.last().map(|s| s.span().end).unwrap_or(Pos::new(1, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function_with_if_else() {
        let src = "def f(x):\n    if x > 0:\n        return x\n    else:\n        return -x\n";
        let module = parse(src).unwrap();
        assert_eq!(module.body.len(), 1);
        let Stmt::FunctionDef { name, span, body } = &module.body[0] else {
            panic!("expected function");
        };
        assert_eq!(name, "f");
        assert_eq!(span.start.line, 1);
        assert_eq!(span.end.line, 5);
        let Stmt::If { test, body, orelse, .. } = &body[0] else {
            panic!("expected if");
        };
        assert_eq!(*test, Span::new(Pos::new(2, 7), Pos::new(2, 12)));
        assert!(matches!(body[0], Stmt::Return { value: Some(_), .. }));
        assert!(matches!(orelse[0], Stmt::Return { value: Some(_), .. }));
    }

    #[test]
    fn test_elif_becomes_nested_if() {
        let src = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        let module = parse(src).unwrap();
        let Stmt::If { orelse, span, .. } = &module.body[0] else {
            panic!("expected if");
        };
        assert_eq!(span.end.line, 6);
        let Stmt::If { orelse: inner, .. } = &orelse[0] else {
            panic!("expected nested if");
        };
        assert!(matches!(inner[0], Stmt::Assign { .. }));
    }

    #[test]
    fn test_assignment_targets_and_value() {
        let module = parse("current.link = new_node\n").unwrap();
        let Stmt::Assign { targets, value, span } = &module.body[0] else {
            panic!("expected assign");
        };
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0], Span::new(Pos::new(1, 0), Pos::new(1, 12)));
        assert_eq!(*value, Span::new(Pos::new(1, 15), Pos::new(1, 23)));
        assert_eq!(span.end.col, 23);
    }

    #[test]
    fn test_keyword_arguments_are_not_assignments() {
        let module = parse("print(x, end='')\n").unwrap();
        assert!(matches!(module.body[0], Stmt::Simple { .. }));
    }

    #[test]
    fn test_annotated_assignment_target() {
        let module = parse("count: int = 0\n").unwrap();
        let Stmt::Assign { targets, .. } = &module.body[0] else {
            panic!("expected assign");
        };
        assert_eq!(targets[0].end.col, 5);
    }

    #[test]
    fn test_for_iterable_span() {
        let module = parse("for i in range(n):\n    total += i\n").unwrap();
        let Stmt::For { iter, .. } = &module.body[0] else {
            panic!("expected for");
        };
        assert_eq!(*iter, Span::new(Pos::new(1, 9), Pos::new(1, 17)));
    }

    #[test]
    fn test_one_line_body_and_semicolons() {
        let module = parse("if ok: a = 1; return a\n").unwrap();
        let Stmt::If { body, .. } = &module.body[0] else {
            panic!("expected if");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_class_with_methods() {
        let src = "class Node:\n    def __init__(self, data):\n        self.data = data\n        self.link = None\n";
        let module = parse(src).unwrap();
        let Stmt::ClassDef { name, body, .. } = &module.body[0] else {
            panic!("expected class");
        };
        assert_eq!(name, "Node");
        assert!(matches!(&body[0], Stmt::FunctionDef { name, .. } if name == "__init__"));
    }

    #[test]
    fn test_try_except_clauses() {
        let src = "try:\n    x = load()\nexcept ValueError:\n    x = None\nfinally:\n    done()\n";
        let module = parse(src).unwrap();
        assert_eq!(module.body.len(), 3);
    }

    #[test]
    fn test_missing_colon_is_error() {
        let err = parse("def f(x)\n    return x\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_missing_block_is_error() {
        assert!(parse("while True:\nx = 1\n").is_err());
    }

    #[test]
    fn test_unexpected_indent_is_error() {
        assert!(parse("x = 1\n    y = 2\n").is_err());
    }

    #[test]
    fn test_stray_else_is_error() {
        assert!(parse("x = 1\nelse:\n    y = 2\n").is_err());
    }
}
