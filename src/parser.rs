// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;

use anyhow::{bail, Result};

/// Recursive-descent parser producing the statement tree of a script.
///
/// Fails on the first syntax error. Restricted-language checks (explicit
/// receivers, named arguments, local values...) are not syntax errors; they
/// are reported later by the document converter.
#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
    next_id: u32,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: 0,
            next_id: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn error_here(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.tok.1.line, self.tok.1.col, msg)
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    // Span from the start of `start` to the end of the last consumed token.
    fn span_from(&self, start: &Span) -> Span {
        Span {
            source: self.source.clone(),
            line: start.line,
            col: start.col,
            start: start.start,
            end: self.end,
        }
    }

    fn is_keyword(&self, ident: &str) -> bool {
        matches!(ident, "false" | "null" | "this" | "true" | "val")
    }

    fn parse_ident(&mut self) -> Result<Span> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Ident if self.is_keyword(span.text()) => Err(self.error_here(&format!(
                "unexpected keyword `{}`",
                span.text()
            ))),
            TokenKind::Ident => {
                self.next_token()?;
                Ok(span)
            }
            _ => Err(self.error_here("expecting identifier")),
        }
    }

    /// Parse a whole script. The returned block spans the entire source.
    pub fn parse(&mut self) -> Result<Block> {
        let statements = self.parse_statements(None)?;
        Ok(Block {
            span: Span::new(self.source.clone(), 0, self.source.contents().len() as u32),
            statements,
        })
    }

    fn parse_statements(&mut self, closing: Option<&str>) -> Result<Vec<Ref<Stmt>>> {
        let mut statements = vec![];
        loop {
            while self.token_text() == ";" {
                self.next_token()?;
            }

            if self.tok.0 == TokenKind::Eof {
                if let Some(closing) = closing {
                    bail!(self.error_here(&format!("missing `{closing}`")));
                }
                break;
            }
            if closing == Some(self.token_text()) {
                break;
            }
            if self.token_text() == "}" {
                bail!(self.error_here("unexpected `}`"));
            }

            let stmt = self.parse_stmt()?;
            let end_line = stmt.span().end_line();
            statements.push(stmt);

            // Statements on the same line must be separated by `;`.
            let separated = self.tok.0 == TokenKind::Eof
                || matches!(self.token_text(), ";" | "}")
                || self.tok.1.line > end_line;
            if !separated {
                bail!(self.error_here("expecting newline or `;` after statement"));
            }
        }
        Ok(statements)
    }

    fn parse_stmt(&mut self) -> Result<Ref<Stmt>> {
        let start = self.tok.1.clone();
        if self.tok.0 == TokenKind::Ident && self.token_text() == "val" {
            self.next_token()?;
            let name = self.parse_ident()?;
            self.expect("=", "after local value name")?;
            let rhs = self.parse_expr()?;
            let id = self.next_id();
            return Ok(Ref::new(Stmt::LocalValue {
                span: self.span_from(&start),
                name,
                rhs,
                id,
            }));
        }

        let lhs = self.parse_expr()?;
        let op = match self.token_text() {
            "=" => Some(None),
            "+=" => Some(Some(AugmentOp::Plus)),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(Ref::new(Stmt::Expr(lhs)));
        };

        if !matches!(lhs.as_ref(), Expr::PropertyAccess { .. }) {
            bail!(lhs.span().error("invalid assignment target"));
        }
        self.next_token()?;
        let rhs = self.parse_expr()?;
        let id = self.next_id();
        let span = self.span_from(&start);
        Ok(Ref::new(match op {
            None => Stmt::Assignment { span, lhs, rhs, id },
            Some(op) => Stmt::AugmentingAssignment {
                span,
                lhs,
                op,
                rhs,
                id,
            },
        }))
    }

    pub fn parse_expr(&mut self) -> Result<Ref<Expr>> {
        let mut expr = self.parse_primary()?;
        while self.token_text() == "." {
            self.next_token()?;
            let name = self.parse_ident()?;
            expr = self.parse_access_or_call(Some(expr), name)?;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Ref<Expr>> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Number => {
                self.next_token()?;
                let value = Self::parse_number(&span)?;
                let id = self.next_id();
                Ok(Ref::new(Expr::Literal { span, value, id }))
            }
            TokenKind::String => {
                self.next_token()?;
                let value = match serde_json::from_str::<String>(span.text()) {
                    Ok(s) => Literal::String(s),
                    Err(e) => bail!(span.error(&format!("invalid string literal: {e}"))),
                };
                let id = self.next_id();
                Ok(Ref::new(Expr::Literal { span, value, id }))
            }
            TokenKind::Ident => match span.text() {
                "true" | "false" => {
                    self.next_token()?;
                    let value = Literal::Boolean(span.text() == "true");
                    let id = self.next_id();
                    Ok(Ref::new(Expr::Literal { span, value, id }))
                }
                "null" => {
                    self.next_token()?;
                    let id = self.next_id();
                    Ok(Ref::new(Expr::Null { span, id }))
                }
                "this" => {
                    self.next_token()?;
                    let id = self.next_id();
                    Ok(Ref::new(Expr::This { span, id }))
                }
                _ => {
                    let name = self.parse_ident()?;
                    self.parse_access_or_call(None, name)
                }
            },
            _ => Err(self.error_here("expecting expression")),
        }
    }

    fn parse_number(span: &Span) -> Result<Literal> {
        let text = span.text();
        if let Some(digits) = text.strip_suffix('L') {
            return match digits.parse::<i64>() {
                Ok(v) => Ok(Literal::Long(v)),
                Err(_) => Err(span.error("long literal out of range")),
            };
        }
        if let Ok(v) = text.parse::<i32>() {
            return Ok(Literal::Int(v));
        }
        match text.parse::<i64>() {
            Ok(v) => Ok(Literal::Long(v)),
            Err(_) => Err(span.error("integer literal out of range")),
        }
    }

    fn parse_access_or_call(
        &mut self,
        receiver: Option<Ref<Expr>>,
        name: Span,
    ) -> Result<Ref<Expr>> {
        let start = match &receiver {
            Some(r) => r.span().clone(),
            None => name.clone(),
        };

        let mut args = vec![];
        let is_call = matches!(self.token_text(), "(" | "{");
        if self.token_text() == "(" {
            self.next_token()?;
            args = self.parse_args()?;
        }
        if self.token_text() == "{" {
            args.push(FunctionArgument::Lambda(self.parse_lambda()?));
        }

        let id = self.next_id();
        let span = self.span_from(&start);
        Ok(Ref::new(if is_call {
            Expr::FunctionCall {
                span,
                receiver,
                name,
                args,
                id,
            }
        } else {
            Expr::PropertyAccess {
                span,
                receiver,
                name,
                id,
            }
        }))
    }

    // Arguments after the opening `(`, up to and including the closing `)`.
    fn parse_args(&mut self) -> Result<Vec<FunctionArgument>> {
        let mut args = vec![];
        if self.token_text() == ")" {
            self.next_token()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_arg()?);
            match self.token_text() {
                "," => self.next_token()?,
                ")" => {
                    self.next_token()?;
                    break;
                }
                _ => bail!(self.error_here("expecting `,` or `)` in argument list")),
            }
        }
        Ok(args)
    }

    fn parse_arg(&mut self) -> Result<FunctionArgument> {
        if self.token_text() == "{" {
            return Ok(FunctionArgument::Lambda(self.parse_lambda()?));
        }

        if self.tok.0 == TokenKind::Ident && !self.is_keyword(self.tok.1.text()) {
            let mut lookahead = self.lexer.clone();
            let next = lookahead.next_token()?;
            if next.0 == TokenKind::Symbol && next.1.text() == "=" {
                let name = self.parse_ident()?;
                self.expect("=", "after argument name")?;
                let expr = self.parse_expr()?;
                return Ok(FunctionArgument::Named {
                    span: self.span_from(&name),
                    name,
                    expr,
                });
            }
        }

        Ok(FunctionArgument::Positional(self.parse_expr()?))
    }

    fn parse_lambda(&mut self) -> Result<Ref<Block>> {
        let start = self.tok.1.clone();
        self.expect("{", "to start a block")?;
        let statements = self.parse_statements(Some("}"))?;
        self.expect("}", "to close the block")?;
        Ok(Ref::new(Block {
            span: self.span_from(&start),
            statements,
        }))
    }
}

/// Parse `source` as a top-level block.
pub fn parse_source(source: &Source) -> Result<Block> {
    Parser::new(source)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Block> {
        let source = Source::from_contents("test.dcl".to_string(), text.to_string())?;
        parse_source(&source)
    }

    #[test]
    fn statements_and_spans() -> Result<()> {
        let block = parse("a = 1\nf(\"x\", 2L) {\n    b += g.h(true)\n}\n")?;
        assert_eq!(block.statements.len(), 2);
        assert_eq!(block.span.text().len(), 39);

        match block.statements[0].as_ref() {
            Stmt::Assignment { span, lhs, rhs, .. } => {
                assert_eq!(span.text(), "a = 1");
                assert_eq!(lhs.span().text(), "a");
                assert!(matches!(
                    rhs.as_ref(),
                    Expr::Literal {
                        value: Literal::Int(1),
                        ..
                    }
                ));
            }
            s => panic!("unexpected statement {s:?}"),
        }

        match block.statements[1].as_ref() {
            Stmt::Expr(e) => match e.as_ref() {
                Expr::FunctionCall {
                    span, name, args, ..
                } => {
                    assert_eq!(name.text(), "f");
                    assert_eq!(span.text(), "f(\"x\", 2L) {\n    b += g.h(true)\n}");
                    assert_eq!(span.line_range(), 2..=4);
                    assert_eq!(args.len(), 3);
                    assert!(matches!(args[1], FunctionArgument::Positional(ref l)
                        if matches!(l.as_ref(), Expr::Literal { value: Literal::Long(2), .. })));
                    match &args[2] {
                        FunctionArgument::Lambda(block) => {
                            assert_eq!(block.statements.len(), 1);
                            assert!(matches!(
                                block.statements[0].as_ref(),
                                Stmt::AugmentingAssignment { .. }
                            ));
                        }
                        a => panic!("expecting lambda, got {a:?}"),
                    }
                }
                e => panic!("unexpected expression {e:?}"),
            },
            s => panic!("unexpected statement {s:?}"),
        }
        Ok(())
    }

    #[test]
    fn named_arguments_and_local_values() -> Result<()> {
        let block = parse("val x = 1\nf(a = 1, 2)")?;
        assert!(matches!(block.statements[0].as_ref(), Stmt::LocalValue { .. }));
        match block.statements[1].as_ref() {
            Stmt::Expr(e) => match e.as_ref() {
                Expr::FunctionCall { args, .. } => {
                    assert!(matches!(&args[0], FunctionArgument::Named { name, .. } if name.text() == "a"));
                    assert!(matches!(&args[1], FunctionArgument::Positional(_)));
                }
                e => panic!("unexpected expression {e:?}"),
            },
            s => panic!("unexpected statement {s:?}"),
        }
        Ok(())
    }

    #[test]
    fn node_ids_are_unique() -> Result<()> {
        let block = parse("a = f(g(1), 2)\nb = 3")?;
        let mut ids = vec![];
        for stmt in &block.statements {
            ids.push(stmt.id());
            if let Stmt::Assignment { lhs, rhs, .. } = stmt.as_ref() {
                ids.push(lhs.id());
                ids.push(rhs.id());
            }
        }
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
        Ok(())
    }

    // A node is numbered after everything it contains.
    #[test]
    fn node_ids_follow_source_order() -> Result<()> {
        let block = parse("a = f(1, 2)\nval b = 3\nc += 4")?;
        let mut previous = None;
        for stmt in &block.statements {
            let (rhs, id) = match stmt.as_ref() {
                Stmt::Assignment { rhs, id, .. }
                | Stmt::AugmentingAssignment { rhs, id, .. }
                | Stmt::LocalValue { rhs, id, .. } => (rhs, *id),
                s => panic!("unexpected statement {s:?}"),
            };
            assert!(rhs.id() < id);
            if let Expr::FunctionCall { args, .. } = rhs.as_ref() {
                let mut last = None;
                for arg in args {
                    if let FunctionArgument::Positional(e) = arg {
                        assert!(last < Some(e.id()));
                        last = Some(e.id());
                    }
                }
                assert!(last < Some(rhs.id()));
            }
            assert!(previous < Some(id));
            previous = Some(id);
        }
        Ok(())
    }

    #[test]
    fn positions_inside_characters() -> Result<()> {
        let source = Source::from_contents("test.dcl".to_string(), "a = 1 // café\nb".to_string())?;
        assert_eq!(source.position(12), (1, 13));
        assert_eq!(source.position(13), (1, 13));
        assert_eq!(source.position(14), (1, 14));
        assert_eq!(source.line_of(13), 1);
        assert_eq!(source.line_of(15), 2);
        Ok(())
    }

    #[test]
    fn nul_characters_are_not_end_of_input() -> Result<()> {
        assert!(parse("a = 1\0\nb = 2").is_err());
        assert!(parse("a = \"x\0y\"").is_err());

        let block = parse("// a \0 in a comment\na = 1\n/* \0 */ b = 2")?;
        assert_eq!(block.statements.len(), 2);
        Ok(())
    }

    #[test]
    fn syntax_errors() {
        assert!(parse("a = 1 b = 2").is_err());
        assert!(parse("f {").is_err());
        assert!(parse("}").is_err());
        assert!(parse("f() = 1").is_err());
        assert!(parse("a = 99999999999999999999").is_err());
        assert!(parse("a = 1.5").is_err());
        assert!(parse("/* unterminated").is_err());
    }

    #[test]
    fn comments_and_separators() -> Result<()> {
        let block = parse("// leading\na = 1; b = 2 /* inline */\nc = \"//not a comment\"")?;
        assert_eq!(block.statements.len(), 3);
        Ok(())
    }
}
