/*
 * expression/parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Operator-precedence parser for expressions and tag arguments.
//!
//! Precedence, loosest first:
//!
//! 1. filter pipeline `|` (left associative)
//! 2. `or`
//! 3. `and`
//! 4. comparison: `==` `!=` `<>` `<` `<=` `>` `>=` `contains`
//! 5. range `..`
//! 6. primary: literals, variable paths, `( ... )`
//!
//! Besides plain expressions, this module parses the argument forms of the
//! standard tags (`assign`, `for`, `cycle`, `include`, `when`).

use super::scanner::{Spanned, Token, tokenize};
use super::{BinaryOp, Expression, FilterCall, Literal, PathSegment};
use crate::ast::{IncludeArgs, LoopHeader};
use crate::error::{SourceError, TemplateResult};

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Line of the last token, for errors at end of input.
    end_line: usize,
}

impl Parser {
    fn new(text: &str, line: usize) -> TemplateResult<Self> {
        let tokens = tokenize(text, line)?;
        let end_line = tokens.last().map_or(line, |t| t.line);
        Ok(Self {
            tokens,
            pos: 0,
            end_line,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn line(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end_line, |t| t.line)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(name)) if name == keyword => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn error(&self, message: impl Into<String>) -> SourceError {
        SourceError::expression(message, self.line())
    }

    fn unexpected(&self, context: &str) -> SourceError {
        match self.peek() {
            Some(token) => self.error(format!("unexpected {} {}", token.describe(), context)),
            None => self.error(format!("unexpected end of expression {}", context)),
        }
    }

    fn expect(&mut self, expected: &Token, context: &str) -> TemplateResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(token) => self.error(format!(
                    "expected {} {}, found {}",
                    expected.describe(),
                    context,
                    token.describe()
                )),
                None => self.error(format!("expected {} {}", expected.describe(), context)),
            })
        }
    }

    fn expect_ident(&mut self, context: &str) -> TemplateResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(context)),
        }
    }

    fn finish(&self) -> TemplateResult<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("after expression"))
        }
    }

    // ------------------------------------------------------------------
    // Grammar
    // ------------------------------------------------------------------

    fn pipeline(&mut self) -> TemplateResult<Expression> {
        let base = self.or_expr()?;
        let mut filters = Vec::new();

        while self.peek() == Some(&Token::Pipe) {
            let line = self.line();
            self.pos += 1;
            let name = self.expect_ident("after `|`; expected a filter name")?;
            let mut args = Vec::new();
            if self.eat(&Token::Colon) {
                loop {
                    args.push(self.or_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            filters.push(FilterCall { name, args, line });
        }

        if filters.is_empty() {
            Ok(base)
        } else {
            Ok(Expression::Filter {
                base: Box::new(base),
                filters,
            })
        }
    }

    fn or_expr(&mut self) -> TemplateResult<Expression> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expression::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> TemplateResult<Expression> {
        let mut left = self.comparison()?;
        while self.eat_keyword("and") {
            let right = self.comparison()?;
            left = Expression::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> TemplateResult<Expression> {
        let mut left = self.range()?;
        while let Some(op) = self.comparison_op() {
            self.pos += 1;
            let right = self.range()?;
            left = Expression::binary(op, left, right);
        }
        Ok(left)
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::Ident(name) if name == "contains" => Some(BinaryOp::Contains),
            _ => None,
        }
    }

    fn range(&mut self) -> TemplateResult<Expression> {
        let low = self.primary()?;
        if self.eat(&Token::DotDot) {
            let high = self.primary()?;
            return Ok(Expression::Range(Box::new(low), Box::new(high)));
        }
        Ok(low)
    }

    fn primary(&mut self) -> TemplateResult<Expression> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("expected an expression"));
        };

        match token {
            Token::LParen => {
                self.pos += 1;
                let inner = self.pipeline()?;
                self.expect(&Token::RParen, "to close `(`")?;
                Ok(inner)
            }
            Token::String(s) => {
                self.pos += 1;
                Ok(Expression::Literal(Literal::String(s)))
            }
            Token::Int(i) => {
                self.pos += 1;
                Ok(Expression::Literal(Literal::Int(i)))
            }
            Token::Float(x) => {
                self.pos += 1;
                Ok(Expression::Literal(Literal::Float(x)))
            }
            Token::Ident(name) => {
                let literal = match name.as_str() {
                    "true" => Some(Literal::Bool(true)),
                    "false" => Some(Literal::Bool(false)),
                    "nil" | "null" => Some(Literal::Nil),
                    "empty" => Some(Literal::Empty),
                    "blank" => Some(Literal::Blank),
                    _ => None,
                };
                match literal {
                    // `empty.size` etc. still reads as a path
                    Some(literal)
                        if !matches!(self.peek_at(1), Some(Token::Dot | Token::LBracket)) =>
                    {
                        self.pos += 1;
                        Ok(Expression::Literal(literal))
                    }
                    _ => {
                        self.pos += 1;
                        self.path(vec![PathSegment::Name(name)])
                    }
                }
            }
            Token::LBracket => {
                self.pos += 1;
                let index = self.pipeline()?;
                self.expect(&Token::RBracket, "to close `[`")?;
                self.path(vec![PathSegment::Index(index)])
            }
            _ => Err(self.unexpected("where an expression was expected")),
        }
    }

    fn path(&mut self, mut segments: Vec<PathSegment>) -> TemplateResult<Expression> {
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = self.expect_ident("after `.`; expected a property name")?;
                    segments.push(PathSegment::Name(name));
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.pipeline()?;
                    self.expect(&Token::RBracket, "to close `[`")?;
                    segments.push(PathSegment::Index(index));
                }
                _ => return Ok(Expression::Variable(segments)),
            }
        }
    }

    /// `name: expr` pairs separated by commas, as used by `include` and loop
    /// attributes.
    fn keyword_arg(&mut self) -> TemplateResult<Option<(String, Expression)>> {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::Ident(name)), Some(Token::Colon)) => {
                let name = name.clone();
                self.pos += 2;
                let value = self.or_expr()?;
                Ok(Some((name, value)))
            }
            _ => Ok(None),
        }
    }
}

/// Parse a complete expression, including filters.
///
/// Empty text is an error; callers that allow empty expressions check first.
pub fn parse_expression(text: &str, line: usize) -> TemplateResult<Expression> {
    let mut parser = Parser::new(text, line)?;
    let expr = parser.pipeline()?;
    parser.finish()?;
    Ok(expr)
}

/// Parse the values of a `when` clause: `a, b or c`.
///
/// `or` separates alternatives here instead of acting as an operator.
pub fn parse_expression_list(text: &str, line: usize) -> TemplateResult<Vec<Expression>> {
    let mut parser = Parser::new(text, line)?;
    let mut values = vec![parser.range()?];
    while parser.eat(&Token::Comma) || parser.eat_keyword("or") {
        values.push(parser.range()?);
    }
    parser.finish()?;
    Ok(values)
}

/// Parse `name = expression` for `assign`.
pub fn parse_assignment(text: &str, line: usize) -> TemplateResult<(String, Expression)> {
    let mut parser = Parser::new(text, line)?;
    let name = parser.expect_ident("; expected a variable name")?;
    parser.expect(&Token::Assign, "after the variable name")?;
    let value = parser.pipeline()?;
    parser.finish()?;
    Ok((name, value))
}

/// Parse a single bare variable name (`capture`, `increment`).
pub fn parse_identifier(text: &str, line: usize) -> TemplateResult<String> {
    let mut parser = Parser::new(text, line)?;
    let name = match parser.peek() {
        Some(Token::Ident(_)) => parser.expect_ident("")?,
        // `{% capture "name" %}` is accepted too
        Some(Token::String(s)) => {
            let name = s.clone();
            parser.advance();
            name
        }
        _ => return Err(parser.unexpected("; expected a variable name")),
    };
    parser.finish()?;
    Ok(name)
}

/// Parse `item in collection [reversed] [limit: n] [offset: n]`.
pub fn parse_loop(text: &str, line: usize) -> TemplateResult<LoopHeader> {
    let mut parser = Parser::new(text, line)?;
    let variable = parser.expect_ident("; expected a loop variable")?;
    if !parser.eat_keyword("in") {
        return Err(parser.unexpected("; expected `in` after the loop variable"));
    }
    let collection = parser.range()?;

    let mut header = LoopHeader {
        variable,
        collection,
        reversed: false,
        limit: None,
        offset: None,
    };

    while !parser.at_end() {
        parser.eat(&Token::Comma);
        if parser.eat_keyword("reversed") {
            header.reversed = true;
            continue;
        }
        match parser.keyword_arg()? {
            Some((name, value)) if name == "limit" => header.limit = Some(value),
            Some((name, value)) if name == "offset" => header.offset = Some(value),
            Some((name, _)) => {
                return Err(parser.error(format!("unknown loop attribute `{}`", name)));
            }
            None => return Err(parser.unexpected("in loop header")),
        }
    }

    Ok(header)
}

/// Parse `cycle` arguments: `[group:] value, value, ...`.
pub fn parse_cycle(
    text: &str,
    line: usize,
) -> TemplateResult<(Option<Expression>, Vec<Expression>)> {
    let mut parser = Parser::new(text, line)?;
    let first = parser.range()?;
    let (group, mut values) = if parser.eat(&Token::Colon) {
        (Some(first), vec![parser.range()?])
    } else {
        (None, vec![first])
    };
    while parser.eat(&Token::Comma) {
        values.push(parser.range()?);
    }
    parser.finish()?;
    Ok((group, values))
}

/// Parse `include` arguments: `"name" [with expr] [, key: expr ...]`.
pub fn parse_include(text: &str, line: usize) -> TemplateResult<IncludeArgs> {
    let mut parser = Parser::new(text, line)?;
    let template = parser.range()?;
    let with = if parser.eat_keyword("with") {
        Some(parser.range()?)
    } else {
        None
    };

    let mut bindings = Vec::new();
    while !parser.at_end() {
        parser.eat(&Token::Comma);
        match parser.keyword_arg()? {
            Some(binding) => bindings.push(binding),
            None => return Err(parser.unexpected("in include arguments")),
        }
    }

    Ok(IncludeArgs {
        template,
        with,
        bindings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_expression("nil", 1).unwrap(),
            Expression::Literal(Literal::Nil)
        );
        assert_eq!(
            parse_expression("true", 1).unwrap(),
            Expression::Literal(Literal::Bool(true))
        );
        assert_eq!(
            parse_expression("'hi'", 1).unwrap(),
            Expression::string("hi")
        );
        assert_eq!(
            parse_expression("2.5", 1).unwrap(),
            Expression::Literal(Literal::Float(2.5))
        );
        assert_eq!(
            parse_expression("empty", 1).unwrap(),
            Expression::Literal(Literal::Empty)
        );
    }

    #[test]
    fn test_variable_paths() {
        assert_eq!(
            parse_expression("a.b[0][key].c", 1).unwrap(),
            Expression::Variable(vec![
                PathSegment::Name("a".to_string()),
                PathSegment::Name("b".to_string()),
                PathSegment::Index(Expression::int(0)),
                PathSegment::Index(var("key")),
                PathSegment::Name("c".to_string()),
            ])
        );
        assert_eq!(
            parse_expression(r#"["my key"]"#, 1).unwrap(),
            Expression::Variable(vec![PathSegment::Index(Expression::string("my key"))])
        );
    }

    #[test]
    fn test_precedence() {
        // and binds tighter than or; comparison tighter than and
        let expr = parse_expression("a or b and c == 1", 1).unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOp::Or,
                var("a"),
                Expression::binary(
                    BinaryOp::And,
                    var("b"),
                    Expression::binary(BinaryOp::Eq, var("c"), Expression::int(1)),
                ),
            )
        );
    }

    #[test]
    fn test_filters_bind_loosest() {
        let expr = parse_expression("a == b | f", 1).unwrap();
        match expr {
            Expression::Filter { base, filters } => {
                assert_eq!(*base, Expression::binary(BinaryOp::Eq, var("a"), var("b")));
                assert_eq!(filters.len(), 1);
            }
            other => panic!("expected filter pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_pipeline_order_and_args() {
        let expr = parse_expression(r#"x | f1: 1, "two" | f2"#, 4).unwrap();
        let Expression::Filter { base, filters } = expr else {
            panic!("expected filter pipeline");
        };
        assert_eq!(*base, var("x"));
        assert_eq!(filters[0].name, "f1");
        assert_eq!(
            filters[0].args,
            vec![Expression::int(1), Expression::string("two")]
        );
        assert_eq!(filters[0].line, 4);
        assert_eq!(filters[1].name, "f2");
        assert!(filters[1].args.is_empty());
    }

    #[test]
    fn test_range() {
        assert_eq!(
            parse_expression("(1..n)", 1).unwrap(),
            Expression::Range(Box::new(Expression::int(1)), Box::new(var("n")))
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse_expression("", 1).is_err());
        assert!(parse_expression("a |", 1).is_err());
        assert!(parse_expression("(a", 1).is_err());
        assert!(parse_expression("a b", 1).is_err());
        assert!(parse_expression("a.", 1).is_err());

        let err = parse_expression("a ==\n\n", 5).unwrap_err();
        assert_eq!(err.line(), Some(5));
    }

    #[test]
    fn test_error_line_inside_multiline_tag() {
        let err = parse_expression("a\n| upcase\n| 3", 10).unwrap_err();
        assert_eq!(err.line(), Some(12));
    }

    #[test]
    fn test_assignment() {
        let (name, value) = parse_assignment("x = y | upcase", 1).unwrap();
        assert_eq!(name, "x");
        assert!(matches!(value, Expression::Filter { .. }));
        assert!(parse_assignment("x y", 1).is_err());
    }

    #[test]
    fn test_loop_header() {
        let header = parse_loop("item in items reversed limit: 2 offset: n", 1).unwrap();
        assert_eq!(header.variable, "item");
        assert_eq!(header.collection, var("items"));
        assert!(header.reversed);
        assert_eq!(header.limit, Some(Expression::int(2)));
        assert_eq!(header.offset, Some(var("n")));

        let header = parse_loop("i in (1..3)", 1).unwrap();
        assert!(matches!(header.collection, Expression::Range(..)));

        assert!(parse_loop("item items", 1).is_err());
        assert!(parse_loop("item in items sideways: 1", 1).is_err());
    }

    #[test]
    fn test_when_values() {
        let values = parse_expression_list(r#"1, 2 or "three""#, 1).unwrap();
        assert_eq!(
            values,
            vec![
                Expression::int(1),
                Expression::int(2),
                Expression::string("three")
            ]
        );
    }

    #[test]
    fn test_cycle() {
        let (group, values) = parse_cycle(r#""odd", "even""#, 1).unwrap();
        assert!(group.is_none());
        assert_eq!(values.len(), 2);

        let (group, values) = parse_cycle(r#""g": "a", "b", "c""#, 1).unwrap();
        assert_eq!(group, Some(Expression::string("g")));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_include() {
        let args = parse_include(r#""card" with product, size: 2, title: t"#, 1).unwrap();
        assert_eq!(args.template, Expression::string("card"));
        assert_eq!(args.with, Some(var("product")));
        assert_eq!(
            args.bindings,
            vec![
                ("size".to_string(), Expression::int(2)),
                ("title".to_string(), var("t")),
            ]
        );
    }

    #[test]
    fn test_identifier() {
        assert_eq!(parse_identifier("greeting", 1).unwrap(), "greeting");
        assert_eq!(parse_identifier("'greeting'", 1).unwrap(), "greeting");
        assert!(parse_identifier("a b", 1).is_err());
        assert!(parse_identifier("", 1).is_err());
    }
}
