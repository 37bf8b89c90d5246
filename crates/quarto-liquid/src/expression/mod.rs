/*
 * expression/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The expression sub-language used inside `{{ }}` and tag arguments.
//!
//! Expressions are parsed once, at compile time, and are immutable
//! afterwards. Filter and variable names are not resolved here; an unknown
//! filter is only an error when a render reaches it.

pub mod parser;
pub mod scanner;

use std::fmt;

pub use parser::{
    parse_assignment, parse_cycle, parse_expression, parse_expression_list, parse_identifier,
    parse_include, parse_loop,
};

/// A literal value written in the template.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `empty`: equal to any empty string, list or map.
    Empty,
    /// `blank`: like `empty`, also equal to nil, false and whitespace.
    Blank,
}

/// One component of a variable path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// `.name`, or the leading name of the path
    Name(String),
    /// `[expr]`
    Index(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Contains => "contains",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        f.write_str(symbol)
    }
}

/// One stage of a filter pipeline: `| name: arg1, arg2`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    /// Evaluated when this stage runs, never earlier.
    pub args: Vec<Expression>,
    pub line: usize,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// A variable path such as `page.tags[0]` or `site["title"]`.
    Variable(Vec<PathSegment>),
    /// `(low..high)`, inclusive.
    Range(Box<Expression>, Box<Expression>),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `base | f1: a | f2`
    Filter {
        base: Box<Expression>,
        filters: Vec<FilterCall>,
    },
}

impl Expression {
    /// A single-name variable reference.
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(vec![PathSegment::Name(name.into())])
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(s.into()))
    }

    pub fn int(i: i64) -> Self {
        Expression::Literal(Literal::Int(i))
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => match literal {
                Literal::Nil => f.write_str("nil"),
                Literal::Bool(b) => write!(f, "{}", b),
                Literal::Int(i) => write!(f, "{}", i),
                Literal::Float(x) => write!(f, "{}", crate::value::format_float(*x)),
                Literal::String(s) => write!(f, "{:?}", s),
                Literal::Empty => f.write_str("empty"),
                Literal::Blank => f.write_str("blank"),
            },
            Expression::Variable(path) => {
                for (i, segment) in path.iter().enumerate() {
                    match segment {
                        PathSegment::Name(name) if i == 0 => f.write_str(name)?,
                        PathSegment::Name(name) => write!(f, ".{}", name)?,
                        PathSegment::Index(index) => write!(f, "[{}]", index)?,
                    }
                }
                Ok(())
            }
            Expression::Range(low, high) => write!(f, "({}..{})", low, high),
            Expression::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expression::Filter { base, filters } => {
                write!(f, "{}", base)?;
                for filter in filters {
                    write!(f, " | {}", filter.name)?;
                    for (i, arg) in filter.args.iter().enumerate() {
                        let sep = if i == 0 { ": " } else { ", " };
                        write!(f, "{}{}", sep, arg)?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_shape() {
        let expr = parse_expression(r#"page.tags[0] | append: "x", 2 | upcase"#, 1).unwrap();
        assert_eq!(expr.to_string(), r#"page.tags[0] | append: "x", 2 | upcase"#);

        let expr = parse_expression("a == 1 and (1..n) contains b", 1).unwrap();
        assert_eq!(expr.to_string(), "a == 1 and (1..n) contains b");
    }
}
