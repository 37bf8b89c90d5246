/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression evaluation.
//!
//! Evaluation only reads the scope. Absent variables and properties resolve
//! to nil unless strict variables are enabled.

use crate::context::Scope;
use crate::error::{SourceError, TemplateResult};
use crate::expression::{BinaryOp, Expression, FilterCall, Literal, PathSegment};
use crate::filters::FilterRegistry;
use crate::options::EngineOptions;
use crate::value::Value;

/// Evaluates expressions against a scope.
pub struct Evaluator<'s> {
    scope: &'s Scope<'s>,
    filters: &'s FilterRegistry,
    options: &'s EngineOptions,
}

impl<'s> Evaluator<'s> {
    pub fn new(
        scope: &'s Scope<'s>,
        filters: &'s FilterRegistry,
        options: &'s EngineOptions,
    ) -> Self {
        Self {
            scope,
            filters,
            options,
        }
    }

    /// Evaluate an expression. `line` locates errors that the expression
    /// itself does not carry.
    pub fn evaluate(&self, expr: &Expression, line: usize) -> TemplateResult<Value> {
        match expr {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Variable(path) => self.variable(path, line),
            Expression::Range(low, high) => self.range(low, high, line),
            Expression::Binary { op, left, right } => self.binary(*op, left, right, line),
            Expression::Filter { base, filters } => self.filtered(base, filters, line),
        }
    }

    fn variable(&self, path: &[PathSegment], line: usize) -> TemplateResult<Value> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(Value::Nil);
        };

        let root_name = match first {
            PathSegment::Name(name) => name.clone(),
            PathSegment::Index(key) => self.evaluate(key, line)?.to_output(),
        };
        let mut value = match self.scope.get(&root_name) {
            Some(value) => value.clone(),
            None if self.options.strict_variables => {
                return Err(SourceError::evaluation(
                    format!("undefined variable `{}`", root_name),
                    line,
                ));
            }
            None => return Ok(Value::Nil),
        };

        for segment in rest {
            value = match segment {
                PathSegment::Name(name) => value.property(name),
                PathSegment::Index(key) => {
                    let key = self.evaluate(key, line)?;
                    value.index(&key)
                }
            };
        }
        Ok(value)
    }

    fn range(&self, low: &Expression, high: &Expression, line: usize) -> TemplateResult<Value> {
        let low = self.range_bound(low, line)?;
        let high = self.range_bound(high, line)?;
        if high < low {
            return Ok(Value::List(Vec::new()));
        }

        let length = high.abs_diff(low).saturating_add(1);
        if length > self.options.max_range_length as u64 {
            return Err(SourceError::evaluation(
                format!(
                    "range ({}..{}) has {} elements, more than the limit of {}",
                    low, high, length, self.options.max_range_length
                ),
                line,
            ));
        }
        Ok(Value::List((low..=high).map(Value::Int).collect()))
    }

    fn range_bound(&self, expr: &Expression, line: usize) -> TemplateResult<i64> {
        let value = self.evaluate(expr, line)?;
        if value.is_nil() {
            return Ok(0);
        }
        value.as_integer().ok_or_else(|| {
            SourceError::evaluation(
                format!("range bound must be a number, got {}", value.type_name()),
                line,
            )
        })
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        line: usize,
    ) -> TemplateResult<Value> {
        let result = match op {
            BinaryOp::And => {
                self.evaluate(left, line)?.is_truthy() && self.evaluate(right, line)?.is_truthy()
            }
            BinaryOp::Or => {
                self.evaluate(left, line)?.is_truthy() || self.evaluate(right, line)?.is_truthy()
            }
            BinaryOp::Eq => self.equals(left, right, line)?,
            BinaryOp::Ne => !self.equals(left, right, line)?,
            BinaryOp::Contains => {
                let haystack = self.evaluate(left, line)?;
                haystack.contains(&self.evaluate(right, line)?)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let left = self.evaluate(left, line)?;
                let right = self.evaluate(right, line)?;
                match left.compare(&right) {
                    Some(ordering) => match op {
                        BinaryOp::Lt => ordering.is_lt(),
                        BinaryOp::Le => ordering.is_le(),
                        BinaryOp::Gt => ordering.is_gt(),
                        _ => ordering.is_ge(),
                    },
                    None => false,
                }
            }
        };
        Ok(Value::Bool(result))
    }

    /// `==`, with `empty` and `blank` compared by predicate.
    fn equals(&self, left: &Expression, right: &Expression, line: usize) -> TemplateResult<bool> {
        match left {
            Expression::Literal(Literal::Empty | Literal::Blank) => {
                self.matches(left, &self.evaluate(right, line)?, line)
            }
            _ => self.matches(right, &self.evaluate(left, line)?, line),
        }
    }

    /// Whether `value` equals `expr`. `empty` and `blank` match by
    /// predicate rather than by comparing against the empty string.
    pub fn matches(&self, expr: &Expression, value: &Value, line: usize) -> TemplateResult<bool> {
        Ok(match expr {
            Expression::Literal(Literal::Empty) => value.is_empty(),
            Expression::Literal(Literal::Blank) => value.is_blank(),
            _ => self.evaluate(expr, line)? == *value,
        })
    }

    fn filtered(
        &self,
        base: &Expression,
        calls: &[FilterCall],
        line: usize,
    ) -> TemplateResult<Value> {
        let mut value = self.evaluate(base, line)?;

        for call in calls {
            let Some(filter) = self.filters.get(&call.name) else {
                if self.options.strict_filters {
                    return Err(SourceError::evaluation(
                        format!("undefined filter `{}`", call.name),
                        call.line,
                    ));
                }
                tracing::debug!(filter = %call.name, "skipping undefined filter");
                continue;
            };

            let args = call
                .args
                .iter()
                .map(|arg| self.evaluate(arg, call.line))
                .collect::<TemplateResult<Vec<_>>>()?;

            tracing::trace!(filter = %call.name, args = args.len(), "applying filter");
            value = filter.apply(&value, &args).map_err(|e| {
                let message = format!("filter `{}`: {}", call.name, e);
                SourceError::evaluation(message, call.line).with_cause(e)
            })?;
        }

        Ok(value)
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
        // Outside a comparison these behave as the empty string.
        Literal::Empty | Literal::Blank => Value::String(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Bindings;
    use crate::error::{ErrorKind, FilterError};
    use crate::expression::parse_expression;
    use pretty_assertions::assert_eq;

    fn bindings() -> Bindings {
        Bindings::from_json(serde_json::json!({
            "name": "World",
            "n": 5,
            "items": [1, 2, 3],
            "user": {"name": "Ada", "tags": ["a", "b"]},
            "key": "name",
            "blank_str": "  ",
            "nothing": null,
        }))
        .unwrap()
    }

    fn eval_with(source: &str, options: &EngineOptions) -> TemplateResult<Value> {
        let globals = bindings();
        let scope = Scope::new(&globals);
        let filters = FilterRegistry::standard();
        let expr = parse_expression(source, 1)?;
        Evaluator::new(&scope, &filters, options).evaluate(&expr, 1)
    }

    fn eval(source: &str) -> Value {
        eval_with(source, &EngineOptions::default()).expect(source)
    }

    #[test]
    fn test_paths() {
        assert_eq!(eval("user.name"), Value::from("Ada"));
        assert_eq!(eval("user.tags[1]"), Value::from("b"));
        assert_eq!(eval("user[key]"), Value::from("Ada"));
        assert_eq!(eval("items[-1]"), Value::Int(3));
        assert_eq!(eval("items.size"), Value::Int(3));
        assert_eq!(eval("user.missing.deeper"), Value::Nil);
        assert_eq!(eval("missing"), Value::Nil);
    }

    #[test]
    fn test_strict_variables() {
        let options = EngineOptions::default().with_strict_variables(true);
        let err = eval_with("missing", &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
        assert!(err.message().contains("missing"));
        // properties of defined values stay permissive
        assert_eq!(eval_with("user.missing", &options).unwrap(), Value::Nil);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("n > 3"), Value::Bool(true));
        assert_eq!(eval("n == 5.0"), Value::Bool(true));
        assert_eq!(eval("name != 'World'"), Value::Bool(false));
        assert_eq!(eval("name < 1"), Value::Bool(false));
        assert_eq!(eval("name == 1"), Value::Bool(false));
        assert_eq!(eval("items contains 2"), Value::Bool(true));
        assert_eq!(eval("name contains 'orl'"), Value::Bool(true));
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(eval("nothing == empty"), Value::Bool(false));
        assert_eq!(eval("nothing == blank"), Value::Bool(true));
        assert_eq!(eval("blank_str == blank"), Value::Bool(true));
        assert_eq!(eval("'' == empty"), Value::Bool(true));
        assert_eq!(eval("empty == items"), Value::Bool(false));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(eval("true or false and false"), Value::Bool(true));
        assert_eq!(eval("false and false or true"), Value::Bool(true));
        assert_eq!(eval("nothing or name"), Value::Bool(true));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(eval("(1..3)"), Value::from(vec![1, 2, 3]));
        assert_eq!(eval("(3..1)"), Value::List(Vec::new()));
        assert_eq!(eval("(1..n)").to_output(), "12345");

        let options = EngineOptions::default().with_max_range_length(10);
        let err = eval_with("(1..100)", &options).unwrap_err();
        assert!(err.message().contains("limit"));

        let err = eval_with("(1..'x')", &EngineOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
    }

    #[test]
    fn test_filters() {
        assert_eq!(eval("name | upcase"), Value::from("WORLD"));
        assert_eq!(
            eval("name | append: '!' | prepend: 'Hello, '"),
            Value::from("Hello, World!")
        );
    }

    #[test]
    fn test_unknown_filter() {
        let err = eval_with("name | nope", &EngineOptions::default()).unwrap_err();
        assert!(err.message().contains("nope"));

        let lax = EngineOptions::default().with_strict_filters(false);
        assert_eq!(
            eval_with("name | nope | upcase", &lax).unwrap(),
            Value::from("WORLD")
        );
    }

    #[test]
    fn test_filter_error_carries_cause() {
        let err = eval_with("n | divided_by: 0", &EngineOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
        assert!(err.message().starts_with("filter `divided_by`"));
        let cause = err.cause().and_then(|c| c.downcast_ref::<FilterError>());
        assert!(cause.is_some());
    }
}
