/*
 * filters/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Filters: named value transformations applied with `|`.
//!
//! A filter receives the piped value and its evaluated arguments and
//! returns a new value or a [`FilterError`]. The evaluator wraps filter
//! errors with the filter name and source line.

mod list;
mod math;
mod misc;
mod string;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FilterError;
use crate::value::Value;

/// A value transformation.
pub trait Filter: Send + Sync {
    fn apply(&self, input: &Value, args: &[Value]) -> Result<Value, FilterError>;
}

impl<F> Filter for F
where
    F: Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync,
{
    fn apply(&self, input: &Value, args: &[Value]) -> Result<Value, FilterError> {
        self(input, args)
    }
}

/// Filters by name.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the standard filters.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        string::register(&mut registry);
        list::register(&mut registry);
        math::register(&mut registry);
        misc::register(&mut registry);
        registry
    }

    /// Add or replace a filter.
    pub fn register(&mut self, name: impl Into<String>, filter: impl Filter + 'static) {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Filter>> {
        self.filters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered filter names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

static NIL: Value = Value::Nil;

/// Check the argument count is within `min..=max`.
pub(crate) fn check_arity(args: &[Value], min: usize, max: usize) -> Result<(), FilterError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{} to {}", min, max)
    };
    Err(FilterError::ArgumentCount {
        expected,
        actual: args.len(),
    })
}

/// The argument at `idx`, or nil when absent.
pub(crate) fn arg(args: &[Value], idx: usize) -> &Value {
    args.get(idx).unwrap_or(&NIL)
}

/// An optional integer argument. Present but non-numeric is an error.
pub(crate) fn int_arg(args: &[Value], idx: usize) -> Result<Option<i64>, FilterError> {
    match args.get(idx) {
        None | Some(Value::Nil) => Ok(None),
        Some(value) => value.as_integer().map(Some).ok_or_else(|| {
            FilterError::InvalidArgument(format!(
                "expected a number, got {} `{}`",
                value.type_name(),
                value.to_output()
            ))
        }),
    }
}

/// An optional string argument, rendered with output semantics.
pub(crate) fn str_arg(args: &[Value], idx: usize) -> Option<String> {
    args.get(idx).map(Value::to_output)
}
