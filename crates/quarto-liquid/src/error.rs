/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation and rendering.
//!
//! Every failure that escapes the engine is a [`SourceError`]: a message, the
//! stage that produced it ([`ErrorKind`]), the template path, the line number
//! and an optional underlying cause. Filters and loaders report their own
//! narrower errors ([`FilterError`], [`LoaderError`]) which the engine wraps
//! as the cause of a `SourceError`.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Path used when the host compiles a template without naming it.
pub const UNNAMED_TEMPLATE: &str = "<template>";

/// The stage of the pipeline that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unterminated or malformed `{{ }}` / `{% %}` delimiters.
    Lex,
    /// Malformed expression grammar inside a delimiter.
    ExpressionParse,
    /// Unmatched or missing block terminator.
    DocumentParse,
    /// Undefined tag or filter, filter-reported error, type mismatch.
    Evaluation,
    /// Failure of a host-provided capability, e.g. a template loader.
    HostIntegration,
}

impl ErrorKind {
    /// Whether an error of this kind is the template author's fault.
    pub fn is_template_error(self) -> bool {
        !matches!(self, ErrorKind::HostIntegration)
    }

    fn label(self) -> &'static str {
        match self {
            ErrorKind::Lex => "syntax error",
            ErrorKind::ExpressionParse => "expression syntax error",
            ErrorKind::DocumentParse => "parse error",
            ErrorKind::Evaluation => "render error",
            ErrorKind::HostIntegration => "integration error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An error with a source location and optional cause.
#[derive(Debug, Error)]
#[error("{}: {}: {message}", location(.path, .line), .kind.label())]
pub struct SourceError {
    kind: ErrorKind,
    message: String,
    path: String,
    line: Option<usize>,
    #[source]
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

fn location(path: &str, line: &Option<usize>) -> String {
    let path = if path.is_empty() { UNNAMED_TEMPLATE } else { path };
    match line {
        Some(line) => format!("{}:{}", path, line),
        None => format!("{}:?", path),
    }
}

impl SourceError {
    /// Create an error without a location.
    ///
    /// The path is filled in when the error crosses the compile or render
    /// boundary; the line stays unknown unless [`SourceError::at_line`] is
    /// called.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: String::new(),
            line: None,
            cause: None,
        }
    }

    /// Create an error at a 1-based line.
    pub fn at(kind: ErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self::new(kind, message).at_line(line)
    }

    pub fn lex(message: impl Into<String>, line: usize) -> Self {
        Self::at(ErrorKind::Lex, message, line)
    }

    pub fn expression(message: impl Into<String>, line: usize) -> Self {
        Self::at(ErrorKind::ExpressionParse, message, line)
    }

    pub fn document(message: impl Into<String>, line: usize) -> Self {
        Self::at(ErrorKind::DocumentParse, message, line)
    }

    pub fn evaluation(message: impl Into<String>, line: usize) -> Self {
        Self::at(ErrorKind::Evaluation, message, line)
    }

    pub fn host(message: impl Into<String>, line: usize) -> Self {
        Self::at(ErrorKind::HostIntegration, message, line)
    }

    /// Set the line number. Lines are 1-based; 0 is treated as unknown.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = (line > 0).then_some(line);
        self
    }

    /// Attribute the error to a template path, unless an inner template
    /// (e.g. an included one) already claimed it.
    pub fn in_path(mut self, path: &str) -> Self {
        if self.path.is_empty() {
            self.path = if path.is_empty() {
                UNNAMED_TEMPLATE.to_string()
            } else {
                path.to_string()
            };
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The template path, or [`UNNAMED_TEMPLATE`] if none was recorded.
    pub fn path(&self) -> &str {
        if self.path.is_empty() {
            UNNAMED_TEMPLATE
        } else {
            &self.path
        }
    }

    /// The 1-based line number, or `None` when unknown.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Whether this error is the template author's fault, as opposed to a
    /// failure of the embedding application.
    pub fn is_template_error(&self) -> bool {
        self.kind.is_template_error()
    }
}

/// Returns true iff `err` represents an error in template syntax or
/// execution.
///
/// Host integration failures (such as a loader that cannot find an included
/// template) and errors that did not originate in this crate return false.
pub fn is_template_error(err: &(dyn StdError + 'static)) -> bool {
    if let Some(source_error) = err.downcast_ref::<SourceError>() {
        return source_error.is_template_error();
    }
    err.downcast_ref::<FilterError>().is_some()
}

/// Errors reported by filter functions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// An argument had an unusable type or value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The filter was called with the wrong number of arguments.
    #[error("expected {expected} argument(s), got {actual}")]
    ArgumentCount { expected: String, actual: usize },

    /// Any other domain error.
    #[error("{0}")]
    Message(String),
}

/// Errors reported by template loaders.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No template with this name exists.
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// I/O error while reading a template.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, SourceError>;
