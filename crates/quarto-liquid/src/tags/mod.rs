/*
 * tags/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag registry.
//!
//! The registry is the only place a tag's meaning lives. For the document
//! parser a tag declares how its arguments are parsed and, for block tags,
//! which clause and end names it owns. At render time the parser's output
//! is handed to the tag's [`TagRenderer`].

mod control;
mod include;
mod iteration;
mod variables;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{TagArgs, TagNode};
use crate::error::{ErrorKind, SourceError, TemplateResult};
use crate::expression;
use crate::render::RenderContext;

/// How a tag's argument text is parsed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSyntax {
    /// No arguments allowed.
    None,
    /// A single expression (`if`, `case`).
    Expression,
    /// Comma or `or` separated values (`when`).
    ExpressionList,
    /// `name = expression` (`assign`).
    Assignment,
    /// A bare variable name (`capture`, `increment`).
    Identifier,
    /// `item in collection ...` (`for`).
    Loop,
    /// `[group:] value, ...` (`cycle`).
    Cycle,
    /// `"name" [with value] [, key: value ...]` (`include`).
    Include,
    /// Argument text is kept as-is.
    Raw,
}

impl ArgSyntax {
    pub(crate) fn parse(self, tag: &str, args: &str, line: usize) -> TemplateResult<TagArgs> {
        if args.is_empty() && !matches!(self, ArgSyntax::None | ArgSyntax::Raw) {
            return Err(SourceError::expression(
                format!("`{}` requires arguments", tag),
                line,
            ));
        }

        match self {
            ArgSyntax::None if args.is_empty() => Ok(TagArgs::None),
            ArgSyntax::None => Err(SourceError::expression(
                format!("`{}` does not take arguments, found `{}`", tag, args),
                line,
            )),
            ArgSyntax::Expression => {
                expression::parse_expression(args, line).map(TagArgs::Expression)
            }
            ArgSyntax::ExpressionList => {
                expression::parse_expression_list(args, line).map(TagArgs::Expressions)
            }
            ArgSyntax::Assignment => {
                let (name, value) = expression::parse_assignment(args, line)?;
                Ok(TagArgs::Assignment { name, value })
            }
            ArgSyntax::Identifier => {
                expression::parse_identifier(args, line).map(TagArgs::Identifier)
            }
            ArgSyntax::Loop => expression::parse_loop(args, line).map(TagArgs::Loop),
            ArgSyntax::Cycle => {
                let (group, values) = expression::parse_cycle(args, line)?;
                Ok(TagArgs::Cycle { group, values })
            }
            ArgSyntax::Include => expression::parse_include(args, line).map(TagArgs::Include),
            ArgSyntax::Raw => Ok(TagArgs::Raw(args.to_string())),
        }
    }
}

/// Render-time behavior of a tag.
pub trait TagRenderer: Send + Sync {
    fn render(&self, ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()>;
}

impl<F> TagRenderer for F
where
    F: Fn(&mut RenderContext<'_>, &TagNode) -> TemplateResult<()> + Send + Sync,
{
    fn render(&self, ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
        self(ctx, tag)
    }
}

/// A clause a block tag recognizes, e.g. `elsif` or `else`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseSpec {
    pub name: String,
    pub syntax: ArgSyntax,
    /// A terminal clause must be the last clause of its block.
    pub terminal: bool,
}

/// The clause and end names of a block tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockShape {
    pub clauses: Vec<ClauseSpec>,
    pub end: String,
}

impl BlockShape {
    pub fn new(end: impl Into<String>) -> Self {
        Self {
            clauses: Vec::new(),
            end: end.into(),
        }
    }

    /// Add a repeatable clause.
    pub fn clause(mut self, name: impl Into<String>, syntax: ArgSyntax) -> Self {
        self.clauses.push(ClauseSpec {
            name: name.into(),
            syntax,
            terminal: false,
        });
        self
    }

    /// Add an argument-less clause that must come last (`else`).
    pub fn terminal(mut self, name: impl Into<String>) -> Self {
        self.clauses.push(ClauseSpec {
            name: name.into(),
            syntax: ArgSyntax::None,
            terminal: true,
        });
        self
    }

    pub fn find_clause(&self, name: &str) -> Option<&ClauseSpec> {
        self.clauses.iter().find(|clause| clause.name == name)
    }

    fn owns(&self, name: &str) -> bool {
        self.end == name || self.find_clause(name).is_some()
    }
}

/// A registered tag.
#[derive(Clone)]
pub struct TagDefinition {
    pub name: String,
    pub syntax: ArgSyntax,
    /// `None` for standalone tags.
    pub block: Option<BlockShape>,
    pub renderer: Arc<dyn TagRenderer>,
}

impl TagDefinition {
    pub fn standalone(
        name: impl Into<String>,
        syntax: ArgSyntax,
        renderer: impl TagRenderer + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            syntax,
            block: None,
            renderer: Arc::new(renderer),
        }
    }

    pub fn block(
        name: impl Into<String>,
        syntax: ArgSyntax,
        shape: BlockShape,
        renderer: impl TagRenderer + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            syntax,
            block: Some(shape),
            renderer: Arc::new(renderer),
        }
    }

    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }
}

impl fmt::Debug for TagDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDefinition")
            .field("name", &self.name)
            .field("syntax", &self.syntax)
            .field("block", &self.block)
            .finish_non_exhaustive()
    }
}

/// Tags by name.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: HashMap<String, TagDefinition>,
}

impl TagRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the standard Liquid tags.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        control::register(&mut registry);
        iteration::register(&mut registry);
        variables::register(&mut registry);
        include::register(&mut registry);
        registry
    }

    /// Add or replace a tag.
    pub fn register(&mut self, definition: TagDefinition) {
        self.tags.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&TagDefinition> {
        self.tags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// Whether `name` is a clause or end name of any registered block.
    pub fn is_terminator(&self, name: &str) -> bool {
        self.tags
            .values()
            .filter_map(|tag| tag.block.as_ref())
            .any(|shape| shape.owns(name))
    }

    /// Registered tag names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Error for a standard tag whose arguments do not have the expected shape,
/// which only happens if a host re-registered it with another syntax.
pub(crate) fn malformed(ctx: &RenderContext<'_>, tag: &TagNode) -> SourceError {
    ctx.error(
        ErrorKind::Evaluation,
        format!("`{}` tag has malformed arguments", tag.name),
        tag.line,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    #[test]
    fn test_standard_registry() {
        let registry = TagRegistry::standard();
        for name in [
            "if", "unless", "case", "for", "break", "continue", "cycle", "assign", "capture",
            "increment", "decrement", "include",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(registry.get("if").is_some_and(TagDefinition::is_block));
        assert!(!registry.get("assign").is_some_and(TagDefinition::is_block));
    }

    #[test]
    fn test_terminators() {
        let registry = TagRegistry::standard();
        for name in ["endif", "else", "elsif", "when", "endfor", "endcapture"] {
            assert!(registry.is_terminator(name), "{} should terminate", name);
        }
        assert!(!registry.is_terminator("if"));
        assert!(!registry.is_terminator("assign"));
    }

    #[test]
    fn test_arg_syntax() {
        assert_eq!(ArgSyntax::None.parse("else", "", 1).unwrap(), TagArgs::None);
        assert!(ArgSyntax::None.parse("else", "x", 1).is_err());
        assert!(ArgSyntax::Expression.parse("if", "", 1).is_err());
        assert_eq!(
            ArgSyntax::Expression.parse("if", "x", 1).unwrap(),
            TagArgs::Expression(Expression::variable("x"))
        );
        assert_eq!(
            ArgSyntax::Raw.parse("custom", "a b", 1).unwrap(),
            TagArgs::Raw("a b".to_string())
        );
    }

    #[test]
    fn test_block_shape() {
        let shape = BlockShape::new("endif")
            .clause("elsif", ArgSyntax::Expression)
            .terminal("else");
        assert!(shape.owns("endif"));
        assert!(shape.owns("elsif"));
        assert!(shape.find_clause("else").is_some_and(|c| c.terminal));
        assert!(!shape.owns("endfor"));
    }
}
