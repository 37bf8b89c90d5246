/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template document tree.
//!
//! A compiled template is a sequence of [`Node`]s. Block tags own their body
//! and the clauses (`elsif`, `else`, `when`, ...) that split it; the tree has
//! a single owner and no shared sub-trees.

use crate::expression::Expression;

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, output verbatim.
    Text(String),
    /// `{{ expression }}`
    Output(OutputNode),
    /// `{% name args %}`, possibly with a body.
    Tag(TagNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    pub expression: Expression,
    pub line: usize,
}

/// A tag occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    pub name: String,
    pub args: TagArgs,
    /// Line of the opening tag.
    pub line: usize,
    /// Body and clauses, for block tags.
    pub block: Option<Block>,
}

impl TagNode {
    /// Nodes before the first clause, or nothing for standalone tags.
    pub fn body(&self) -> &[Node] {
        match &self.block {
            Some(block) => &block.body,
            None => &[],
        }
    }

    /// Clauses in source order.
    pub fn clauses(&self) -> &[Clause] {
        match &self.block {
            Some(block) => &block.clauses,
            None => &[],
        }
    }

    /// The first clause with this name.
    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses().iter().find(|clause| clause.name == name)
    }
}

/// The contents of a block tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub body: Vec<Node>,
    pub clauses: Vec<Clause>,
}

/// A named section inside a block, e.g. `{% elsif x %}...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub name: String,
    pub args: TagArgs,
    pub line: usize,
    pub body: Vec<Node>,
}

/// Parsed tag arguments. Which variant a tag gets is decided by the
/// [`ArgSyntax`](crate::tags::ArgSyntax) it registered with.
#[derive(Debug, Clone, PartialEq)]
pub enum TagArgs {
    None,
    Expression(Expression),
    Expressions(Vec<Expression>),
    Assignment { name: String, value: Expression },
    Identifier(String),
    Loop(LoopHeader),
    Cycle {
        group: Option<Expression>,
        values: Vec<Expression>,
    },
    Include(IncludeArgs),
    /// Unparsed argument text, for tags that interpret it themselves.
    Raw(String),
}

/// `for variable in collection reversed limit: n offset: m`
#[derive(Debug, Clone, PartialEq)]
pub struct LoopHeader {
    pub variable: String,
    pub collection: Expression,
    pub reversed: bool,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
}

/// `include "name" with value, key: value`
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeArgs {
    pub template: Expression,
    pub with: Option<Expression>,
    pub bindings: Vec<(String, Expression)>,
}
