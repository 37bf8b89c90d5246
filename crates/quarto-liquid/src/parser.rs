/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Document parser.
//!
//! Turns the lexer's segment stream into a [`Node`] tree. Block nesting is
//! tracked on an explicit stack of open blocks; each entry collects the
//! block's body and clauses until its end tag arrives.

use std::sync::Arc;

use crate::ast::{Block, Clause, Node, OutputNode, TagArgs, TagNode};
use crate::engine::Environment;
use crate::error::{SourceError, TemplateResult, UNNAMED_TEMPLATE};
use crate::expression::{self, Expression, Literal};
use crate::lexer::{self, Segment, SegmentKind};
use crate::tags::{BlockShape, TagRegistry};

/// A compiled template ready for rendering.
///
/// Templates are immutable and can be rendered any number of times, from
/// any number of threads.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) nodes: Vec<Node>,
    pub(crate) path: String,
    pub(crate) env: Arc<Environment>,
}

impl Template {
    /// Compile `source` against an environment.
    pub(crate) fn compile(
        source: &str,
        path: &str,
        env: Arc<Environment>,
    ) -> TemplateResult<Self> {
        let nodes = parse(source, &env.tags).map_err(|e| e.in_path(path))?;
        tracing::debug!(path = %path, nodes = nodes.len(), "compiled template");
        Ok(Template {
            nodes,
            path: path.to_string(),
            env,
        })
    }

    /// The top-level nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The path given at compile time, or `<template>`.
    pub fn path(&self) -> &str {
        if self.path.is_empty() {
            UNNAMED_TEMPLATE
        } else {
            &self.path
        }
    }
}

/// Lex and parse template source into a node tree.
pub fn parse(source: &str, tags: &TagRegistry) -> TemplateResult<Vec<Node>> {
    let segments = lexer::lex(source)?;
    parse_segments(segments, tags)
}

/// A block tag waiting for its end tag.
struct OpenBlock<'r> {
    name: String,
    args: TagArgs,
    line: usize,
    shape: &'r BlockShape,
    body: Vec<Node>,
    clauses: Vec<Clause>,
    /// Name of a terminal clause already seen, after which no clause may follow.
    terminal: Option<String>,
}

impl OpenBlock<'_> {
    fn current(&mut self) -> &mut Vec<Node> {
        match self.clauses.last_mut() {
            Some(clause) => &mut clause.body,
            None => &mut self.body,
        }
    }

    fn finish(self) -> Node {
        Node::Tag(TagNode {
            name: self.name,
            args: self.args,
            line: self.line,
            block: Some(Block {
                body: self.body,
                clauses: self.clauses,
            }),
        })
    }
}

fn emit(stack: &mut [OpenBlock<'_>], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(open) => open.current().push(node),
        None => root.push(node),
    }
}

/// Build the node tree from lexed segments.
pub fn parse_segments(segments: Vec<Segment>, tags: &TagRegistry) -> TemplateResult<Vec<Node>> {
    let mut root = Vec::new();
    let mut stack: Vec<OpenBlock<'_>> = Vec::new();

    for Segment { kind, line } in segments {
        match kind {
            SegmentKind::Text(text) => emit(&mut stack, &mut root, Node::Text(text)),
            SegmentKind::Output(text) => {
                let expression = if text.is_empty() {
                    Expression::Literal(Literal::Nil)
                } else {
                    expression::parse_expression(&text, line)?
                };
                emit(
                    &mut stack,
                    &mut root,
                    Node::Output(OutputNode { expression, line }),
                );
            }
            SegmentKind::Tag {
                name,
                args,
                args_line,
            } => {
                if let Some(open) = stack.last_mut() {
                    if name == open.shape.end {
                        if let Some(open) = stack.pop() {
                            let node = open.finish();
                            emit(&mut stack, &mut root, node);
                        }
                        continue;
                    }
                    let shape = open.shape;
                    if let Some(clause_spec) = shape.find_clause(&name) {
                        if let Some(terminal) = &open.terminal {
                            return Err(SourceError::document(
                                format!(
                                    "unexpected `{{% {} %}}` after `{{% {} %}}` in `{}` block opened on line {}",
                                    name, terminal, open.name, open.line
                                ),
                                line,
                            ));
                        }
                        let args = clause_spec.syntax.parse(&name, &args, args_line)?;
                        if clause_spec.terminal {
                            open.terminal = Some(name.clone());
                        }
                        open.clauses.push(Clause {
                            name,
                            args,
                            line,
                            body: Vec::new(),
                        });
                        continue;
                    }
                }

                if tags.is_terminator(&name) {
                    let message = match stack.last() {
                        Some(open) => format!(
                            "unexpected `{{% {} %}}`; expected `{{% {} %}}` to close `{}` opened on line {}",
                            name, open.shape.end, open.name, open.line
                        ),
                        None => format!("unexpected `{{% {} %}}` with no open block", name),
                    };
                    return Err(SourceError::document(message, line));
                }

                match tags.get(&name) {
                    Some(definition) => {
                        let args = definition.syntax.parse(&name, &args, args_line)?;
                        match &definition.block {
                            Some(shape) => stack.push(OpenBlock {
                                name,
                                args,
                                line,
                                shape,
                                body: Vec::new(),
                                clauses: Vec::new(),
                                terminal: None,
                            }),
                            None => emit(
                                &mut stack,
                                &mut root,
                                Node::Tag(TagNode {
                                    name,
                                    args,
                                    line,
                                    block: None,
                                }),
                            ),
                        }
                    }
                    // Reported as an undefined tag if it is ever rendered.
                    None => emit(
                        &mut stack,
                        &mut root,
                        Node::Tag(TagNode {
                            name,
                            args: TagArgs::Raw(args),
                            line,
                            block: None,
                        }),
                    ),
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(SourceError::document(
            format!(
                "`{}` tag opened on line {} was never closed; expected `{{% {} %}}`",
                open.name, open.line, open.shape.end
            ),
            open.line,
        ));
    }

    Ok(root)
}
