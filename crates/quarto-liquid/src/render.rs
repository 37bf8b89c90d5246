/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template rendering.
//!
//! Rendering walks the node tree with a [`RenderContext`] that owns all
//! per-render state: the scope, the output buffer, loop states, and the
//! `cycle`/`increment` counters. Tags drive control flow through it.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use crate::ast::Node;
use crate::context::{Bindings, LoopState, Scope};
use crate::engine::Environment;
use crate::error::{ErrorKind, SourceError, TemplateResult};
use crate::evaluator::Evaluator;
use crate::expression::Expression;
use crate::options::EngineOptions;
use crate::parser::Template;
use crate::value::{Map, Value};

impl Template {
    /// Render the template with the given bindings.
    ///
    /// Output is all-or-nothing: on error no partial output is returned.
    pub fn render(&self, bindings: &Bindings) -> TemplateResult<String> {
        let mut ctx = RenderContext::new(&self.env, self.path(), bindings);
        ctx.render_nodes(&self.nodes)
            .map_err(|e| e.in_path(self.path()))?;
        let output = ctx.into_output();
        tracing::debug!(path = %self.path(), bytes = output.len(), "rendered template");
        Ok(output)
    }
}

/// A pending `break` or `continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Break,
    Continue,
}

/// Per-render state handed to tag renderers.
pub struct RenderContext<'a> {
    env: &'a Environment,
    path: String,
    scope: Scope<'a>,
    output: String,
    loops: Vec<LoopState>,
    interrupt: Option<Interrupt>,
    cycles: HashMap<String, usize>,
    counters: HashMap<String, i64>,
    include_depth: usize,
    /// Included templates parsed so far in this render, by name.
    includes: HashMap<String, Arc<[Node]>>,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(env: &'a Environment, path: &str, bindings: &'a Bindings) -> Self {
        Self {
            env,
            path: path.to_string(),
            scope: Scope::new(bindings),
            output: String::new(),
            loops: Vec::new(),
            interrupt: None,
            cycles: HashMap::new(),
            counters: HashMap::new(),
            include_depth: 0,
            includes: HashMap::new(),
        }
    }

    pub(crate) fn environment(&self) -> &'a Environment {
        self.env
    }

    pub fn options(&self) -> &EngineOptions {
        &self.env.options
    }

    /// Path of the template currently being rendered.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scope(&self) -> &Scope<'a> {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope<'a> {
        &mut self.scope
    }

    /// Append text to the output.
    pub fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn evaluate(&self, expr: &Expression, line: usize) -> TemplateResult<Value> {
        Evaluator::new(&self.scope, &self.env.filters, &self.env.options).evaluate(expr, line)
    }

    /// Compare `value` against `expr` the way `==` does.
    pub fn matches(&self, expr: &Expression, value: &Value, line: usize) -> TemplateResult<bool> {
        Evaluator::new(&self.scope, &self.env.filters, &self.env.options).matches(expr, value, line)
    }

    /// An error located in the current template.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>, line: usize) -> SourceError {
        SourceError::at(kind, message, line).in_path(&self.path)
    }

    /// Render nodes in order, stopping early at `break` or `continue`.
    pub fn render_nodes(&mut self, nodes: &[Node]) -> TemplateResult<()> {
        for node in nodes {
            if self.interrupt.is_some() {
                break;
            }
            self.render_node(node)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node) -> TemplateResult<()> {
        match node {
            Node::Text(text) => self.output.push_str(text),
            Node::Output(output) => {
                let value = self.evaluate(&output.expression, output.line)?;
                self.output.push_str(&value.to_output());
            }
            Node::Tag(tag) => {
                let env = self.env;
                let definition = env.tags.get(&tag.name).ok_or_else(|| {
                    self.error(
                        ErrorKind::Evaluation,
                        format!("undefined tag `{}`", tag.name),
                        tag.line,
                    )
                })?;
                definition
                    .renderer
                    .render(self, tag)
                    .map_err(|e| e.in_path(&self.path))?;
            }
        }
        Ok(())
    }

    /// Render nodes into a detached buffer and return it.
    pub fn render_to_string(&mut self, nodes: &[Node]) -> TemplateResult<String> {
        let saved = mem::take(&mut self.output);
        let result = self.render_nodes(nodes);
        let captured = mem::replace(&mut self.output, saved);
        result.map(|()| captured)
    }

    /// Run `f` with `frame` pushed as the innermost scope frame.
    pub fn with_frame<R>(&mut self, frame: Map, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scope.push_frame(frame);
        let result = f(self);
        self.scope.pop_frame();
        result
    }

    /// The innermost active loop.
    pub fn current_loop(&self) -> Option<&LoopState> {
        self.loops.last()
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    pub(crate) fn push_loop(&mut self, state: LoopState) {
        self.loops.push(state);
    }

    pub(crate) fn current_loop_mut(&mut self) -> Option<&mut LoopState> {
        self.loops.last_mut()
    }

    pub(crate) fn pop_loop(&mut self) -> Option<LoopState> {
        self.loops.pop()
    }

    /// Request a `break` or `continue` of the innermost loop.
    pub fn interrupt(&mut self, interrupt: Interrupt) {
        self.interrupt = Some(interrupt);
    }

    pub fn take_interrupt(&mut self) -> Option<Interrupt> {
        self.interrupt.take()
    }

    /// Position of the next value in a `cycle` group of `len` values.
    pub fn next_cycle(&mut self, group: String, len: usize) -> usize {
        let counter = self.cycles.entry(group).or_insert(0);
        let position = *counter % len.max(1);
        *counter += 1;
        position
    }

    /// `increment`: the counter's value before incrementing, from 0.
    pub fn increment(&mut self, name: &str) -> i64 {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        let value = *counter;
        *counter += 1;
        value
    }

    /// `decrement`: the counter's value after decrementing, from -1.
    pub fn decrement(&mut self, name: &str) -> i64 {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        *counter -= 1;
        *counter
    }

    pub(crate) fn include_depth(&self) -> usize {
        self.include_depth
    }

    pub(crate) fn cached_include(&self, name: &str) -> Option<Arc<[Node]>> {
        self.includes.get(name).cloned()
    }

    pub(crate) fn cache_include(&mut self, name: &str, nodes: Vec<Node>) -> Arc<[Node]> {
        let nodes: Arc<[Node]> = nodes.into();
        self.includes.insert(name.to_string(), Arc::clone(&nodes));
        nodes
    }

    /// Render another template's nodes in the current scope with `frame`
    /// pushed on top. Errors are attributed to `path`.
    pub(crate) fn render_included(
        &mut self,
        path: &str,
        nodes: &[Node],
        frame: Map,
    ) -> TemplateResult<()> {
        let outer_path = mem::replace(&mut self.path, path.to_string());
        self.include_depth += 1;
        let result = self
            .with_frame(frame, |ctx| ctx.render_nodes(nodes))
            .map_err(|e| e.in_path(path));
        self.include_depth -= 1;
        self.path = outer_path;
        result
    }

    pub(crate) fn into_output(self) -> String {
        self.output
    }
}
