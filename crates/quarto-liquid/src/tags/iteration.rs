/*
 * tags/iteration.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `for` loops and the tags that only make sense inside them.

use super::{ArgSyntax, BlockShape, TagDefinition, TagRegistry, malformed};
use crate::ast::{LoopHeader, TagArgs, TagNode};
use crate::context::LoopState;
use crate::error::{ErrorKind, TemplateResult};
use crate::expression::Expression;
use crate::render::{Interrupt, RenderContext};
use crate::value::{Map, Value};

pub(super) fn register(registry: &mut TagRegistry) {
    registry.register(TagDefinition::block(
        "for",
        ArgSyntax::Loop,
        BlockShape::new("endfor").terminal("else"),
        render_for,
    ));
    registry.register(TagDefinition::standalone(
        "break",
        ArgSyntax::None,
        render_break,
    ));
    registry.register(TagDefinition::standalone(
        "continue",
        ArgSyntax::None,
        render_continue,
    ));
    registry.register(TagDefinition::standalone(
        "cycle",
        ArgSyntax::Cycle,
        render_cycle,
    ));
}

fn render_for(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Loop(header) = &tag.args else {
        return Err(malformed(ctx, tag));
    };

    let collection = ctx.evaluate(&header.collection, tag.line)?;
    let mut items = match collection {
        Value::Nil => Vec::new(),
        Value::List(items) => items,
        Value::Map(map) => map
            .into_iter()
            .map(|(key, value)| Value::List(vec![Value::String(key), value]))
            .collect(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![Value::String(s)],
        other => {
            return Err(ctx.error(
                ErrorKind::Evaluation,
                format!("cannot iterate over {} `{}`", other.type_name(), header.collection),
                tag.line,
            ));
        }
    };

    if let Some(offset) = loop_count(ctx, header.offset.as_ref(), "offset", tag)? {
        items.drain(..offset.min(items.len()));
    }
    if let Some(limit) = loop_count(ctx, header.limit.as_ref(), "limit", tag)? {
        items.truncate(limit);
    }
    if header.reversed {
        items.reverse();
    }

    if items.is_empty() {
        if let Some(otherwise) = tag.clause("else") {
            return ctx.render_nodes(&otherwise.body);
        }
        return Ok(());
    }

    let parent = ctx.current_loop().cloned();
    ctx.push_loop(LoopState::new(loop_name(header), items.len(), parent));
    let result = iterate(ctx, header, tag, items);
    ctx.pop_loop();
    result
}

fn iterate(
    ctx: &mut RenderContext<'_>,
    header: &LoopHeader,
    tag: &TagNode,
    items: Vec<Value>,
) -> TemplateResult<()> {
    for (index0, item) in items.into_iter().enumerate() {
        let forloop = match ctx.current_loop_mut() {
            Some(state) => {
                state.index0 = index0;
                state.to_value()
            }
            None => Value::Nil,
        };

        let mut frame = Map::new();
        frame.insert(header.variable.clone(), item);
        frame.insert("forloop".to_string(), forloop);
        ctx.with_frame(frame, |ctx| ctx.render_nodes(tag.body()))?;

        if ctx.take_interrupt() == Some(Interrupt::Break) {
            break;
        }
    }
    Ok(())
}

fn loop_name(header: &LoopHeader) -> String {
    format!("{}-{}", header.variable, header.collection)
}

/// Evaluate a `limit`/`offset` attribute; negative values count as 0.
fn loop_count(
    ctx: &RenderContext<'_>,
    expr: Option<&Expression>,
    attribute: &str,
    tag: &TagNode,
) -> TemplateResult<Option<usize>> {
    let Some(expr) = expr else {
        return Ok(None);
    };
    let value = ctx.evaluate(expr, tag.line)?;
    if value.is_nil() {
        return Ok(None);
    }
    match value.as_integer() {
        Some(n) => Ok(Some(n.max(0) as usize)),
        None => Err(ctx.error(
            ErrorKind::Evaluation,
            format!(
                "loop `{}` must be a number, got {}",
                attribute,
                value.type_name()
            ),
            tag.line,
        )),
    }
}

fn render_break(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    loop_interrupt(ctx, tag, Interrupt::Break)
}

fn render_continue(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    loop_interrupt(ctx, tag, Interrupt::Continue)
}

fn loop_interrupt(
    ctx: &mut RenderContext<'_>,
    tag: &TagNode,
    interrupt: Interrupt,
) -> TemplateResult<()> {
    if !ctx.in_loop() {
        return Err(ctx.error(
            ErrorKind::Evaluation,
            format!("`{}` used outside of a `for` loop", tag.name),
            tag.line,
        ));
    }
    ctx.interrupt(interrupt);
    Ok(())
}

/// `cycle` alternates through its values; calls with the same group (or,
/// without a group, the same values) share a position.
fn render_cycle(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Cycle { group, values } = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    let key = match group {
        Some(group) => ctx.evaluate(group, tag.line)?.to_output(),
        None => values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    };
    let position = ctx.next_cycle(key, values.len());
    if let Some(expr) = values.get(position) {
        let value = ctx.evaluate(expr, tag.line)?;
        ctx.write(&value.to_output());
    }
    Ok(())
}
