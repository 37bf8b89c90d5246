/*
 * tags/control.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conditional tags: `if`, `unless`, `case`.

use super::{ArgSyntax, BlockShape, TagDefinition, TagRegistry, malformed};
use crate::ast::{TagArgs, TagNode};
use crate::error::TemplateResult;
use crate::render::RenderContext;

pub(super) fn register(registry: &mut TagRegistry) {
    registry.register(TagDefinition::block(
        "if",
        ArgSyntax::Expression,
        BlockShape::new("endif")
            .clause("elsif", ArgSyntax::Expression)
            .terminal("else"),
        render_if,
    ));
    registry.register(TagDefinition::block(
        "unless",
        ArgSyntax::Expression,
        BlockShape::new("endunless")
            .clause("elsif", ArgSyntax::Expression)
            .terminal("else"),
        render_unless,
    ));
    registry.register(TagDefinition::block(
        "case",
        ArgSyntax::Expression,
        BlockShape::new("endcase")
            .clause("when", ArgSyntax::ExpressionList)
            .terminal("else"),
        render_case,
    ));
}

fn render_if(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    render_conditional(ctx, tag, false)
}

fn render_unless(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    render_conditional(ctx, tag, true)
}

/// Render the first branch whose condition holds; `negate` flips only the
/// opening condition.
fn render_conditional(
    ctx: &mut RenderContext<'_>,
    tag: &TagNode,
    negate: bool,
) -> TemplateResult<()> {
    let TagArgs::Expression(condition) = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    if ctx.evaluate(condition, tag.line)?.is_truthy() != negate {
        return ctx.render_nodes(tag.body());
    }

    for clause in tag.clauses() {
        match &clause.args {
            TagArgs::Expression(condition) => {
                if ctx.evaluate(condition, clause.line)?.is_truthy() {
                    return ctx.render_nodes(&clause.body);
                }
            }
            TagArgs::None => return ctx.render_nodes(&clause.body),
            _ => return Err(malformed(ctx, tag)),
        }
    }
    Ok(())
}

fn render_case(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Expression(subject) = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    let subject = ctx.evaluate(subject, tag.line)?;

    for clause in tag.clauses() {
        match &clause.args {
            TagArgs::Expressions(candidates) => {
                for candidate in candidates {
                    if ctx.matches(candidate, &subject, clause.line)? {
                        return ctx.render_nodes(&clause.body);
                    }
                }
            }
            TagArgs::None => return ctx.render_nodes(&clause.body),
            _ => return Err(malformed(ctx, tag)),
        }
    }
    Ok(())
}
