/*
 * tags/variables.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tags that bind variables or counters.

use super::{ArgSyntax, BlockShape, TagDefinition, TagRegistry, malformed};
use crate::ast::{TagArgs, TagNode};
use crate::error::TemplateResult;
use crate::render::RenderContext;
use crate::value::Value;

pub(super) fn register(registry: &mut TagRegistry) {
    registry.register(TagDefinition::standalone(
        "assign",
        ArgSyntax::Assignment,
        render_assign,
    ));
    registry.register(TagDefinition::block(
        "capture",
        ArgSyntax::Identifier,
        BlockShape::new("endcapture"),
        render_capture,
    ));
    registry.register(TagDefinition::standalone(
        "increment",
        ArgSyntax::Identifier,
        render_increment,
    ));
    registry.register(TagDefinition::standalone(
        "decrement",
        ArgSyntax::Identifier,
        render_decrement,
    ));
}

fn render_assign(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Assignment { name, value } = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    let value = ctx.evaluate(value, tag.line)?;
    ctx.scope_mut().assign(name.as_str(), value);
    Ok(())
}

fn render_capture(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Identifier(name) = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    let captured = ctx.render_to_string(tag.body())?;
    ctx.scope_mut()
        .assign(name.as_str(), Value::String(captured));
    Ok(())
}

fn render_increment(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Identifier(name) = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    let value = ctx.increment(name);
    ctx.write(&value.to_string());
    Ok(())
}

fn render_decrement(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Identifier(name) = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    let value = ctx.decrement(name);
    ctx.write(&value.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::context::Bindings;
    use crate::engine::Engine;
    use pretty_assertions::assert_eq;

    fn render(source: &str) -> String {
        let mut bindings = Bindings::new();
        bindings.insert("name", "Ada");
        bindings.insert("xs", vec![1, 2, 3]);
        Engine::new()
            .parse_and_render(source, &bindings)
            .expect(source)
    }

    #[test]
    fn test_assign() {
        assert_eq!(render("{% assign x = name | upcase %}{{ x }}"), "ADA");
        assert_eq!(render("{% assign name = 'Bob' %}{{ name }}"), "Bob");
    }

    #[test]
    fn test_assign_in_loop_survives_the_loop() {
        assert_eq!(
            render("{% for x in xs %}{% assign last = x %}{% endfor %}{{ last }}"),
            "3"
        );
        // rebinding the loop variable only touches the iteration frame
        assert_eq!(
            render("{% for x in xs %}{% assign x = 0 %}{{ x }}{% endfor %}[{{ x }}]"),
            "000[]"
        );
    }

    #[test]
    fn test_capture() {
        assert_eq!(
            render("{% capture greeting %}Hi {{ name }}{% endcapture %}<{{ greeting }}>"),
            "<Hi Ada>"
        );
    }

    #[test]
    fn test_counters_are_independent_of_variables() {
        assert_eq!(
            render("{% increment n %}{% increment n %}{% assign n = 10 %}{% increment n %}{{ n }}"),
            "01210"
        );
        assert_eq!(render("{% decrement d %}{% decrement d %}"), "-1-2");
    }
}
