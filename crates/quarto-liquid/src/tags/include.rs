/*
 * tags/include.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `include`: render another template in the current scope.

use std::path::Path;

use super::{ArgSyntax, TagDefinition, TagRegistry, malformed};
use crate::ast::{TagArgs, TagNode};
use crate::error::{ErrorKind, TemplateResult};
use crate::parser;
use crate::render::RenderContext;
use crate::value::Map;

pub(super) fn register(registry: &mut TagRegistry) {
    registry.register(TagDefinition::standalone(
        "include",
        ArgSyntax::Include,
        render_include,
    ));
}

/// The variable `with` binds: the template's base name without extension.
fn include_variable(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map_or_else(|| name.to_string(), |stem| stem.to_string_lossy().into_owned())
}

fn render_include(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
    let TagArgs::Include(args) = &tag.args else {
        return Err(malformed(ctx, tag));
    };
    let name = ctx.evaluate(&args.template, tag.line)?.to_output();
    let env = ctx.environment();

    let Some(loader) = env.loader.as_deref() else {
        return Err(ctx.error(
            ErrorKind::HostIntegration,
            format!("cannot include `{}`: no template loader is configured", name),
            tag.line,
        ));
    };

    let limit = env.options.max_include_depth;
    if ctx.include_depth() >= limit {
        return Err(ctx.error(
            ErrorKind::Evaluation,
            format!(
                "cannot include `{}`: include depth limit ({}) exceeded",
                name, limit
            ),
            tag.line,
        ));
    }

    let nodes = match ctx.cached_include(&name) {
        Some(nodes) => nodes,
        None => {
            let source = loader.load(&name, ctx.path()).map_err(|e| {
                ctx.error(
                    ErrorKind::HostIntegration,
                    format!("cannot include `{}`: {}", name, e),
                    tag.line,
                )
                .with_cause(e)
            })?;
            let nodes = parser::parse(&source, &env.tags).map_err(|e| e.in_path(&name))?;
            ctx.cache_include(&name, nodes)
        }
    };

    let mut frame = Map::new();
    if let Some(with) = &args.with {
        frame.insert(include_variable(&name), ctx.evaluate(with, tag.line)?);
    }
    for (key, value) in &args.bindings {
        frame.insert(key.clone(), ctx.evaluate(value, tag.line)?);
    }

    tracing::trace!(name = %name, depth = ctx.include_depth() + 1, "including template");
    ctx.render_included(&name, &nodes, frame)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::include_variable;
    use crate::context::Bindings;
    use crate::engine::Engine;
    use crate::error::{ErrorKind, LoaderError};
    use crate::loader::{MemoryLoader, TemplateLoader};
    use crate::options::EngineOptions;
    use pretty_assertions::assert_eq;

    /// Serves one template and counts how often it is loaded.
    struct CountingLoader {
        loads: Arc<AtomicUsize>,
    }

    impl TemplateLoader for CountingLoader {
        fn load(&self, _name: &str, _from: &str) -> Result<String, LoaderError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok("<{{ i }}>".to_string())
        }
    }

    fn engine(templates: &[(&str, &str)]) -> Engine {
        let mut engine = Engine::new();
        engine.set_loader(MemoryLoader::with_templates(templates.iter().copied()));
        engine
    }

    #[test]
    fn test_include_variable() {
        assert_eq!(include_variable("product"), "product");
        assert_eq!(include_variable("cards/product.liquid"), "product");
    }

    #[test]
    fn test_include_shares_scope() {
        let engine = engine(&[("greet", "Hi {{ name }}{% assign seen = true %}")]);
        let mut bindings = Bindings::new();
        bindings.insert("name", "Ada");
        assert_eq!(
            engine
                .parse_and_render("{% include 'greet' %}|{{ seen }}", &bindings)
                .unwrap(),
            "Hi Ada|true"
        );
    }

    #[test]
    fn test_include_with_and_bindings() {
        let engine = engine(&[("card", "[{{ card }}:{{ size }}]")]);
        let mut bindings = Bindings::new();
        bindings.insert("item", "shoe");
        assert_eq!(
            engine
                .parse_and_render(
                    "{% include 'card' with item, size: 3 %}{{ size }}",
                    &bindings
                )
                .unwrap(),
            "[shoe:3]"
        );
    }

    #[test]
    fn test_missing_loader_is_host_error() {
        let err = Engine::new()
            .parse_and_render("{% include 'x' %}", &Bindings::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostIntegration);
        assert!(!err.is_template_error());
    }

    #[test]
    fn test_missing_template_is_host_error() {
        let engine = engine(&[]);
        let err = engine
            .parse_and_render("\n{% include 'nope' %}", &Bindings::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostIntegration);
        assert_eq!(err.line(), Some(2));
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_errors_in_included_template_name_it() {
        let engine = engine(&[("broken", "ok\n{{ x | nope }}")]);
        let err = engine
            .compile("{% include 'broken' %}", "page.liquid")
            .unwrap()
            .render(&Bindings::new())
            .unwrap_err();
        assert_eq!(err.path(), "broken");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_include_is_loaded_once_per_render() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut engine = Engine::new();
        engine.set_loader(CountingLoader {
            loads: Arc::clone(&loads),
        });
        let template = engine
            .compile("{% for i in (1..3) %}{% include 'item' %}{% endfor %}", "list")
            .unwrap();

        assert_eq!(template.render(&Bindings::new()).unwrap(), "<1><2><3>");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        // each render starts with an empty cache
        template.render(&Bindings::new()).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_recursion_limit() {
        let mut engine = Engine::with_options(EngineOptions::default().with_max_include_depth(5));
        engine.set_loader(MemoryLoader::with_templates([("loop", "x{% include 'loop' %}")]));
        let err = engine
            .parse_and_render("{% include 'loop' %}", &Bindings::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
        assert!(err.message().contains("depth"));
    }
}
