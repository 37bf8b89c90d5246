/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The engine: registries, loader and options, and the compile entry point.

use std::fmt;
use std::sync::Arc;

use crate::context::Bindings;
use crate::error::TemplateResult;
use crate::filters::{Filter, FilterRegistry};
use crate::loader::TemplateLoader;
use crate::options::EngineOptions;
use crate::parser::Template;
use crate::tags::{ArgSyntax, BlockShape, TagDefinition, TagRegistry, TagRenderer};

/// Configuration shared by a compiled template and its renders.
#[derive(Clone, Default)]
pub struct Environment {
    pub(crate) tags: TagRegistry,
    pub(crate) filters: FilterRegistry,
    pub(crate) loader: Option<Arc<dyn TemplateLoader>>,
    pub(crate) options: EngineOptions,
}

impl Environment {
    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("tags", &self.tags.names())
            .field("filters", &self.filters.names())
            .field("loader", &self.loader.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// Compiles templates.
///
/// Registration mutates the engine's own configuration; templates compiled
/// earlier keep the configuration they were compiled with.
///
/// ```ignore
/// let mut engine = Engine::new();
/// engine.register_filter("shout", |v: &Value, _: &[Value]| -> Result<Value, FilterError> {
///     Ok(Value::String(v.to_output().to_uppercase() + "!"))
/// });
/// let template = engine.compile("{{ name | shout }}", "greeting.liquid")?;
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    env: Arc<Environment>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the standard tags and filters.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            env: Arc::new(Environment {
                tags: TagRegistry::standard(),
                filters: FilterRegistry::standard(),
                loader: None,
                options,
            }),
        }
    }

    /// An engine with no tags or filters registered.
    pub fn empty() -> Self {
        Self {
            env: Arc::new(Environment::default()),
        }
    }

    fn env_mut(&mut self) -> &mut Environment {
        Arc::make_mut(&mut self.env)
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn options(&self) -> &EngineOptions {
        &self.env.options
    }

    pub fn set_options(&mut self, options: EngineOptions) {
        self.env_mut().options = options;
    }

    /// Register a standalone tag. Its arguments reach the renderer
    /// unparsed, as [`TagArgs::Raw`](crate::ast::TagArgs::Raw).
    pub fn register_tag(&mut self, name: impl Into<String>, renderer: impl TagRenderer + 'static) {
        self.register_tag_definition(TagDefinition::standalone(name, ArgSyntax::Raw, renderer));
    }

    /// Register a block tag with its clause names and end name.
    pub fn register_block(
        &mut self,
        name: impl Into<String>,
        clauses: &[&str],
        end: impl Into<String>,
        renderer: impl TagRenderer + 'static,
    ) {
        let shape = clauses
            .iter()
            .fold(BlockShape::new(end), |shape, clause| {
                shape.clause(*clause, ArgSyntax::Raw)
            });
        self.register_tag_definition(TagDefinition::block(name, ArgSyntax::Raw, shape, renderer));
    }

    /// Register a tag with full control over its argument syntax and shape.
    pub fn register_tag_definition(&mut self, definition: TagDefinition) {
        self.env_mut().tags.register(definition);
    }

    pub fn register_filter(&mut self, name: impl Into<String>, filter: impl Filter + 'static) {
        self.env_mut().filters.register(name, filter);
    }

    /// Set the loader used by `include`.
    pub fn set_loader(&mut self, loader: impl TemplateLoader + 'static) {
        self.env_mut().loader = Some(Arc::new(loader));
    }

    /// Compile a template. `path` names it in error messages; pass `""`
    /// to use `<template>`.
    pub fn compile(&self, source: &str, path: &str) -> TemplateResult<Template> {
        Template::compile(source, path, Arc::clone(&self.env))
    }

    /// Compile and render in one step.
    pub fn parse_and_render(&self, source: &str, bindings: &Bindings) -> TemplateResult<String> {
        self.compile(source, "")?.render(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{TagArgs, TagNode};
    use crate::error::{ErrorKind, FilterError};
    use crate::render::RenderContext;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn shout(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
        Ok(Value::String(input.to_output().to_uppercase() + "!"))
    }

    fn render_echo(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
        if let TagArgs::Raw(text) = &tag.args {
            ctx.write(text);
        }
        Ok(())
    }

    /// Renders the body, then each clause's arguments and body.
    fn render_sections(ctx: &mut RenderContext<'_>, tag: &TagNode) -> TemplateResult<()> {
        ctx.render_nodes(tag.body())?;
        for clause in tag.clauses() {
            if let TagArgs::Raw(text) = &clause.args {
                ctx.write(&format!("<{}>", text));
            }
            ctx.render_nodes(&clause.body)?;
        }
        Ok(())
    }

    #[test]
    fn test_custom_filter() {
        let mut engine = Engine::new();
        engine.register_filter("shout", shout);
        let mut bindings = Bindings::new();
        bindings.insert("name", "ada");
        assert_eq!(
            engine.parse_and_render("{{ name | shout }}", &bindings).unwrap(),
            "ADA!"
        );
    }

    #[test]
    fn test_custom_tags() {
        let mut engine = Engine::new();
        engine.register_tag("echo", render_echo);
        engine.register_block("sections", &["part"], "endsections", render_sections);
        assert_eq!(
            engine
                .parse_and_render(
                    "{% echo hello there %}|{% sections %}a{% part x %}b{% part y %}c{% endsections %}",
                    &Bindings::new()
                )
                .unwrap(),
            "hello there|a<x>b<y>c"
        );
    }

    #[test]
    fn test_compiled_template_keeps_its_configuration() {
        let mut engine = Engine::new();
        let template = engine.compile("{{ 'a' | shout }}", "t").unwrap();
        engine.register_filter("shout", shout);

        let err = template.render(&Bindings::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
        let recompiled = engine.compile("{{ 'a' | shout }}", "t").unwrap();
        assert_eq!(recompiled.render(&Bindings::new()).unwrap(), "A!");
    }

    #[test]
    fn test_empty_engine() {
        let engine = Engine::empty();
        assert!(engine.environment().tags().names().is_empty());
        let err = engine
            .parse_and_render("{% if x %}{% endif %}", &Bindings::new())
            .unwrap_err();
        // `endif` is unknown, so both tags parse as standalone and fail at render
        assert!(err.message().contains("undefined tag `if`"));
    }

    #[test]
    fn test_unnamed_template_path() {
        let err = Engine::new()
            .parse_and_render("{% if x %}", &Bindings::new())
            .unwrap_err();
        assert_eq!(err.path(), "<template>");
        assert_eq!(err.kind(), ErrorKind::DocumentParse);
    }

    #[test]
    fn test_template_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Template>();
        assert_send_sync::<Engine>();
    }
}
