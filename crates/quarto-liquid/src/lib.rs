/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Liquid-compatible template engine for Quarto.
//!
//! Templates mix literal text with two kinds of delimited regions:
//!
//! - Output: `{{ page.title | upcase }}`
//! - Tags: `{% if user %}...{% elsif guest %}...{% else %}...{% endif %}`
//! - Loops: `{% for item in items limit: 3 %}...{% else %}...{% endfor %}`
//! - Variables: `{% assign x = 1 %}`, `{% capture x %}...{% endcapture %}`
//! - Includes: `{% include 'header' with page %}`
//! - Whitespace control: `{{- x -}}`, `{%- if x -%}`
//! - Verbatim text: `{% raw %}{{ not rendered }}{% endraw %}`
//!
//! # Architecture
//!
//! Compilation runs the [lexer], the [expression] parser and the
//! document [parser] once, producing an immutable [`Template`]. Rendering
//! walks the tree with a fresh [`RenderContext`] per call, so one
//! template can be rendered concurrently from many threads.
//!
//! Tags and filters are looked up in registries owned by the [`Engine`].
//! The standard set is registered by [`Engine::new`]; hosts add their own
//! with [`Engine::register_tag`], [`Engine::register_block`] and
//! [`Engine::register_filter`].
//!
//! # Example
//!
//! ```ignore
//! use quarto_liquid::{Bindings, Engine};
//!
//! let engine = Engine::new();
//! let template = engine.compile("Hello, {{ name | capitalize }}!", "hello.liquid")?;
//!
//! let mut bindings = Bindings::new();
//! bindings.insert("name", "world");
//! assert_eq!(template.render(&bindings)?, "Hello, World!");
//! ```

pub mod ast;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod filters;
pub mod lexer;
pub mod loader;
pub mod options;
pub mod parser;
pub mod render;
mod report;
pub mod source;
pub mod tags;
pub mod value;

// Re-export main types at crate root
pub use context::{Bindings, LoopState, Scope};
pub use engine::{Engine, Environment};
pub use error::{
    ErrorKind, FilterError, LoaderError, SourceError, TemplateResult, is_template_error,
};
pub use filters::{Filter, FilterRegistry};
pub use loader::{DirectoryLoader, MemoryLoader, TemplateLoader};
pub use options::EngineOptions;
pub use parser::Template;
pub use render::{Interrupt, RenderContext};
pub use tags::{ArgSyntax, BlockShape, TagDefinition, TagRegistry, TagRenderer};
pub use value::{HostObject, Map, Number, Value};
