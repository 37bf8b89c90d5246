/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template loading for `include`.
//!
//! Templates never touch the file system themselves; the host injects a
//! [`TemplateLoader`] into the engine and `include` goes through it.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::LoaderError;

/// Loads template source by name.
pub trait TemplateLoader: Send + Sync {
    /// Load the template called `name`.
    ///
    /// `from` is the path of the template that contains the `include`.
    fn load(&self, name: &str, from: &str) -> Result<String, LoaderError>;
}

/// Loader backed by an in-memory map.
///
/// Useful for testing and for templates bundled into the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template under `name`.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    /// Create a loader with the given templates.
    pub fn with_templates(
        templates: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (name, source) in templates {
            loader.add(name, source);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, name: &str, _from: &str) -> Result<String, LoaderError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Loader that reads templates below a root directory.
///
/// Names without an extension get `.liquid` appended:
///
/// ```ignore
/// // root: /site/_includes, name: "header"      → /site/_includes/header.liquid
/// // root: /site/_includes, name: "nav.html"    → /site/_includes/nav.html
/// // root: /site/_includes, name: "blog/card"   → /site/_includes/blog/card.liquid
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
    extension: String,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "liquid".to_string(),
        }
    }

    /// Use a different default extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a template name to a file path. Absolute names and names that
    /// climb out of the root with `..` are rejected.
    pub fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return None;
        }

        let path = self.root.join(relative);
        if relative.extension().is_some() || self.extension.is_empty() {
            Some(path)
        } else {
            Some(path.with_extension(&self.extension))
        }
    }
}

impl TemplateLoader for DirectoryLoader {
    fn load(&self, name: &str, _from: &str) -> Result<String, LoaderError> {
        let not_found = || LoaderError::NotFound {
            name: name.to_string(),
        };
        let path = self.resolve_path(name).ok_or_else(not_found)?;
        tracing::trace!(name = %name, path = %path.display(), "loading template");
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => not_found(),
            _ => LoaderError::Io(e),
        })
    }
}
