/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine options.

use serde::{Deserialize, Serialize};

/// Options controlling compilation and rendering.
///
/// Deserializable so hosts can read them from their own configuration;
/// missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Referencing an undefined variable is an error instead of nil.
    pub strict_variables: bool,

    /// Applying an unregistered filter is an error. When off, the filter is
    /// skipped and its input passes through unchanged.
    pub strict_filters: bool,

    /// Maximum nesting depth of `include` (prevents infinite recursion).
    pub max_include_depth: usize,

    /// Longest range literal that may be materialized.
    pub max_range_length: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strict_variables: false,
            strict_filters: true,
            max_include_depth: 50,
            max_range_length: 1_000_000,
        }
    }
}

impl EngineOptions {
    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }

    pub fn with_strict_filters(mut self, strict: bool) -> Self {
        self.strict_filters = strict;
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn with_max_range_length(mut self, length: usize) -> Self {
        self.max_range_length = length;
        self
    }
}
