/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Byte offset to line number conversion.

use std::ops::Range;

/// Index of the line breaks in a template source.
///
/// Built once per compile so that every segment can be attributed to a
/// 1-based line with a binary search instead of rescanning the text.
#[derive(Debug, Clone, PartialEq)]
pub struct LineIndex {
    /// Byte offsets of each newline character
    line_breaks: Vec<usize>,
    total_length: usize,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let line_breaks = content
            .char_indices()
            .filter_map(|(idx, ch)| (ch == '\n').then_some(idx))
            .collect();

        LineIndex {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// The 1-based line containing `offset`.
    ///
    /// A newline belongs to the line it terminates. Offsets past the end of
    /// the content are clamped to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.total_length);
        let row = match self.line_breaks.binary_search(&offset) {
            Ok(idx) | Err(idx) => idx,
        };
        row + 1
    }

    /// Byte range of a 1-based line, excluding its terminating newline.
    pub fn line_span(&self, line: usize) -> Option<Range<usize>> {
        if line == 0 || line > self.line_count() {
            return None;
        }
        let row = line - 1;
        let start = if row == 0 {
            0
        } else {
            self.line_breaks[row - 1] + 1
        };
        let end = self
            .line_breaks
            .get(row)
            .copied()
            .unwrap_or(self.total_length);
        Some(start..end)
    }

    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}

/// Line of `offset` within `text`, given that `text` starts on `base_line`.
pub(crate) fn line_within(text: &str, offset: usize, base_line: usize) -> usize {
    let end = offset.min(text.len());
    base_line + text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count()
}
