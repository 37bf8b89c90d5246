/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template segmentation.
//!
//! The lexer splits raw template text into literal text, `{{ output }}` and
//! `{% tag %}` segments. It does not look inside expressions; it only finds
//! delimiters (skipping over quoted strings), applies whitespace trim
//! markers, and passes `raw` and `comment` bodies through untouched.
//!
//! Trim markers sit next to the inner brace:
//!
//! - `-` strips all whitespace of the bordering text segment
//! - `~` strips spaces and tabs up to and including the first newline

use crate::error::{SourceError, TemplateResult};
use crate::source::LineIndex;

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentKind {
    Text(String),
    /// Expression text between `{{` and `}}`, trimmed.
    Output(String),
    /// Tag name and the remaining argument text, trimmed.
    Tag {
        name: String,
        args: String,
        /// Line of the first argument character, which can follow the
        /// tag name on a later line.
        args_line: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// 1-based line where the segment starts. For output this is the line
    /// of the expression text rather than of the `{{`.
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trim {
    None,
    Full,
    Light,
}

impl Trim {
    fn from_marker(byte: Option<u8>) -> Self {
        match byte {
            Some(b'-') => Trim::Full,
            Some(b'~') => Trim::Light,
            _ => Trim::None,
        }
    }
}

/// Intermediate form before trims are applied.
enum Piece {
    Text {
        text: String,
        line: usize,
        /// Body of a `raw` block; never trimmed.
        verbatim: bool,
    },
    Delimited {
        segment: Option<Segment>,
        trim_before: Trim,
        trim_after: Trim,
    },
}

/// A `{{ }}` or `{% %}` occurrence located in the source.
struct Delimiter<'s> {
    inner: &'s str,
    /// Offset of `inner` in the source.
    inner_start: usize,
    open: usize,
    /// Offset just past the closing delimiter.
    end: usize,
    trim_before: Trim,
    trim_after: Trim,
}

/// Split template text into segments.
pub fn lex(source: &str) -> TemplateResult<Vec<Segment>> {
    let index = LineIndex::new(source);
    let mut pieces = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let Some((open, is_output)) = find_opener(source, pos) else {
            push_text(&mut pieces, &source[pos..], pos, &index);
            break;
        };
        push_text(&mut pieces, &source[pos..open], pos, &index);

        let line = index.line_of(open);
        let delimiter = scan_delimiter(source, open, is_output, &index)?;
        pos = delimiter.end;

        if is_output {
            let leading = delimiter.inner.len() - delimiter.inner.trim_start().len();
            pieces.push(Piece::Delimited {
                segment: Some(Segment {
                    kind: SegmentKind::Output(delimiter.inner.trim().to_string()),
                    line: index.line_of(delimiter.inner_start + leading),
                }),
                trim_before: delimiter.trim_before,
                trim_after: delimiter.trim_after,
            });
            continue;
        }

        let (name, args, args_offset) = split_tag(delimiter.inner)
            .ok_or_else(|| SourceError::lex("expected a tag name after `{%`", line))?;

        match name {
            "raw" | "comment" => {
                let end_name = format!("end{}", name);
                let closing = find_end_tag(source, pos, &end_name, &index)?.ok_or_else(|| {
                    SourceError::lex(
                        format!(
                            "`{}` tag opened on line {} was never closed; expected `{{% {} %}}`",
                            name, line, end_name
                        ),
                        line,
                    )
                })?;
                pieces.push(Piece::Delimited {
                    segment: None,
                    trim_before: delimiter.trim_before,
                    trim_after: Trim::None,
                });
                if name == "raw" {
                    pieces.push(Piece::Text {
                        text: source[pos..closing.open].to_string(),
                        line: index.line_of(pos),
                        verbatim: true,
                    });
                }
                pieces.push(Piece::Delimited {
                    segment: None,
                    trim_before: Trim::None,
                    trim_after: closing.trim_after,
                });
                pos = closing.end;
            }
            // inline comment: {% # note %}
            "#" => pieces.push(Piece::Delimited {
                segment: None,
                trim_before: delimiter.trim_before,
                trim_after: delimiter.trim_after,
            }),
            _ => pieces.push(Piece::Delimited {
                segment: Some(Segment {
                    kind: SegmentKind::Tag {
                        name: name.to_string(),
                        args: args.to_string(),
                        args_line: index.line_of(delimiter.inner_start + args_offset),
                    },
                    line,
                }),
                trim_before: delimiter.trim_before,
                trim_after: delimiter.trim_after,
            }),
        }
    }

    apply_trims(&mut pieces);
    Ok(pieces
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Text { text, line, .. } if !text.is_empty() => Some(Segment {
                kind: SegmentKind::Text(text),
                line,
            }),
            Piece::Text { .. } => None,
            Piece::Delimited { segment, .. } => segment,
        })
        .collect())
}

fn push_text(pieces: &mut Vec<Piece>, text: &str, offset: usize, index: &LineIndex) {
    if !text.is_empty() {
        pieces.push(Piece::Text {
            text: text.to_string(),
            line: index.line_of(offset),
            verbatim: false,
        });
    }
}

/// Find the next `{{` or `{%` at or after `from`.
fn find_opener(source: &str, from: usize) -> Option<(usize, bool)> {
    let bytes = source.as_bytes();
    let mut pos = from;
    while let Some(rel) = source[pos..].find('{') {
        let at = pos + rel;
        match bytes.get(at + 1) {
            Some(b'{') => return Some((at, true)),
            Some(b'%') => return Some((at, false)),
            _ => pos = at + 1,
        }
    }
    None
}

/// Locate the closing delimiter of the `{{`/`{%` at `open`.
fn scan_delimiter<'s>(
    source: &'s str,
    open: usize,
    is_output: bool,
    index: &LineIndex,
) -> TemplateResult<Delimiter<'s>> {
    let bytes = source.as_bytes();
    let (closer, opener) = if is_output {
        (b"}}", "{{")
    } else {
        (b"%}", "{%")
    };

    let mut inner_start = open + 2;
    let trim_before = Trim::from_marker(bytes.get(inner_start).copied());
    if trim_before != Trim::None {
        inner_start += 1;
    }

    let close = find_closer(bytes, inner_start, closer).ok_or_else(|| {
        SourceError::lex(
            format!(
                "unterminated `{}`; expected `{}`",
                opener,
                String::from_utf8_lossy(closer)
            ),
            index.line_of(open),
        )
    })?;

    let mut inner_end = close;
    let trim_after = if close > inner_start {
        Trim::from_marker(bytes.get(close - 1).copied())
    } else {
        Trim::None
    };
    if trim_after != Trim::None {
        inner_end -= 1;
    }

    Ok(Delimiter {
        inner: &source[inner_start..inner_end],
        inner_start,
        open,
        end: close + 2,
        trim_before,
        trim_after,
    })
}

/// Position of `closer` at or after `from`, ignoring quoted strings.
fn find_closer(bytes: &[u8], from: usize, closer: &[u8; 2]) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut pos = from;
    while pos < bytes.len() {
        let c = bytes[pos];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == b'"' || c == b'\'' => quote = Some(c),
            None if c == closer[0] && bytes.get(pos + 1) == Some(&closer[1]) => {
                return Some(pos);
            }
            None => {}
        }
        pos += 1;
    }
    None
}

/// Split tag content into its name and argument text, along with the
/// byte offset of the arguments within `inner`.
fn split_tag(inner: &str) -> Option<(&str, &str, usize)> {
    let leading = inner.len() - inner.trim_start().len();
    let trimmed = inner.trim();
    let name_len = if trimmed.starts_with('#') {
        1
    } else {
        trimmed
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len())
    };
    if name_len == 0 {
        return None;
    }
    let rest = &trimmed[name_len..];
    let args_offset = leading + name_len + (rest.len() - rest.trim_start().len());
    Some((&trimmed[..name_len], rest.trim(), args_offset))
}

/// Position of the next `%}` at or after `from`. Quotes are not special,
/// so text inside `raw` and `comment` bodies cannot hide a closer.
fn find_plain_closer(source: &str, from: usize) -> Option<usize> {
    source.get(from..)?.find("%}").map(|rel| from + rel)
}

/// Find `{% end_name %}` starting at `from`, without interpreting anything
/// in between.
fn find_end_tag<'s>(
    source: &'s str,
    from: usize,
    end_name: &str,
    index: &LineIndex,
) -> TemplateResult<Option<Delimiter<'s>>> {
    let mut pos = from;
    while let Some((open, is_output)) = find_opener(source, pos) {
        if is_output {
            pos = open + 2;
            continue;
        }
        // an unterminated `{%` inside the body is just text
        let Some(close) = find_plain_closer(source, open + 2) else {
            return Ok(None);
        };
        let content = source[open + 2..close].trim_matches(|c: char| c == '-' || c == '~');
        if content.trim() == end_name {
            return scan_delimiter(source, open, false, index).map(Some);
        }
        pos = close + 2;
    }
    Ok(None)
}

fn apply_trims(pieces: &mut [Piece]) {
    for i in 0..pieces.len() {
        let (trim_before, trim_after) = match &pieces[i] {
            Piece::Delimited {
                trim_before,
                trim_after,
                ..
            } => (*trim_before, *trim_after),
            Piece::Text { .. } => continue,
        };
        if i > 0 {
            if let Piece::Text {
                text,
                verbatim: false,
                ..
            } = &mut pieces[i - 1]
            {
                trim_end(text, trim_before);
            }
        }
        if let Some(Piece::Text {
            text,
            verbatim: false,
            ..
        }) = pieces.get_mut(i + 1)
        {
            trim_start(text, trim_after);
        }
    }
}

fn trim_end(text: &mut String, trim: Trim) {
    let keep = match trim {
        Trim::None => return,
        Trim::Full => text.trim_end().len(),
        Trim::Light => {
            let rest = text.trim_end_matches([' ', '\t']);
            let rest = rest
                .strip_suffix('\n')
                .map_or(rest, |r| r.strip_suffix('\r').unwrap_or(r));
            rest.len()
        }
    };
    text.truncate(keep);
}

fn trim_start(text: &mut String, trim: Trim) {
    let skip = match trim {
        Trim::None => return,
        Trim::Full => text.len() - text.trim_start().len(),
        Trim::Light => {
            let rest = text.trim_start_matches([' ', '\t']);
            let rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest);
            text.len() - rest.len()
        }
    };
    text.drain(..skip);
}
