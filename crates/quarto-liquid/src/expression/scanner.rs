/*
 * expression/scanner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokenizer for expression text.

use crate::error::{SourceError, TemplateResult};
use crate::source::line_within;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Names and keywords (`and`, `or`, `contains`, `true`, `in`, ...)
    Ident(String),
    String(String),
    Int(i64),
    Float(f64),
    Dot,
    DotDot,
    Comma,
    Colon,
    Pipe,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("`{}`", name),
            Token::String(s) => format!("string {:?}", s),
            Token::Int(i) => format!("number {}", i),
            Token::Float(x) => format!("number {}", x),
            Token::Dot => "`.`".to_string(),
            Token::DotDot => "`..`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Colon => "`:`".to_string(),
            Token::Pipe => "`|`".to_string(),
            Token::Assign => "`=`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::LBracket => "`[`".to_string(),
            Token::RBracket => "`]`".to_string(),
            Token::Eq => "`==`".to_string(),
            Token::Ne => "`!=`".to_string(),
            Token::Lt => "`<`".to_string(),
            Token::Le => "`<=`".to_string(),
            Token::Gt => "`>`".to_string(),
            Token::Ge => "`>=`".to_string(),
        }
    }
}

/// A token with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

/// Split expression text into tokens.
///
/// `line` is the line on which `text` starts; tokens record the line they
/// start on so errors inside multi-line tags can be located.
pub fn tokenize(text: &str, line: usize) -> TemplateResult<Vec<Spanned>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let token_line = line_within(text, start, line);
        let token = match c {
            b'"' | b'\'' => {
                let close = text[pos + 1..].find(c as char).ok_or_else(|| {
                    SourceError::expression("unterminated string literal", token_line)
                })?;
                let value = text[pos + 1..pos + 1 + close].to_string();
                pos += close + 2;
                Token::String(value)
            }
            b'0'..=b'9' => scan_number(text, &mut pos, token_line)?,
            b'-' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                scan_number(text, &mut pos, token_line)?
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                pos += 1;
                while pos < bytes.len() && is_ident_continue(bytes, pos) {
                    pos += 1;
                }
                if bytes.get(pos) == Some(&b'?') {
                    pos += 1;
                }
                Token::Ident(text[start..pos].to_string())
            }
            _ => {
                let (token, len) = scan_symbol(&bytes[pos..]).ok_or_else(|| {
                    let ch = text[pos..].chars().next().unwrap_or('?');
                    SourceError::expression(format!("unexpected character `{}`", ch), token_line)
                })?;
                pos += len;
                token
            }
        };

        tokens.push(Spanned {
            token,
            line: token_line,
        });
    }

    Ok(tokens)
}

fn is_ident_continue(bytes: &[u8], pos: usize) -> bool {
    let c = bytes[pos];
    if c.is_ascii_alphanumeric() || c == b'_' {
        return true;
    }
    // hyphens are allowed inside names (`my-var`) but not trailing
    c == b'-'
        && bytes
            .get(pos + 1)
            .is_some_and(|next| next.is_ascii_alphanumeric() || *next == b'_')
}

fn scan_number(text: &str, pos: &mut usize, line: usize) -> TemplateResult<Token> {
    let bytes = text.as_bytes();
    let start = *pos;
    if bytes[*pos] == b'-' {
        *pos += 1;
    }
    while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
        *pos += 1;
    }

    // `1.5` is a float; `1..5` is a range of integers
    let is_float = bytes.get(*pos) == Some(&b'.')
        && bytes.get(*pos + 1).is_some_and(u8::is_ascii_digit);
    if is_float {
        *pos += 1;
        while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
            *pos += 1;
        }
    }

    if bytes
        .get(*pos)
        .is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_')
    {
        let end = text[*pos..]
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .map_or(text.len(), |i| *pos + i);
        return Err(SourceError::expression(
            format!("invalid number literal `{}`", &text[start..end]),
            line,
        ));
    }

    let literal = &text[start..*pos];
    if is_float {
        literal
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| SourceError::expression(format!("invalid number `{}`", literal), line))
    } else {
        literal.parse::<i64>().map(Token::Int).map_err(|_| {
            SourceError::expression(format!("integer `{}` is out of range", literal), line)
        })
    }
}

fn scan_symbol(rest: &[u8]) -> Option<(Token, usize)> {
    let two = rest.get(..2);
    let token = match two {
        Some(b"..") => (Token::DotDot, 2),
        Some(b"==") => (Token::Eq, 2),
        Some(b"!=") | Some(b"<>") => (Token::Ne, 2),
        Some(b"<=") => (Token::Le, 2),
        Some(b">=") => (Token::Ge, 2),
        _ => match rest[0] {
            b'.' => (Token::Dot, 1),
            b',' => (Token::Comma, 1),
            b':' => (Token::Colon, 1),
            b'|' => (Token::Pipe, 1),
            b'=' => (Token::Assign, 1),
            b'(' => (Token::LParen, 1),
            b')' => (Token::RParen, 1),
            b'[' => (Token::LBracket, 1),
            b']' => (Token::RBracket, 1),
            b'<' => (Token::Lt, 1),
            b'>' => (Token::Gt, 1),
            _ => return None,
        },
    };
    Some(token)
}
