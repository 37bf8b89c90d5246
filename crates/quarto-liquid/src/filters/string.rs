/*
 * filters/string.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! String filters. Inputs of any type are rendered to their output form
//! first, so `{{ 5 | append: "x" }}` gives `5x`.

use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;

use super::{FilterRegistry, arg, check_arity, int_arg, str_arg};
use crate::error::FilterError;
use crate::value::Value;

type FilterResult = Result<Value, FilterError>;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script.*?</script>|<style.*?</style>|<!--.*?-->|<[^>]*>")
        .expect("valid regex")
});

static HTML_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:[a-zA-Z][a-zA-Z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);").expect("valid regex")
});

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.register("append", append);
    registry.register("prepend", prepend);
    registry.register("capitalize", capitalize);
    registry.register("downcase", downcase);
    registry.register("upcase", upcase);
    registry.register("remove", remove);
    registry.register("remove_first", remove_first);
    registry.register("replace", replace);
    registry.register("replace_first", replace_first);
    registry.register("strip", strip);
    registry.register("lstrip", lstrip);
    registry.register("rstrip", rstrip);
    registry.register("strip_newlines", strip_newlines);
    registry.register("newline_to_br", newline_to_br);
    registry.register("strip_html", strip_html);
    registry.register("escape", escape);
    registry.register("escape_once", escape_once);
    registry.register("url_encode", url_encode);
    registry.register("url_decode", url_decode);
    registry.register("truncate", truncate);
    registry.register("truncatewords", truncatewords);
    registry.register("split", split);
    registry.register("slice", slice);
}

fn append(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    Ok(Value::String(input.to_output() + &arg(args, 0).to_output()))
}

fn prepend(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    Ok(Value::String(arg(args, 0).to_output() + &input.to_output()))
}

fn capitalize(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    let text = input.to_output();
    let mut chars = text.chars();
    let capitalized = match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().collect::<String>() + &rest
        }
        None => String::new(),
    };
    Ok(Value::String(capitalized))
}

fn downcase(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(Value::String(input.to_output().to_lowercase()))
}

fn upcase(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(Value::String(input.to_output().to_uppercase()))
}

fn remove(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let needle = arg(args, 0).to_output();
    Ok(Value::String(input.to_output().replace(&needle, "")))
}

fn remove_first(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let needle = arg(args, 0).to_output();
    Ok(Value::String(input.to_output().replacen(&needle, "", 1)))
}

fn replace(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 2)?;
    let needle = arg(args, 0).to_output();
    let replacement = arg(args, 1).to_output();
    Ok(Value::String(input.to_output().replace(&needle, &replacement)))
}

fn replace_first(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 2)?;
    let needle = arg(args, 0).to_output();
    let replacement = arg(args, 1).to_output();
    Ok(Value::String(
        input.to_output().replacen(&needle, &replacement, 1),
    ))
}

fn strip(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(Value::from(input.to_output().trim()))
}

fn lstrip(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(Value::from(input.to_output().trim_start()))
}

fn rstrip(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(Value::from(input.to_output().trim_end()))
}

fn strip_newlines(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    let text = input.to_output();
    Ok(Value::String(
        text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect(),
    ))
}

fn newline_to_br(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(Value::String(input.to_output().replace('\n', "<br />\n")))
}

fn strip_html(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    let text = input.to_output();
    Ok(Value::String(HTML_TAG.replace_all(&text, "").into_owned()))
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

fn escape(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    let mut out = String::new();
    escape_html(&input.to_output(), &mut out);
    Ok(Value::String(out))
}

/// Like `escape`, but leaves existing entities alone.
fn escape_once(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    let text = input.to_output();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for entity in HTML_ENTITY.find_iter(&text) {
        escape_html(&text[last..entity.start()], &mut out);
        out.push_str(entity.as_str());
        last = entity.end();
    }
    escape_html(&text[last..], &mut out);
    Ok(Value::String(out))
}

fn url_encode(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    let text = input.to_output();
    Ok(Value::String(
        form_urlencoded::byte_serialize(text.as_bytes()).collect(),
    ))
}

fn url_decode(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    // Decode as a lone form key: `&` and `=` must not split it.
    let text = input.to_output().replace('&', "%26").replace('=', "%3D");
    let decoded = form_urlencoded::parse(text.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default();
    Ok(Value::String(decoded))
}

fn truncate(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 2)?;
    let length = int_arg(args, 0)?.unwrap_or(50).max(0) as usize;
    let ellipsis = str_arg(args, 1).unwrap_or_else(|| "...".to_string());

    let text = input.to_output();
    if text.chars().count() <= length {
        return Ok(Value::String(text));
    }
    let keep = length.saturating_sub(ellipsis.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(&ellipsis);
    Ok(Value::String(truncated))
}

fn truncatewords(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 2)?;
    let count = int_arg(args, 0)?.unwrap_or(15).max(1) as usize;
    let ellipsis = str_arg(args, 1).unwrap_or_else(|| "...".to_string());

    let text = input.to_output();
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= count {
        return Ok(Value::String(text));
    }
    Ok(Value::String(words[..count].join(" ") + &ellipsis))
}

fn split(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let text = input.to_output();
    let separator = arg(args, 0).to_output();

    let mut parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Value::from).collect()
    };
    while parts.last().is_some_and(Value::is_empty) {
        parts.pop();
    }
    Ok(Value::List(parts))
}

/// `slice: start[, length]` on strings (by character) and lists.
fn slice(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 2)?;
    let start = int_arg(args, 0)?.ok_or_else(|| {
        FilterError::InvalidArgument("slice start must be a number".to_string())
    })?;
    let length = int_arg(args, 1)?.unwrap_or(1);

    match input {
        Value::List(items) => {
            let range = slice_range(items.len(), start, length);
            Ok(Value::List(items[range].to_vec()))
        }
        _ => {
            let chars: Vec<char> = input.to_output().chars().collect();
            let range = slice_range(chars.len(), start, length);
            Ok(Value::String(chars[range].iter().collect()))
        }
    }
}

fn slice_range(total: usize, start: i64, length: i64) -> std::ops::Range<usize> {
    let total = total as i64;
    let start = if start < 0 { total + start } else { start };
    if start < 0 || start >= total || length <= 0 {
        return 0..0;
    }
    let end = start.saturating_add(length).min(total);
    start as usize..end as usize
}
