/*
 * filters/list.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::cmp::Ordering;

use super::{FilterRegistry, arg, check_arity, str_arg};
use crate::error::FilterError;
use crate::value::Value;

type FilterResult = Result<Value, FilterError>;

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.register("join", join);
    registry.register("first", first);
    registry.register("last", last);
    registry.register("size", size);
    registry.register("reverse", reverse);
    registry.register("sort", sort);
    registry.register("sort_natural", sort_natural);
    registry.register("uniq", uniq);
    registry.register("compact", compact);
    registry.register("map", map);
    registry.register("where", where_);
    registry.register("concat", concat);
}

/// Treat the input as a list: nil is empty, scalars are a single element.
fn items(input: &Value) -> Vec<Value> {
    match input {
        Value::List(items) => items.clone(),
        Value::Nil => Vec::new(),
        other => vec![other.clone()],
    }
}

/// The sort key of an item: the item itself or one of its properties.
fn key(item: &Value, property: Option<&str>) -> Value {
    match property {
        Some(name) => item.property(name),
        None => item.clone(),
    }
}

fn join(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 1)?;
    let separator = str_arg(args, 0).unwrap_or_else(|| " ".to_string());
    match input {
        Value::List(items) => Ok(Value::String(
            items
                .iter()
                .map(Value::to_output)
                .collect::<Vec<_>>()
                .join(&separator),
        )),
        other => Ok(Value::String(other.to_output())),
    }
}

fn first(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(match input {
        Value::List(_) => input.property("first"),
        Value::String(s) => s.chars().next().map_or(Value::Nil, |c| c.to_string().into()),
        _ => Value::Nil,
    })
}

fn last(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(match input {
        Value::List(_) => input.property("last"),
        Value::String(s) => s.chars().last().map_or(Value::Nil, |c| c.to_string().into()),
        _ => Value::Nil,
    })
}

fn size(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    Ok(match input {
        Value::List(items) => Value::from(items.len()),
        Value::Map(map) => Value::from(map.len()),
        Value::String(s) => Value::from(s.chars().count()),
        _ => Value::Int(0),
    })
}

fn reverse(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    match input {
        Value::List(items) => Ok(Value::List(items.iter().rev().cloned().collect())),
        other => Ok(other.clone()),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::String(_) => 2,
        Value::List(_) => 3,
        Value::Map(_) => 4,
        Value::Object(_) => 5,
        Value::Nil => 6,
    }
}

/// A total order for sorting: values group by type, nil sorts last.
fn sort_order(a: &Value, b: &Value, natural: bool) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let x = a.as_number().map_or(0.0, |n| n.as_f64());
            let y = b.as_number().map_or(0.0, |n| n.as_f64());
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) if natural => {
            x.to_lowercase().cmp(&y.to_lowercase())
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn sorted(input: &Value, args: &[Value], natural: bool) -> FilterResult {
    check_arity(args, 0, 1)?;
    let property = str_arg(args, 0);
    let mut items = items(input);
    items.sort_by(|a, b| {
        sort_order(
            &key(a, property.as_deref()),
            &key(b, property.as_deref()),
            natural,
        )
    });
    Ok(Value::List(items))
}

fn sort(input: &Value, args: &[Value]) -> FilterResult {
    sorted(input, args, false)
}

fn sort_natural(input: &Value, args: &[Value]) -> FilterResult {
    sorted(input, args, true)
}

fn uniq(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 1)?;
    let property = str_arg(args, 0);
    let mut seen: Vec<Value> = Vec::new();
    let mut unique = Vec::new();
    for item in items(input) {
        let k = key(&item, property.as_deref());
        if !seen.contains(&k) {
            seen.push(k);
            unique.push(item);
        }
    }
    Ok(Value::List(unique))
}

fn compact(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 1)?;
    let property = str_arg(args, 0);
    Ok(Value::List(
        items(input)
            .into_iter()
            .filter(|item| !key(item, property.as_deref()).is_nil())
            .collect(),
    ))
}

fn map(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let property = arg(args, 0).to_output();
    Ok(Value::List(
        items(input)
            .iter()
            .map(|item| item.property(&property))
            .collect(),
    ))
}

/// `where: property[, value]`: keep items whose property equals `value`,
/// or is truthy when no value is given.
fn where_(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 2)?;
    let property = arg(args, 0).to_output();
    let expected = args.get(1);
    Ok(Value::List(
        items(input)
            .into_iter()
            .filter(|item| {
                let actual = item.property(&property);
                match expected {
                    Some(expected) => &actual == expected,
                    None => actual.is_truthy(),
                }
            })
            .collect(),
    ))
}

fn concat(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let Value::List(extra) = arg(args, 0) else {
        return Err(FilterError::InvalidArgument(format!(
            "concat expects a list, got {}",
            arg(args, 0).type_name()
        )));
    };
    let mut combined = items(input);
    combined.extend(extra.iter().cloned());
    Ok(Value::List(combined))
}
