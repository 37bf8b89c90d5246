/*
 * filters/misc.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};

use super::{FilterRegistry, arg, check_arity};
use crate::error::FilterError;
use crate::value::Value;

type FilterResult = Result<Value, FilterError>;

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.register("default", default);
    registry.register("date", date);
    registry.register("json", json);
}

/// The argument when the input is nil, false, or empty.
fn default(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    if !input.is_truthy() || input.is_empty() {
        Ok(arg(args, 0).clone())
    } else {
        Ok(input.clone())
    }
}

/// `date: format` with strftime syntax. Inputs that are not dates pass
/// through unchanged.
fn date(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 1, 1)?;
    let format = arg(args, 0).to_output();
    let Some(datetime) = parse_date(input) else {
        return Ok(input.clone());
    };

    let mut formatted = String::new();
    write!(formatted, "{}", datetime.format(&format))
        .map_err(|_| FilterError::InvalidArgument(format!("invalid date format `{}`", format)))?;
    Ok(Value::String(formatted))
}

fn from_timestamp(seconds: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(seconds, 0).map(|utc| utc.fixed_offset())
}

fn parse_date(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Int(seconds) => from_timestamp(*seconds),
        Value::Float(seconds) if seconds.is_finite() => from_timestamp(seconds.trunc() as i64),
        Value::String(text) => {
            let text = text.trim();
            if matches!(text, "now" | "today") {
                return Some(Local::now().fixed_offset());
            }
            DateTime::parse_from_rfc3339(text)
                .ok()
                .or_else(|| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z").ok())
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|naive| naive.and_utc().fixed_offset())
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|day| day.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc().fixed_offset())
                })
                .or_else(|| text.parse::<i64>().ok().and_then(from_timestamp))
        }
        _ => None,
    }
}

fn json(input: &Value, args: &[Value]) -> FilterResult {
    check_arity(args, 0, 0)?;
    serde_json::to_string(input)
        .map(Value::String)
        .map_err(|e| FilterError::Message(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_default() {
        assert_eq!(default(&Value::Nil, &[s("x")]).unwrap(), s("x"));
        assert_eq!(default(&Value::Bool(false), &[s("x")]).unwrap(), s("x"));
        assert_eq!(default(&s(""), &[s("x")]).unwrap(), s("x"));
        assert_eq!(default(&Value::Int(0), &[s("x")]).unwrap(), Value::Int(0));
        assert_eq!(default(&s("set"), &[s("x")]).unwrap(), s("set"));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(date(&s("2024-03-05"), &[s("%b %d, %Y")]).unwrap(), s("Mar 05, 2024"));
        assert_eq!(
            date(&s("2024-03-05T10:30:00+02:00"), &[s("%H:%M %z")]).unwrap(),
            s("10:30 +0200")
        );
        assert_eq!(date(&Value::Int(0), &[s("%Y-%m-%d")]).unwrap(), s("1970-01-01"));
        assert_eq!(date(&s("86400"), &[s("%d")]).unwrap(), s("02"));
        assert!(matches!(date(&s("now"), &[s("%Y")]).unwrap(), Value::String(_)));
    }

    #[test]
    fn test_date_passthrough_and_errors() {
        assert_eq!(date(&s("not a date"), &[s("%Y")]).unwrap(), s("not a date"));
        assert_eq!(date(&Value::Nil, &[s("%Y")]).unwrap(), Value::Nil);
        assert!(date(&s("2024-03-05"), &[s("%Q")]).is_err());
    }

    #[test]
    fn test_json() {
        let value = Value::from(serde_json::json!({"b": [1, "two"], "a": null}));
        assert_eq!(json(&value, &[]).unwrap(), s(r#"{"b":[1,"two"],"a":null}"#));
        assert_eq!(json(&s("x"), &[]).unwrap(), s(r#""x""#));
    }
}
