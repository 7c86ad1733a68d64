//! Display text for evaluation outputs.
//!
//! Scalars print as literals, strings are JSON-quoted, and anything
//! structured is serialized as compact JSON. A value JSON cannot express
//! (a function, or a map keyed by nil or by a collection) degrades to
//! [`UNSERIALIZABLE`] instead of failing the render.

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use evaltrace_core::Value;

use crate::store::EvalRecord;

/// Label for a node that did not run during this evaluation.
pub const NOT_EVALUATED: &str = "[not evaluated]";
/// Label for an optional sub-expression the source left out.
pub const NOT_SPECIFIED: &str = "[not specified]";
/// Leaf standing in for element branches cut by `max_elements`.
pub const ELIDED: &str = "[...]";
/// Placeholder for text that is not shown (closure bodies, truncated values).
pub const ELLIPSIS: &str = "...";
/// Placeholder for a value that could not be serialized.
pub const UNSERIALIZABLE: &str = "?";

/// Formats a single value.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => format_float(*x),
        Value::String(_) | Value::Array(_) | Value::Map(_) | Value::Func(_) => {
            serde_json::to_string(&JsonView(value)).unwrap_or_else(|e| {
                tracing::trace!("value display fell back to placeholder: {}", e);
                UNSERIALIZABLE.to_string()
            })
        }
    }
}

/// Formats the output carried by a record.
pub fn format_record(record: &EvalRecord) -> String {
    match record {
        EvalRecord::Collection { elements } => {
            serde_json::to_string(&JsonSeq(elements)).unwrap_or_else(|_| UNSERIALIZABLE.to_string())
        }
        other => format_value(&other.output()),
    }
}

/// Formats an optional record; a missing one is [`NOT_EVALUATED`].
pub fn format_output(record: Option<&EvalRecord>) -> String {
    record.map_or_else(|| NOT_EVALUATED.to_string(), format_record)
}

/// Cuts `text` to `width` characters, marking the cut with [`ELLIPSIS`].
pub fn truncate(text: String, width: Option<usize>) -> String {
    match width {
        Some(width) if text.chars().count() > width => {
            let mut cut: String = text.chars().take(width).collect();
            cut.push_str(ELLIPSIS);
            cut
        }
        _ => text,
    }
}

fn format_float(x: f64) -> String {
    if x.is_finite() {
        serde_json::to_string(&x).unwrap_or_else(|_| x.to_string())
    } else {
        x.to_string()
    }
}

// ---------------------------------------------------------------------------
// JSON view of values
// ---------------------------------------------------------------------------

/// Serializes a [`Value`] as plain JSON rather than its tagged dump form.
struct JsonView<'a>(&'a Value);

struct JsonSeq<'a>(&'a [Value]);

impl Serialize for JsonView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => JsonSeq(items).serialize(serializer),
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(&JsonView(k), &JsonView(v))?;
                }
                map.end()
            }
            Value::Func(name) => Err(S::Error::custom(format!(
                "function value `{}` has no JSON form",
                name
            ))),
        }
    }
}

impl Serialize for JsonSeq<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for item in self.0 {
            seq.serialize_element(&JsonView(item))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_print_as_literals() {
        assert_eq!(format_value(&Value::Nil), "nil");
        assert_eq!(format_value(&Value::Bool(false)), "false");
        assert_eq!(format_value(&Value::Int(-7)), "-7");
        assert_eq!(format_value(&Value::Float(2.5)), "2.5");
        assert_eq!(format_value(&Value::Float(3.0)), "3.0");
        assert_eq!(format_value(&Value::Float(f64::NAN)), "NaN");
    }

    #[test]
    fn strings_are_quoted_and_escaped() {
        assert_eq!(format_value(&Value::from("adult")), r#""adult""#);
        assert_eq!(format_value(&Value::from("a\"b\n")), r#""a\"b\n""#);
    }

    #[test]
    fn structures_serialize_as_json() {
        let v = Value::Array(vec![Value::Int(1), Value::Nil, Value::from("x")]);
        assert_eq!(format_value(&v), r#"[1,null,"x"]"#);

        let m = Value::map([("status", Value::Int(200)), ("ok", Value::Bool(true))]);
        assert_eq!(format_value(&m), r#"{"status":200,"ok":true}"#);
    }

    #[test]
    fn unserializable_values_degrade_to_placeholder() {
        assert_eq!(format_value(&Value::Func("len".into())), "?");

        let nested = Value::Array(vec![Value::Func("f".into())]);
        assert_eq!(format_value(&nested), "?");

        let bad_key = Value::Map(vec![(Value::Array(vec![]), Value::Int(1))]);
        assert_eq!(format_value(&bad_key), "?");

        let nil_key = Value::Map(vec![(Value::Nil, Value::Int(1))]);
        assert_eq!(format_value(&nil_key), "?");
    }

    #[test]
    fn integer_map_keys_become_strings() {
        let m = Value::Map(vec![(Value::Int(1), Value::from("one"))]);
        assert_eq!(format_value(&m), r#"{"1":"one"}"#);
    }

    #[test]
    fn records_format_their_payload() {
        assert_eq!(
            format_record(&EvalRecord::collection(vec![Value::Int(2), Value::Int(3)])),
            "[2,3]"
        );
        assert_eq!(format_record(&EvalRecord::call(true, 4)), "true");
        assert_eq!(format_output(None), NOT_EVALUATED);
        assert_eq!(format_output(Some(&EvalRecord::scalar(3))), "3");
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("abcdef".into(), Some(3)), "abc...");
        assert_eq!(truncate("abc".into(), Some(3)), "abc");
        assert_eq!(truncate("abcdef".into(), None), "abcdef");
        assert_eq!(truncate("ééé".into(), Some(2)), "éé...");
    }
}
