//! Untyped JSON view of the attribute-value model.
//!
//! Lossy by nature: timestamps become RFC 3339 strings and come back as
//! string scalars, which the scalar coercion reads in lenient mode.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::error::ConversionError;
use crate::value::{Document, Entry, EntryKind, Scalar};

impl Scalar {
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::UInt(u) => Value::from(*u),
            // Non-finite floats have no JSON form.
            Scalar::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Timestamp(micros) => match DateTime::<Utc>::from_timestamp_micros(*micros) {
                Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                None => Value::from(*micros),
            },
        }
    }
}

impl Entry {
    pub fn to_json(&self) -> Value {
        match self {
            Entry::Scalar(s) => s.to_json(),
            Entry::List(items) => Value::Array(items.iter().map(Entry::to_json).collect()),
            Entry::Document(doc) => doc.to_json(),
        }
    }

    pub fn from_json(value: Value) -> Entry {
        match value {
            Value::Null => Entry::NULL,
            Value::Bool(b) => Entry::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Entry::Scalar(number(&n)),
            Value::String(s) => Entry::Scalar(Scalar::String(s)),
            Value::Array(items) => Entry::List(items.into_iter().map(Entry::from_json).collect()),
            Value::Object(map) => Entry::Document(object(map)),
        }
    }
}

impl Document {
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        Value::Object(map)
    }

    /// Only a JSON object is a document.
    pub fn from_json(value: Value) -> Result<Document, ConversionError> {
        match value {
            Value::Object(map) => Ok(object(map)),
            other => Err(ConversionError::unexpected(
                "Document",
                EntryKind::Document,
                Entry::from_json(other).kind(),
            )),
        }
    }
}

fn number(n: &Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i)
    } else if let Some(u) = n.as_u64() {
        Scalar::UInt(u)
    } else {
        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn object(map: Map<String, Value>) -> Document {
    map.into_iter().map(|(k, v)| (k, Entry::from_json(v))).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_prefer_signed_integers() {
        let doc = Document::from_json(json!({ "a": 1, "b": u64::MAX, "c": 1.5 })).unwrap();
        assert_eq!(doc.get("a"), Some(&Entry::Scalar(Scalar::Int(1))));
        assert_eq!(doc.get("b"), Some(&Entry::Scalar(Scalar::UInt(u64::MAX))));
        assert_eq!(doc.get("c"), Some(&Entry::Scalar(Scalar::Float(1.5))));
    }

    #[test]
    fn nested_values_survive_a_json_trip() {
        let doc = Document::new()
            .with("name", "x")
            .with("tags", Entry::List(vec!["a".into(), "b".into()]))
            .with("inner", Document::new().with("n", 2i64));
        assert_eq!(Document::from_json(doc.to_json()).unwrap(), doc);
    }

    #[test]
    fn timestamps_render_as_rfc3339() {
        let json = Scalar::Timestamp(1_700_000_000_000_000).to_json();
        assert_eq!(json, json!("2023-11-14T22:13:20Z"));
    }

    #[test]
    fn non_objects_are_not_documents() {
        let err = Document::from_json(json!([1, 2])).unwrap_err();
        assert_eq!(err.found, Some(EntryKind::List));
    }
}
