//! Flattening structured values into query-string and form pairs.
//!
//! # Design
//! Anything that goes into a query string or a form body implements
//! `EncodePairs`: an ordered list of `(key, value)` strings. Plain pair lists
//! and maps implement it directly; `Fields` adapts any serde record whose
//! fields are scalars or lists of scalars.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use url::{form_urlencoded, Url};

/// Errors raised while flattening a value into pairs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairsError {
    #[error("value could not be serialized: {0}")]
    Serialize(String),

    /// Only records (structs or maps) flatten into key/value pairs.
    #[error("expected a record, got {0}")]
    NotARecord(&'static str),

    #[error("field {key:?} holds a nested value")]
    Nested { key: String },
}

/// A value that can be flattened into ordered `(key, value)` pairs.
pub trait EncodePairs {
    fn encode_pairs(&self) -> Result<Vec<(String, String)>, PairsError>;
}

impl<K: AsRef<str>, V: AsRef<str>> EncodePairs for [(K, V)] {
    fn encode_pairs(&self) -> Result<Vec<(String, String)>, PairsError> {
        Ok(self
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect())
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> EncodePairs for [(K, V); N] {
    fn encode_pairs(&self) -> Result<Vec<(String, String)>, PairsError> {
        self.as_slice().encode_pairs()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> EncodePairs for Vec<(K, V)> {
    fn encode_pairs(&self) -> Result<Vec<(String, String)>, PairsError> {
        self.as_slice().encode_pairs()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> EncodePairs for BTreeMap<K, V> {
    fn encode_pairs(&self) -> Result<Vec<(String, String)>, PairsError> {
        Ok(self
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect())
    }
}

/// `None` contributes no pairs.
impl<T: EncodePairs> EncodePairs for Option<T> {
    fn encode_pairs(&self) -> Result<Vec<(String, String)>, PairsError> {
        match self {
            Some(inner) => inner.encode_pairs(),
            None => Ok(Vec::new()),
        }
    }
}

/// Flattens a serde record into pairs.
///
/// `None` fields are skipped, sequences become repeated keys, and nested
/// records are rejected. Pairs come out in key order.
#[derive(Debug, Clone)]
pub struct Fields<T>(pub T);

impl<T: Serialize> EncodePairs for Fields<T> {
    fn encode_pairs(&self) -> Result<Vec<(String, String)>, PairsError> {
        let value =
            serde_json::to_value(&self.0).map_err(|e| PairsError::Serialize(e.to_string()))?;
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Vec::new()),
            other => return Err(PairsError::NotARecord(kind(&other))),
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        match scalar(item) {
                            Some(Some(s)) => pairs.push((key.clone(), s)),
                            Some(None) => {}
                            None => return Err(PairsError::Nested { key }),
                        }
                    }
                }
                other => match scalar(other) {
                    Some(Some(s)) => pairs.push((key, s)),
                    Some(None) => {}
                    None => return Err(PairsError::Nested { key }),
                },
            }
        }
        Ok(pairs)
    }
}

/// `Some(None)` for null, `None` for anything that is not a scalar.
fn scalar(value: Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s)),
        Value::Bool(b) => Some(Some(b.to_string())),
        Value::Number(n) => Some(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a record",
    }
}

/// Encode pairs as an `application/x-www-form-urlencoded` string.
pub fn encode(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Merge `values` into the query string of `url`.
///
/// Existing pairs are kept as-is, keys from `values` are lower-cased, and the
/// result is stably sorted by key so repeated keys keep insertion order.
pub fn merge_into<'a, I, Q>(url: &mut Url, values: I) -> Result<(), PairsError>
where
    I: IntoIterator<Item = &'a Q>,
    Q: EncodePairs + ?Sized + 'a,
{
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for value in values {
        for (key, v) in value.encode_pairs()? {
            pairs.push((key.to_lowercase(), v));
        }
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&encode(&pairs)));
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn pairs() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("[a-zA-Z]{1,4}", "[a-z0-9 ]{0,6}"), 0..6)
    }

    proptest! {
        /// Structured keys always land lower-cased in the query string.
        #[test]
        fn merged_keys_are_lowercase(a in pairs(), b in pairs()) {
            let mut url = Url::parse("https://api.example.com/x").unwrap();
            let values: [&(dyn EncodePairs + Send + Sync); 2] = [&a, &b];
            merge_into(&mut url, values).unwrap();
            for (key, _) in url.query_pairs() {
                prop_assert_eq!(key.to_lowercase(), key.to_string());
            }
        }

        /// Same inputs always produce the same URL, sorted by key.
        #[test]
        fn merge_is_deterministic(a in pairs(), b in pairs()) {
            let run = || {
                let mut url = Url::parse("https://api.example.com/x?m=1").unwrap();
                let values: [&(dyn EncodePairs + Send + Sync); 2] = [&a, &b];
                merge_into(&mut url, values).unwrap();
                url
            };
            let first = run();
            let second = run();
            prop_assert_eq!(first.as_str(), second.as_str());

            let keys: Vec<String> = first.query_pairs().map(|(k, _)| k.into_owned()).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);
        }
    }
}
