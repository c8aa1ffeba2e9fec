//! Query string construction and parsing.
//!
//! The encoding matches the form query construction signing servers use to
//! rebuild the canonical string: every byte outside `[A-Za-z0-9-_.]` is
//! percent encoded with uppercase hex and space becomes `+`.

use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// AsciiSet for form query values.
///
/// - Unreserved: `A-Z`, `a-z`, `0-9`, `-`, `_`, `.`
/// - Everything else is encoded, space is replaced by `+` afterwards.
pub static FORM_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Encode a single key or value.
pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, &FORM_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// Build a query string from ordered pairs.
///
/// Nested objects and arrays flatten into `key[sub]=v` and `key[0]=v`,
/// booleans become `1` and `0`, `null` and empty containers are dropped.
pub fn build_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut out = Vec::new();
    for (k, v) in pairs {
        flatten(k.to_string(), v, &mut out);
    }

    let mut s = String::with_capacity(out.iter().map(|(k, v)| k.len() + v.len() + 2).sum());
    for (idx, (k, v)) in out.iter().enumerate() {
        if idx != 0 {
            s.push('&');
        }
        s.push_str(&encode(k));
        s.push('=');
        s.push_str(&encode(v));
    }
    s
}

/// Build a query string from flat string pairs.
pub fn build_flat_query(pairs: &[(String, String)]) -> String {
    let values: Vec<(&str, Value)> = pairs
        .iter()
        .map(|(k, v)| (k.as_str(), Value::String(v.clone())))
        .collect();
    build_query(values.iter().map(|(k, v)| (*k, v)))
}

/// Parse a form encoded string into ordered pairs.
pub fn parse_query(s: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(s.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Rebuild nested values from flat bracketed pairs.
///
/// This is the inverse of [`build_query`] flattening, following form
/// decoding as signing servers do it:
///
/// - `a[x][y]=1` becomes `{"a": {"x": {"y": "1"}}}`
/// - `a[]=1&a[]=2` appends under the next integer key: `{"a": {"0": "1", "1": "2"}}`
/// - a repeated key keeps its first position and takes the last value
/// - ` ` and `.` in the top level name become `_`, and so does an
///   unmatched `[`
///
/// Nested entries keep their input order; only callers decide whether to
/// sort the top level.
pub fn decode_nested<I>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut out = Map::new();
    for (key, value) in pairs {
        let (name, path) = split_key(&key);
        if name.is_empty() {
            continue;
        }
        insert_path(&mut out, &name, &path, Value::String(value));
    }
    out
}

fn split_key(key: &str) -> (String, Vec<String>) {
    let key = key.trim_start_matches(' ');
    let mangle = |s: &str| s.replace([' ', '.'], "_");

    let Some(open) = key.find('[') else {
        return (mangle(key), Vec::new());
    };
    if !key[open..].contains(']') {
        return (format!("{}_{}", mangle(&key[..open]), &key[open + 1..]), Vec::new());
    }

    let name = mangle(&key[..open]);
    let mut path = Vec::new();
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        path.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    (name, path)
}

fn insert_path(map: &mut Map<String, Value>, key: &str, path: &[String], value: Value) {
    let key = if key.is_empty() {
        next_index(map).to_string()
    } else {
        key.to_string()
    };

    match path.split_first() {
        None => {
            map.insert(key, value);
        }
        Some((next, rest)) => {
            let child = map
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, next, rest, value);
            }
        }
    }
}

fn next_index(map: &Map<String, Value>) -> u64 {
    map.keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(0, |i| i + 1)
}

/// Flatten a JSON payload into flat query pairs.
///
/// `null` yields nothing. Any other non-object top level value can't be
/// expressed as key value pairs and is rejected.
pub fn payload_to_pairs(payload: &Value) -> Result<Vec<(String, String)>> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => {
            let mut out = Vec::new();
            for (k, v) in map {
                flatten(k.clone(), v, &mut out);
            }
            Ok(out)
        }
        Value::Array(items) if items.is_empty() => Ok(Vec::new()),
        v => Err(Error::api(
            crate::error::NO_RESPONSE,
            format!("payload must be an object, got {v}"),
        )),
    }
}

fn flatten(key: String, v: &Value, out: &mut Vec<(String, String)>) {
    match v {
        Value::Null => {}
        Value::Bool(b) => out.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::String(s) => out.push((key, s.clone())),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                flatten(format!("{key}[{idx}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (k, item) in map {
                flatten(format!("{key}[{k}]"), item, out);
            }
        }
    }
}
