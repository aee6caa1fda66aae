//! Manifest parsing
//!
//! Manifests are written in YAML or JSON (JSON being a subset of YAML). They
//! are parsed with yaml-rust2 into a `serde_json::Value` and then decoded
//! through the target type's own decode contract, so armed decode faults
//! behave the same whether an object arrives as a manifest or over the wire.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::crd::decode_value;
use crate::{Error, Result};

/// Parse the first document of a manifest into a JSON value
///
/// Returns `Value::Null` for empty input.
pub fn parse_manifest(input: &str) -> Result<Value> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| Error::yaml(e.to_string()))?;
    match docs.into_iter().next() {
        Some(doc) => to_json(doc),
        None => Ok(Value::Null),
    }
}

/// Parse every `---`-separated document of a manifest
///
/// Empty documents are skipped.
pub fn parse_manifests(input: &str) -> Result<Vec<Value>> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| Error::yaml(e.to_string()))?;
    docs.into_iter()
        .filter(|doc| !matches!(doc, Yaml::Null))
        .map(to_json)
        .collect()
}

/// Parse a manifest and decode it as `kind`
pub fn from_manifest<T: DeserializeOwned>(kind: &str, input: &str) -> Result<T> {
    let value = parse_manifest(input)?;
    if value.is_null() {
        return Err(Error::decode(kind, "manifest is empty"));
    }
    decode_value(kind, value)
}

fn to_json(yaml: Yaml) -> Result<Value> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(b)),
        Yaml::Integer(i) => Ok(Value::Number(i.into())),
        Yaml::Real(s) => {
            let f: f64 = s
                .parse()
                .map_err(|e: std::num::ParseFloatError| Error::yaml(format!("{s}: {e}")))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Array(items) => items
            .into_iter()
            .map(to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Yaml::Hash(entries) => entries
            .into_iter()
            .map(|(k, v)| Ok((map_key(k)?, to_json(v)?)))
            .collect::<Result<Map<String, Value>>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err(Error::yaml("YAML aliases not supported")),
        Yaml::BadValue => Err(Error::yaml("bad YAML value")),
    }
}

/// Field maps are string-keyed; scalar keys are stringified
fn map_key(key: Yaml) -> Result<String> {
    match key {
        Yaml::String(s) | Yaml::Real(s) => Ok(s),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        _ => Err(Error::yaml("unsupported YAML key type")),
    }
}
