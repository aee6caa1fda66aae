//! Custom Resource Definitions for the test resources
//!
//! This module contains the resource types and the registration entry point
//! that makes them known to a [`Scheme`] and an [`Equalities`] registry.

mod hidden;
mod types;
mod unexported_fields;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use hidden::SharedFields;
pub use types::{Condition, ConditionStatus, Status};
pub use unexported_fields::{
    TestResourceUnexportedFields, TestResourceUnexportedFieldsList,
    TestResourceUnexportedFieldsSpec, TestResourceUnexportedFieldsStatus, DEFAULTER_KEY,
    DEFAULTER_VALUE, ERR_ON_MARSHAL, ERR_ON_UNMARSHAL, INVALID_KEY,
};

use crate::equality::Equalities;
use crate::scheme::Scheme;
use crate::{Error, Result};

/// Register every test resource and its semantic equality predicates
///
/// Call once during process bootstrap. Registering into the same registries
/// twice fails, and callers should treat that failure as fatal.
pub fn add_to_scheme(scheme: &Scheme, equalities: &Equalities) -> Result<()> {
    unexported_fields::register(scheme, equalities)?;
    tracing::debug!(
        kinds = scheme.len(),
        equality_funcs = equalities.len(),
        "registered test resources"
    );
    Ok(())
}

/// Encode `value` to JSON bytes, reporting failures as [`Error::Encode`]
pub(crate) fn encode<T: Serialize + ?Sized>(kind: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::encode(kind, e.to_string()))
}

/// Decode JSON bytes, reporting failures as [`Error::Decode`]
pub(crate) fn decode<T: DeserializeOwned>(kind: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::decode(kind, e.to_string()))
}

/// Convert an already-parsed JSON value through the decode contract
pub(crate) fn decode_value<T: DeserializeOwned>(kind: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::decode(kind, e.to_string()))
}

/// Convert to a JSON value through the encode contract
pub(crate) fn encode_value<T: Serialize + ?Sized>(kind: &str, value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::encode(kind, e.to_string()))
}
