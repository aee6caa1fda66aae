//! AdmissionReview adapter
//!
//! Turns an `AdmissionRequest<DynamicObject>` into calls on the defaulting and
//! validation hooks of one concrete kind `K`. Objects are decoded through
//! `K`'s decode contract, so armed decode faults and malformed objects deny
//! the request instead of reaching the hooks.

use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use kube::core::DynamicObject;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::{CustomDefaulter, CustomValidator, Warnings};
use crate::crd::{decode_value, encode_value};
use crate::runtime::Object;
use crate::{Error, Result};

/// Run the defaulting hook and answer with a JSON patch of its changes
///
/// The patch is the difference between the object as received and the
/// defaulted object as `K` encodes it. An unchanged object is allowed without
/// a patch.
pub fn mutate<K, H>(handler: &H, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse
where
    K: Object + Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    H: CustomDefaulter + ?Sized,
{
    let uid = request.uid.clone();
    let kind = <K as Resource>::kind(&()).into_owned();

    let Some(raw) = request.object.as_ref() else {
        debug!(uid = %uid, kind = %kind, "No object in request, allowing unchanged");
        return AdmissionResponse::from(request);
    };

    let defaulted = (|| -> Result<(serde_json::Value, serde_json::Value)> {
        let original = serde_json::to_value(raw)?;
        let mut obj: K = decode_value(&kind, original.clone())?;
        handler.apply_defaults(&mut obj)?;
        Ok((original, encode_value(&kind, &obj)?))
    })();

    let (original, defaulted) = match defaulted {
        Ok(pair) => pair,
        Err(e) => {
            warn!(uid = %uid, kind = %kind, error = %e, "Defaulting failed, denying");
            return AdmissionResponse::from(request).deny(e.to_string());
        }
    };

    let patch = json_patch::diff(&original, &defaulted);
    if patch.0.is_empty() {
        debug!(uid = %uid, kind = %kind, "Defaults already applied, allowing unchanged");
        return AdmissionResponse::from(request);
    }

    debug!(uid = %uid, kind = %kind, patch_ops = patch.0.len(), "Applying defaults");
    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            warn!(uid = %uid, error = %e, "Failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}

/// Run the validation hook matching the request's operation
///
/// `CREATE` validates `object`, `UPDATE` validates `oldObject` against
/// `object`, `DELETE` validates `oldObject`. `CONNECT` is allowed without
/// calling a hook. Warnings are passed through on success.
pub fn validate<K, H>(handler: &H, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse
where
    K: Object + Resource<DynamicType = ()> + DeserializeOwned,
    H: CustomValidator + ?Sized,
{
    let uid = request.uid.clone();
    let kind = <K as Resource>::kind(&()).into_owned();

    let result = (|| -> Result<Warnings> {
        match request.operation {
            Operation::Create => {
                let obj: K = decode_object(&kind, request.object.as_ref(), "object")?;
                handler.validate_create(&obj)
            }
            Operation::Update => {
                let old: K = decode_object(&kind, request.old_object.as_ref(), "oldObject")?;
                let new: K = decode_object(&kind, request.object.as_ref(), "object")?;
                handler.validate_update(&old, &new)
            }
            Operation::Delete => {
                let obj: K = decode_object(&kind, request.old_object.as_ref(), "oldObject")?;
                handler.validate_delete(&obj)
            }
            // CONNECT carries no object worth validating
            _ => Ok(Warnings::new()),
        }
    })();

    match result {
        Ok(warnings) => {
            let mut response = AdmissionResponse::from(request);
            if !warnings.is_empty() {
                debug!(uid = %uid, kind = %kind, warnings = warnings.len(), "Allowing with warnings");
                response.warnings = Some(warnings);
            }
            response
        }
        Err(e) => {
            warn!(uid = %uid, kind = %kind, error = %e, "Validation failed, denying");
            AdmissionResponse::from(request).deny(e.to_string())
        }
    }
}

fn decode_object<K: DeserializeOwned>(
    kind: &str,
    obj: Option<&DynamicObject>,
    field: &str,
) -> Result<K> {
    let obj = obj.ok_or_else(|| Error::decode(kind, format!("admission request has no {field}")))?;
    decode_value(kind, serde_json::to_value(obj)?)
}
