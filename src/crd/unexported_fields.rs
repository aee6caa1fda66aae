//! TestResourceUnexportedFields Custom Resource
//!
//! A resource whose in-memory form carries state its wire form does not:
//!
//! - spec and status each hold a hidden field map that is never encoded and
//!   is ignored by semantic equality, reachable only through accessors
//! - the spec can be armed to fail the next encode (`errOnMarshal`) or the
//!   next decode (`errOnUnmarshal`)
//! - defaulting and validation hooks for an admission pipeline
//!
//! Example:
//! ```yaml
//! apiVersion: testing.reconciler.runtime/v1
//! kind: TestResourceUnexportedFields
//! metadata:
//!   name: sample
//!   namespace: default
//! spec:
//!   fields:
//!     hello: world
//!   errOnUnmarshal: true
//! ```

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::core::{GroupVersionKind, ObjectList};
use kube::{CustomResource, Resource};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::hidden::SharedFields;
use super::types::Status;
use crate::admission::{CustomDefaulter, CustomValidator, Warnings};
use crate::equality::Equalities;
use crate::field::{ErrorList, FieldError, Path};
use crate::runtime::{downcast_mut, downcast_ref, Object};
use crate::scheme::Scheme;
use crate::{TESTING_GROUP, TESTING_VERSION};

/// Message of the armed encode fault
pub const ERR_ON_MARSHAL: &str = "ErrOnMarshal true";

/// Message of the armed decode fault
pub const ERR_ON_UNMARSHAL: &str = "ErrOnUnmarshal true";

/// Key the defaulting hook writes into `spec.fields`
pub const DEFAULTER_KEY: &str = "Defaulter";

/// Value the defaulting hook writes under [`DEFAULTER_KEY`]
pub const DEFAULTER_VALUE: &str = "ran";

/// Key in `spec.fields` the validation rule looks for
pub const INVALID_KEY: &str = "invalid";

const LIST_KIND: &str = "TestResourceUnexportedFieldsList";

/// Specification for a TestResourceUnexportedFields
///
/// `Serialize`/`Deserialize` are written by hand so the hidden field map is
/// structurally absent from the wire form and the fault flags are checked
/// before anything is produced. `Clone` gives the copy its own hidden map.
#[derive(CustomResource, Debug, Default, PartialEq)]
#[kube(
    group = "testing.reconciler.runtime",
    version = "v1",
    kind = "TestResourceUnexportedFields",
    plural = "testresourceunexportedfields",
    namespaced,
    status = "TestResourceUnexportedFieldsStatus",
    schema = "disabled",
    derive = "Default",
    derive = "PartialEq"
)]
pub struct TestResourceUnexportedFieldsSpec {
    /// Visible string map; `None` and an empty map are distinct states
    pub fields: Option<BTreeMap<String, String>>,

    hidden_fields: Option<SharedFields>,

    /// Pod template, compared and copied as a whole
    pub template: PodTemplateSpec,

    /// Fail the next encode of this spec
    pub err_on_marshal: bool,

    /// Fail any decode of a wire form carrying this flag
    pub err_on_unmarshal: bool,
}

/// Status of a TestResourceUnexportedFields
#[derive(Debug, Default, PartialEq)]
pub struct TestResourceUnexportedFieldsStatus {
    /// Generic observed-state envelope, inlined on the wire
    pub status: Status,

    /// Visible string map; `None` and an empty map are distinct states
    pub fields: Option<BTreeMap<String, String>>,

    hidden_fields: Option<SharedFields>,
}

/// List of TestResourceUnexportedFields, items kept in encode order
pub type TestResourceUnexportedFieldsList = ObjectList<TestResourceUnexportedFields>;

// =============================================================================
// Wire forms
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpecWireRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a BTreeMap<String, String>>,
    template: &'a PodTemplateSpec,
    #[serde(skip_serializing_if = "is_false")]
    err_on_marshal: bool,
    #[serde(skip_serializing_if = "is_false")]
    err_on_unmarshal: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecWire {
    #[serde(default)]
    fields: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    template: PodTemplateSpec,
    #[serde(default)]
    err_on_marshal: bool,
    #[serde(default)]
    err_on_unmarshal: bool,
}

#[derive(Serialize)]
struct StatusWireRef<'a> {
    #[serde(flatten)]
    status: &'a Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct StatusWire {
    #[serde(flatten)]
    status: Status,
    #[serde(default)]
    fields: Option<BTreeMap<String, String>>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// An explicit `null` decodes like an absent key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Serialize for TestResourceUnexportedFieldsSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.err_on_marshal {
            return Err(S::Error::custom(ERR_ON_MARSHAL));
        }
        SpecWireRef {
            fields: self.fields.as_ref(),
            template: &self.template,
            err_on_marshal: self.err_on_marshal,
            err_on_unmarshal: self.err_on_unmarshal,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TestResourceUnexportedFieldsSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = SpecWire::deserialize(deserializer)?;
        if wire.err_on_unmarshal {
            return Err(D::Error::custom(ERR_ON_UNMARSHAL));
        }
        Ok(Self {
            fields: wire.fields,
            hidden_fields: None,
            template: wire.template,
            err_on_marshal: wire.err_on_marshal,
            err_on_unmarshal: wire.err_on_unmarshal,
        })
    }
}

impl Serialize for TestResourceUnexportedFieldsStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StatusWireRef {
            status: &self.status,
            fields: self.fields.as_ref(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TestResourceUnexportedFieldsStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = StatusWire::deserialize(deserializer)?;
        Ok(Self {
            status: wire.status,
            fields: wire.fields,
            hidden_fields: None,
        })
    }
}

// =============================================================================
// Hidden side channel
// =============================================================================

impl Clone for TestResourceUnexportedFieldsSpec {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            hidden_fields: self.hidden_fields.as_ref().map(SharedFields::deep_clone),
            template: self.template.clone(),
            err_on_marshal: self.err_on_marshal,
            err_on_unmarshal: self.err_on_unmarshal,
        }
    }
}

impl Clone for TestResourceUnexportedFieldsStatus {
    fn clone(&self) -> Self {
        Self {
            status: self.status.clone(),
            fields: self.fields.clone(),
            hidden_fields: self.hidden_fields.as_ref().map(SharedFields::deep_clone),
        }
    }
}

fn add_hidden(slot: &mut Option<SharedFields>, key: impl Into<String>, value: impl Into<String>) {
    slot.get_or_insert_with(SharedFields::new).insert(key, value);
}

impl TestResourceUnexportedFieldsSpec {
    /// Current hidden field map; the returned handle aliases the spec's
    pub fn hidden_fields(&self) -> Option<SharedFields> {
        self.hidden_fields.clone()
    }

    /// Replace the hidden field map
    pub fn set_hidden_fields(&mut self, fields: Option<SharedFields>) {
        self.hidden_fields = fields;
    }

    /// Insert or overwrite one hidden entry, allocating the map if absent
    pub fn add_hidden_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        add_hidden(&mut self.hidden_fields, key, value);
    }

    /// Equality that ignores the hidden field map
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.template == other.template
            && self.err_on_marshal == other.err_on_marshal
            && self.err_on_unmarshal == other.err_on_unmarshal
    }

    /// Encode to JSON bytes, honouring `errOnMarshal`
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        super::encode("TestResourceUnexportedFieldsSpec", self)
    }

    /// Decode from JSON bytes, honouring `errOnUnmarshal`
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        super::decode("TestResourceUnexportedFieldsSpec", bytes)
    }
}

impl TestResourceUnexportedFieldsStatus {
    /// Current hidden field map; the returned handle aliases the status's
    pub fn hidden_fields(&self) -> Option<SharedFields> {
        self.hidden_fields.clone()
    }

    /// Replace the hidden field map
    pub fn set_hidden_fields(&mut self, fields: Option<SharedFields>) {
        self.hidden_fields = fields;
    }

    /// Insert or overwrite one hidden entry, allocating the map if absent
    pub fn add_hidden_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        add_hidden(&mut self.hidden_fields, key, value);
    }

    /// Equality that ignores the hidden field map
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.status == other.status && self.fields == other.fields
    }

    /// Encode to JSON bytes
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        super::encode("TestResourceUnexportedFieldsStatus", self)
    }

    /// Decode from JSON bytes
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        super::decode("TestResourceUnexportedFieldsStatus", bytes)
    }
}

// =============================================================================
// Resource operations
// =============================================================================

impl TestResourceUnexportedFields {
    /// Point the status's hidden field map at the spec's
    ///
    /// The map is shared, not copied: later inserts through either handle are
    /// visible through both. A spec without a hidden map clears the status's.
    pub fn reflect_hidden_fields_to_status(&mut self) {
        self.status
            .get_or_insert_with(Default::default)
            .hidden_fields = self.spec.hidden_fields.clone();
    }

    /// Field-level validation of the resource
    ///
    /// An `invalid` key in `spec.fields` produces a field error that is not
    /// collected, so the returned list is currently always empty.
    pub fn validate(&self) -> ErrorList {
        let errs = ErrorList::new();

        if let Some(value) = self.spec.fields.as_ref().and_then(|f| f.get(INVALID_KEY)) {
            // TODO: push this into `errs` once fixtures carrying an "invalid"
            // key no longer expect to be admitted.
            let _ = FieldError::invalid(
                Path::new(["spec", "fields", INVALID_KEY]),
                value.as_str(),
                "",
            );
        }

        errs
    }

    /// Compare two revisions with the registered semantic predicates
    ///
    /// Metadata is compared structurally; a missing status compares equal to
    /// an empty one.
    pub fn semantic_eq(&self, other: &Self, equalities: &Equalities) -> bool {
        let empty = TestResourceUnexportedFieldsStatus::default();
        self.metadata == other.metadata
            && equalities.deep_equal(&self.spec, &other.spec)
            && equalities.deep_equal(
                self.status.as_ref().unwrap_or(&empty),
                other.status.as_ref().unwrap_or(&empty),
            )
    }

    /// Encode the whole resource to JSON bytes
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        super::encode(&<Self as Resource>::kind(&()), self)
    }

    /// Decode a whole resource from JSON bytes
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        super::decode(&<Self as Resource>::kind(&()), bytes)
    }

    fn kind_name() -> String {
        <Self as Resource>::kind(&()).into_owned()
    }
}

impl CustomDefaulter for TestResourceUnexportedFields {
    fn apply_defaults(&self, obj: &mut dyn Object) -> crate::Result<()> {
        let r = downcast_mut::<Self>(obj, "obj")?;
        r.spec
            .fields
            .get_or_insert_with(BTreeMap::new)
            .insert(DEFAULTER_KEY.to_string(), DEFAULTER_VALUE.to_string());
        Ok(())
    }
}

impl CustomValidator for TestResourceUnexportedFields {
    fn validate_create(&self, obj: &dyn Object) -> crate::Result<Warnings> {
        let r = downcast_ref::<Self>(obj, "obj")?;
        r.validate().to_aggregate(Self::kind_name())?;
        Ok(Warnings::new())
    }

    fn validate_update(&self, old_obj: &dyn Object, new_obj: &dyn Object) -> crate::Result<Warnings> {
        // No rule compares revisions yet; the old object is only type-checked.
        downcast_ref::<Self>(old_obj, "oldObj")?;
        let r = downcast_ref::<Self>(new_obj, "newObj")?;
        r.validate().to_aggregate(Self::kind_name())?;
        Ok(Warnings::new())
    }

    fn validate_delete(&self, obj: &dyn Object) -> crate::Result<Warnings> {
        downcast_ref::<Self>(obj, "obj")?;
        Ok(Warnings::new())
    }
}

/// Register the resource, its list and its semantic predicates
pub(crate) fn register(scheme: &Scheme, equalities: &Equalities) -> crate::Result<()> {
    scheme.add_known_type::<TestResourceUnexportedFields>()?;
    scheme.add_known_type_as::<TestResourceUnexportedFieldsList>(GroupVersionKind::gvk(
        TESTING_GROUP,
        TESTING_VERSION,
        LIST_KIND,
    ))?;

    equalities.add_func(
        |a: &TestResourceUnexportedFieldsSpec, b: &TestResourceUnexportedFieldsSpec| {
            a.semantic_eq(b)
        },
    )?;
    equalities.add_func(
        |a: &TestResourceUnexportedFieldsStatus, b: &TestResourceUnexportedFieldsStatus| {
            a.semantic_eq(b)
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use proptest::prelude::*;
    use k8s_openapi::api::core::v1::{ConfigMap, Container, PodSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn spec_with_fields(pairs: &[(&str, &str)]) -> TestResourceUnexportedFieldsSpec {
        TestResourceUnexportedFieldsSpec {
            fields: Some(fields(pairs)),
            ..Default::default()
        }
    }

    fn sample_template(image: &str) -> PodTemplateSpec {
        PodTemplateSpec {
            metadata: None,
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "app".to_string(),
                    image: Some(image.to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        }
    }

    fn resource(spec: TestResourceUnexportedFieldsSpec) -> TestResourceUnexportedFields {
        let mut r = TestResourceUnexportedFields::new("sample", spec);
        r.metadata.namespace = Some("default".to_string());
        r
    }

    fn handler() -> TestResourceUnexportedFields {
        TestResourceUnexportedFields::default()
    }

    /// Visible field maps, absent and empty included
    fn visible_fields() -> impl Strategy<Value = Option<BTreeMap<String, String>>> {
        prop::option::of(prop::collection::btree_map(
            "[a-zA-Z]{1,8}",
            "[a-zA-Z0-9 ]{0,12}",
            0..6,
        ))
    }

    /// Hidden entries; keys never collide with anything in the wire form
    fn hidden_entries() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("hidden-[a-z]{1,8}", "secret-[a-z0-9]{1,8}", 0..6)
    }

    fn arb_spec() -> impl Strategy<Value = TestResourceUnexportedFieldsSpec> {
        (visible_fields(), any::<bool>(), any::<bool>(), hidden_entries()).prop_map(
            |(fields, err_on_marshal, err_on_unmarshal, hidden)| {
                let mut spec = TestResourceUnexportedFieldsSpec {
                    fields,
                    err_on_marshal,
                    err_on_unmarshal,
                    ..Default::default()
                };
                for (k, v) in hidden {
                    spec.add_hidden_field(k, v);
                }
                spec
            },
        )
    }

    // =========================================================================
    // Encode / decode
    // =========================================================================

    mod wire {
        use super::*;

        #[test]
        fn test_spec_wire_shape() {
            let mut spec = spec_with_fields(&[("hello", "world")]);
            spec.err_on_unmarshal = true;

            let json = serde_json::to_value(&spec).unwrap();
            assert_eq!(
                json,
                serde_json::json!({
                    "fields": {"hello": "world"},
                    "template": {},
                    "errOnUnmarshal": true,
                })
            );
        }

        #[test]
        fn test_unset_flags_and_absent_fields_are_omitted() {
            let json = serde_json::to_value(TestResourceUnexportedFieldsSpec::default()).unwrap();
            assert_eq!(json, serde_json::json!({"template": {}}));
        }

        #[test]
        fn test_empty_fields_round_trip_as_empty() {
            let spec = TestResourceUnexportedFieldsSpec {
                fields: Some(BTreeMap::new()),
                ..Default::default()
            };
            let decoded = TestResourceUnexportedFieldsSpec::decode(&spec.encode().unwrap()).unwrap();
            assert_eq!(decoded.fields, Some(BTreeMap::new()));

            let decoded = TestResourceUnexportedFieldsSpec::decode(br#"{"template":{}}"#).unwrap();
            assert_eq!(decoded.fields, None);
        }

        #[test]
        fn test_round_trip_preserves_visible_fields() {
            let mut spec = spec_with_fields(&[("a", "1"), ("b", "2")]);
            spec.template = sample_template("nginx:1.27");
            spec.add_hidden_field("secret", "value");

            let decoded = TestResourceUnexportedFieldsSpec::decode(&spec.encode().unwrap()).unwrap();
            assert_eq!(decoded.fields, spec.fields);
            assert_eq!(decoded.template, spec.template);
            assert!(!decoded.err_on_marshal);
            assert!(!decoded.err_on_unmarshal);
            assert!(decoded.hidden_fields().is_none());
        }

        #[test]
        fn test_err_on_marshal_fails_encode() {
            let spec = TestResourceUnexportedFieldsSpec {
                err_on_marshal: true,
                ..Default::default()
            };
            let err = spec.encode().unwrap_err();
            assert!(matches!(err, Error::Encode { .. }));
            assert!(err.to_string().contains(ERR_ON_MARSHAL));
        }

        #[test]
        fn test_err_on_marshal_fails_whole_resource_encode() {
            let r = resource(TestResourceUnexportedFieldsSpec {
                err_on_marshal: true,
                ..Default::default()
            });
            assert!(matches!(r.encode(), Err(Error::Encode { .. })));
        }

        #[test]
        fn test_err_on_marshal_is_decoded_from_wire() {
            let spec =
                TestResourceUnexportedFieldsSpec::decode(br#"{"errOnMarshal": true}"#).unwrap();
            assert!(spec.err_on_marshal);
            assert!(spec.encode().is_err());
        }

        #[test]
        fn test_err_on_unmarshal_fails_decode() {
            let err = TestResourceUnexportedFieldsSpec::decode(
                br#"{"fields": {"a": "b"}, "errOnUnmarshal": true}"#,
            )
            .unwrap_err();
            assert!(matches!(err, Error::Decode { .. }));
            assert!(err.to_string().contains(ERR_ON_UNMARSHAL));
        }

        #[test]
        fn test_armed_spec_encodes_but_never_decodes() {
            let mut spec = spec_with_fields(&[("a", "b")]);
            spec.err_on_unmarshal = true;

            let bytes = spec.encode().expect("decode fault does not block encode");
            let err = TestResourceUnexportedFieldsSpec::decode(&bytes).unwrap_err();
            assert!(matches!(err, Error::Decode { .. }));
        }

        #[test]
        fn test_null_template_decodes_as_empty() {
            let spec = TestResourceUnexportedFieldsSpec::decode(br#"{"template": null}"#).unwrap();
            assert_eq!(spec.template, PodTemplateSpec::default());
            assert_eq!(spec.fields, None);

            let spec = TestResourceUnexportedFieldsSpec::decode(br#"{"fields": null}"#).unwrap();
            assert_eq!(spec.fields, None);
        }

        #[test]
        fn test_resource_without_spec_is_rejected() {
            let err = TestResourceUnexportedFields::decode(
                br#"{"apiVersion": "testing.reconciler.runtime/v1", "kind": "TestResourceUnexportedFields", "metadata": {"name": "bare"}}"#,
            )
            .unwrap_err();
            assert!(err.to_string().contains("spec"), "unexpected error: {err}");
        }

        #[test]
        fn test_malformed_input_fails_before_flag_check() {
            let err = TestResourceUnexportedFieldsSpec::decode(br#"{"fields": ["not", "a", "map"]"#)
                .unwrap_err();
            assert!(matches!(err, Error::Decode { .. }));
            assert!(!err.to_string().contains(ERR_ON_UNMARSHAL));
        }

        #[test]
        fn test_status_inlines_envelope() {
            let mut status = TestResourceUnexportedFieldsStatus {
                fields: Some(fields(&[("observed", "yes")])),
                ..Default::default()
            };
            status.status.observed_generation = 4;
            status.add_hidden_field("k", "v");

            let json = serde_json::to_value(&status).unwrap();
            assert_eq!(
                json,
                serde_json::json!({"observedGeneration": 4, "fields": {"observed": "yes"}})
            );

            let decoded = TestResourceUnexportedFieldsStatus::decode(&status.encode().unwrap()).unwrap();
            assert_eq!(decoded.status.observed_generation, 4);
            assert_eq!(decoded.fields, status.fields);
            assert!(decoded.hidden_fields().is_none());
        }

        #[test]
        fn test_resource_round_trip() {
            let mut r = resource(spec_with_fields(&[("hello", "world")]));
            r.status = Some(TestResourceUnexportedFieldsStatus {
                fields: Some(fields(&[("seen", "1")])),
                ..Default::default()
            });

            let json = serde_json::to_value(&r).unwrap();
            assert_eq!(json["apiVersion"], "testing.reconciler.runtime/v1");
            assert_eq!(json["kind"], "TestResourceUnexportedFields");

            let decoded = TestResourceUnexportedFields::decode(&r.encode().unwrap()).unwrap();
            assert_eq!(decoded, r);
        }

        proptest! {
            /// Property: unarmed specs round-trip their visible fields and lose hidden ones
            #[test]
            fn prop_round_trip_keeps_visible_fields(mut spec in arb_spec()) {
                spec.err_on_marshal = false;
                let bytes = spec.encode().expect("unarmed spec encodes");
                prop_assert!(!String::from_utf8_lossy(&bytes).contains("hidden-"));

                match TestResourceUnexportedFieldsSpec::decode(&bytes) {
                    Ok(decoded) => {
                        prop_assert!(!spec.err_on_unmarshal);
                        prop_assert_eq!(&decoded.fields, &spec.fields);
                        prop_assert_eq!(&decoded.template, &spec.template);
                        prop_assert!(!decoded.err_on_marshal);
                        prop_assert!(!decoded.err_on_unmarshal);
                        prop_assert!(decoded.hidden_fields().is_none());
                    }
                    Err(err) => {
                        prop_assert!(spec.err_on_unmarshal);
                        prop_assert!(matches!(err, Error::Decode { .. }), "unexpected error: {err}");
                    }
                }
            }

            /// Property: an armed encode never produces bytes
            #[test]
            fn prop_armed_encode_always_fails(mut spec in arb_spec()) {
                spec.err_on_marshal = true;
                prop_assert!(matches!(spec.encode(), Err(Error::Encode { .. })), "armed encode did not fail with Error::Encode");
            }

            /// Property: status round-trips its visible fields and loses hidden ones
            #[test]
            fn prop_status_round_trip(
                fields in visible_fields(),
                generation in 0i64..1_000,
                hidden in hidden_entries(),
            ) {
                let mut status = TestResourceUnexportedFieldsStatus {
                    fields,
                    ..Default::default()
                };
                status.status.observed_generation = generation;
                status.set_hidden_fields(Some(hidden.into()));

                let decoded =
                    TestResourceUnexportedFieldsStatus::decode(&status.encode().unwrap()).unwrap();
                prop_assert_eq!(&decoded.fields, &status.fields);
                prop_assert_eq!(&decoded.status, &status.status);
                prop_assert!(decoded.hidden_fields().is_none());
            }
        }
    }

    // =========================================================================
    // Hidden side channel
    // =========================================================================

    mod hidden {
        use super::*;

        /// Story: A hidden entry is readable in memory but never leaves the process
        #[test]
        fn story_hidden_field_never_reaches_the_wire() {
            let mut spec = TestResourceUnexportedFieldsSpec::default();
            assert!(spec.hidden_fields().is_none());

            spec.add_hidden_field("k", "v");
            let hidden = spec.hidden_fields().expect("allocated on first add");
            assert_eq!(hidden.snapshot(), fields(&[("k", "v")]));

            let encoded = String::from_utf8(spec.encode().unwrap()).unwrap();
            assert!(!encoded.contains("\"k\""), "hidden key leaked: {encoded}");
            assert!(!encoded.contains("\"v\""), "hidden value leaked: {encoded}");
            assert!(spec.fields.is_none());
        }

        #[test]
        fn test_set_replaces_wholesale() {
            let mut status = TestResourceUnexportedFieldsStatus::default();
            status.add_hidden_field("old", "1");
            status.set_hidden_fields(Some([("new", "2")].into_iter().collect()));

            let hidden = status.hidden_fields().unwrap();
            assert_eq!(hidden.get("old"), None);
            assert_eq!(hidden.get("new").as_deref(), Some("2"));

            status.set_hidden_fields(None);
            assert!(status.hidden_fields().is_none());
        }

        #[test]
        fn test_add_overwrites_existing_entry() {
            let mut spec = TestResourceUnexportedFieldsSpec::default();
            spec.add_hidden_field("k", "v1");
            spec.add_hidden_field("k", "v2");
            assert_eq!(spec.hidden_fields().unwrap().snapshot(), fields(&[("k", "v2")]));
        }

        /// Story: Reflecting to status shares the spec's map
        #[test]
        fn story_reflect_aliases_the_spec_map() {
            let mut r = resource(TestResourceUnexportedFieldsSpec::default());
            r.spec.add_hidden_field("k", "v");
            r.reflect_hidden_fields_to_status();

            let status = r.status.as_ref().expect("status allocated");
            let spec_map = r.spec.hidden_fields().unwrap();
            let status_map = status.hidden_fields().unwrap();
            assert!(spec_map.ptr_eq(&status_map));

            // A later add through the spec shows up in the status
            r.spec.add_hidden_field("later", "x");
            let status_map = r.status.as_ref().unwrap().hidden_fields().unwrap();
            assert_eq!(status_map.get("later").as_deref(), Some("x"));
        }

        /// Story: A copy owns its hidden map; only reflecting shares one
        #[test]
        fn story_clones_do_not_share_hidden_maps() {
            let mut original = TestResourceUnexportedFieldsSpec::default();
            original.add_hidden_field("k", "v");

            let mut copy = original.clone();
            copy.add_hidden_field("only-on-copy", "x");

            assert_eq!(original.hidden_fields().unwrap().snapshot(), fields(&[("k", "v")]));
            assert_eq!(
                copy.hidden_fields().unwrap().snapshot(),
                fields(&[("k", "v"), ("only-on-copy", "x")])
            );

            let mut status = TestResourceUnexportedFieldsStatus::default();
            status.add_hidden_field("s", "1");
            let status_copy = status.clone();
            status.add_hidden_field("later", "2");
            assert_eq!(status_copy.hidden_fields().unwrap().len(), 1);
        }

        #[test]
        fn test_resource_clone_copies_hidden_maps() {
            let mut r = resource(TestResourceUnexportedFieldsSpec::default());
            r.spec.add_hidden_field("k", "v");
            r.reflect_hidden_fields_to_status();

            let copy = r.clone();
            r.spec.add_hidden_field("after", "1");

            assert_eq!(copy.spec.hidden_fields().unwrap().get("after"), None);
            let status_map = copy.status.as_ref().unwrap().hidden_fields().unwrap();
            assert_eq!(status_map.get("after"), None);
            assert_eq!(status_map.get("k").as_deref(), Some("v"));
        }

        #[test]
        fn test_reflect_without_spec_map_clears_status_map() {
            let mut r = resource(TestResourceUnexportedFieldsSpec::default());
            let mut status = TestResourceUnexportedFieldsStatus::default();
            status.add_hidden_field("stale", "1");
            r.status = Some(status);

            r.reflect_hidden_fields_to_status();
            assert!(r.status.unwrap().hidden_fields().is_none());
        }

        #[test]
        fn test_hidden_fields_do_not_touch_visible_fields() {
            let mut spec = spec_with_fields(&[("a", "1")]);
            spec.add_hidden_field("a", "hidden");
            assert_eq!(spec.fields, Some(fields(&[("a", "1")])));
        }
    }

    // =========================================================================
    // Lifecycle hooks
    // =========================================================================

    mod hooks {
        use super::*;

        /// Story: Defaulting an object without fields allocates and marks them
        #[test]
        fn story_defaulting_marks_fields() {
            let mut r = resource(TestResourceUnexportedFieldsSpec::default());
            handler().apply_defaults(&mut r).unwrap();
            assert_eq!(r.spec.fields, Some(fields(&[("Defaulter", "ran")])));
        }

        #[test]
        fn test_defaulting_keeps_existing_fields() {
            let mut r = resource(spec_with_fields(&[("keep", "me")]));
            handler().apply_defaults(&mut r).unwrap();
            assert_eq!(
                r.spec.fields,
                Some(fields(&[("Defaulter", "ran"), ("keep", "me")]))
            );
        }

        #[test]
        fn test_defaulting_is_idempotent() {
            let mut once = resource(spec_with_fields(&[("x", "y")]));
            handler().apply_defaults(&mut once).unwrap();

            let mut twice = once.clone();
            handler().apply_defaults(&mut twice).unwrap();
            assert_eq!(once, twice);
        }

        #[test]
        fn test_defaulting_rejects_other_kinds() {
            let mut cm = ConfigMap::default();
            let err = handler().apply_defaults(&mut cm).unwrap_err();
            assert_eq!(
                err.to_string(),
                "expected obj to be TestResourceUnexportedFields, got ConfigMap"
            );
        }

        /// Story: An "invalid" entry is currently admitted
        #[test]
        fn story_invalid_key_is_not_rejected() {
            let r = resource(spec_with_fields(&[("invalid", "x")]));
            assert!(r.validate().is_empty());

            let warnings = handler().validate_create(&r).unwrap();
            assert!(warnings.is_empty());

            let warnings = handler().validate_update(&r.clone(), &r).unwrap();
            assert!(warnings.is_empty());
        }

        #[test]
        fn test_validate_update_type_checks_both_sides() {
            let r = resource(TestResourceUnexportedFieldsSpec::default());
            let cm = ConfigMap::default();

            let err = handler().validate_update(&cm, &r).unwrap_err();
            assert!(err.to_string().starts_with("expected oldObj"));

            let err = handler().validate_update(&r, &cm).unwrap_err();
            assert!(err.to_string().starts_with("expected newObj"));
        }

        #[test]
        fn test_validate_delete_always_allows() {
            let mut spec = spec_with_fields(&[("invalid", "x")]);
            spec.err_on_marshal = true;
            let r = resource(spec);

            let warnings = handler().validate_delete(&r).unwrap();
            assert!(warnings.is_empty());
        }

        #[test]
        fn test_validate_create_and_delete_reject_other_kinds() {
            let cm = ConfigMap::default();
            assert!(matches!(
                handler().validate_create(&cm),
                Err(Error::TypeMismatch { .. })
            ));
            assert!(matches!(
                handler().validate_delete(&cm),
                Err(Error::TypeMismatch { .. })
            ));
        }

        proptest! {
            /// Property: defaulting twice equals defaulting once
            #[test]
            fn prop_defaulting_is_idempotent(spec in arb_spec()) {
                let mut once = resource(spec);
                handler().apply_defaults(&mut once).unwrap();

                let mut twice = once.clone();
                handler().apply_defaults(&mut twice).unwrap();

                prop_assert_eq!(&once, &twice);
                let fields = once.spec.fields.as_ref().expect("defaulting allocates fields");
                prop_assert_eq!(fields.get(DEFAULTER_KEY).map(String::as_str), Some(DEFAULTER_VALUE));
            }
        }
    }

    // =========================================================================
    // Semantic equality
    // =========================================================================

    mod equality {
        use super::*;

        fn registered() -> Equalities {
            let equalities = Equalities::new();
            register(&Scheme::new(), &equalities).expect("registration");
            equalities
        }

        /// Story: Two revisions that differ only in hidden data are the same revision
        #[test]
        fn story_hidden_only_differences_are_semantically_equal() {
            let eq = registered();

            let a = spec_with_fields(&[("a", "1")]);
            let mut b = a.clone();
            b.add_hidden_field("debug", "trace");

            assert_ne!(a, b, "structural equality sees the hidden map");
            assert!(eq.deep_equal(&a, &b));

            let mut sa = TestResourceUnexportedFieldsStatus::default();
            let mut sb = TestResourceUnexportedFieldsStatus::default();
            sa.add_hidden_field("x", "1");
            sb.add_hidden_field("x", "2");
            assert!(eq.deep_equal(&sa, &sb));
        }

        #[test]
        fn test_visible_differences_are_unequal() {
            let eq = registered();
            let base = spec_with_fields(&[("a", "1")]);

            let mut other = base.clone();
            other.fields = Some(fields(&[("a", "2")]));
            assert!(!eq.deep_equal(&base, &other));

            let mut other = base.clone();
            other.fields = Some(BTreeMap::new());
            assert!(!eq.deep_equal(&base, &other));

            let mut other = base.clone();
            other.template = sample_template("busybox");
            assert!(!eq.deep_equal(&base, &other));

            let mut other = base.clone();
            other.err_on_marshal = true;
            assert!(!eq.deep_equal(&base, &other));

            let mut other = base.clone();
            other.err_on_unmarshal = true;
            assert!(!eq.deep_equal(&base, &other));
        }

        #[test]
        fn test_status_visible_differences_are_unequal() {
            let eq = registered();
            let a = TestResourceUnexportedFieldsStatus::default();

            let mut b = a.clone();
            b.status.observed_generation = 2;
            assert!(!eq.deep_equal(&a, &b));

            let mut b = a.clone();
            b.fields = Some(fields(&[("k", "v")]));
            assert!(!eq.deep_equal(&a, &b));
        }

        #[test]
        fn test_resource_semantic_eq() {
            let eq = registered();
            let a = resource(spec_with_fields(&[("a", "1")]));

            let mut b = a.clone();
            b.spec.add_hidden_field("k", "v");
            b.status = Some(TestResourceUnexportedFieldsStatus::default());
            assert!(a.semantic_eq(&b, &eq));

            let mut c = a.clone();
            c.metadata = ObjectMeta {
                name: Some("other".to_string()),
                ..Default::default()
            };
            assert!(!a.semantic_eq(&c, &eq));
        }

        #[test]
        fn test_registration_twice_fails() {
            let scheme = Scheme::new();
            let equalities = Equalities::new();
            register(&scheme, &equalities).expect("first registration");

            assert!(matches!(
                register(&scheme, &equalities),
                Err(Error::Registration { .. })
            ));
        }

        proptest! {
            /// Property: specs that differ only in hidden entries are equal
            #[test]
            fn prop_hidden_only_differences_are_equal(spec in arb_spec(), extra in hidden_entries()) {
                let eq = registered();
                let mut other = spec.clone();
                other.set_hidden_fields(Some(extra.clone().into()));
                prop_assert!(eq.deep_equal(&spec, &other));

                let mut a = TestResourceUnexportedFieldsStatus {
                    fields: spec.fields.clone(),
                    ..Default::default()
                };
                let mut b = a.clone();
                a.set_hidden_fields(None);
                b.set_hidden_fields(Some(extra.into()));
                prop_assert!(eq.deep_equal(&a, &b));
            }

            /// Property: specs that differ in any visible field are unequal
            #[test]
            fn prop_visible_differences_are_unequal(a in arb_spec(), b in arb_spec()) {
                let visible_differs = a.fields != b.fields
                    || a.template != b.template
                    || a.err_on_marshal != b.err_on_marshal
                    || a.err_on_unmarshal != b.err_on_unmarshal;
                let eq = registered();
                prop_assert_eq!(eq.deep_equal(&a, &b), !visible_differs);
            }

            /// Property: statuses that differ in visible fields are unequal
            #[test]
            fn prop_status_visible_differences_are_unequal(
                fa in visible_fields(),
                fb in visible_fields(),
            ) {
                prop_assume!(fa != fb);
                let eq = registered();
                let a = TestResourceUnexportedFieldsStatus { fields: fa, ..Default::default() };
                let b = TestResourceUnexportedFieldsStatus { fields: fb, ..Default::default() };
                prop_assert!(!eq.deep_equal(&a, &b));
            }
        }
    }
}
