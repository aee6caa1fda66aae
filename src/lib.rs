//! Lattice fixtures - test resources for admission, defaulting and equality
//!
//! This crate provides a Kubernetes resource type whose in-memory form carries
//! more than its wire form does. It is used to exercise the machinery that
//! surrounds a resource:
//!
//! - serialization with caller-armed encode/decode faults
//! - a hidden side channel on spec and status that never reaches the wire
//! - defaulting and validation hooks invoked by an admission pipeline
//! - semantic equality predicates that ignore the side channel
//!
//! # Modules
//!
//! - [`crd`] - The `TestResourceUnexportedFields` resource, its list and status envelope
//! - [`admission`] - Defaulter/validator capability traits and the admission review adapter
//! - [`runtime`] - Type-erased object model used by the lifecycle hooks
//! - [`scheme`] - Registry of known kinds
//! - [`equality`] - Registry of semantic equality predicates
//! - [`field`] - Field paths and field-level validation errors
//! - [`yaml`] - Manifest parsing
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod admission;
pub mod crd;
pub mod equality;
pub mod error;
pub mod field;
pub mod runtime;
pub mod scheme;
pub mod telemetry;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of the test resources
pub const TESTING_GROUP: &str = "testing.reconciler.runtime";

/// API version of the test resources
pub const TESTING_VERSION: &str = "v1";
