//! Tool schema validation.
//!
//! Validates tool definitions against the supported JSON-Schema subset and
//! memoizes reports in a bounded, TTL-expiring cache keyed by a canonical
//! schema hash.

pub mod cache;
pub mod validator;

pub use cache::{canonical_hash, ValidationCache, ValidationCacheConfig};
pub use validator::{
    IssueSeverity, SchemaIssue, SchemaReport, SchemaValidator, SchemaValidatorConfig,
};
