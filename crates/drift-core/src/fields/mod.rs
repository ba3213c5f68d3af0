//! Managed field registry
//!
//! Maps each configurable field name to how its live value is read, how it
//! is compared with the expected value, and how the expected value is
//! written back.

mod builtins;
mod store;
mod types;

pub use builtins::{
    MERGE_ACCESS_LEVELS, MERGE_METHOD, MERGE_REQUESTS_TEMPLATE,
    ONLY_ALLOW_MERGE_IF_PIPELINE_SUCCEEDS, PREVENT_SECRETS, REMOVE_SOURCE_BRANCH_AFTER_MERGE,
    SQUASH_OPTION, SQUASH_OPTIONS, builtin_fields, display_template,
};
pub use store::FieldRegistry;
pub use types::{FieldKind, FieldLookup, ScalarField, ValueKind};
